//! `wait-guide` and `wait-input` subcommands.

use super::state::{print_state, state_output};
use super::{Result, Transport, Xusb, print_json};

#[derive(Debug, Clone, Copy)]
pub(super) enum Which {
    Guide,
    Input,
}

pub(super) fn cmd_wait<T: Transport>(
    x: &Xusb<T>,
    user: u8,
    which: Which,
    json: bool,
) -> Result<()> {
    if !json {
        match which {
            Which::Guide => {
                eprintln!("Waiting for the guide button on user index {user} (Ctrl+C to cancel)...")
            }
            Which::Input => eprintln!(
                "Waiting for input on user index {user} (Ctrl+C to cancel). \
                 The driver only reports input while a non-console window has focus."
            ),
        }
    }
    let result = match which {
        Which::Guide => x.wait_for_guide(user),
        Which::Input => x.wait_for_input(user),
    };
    let state = match result {
        Ok(s) => s,
        Err(e) => {
            if e.is_cancelled() {
                log::info!("wait on user index {user} cancelled");
            }
            return Err(e);
        }
    };
    if json {
        return print_json(&state_output(user, state));
    }
    print_state(user, &state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use xusb_lib::wire::{InputStateV1, buttons};

    use super::super::test_support::{client, driver};
    use super::*;

    #[test]
    fn guide_wait_prints_state() {
        let d = driver();
        let x = client(&d);
        x.refresh();
        std::thread::scope(|s| {
            let t = s.spawn(|| cmd_wait(&x, 0, Which::Guide, true));
            assert!(d.wait_for_pending(1, Duration::from_secs(5)));
            let mut reply = InputStateV1 {
                version: 0x0102,
                status: 1,
                ..Default::default()
            };
            reply.gamepad.standard.buttons = buttons::GUIDE;
            d.complete_pending(Ok(reply.encode().to_vec()));
            t.join().unwrap().unwrap();
        });
    }

    #[test]
    fn cancelled_wait_is_an_error() {
        let d = driver();
        let x = client(&d);
        x.refresh();
        let canceller = x.wait_canceller();
        std::thread::scope(|s| {
            let t = s.spawn(|| cmd_wait(&x, 0, Which::Input, false));
            assert!(d.wait_for_pending(1, Duration::from_secs(5)));
            canceller.cancel(0);
            let err = t.join().unwrap().unwrap_err();
            assert!(err.is_cancelled());
        });
    }
}
