//! `state`, `led`, `set` and `power-off` subcommands.

use serde::Serialize;

use super::{
    InputState, LedSetting, Result, SetStateFlags, StateOutput, Transport, Vibration, Xusb,
    button_label, buttons, kv, kv_width, print_json, version_label,
};

/// Print an input state as text.
pub(super) fn print_state(user: u8, state: &InputState) {
    let g = state.gamepad();
    let w = kv_width(
        &[
            "User index:",
            "Version:",
            "Status:",
            "Packet:",
            "Buttons:",
            "Triggers:",
            "Left stick:",
            "Right stick:",
        ],
        &[],
    );
    kv("User index:", user, w);
    kv("Version:", version_label(state.version()), w);
    kv(
        "Status:",
        format_args!(
            "0x{:02X} ({})",
            state.status(),
            if state.is_connected() {
                "connected"
            } else {
                "not connected"
            }
        ),
        w,
    );
    kv("Packet:", state.packet_number(), w);
    kv(
        "Buttons:",
        format_args!("0x{:04X} {}", g.buttons, button_label(g.buttons)),
        w,
    );
    kv(
        "Triggers:",
        format_args!("L {} / R {}", g.left_trigger, g.right_trigger),
        w,
    );
    kv(
        "Left stick:",
        format_args!("({}, {})", g.left_thumb_x, g.left_thumb_y),
        w,
    );
    kv(
        "Right stick:",
        format_args!("({}, {})", g.right_thumb_x, g.right_thumb_y),
        w,
    );
}

pub(super) fn state_output(user: u8, state: InputState) -> StateOutput {
    StateOutput {
        user_index: user,
        buttons: buttons::names(state.gamepad().buttons),
        state,
    }
}

pub(super) fn cmd_state<T: Transport>(x: &Xusb<T>, user: u8, json: bool) -> Result<()> {
    let state = x.input_state(user)?;
    if json {
        return print_json(&state_output(user, state));
    }
    print_state(user, &state);
    Ok(())
}

#[derive(Serialize)]
struct LedOutput {
    user_index: u8,
    version: u16,
    led: u8,
    setting: Option<&'static str>,
}

pub(super) fn cmd_led<T: Transport>(x: &Xusb<T>, user: u8, json: bool) -> Result<()> {
    let led = x.led_state(user)?;
    let setting = led.setting().map(LedSetting::name);
    if json {
        return print_json(&LedOutput {
            user_index: user,
            version: led.version,
            led: led.led,
            setting,
        });
    }

    if led.version == 0 {
        println!("LED state is not reported by this bus.");
        return Ok(());
    }
    let w = kv_width(&["Version:", "LED:"], &[]);
    kv("Version:", version_label(led.version), w);
    match setting {
        Some(name) => kv("LED:", format_args!("{name} ({})", led.led), w),
        None => kv("LED:", format_args!("unknown ({})", led.led), w),
    }
    Ok(())
}

/// Flags and payload for a `set` invocation. Motors left unspecified stay
/// at zero when the other one is given.
pub(super) fn set_request(
    led: Option<LedSetting>,
    left: Option<u8>,
    right: Option<u8>,
) -> (LedSetting, Vibration, SetStateFlags) {
    let mut flags = SetStateFlags::NONE;
    if led.is_some() {
        flags = flags | SetStateFlags::LED;
    }
    if left.is_some() || right.is_some() {
        flags = flags | SetStateFlags::VIBRATION;
    }
    let vibration = Vibration::new(left.unwrap_or(0), right.unwrap_or(0));
    (led.unwrap_or(LedSetting::Off), vibration, flags)
}

pub(super) fn cmd_set<T: Transport>(
    x: &Xusb<T>,
    user: u8,
    led: Option<LedSetting>,
    left: Option<u8>,
    right: Option<u8>,
) -> Result<()> {
    let (led, vibration, flags) = set_request(led, left, right);
    x.set_state(user, led, vibration, flags)?;
    log::info!("set state on user index {user}");
    Ok(())
}

pub(super) fn cmd_power_off<T: Transport>(x: &Xusb<T>, user: u8) -> Result<()> {
    x.power_off(user)?;
    println!("Powered off user index {user}.");
    Ok(())
}
