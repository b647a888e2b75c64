//! `devices` subcommand — list connected controllers.

use super::{DeviceJson, DevicesOutput, Result, Transport, Xusb, print_json};

pub(super) fn devices_output<T: Transport>(x: &Xusb<T>) -> DevicesOutput {
    let devices: Vec<DeviceJson> = x
        .devices()
        .iter()
        .map(|d| DeviceJson {
            user_index: d.user_index(),
            bus: d.bus_instance(),
            index_on_bus: d.index_on_bus(),
        })
        .collect();
    DevicesOutput {
        count: devices.len(),
        devices,
    }
}

pub(super) fn cmd_devices<T: Transport>(x: &Xusb<T>, json: bool) -> Result<()> {
    let output = devices_output(x);
    if json {
        return print_json(&output);
    }

    if output.devices.is_empty() {
        println!("No controllers found.");
        return Ok(());
    }

    println!(
        "Found {} controller{}:",
        output.count,
        if output.count == 1 { "" } else { "s" }
    );
    println!();
    for d in &output.devices {
        println!(
            "  [{}] bus {}, slot {}",
            d.user_index, d.bus, d.index_on_bus
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{client, driver};
    use super::*;

    #[test]
    fn led_hint_places_player_three() {
        let d = driver();
        let x = client(&d);
        let out = devices_output(&x);
        assert_eq!(out.count, 2);
        let pairs: Vec<_> = out
            .devices
            .iter()
            .map(|d| (d.user_index, d.bus, d.index_on_bus))
            .collect();
        assert_eq!(pairs, vec![(0, 0, 1), (2, 1, 0)]);
    }
}
