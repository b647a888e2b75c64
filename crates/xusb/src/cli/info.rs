//! `caps`, `battery` and `audio` subcommands.

use xusb_lib::wire::Capabilities;

use super::{
    Result, SubDevice, Transport, Xusb, button_label, kv, kv_indent, kv_width, print_json,
    version_label,
};

pub(super) fn cmd_caps<T: Transport>(x: &Xusb<T>, user: u8, json: bool) -> Result<()> {
    let caps = x.capabilities(user)?;
    if json {
        return print_json(&caps);
    }
    if caps.is_none() {
        println!("Capabilities are not reported by this bus.");
        return Ok(());
    }

    let w = kv_width(
        &["Version:", "Type:", "Subtype:", "Buttons:", "Vibration:"],
        &["Flags:", "Vendor ID:", "Product ID:", "Revision:", "Serial:"],
    );
    let pad = caps.gamepad().standard;
    kv("Version:", version_label(caps.version()), w);
    kv("Type:", format_args!("0x{:02X}", caps.device_type()), w);
    kv("Subtype:", format_args!("0x{:02X}", caps.device_subtype()), w);
    kv("Buttons:", button_label(pad.buttons), w);
    let vib = caps.vibration();
    kv("Vibration:", format_args!("L {} / R {}", vib.left, vib.right), w);
    if let Capabilities::V1_2(c) = caps {
        println!();
        println!("Identity:");
        kv_indent("Flags:", format_args!("0x{:04X}", c.flags), w);
        kv_indent("Vendor ID:", format_args!("0x{:04X}", c.vendor_id), w);
        kv_indent("Product ID:", format_args!("0x{:04X}", c.product_id), w);
        kv_indent("Revision:", format_args!("0x{:04X}", c.revision), w);
        kv_indent("Serial:", format_args!("0x{:08X}", c.serial), w);
    }
    Ok(())
}

pub(super) fn cmd_battery<T: Transport>(
    x: &Xusb<T>,
    user: u8,
    sub_device: SubDevice,
    json: bool,
) -> Result<()> {
    let battery = x.battery_info(user, sub_device)?;
    if json {
        return print_json(&battery);
    }
    if battery.version == 0 {
        println!("Battery information is not reported by this bus.");
        return Ok(());
    }
    let w = kv_width(&["Version:", "Type:", "Level:"], &[]);
    kv("Version:", version_label(battery.version), w);
    kv("Type:", battery.type_name(), w);
    kv("Level:", battery.level_name(), w);
    Ok(())
}

pub(super) fn cmd_audio<T: Transport>(x: &Xusb<T>, user: u8, json: bool) -> Result<()> {
    let audio = x.audio_info(user)?;
    if json {
        return print_json(&audio);
    }
    if audio.version == 0 {
        println!("Audio information is not reported by this bus.");
        return Ok(());
    }
    let w = kv_width(&["Version:", "Vendor ID:", "Product ID:"], &[]);
    kv("Version:", version_label(audio.version), w);
    kv("Vendor ID:", format_args!("0x{:04X}", audio.vendor_id), w);
    kv("Product ID:", format_args!("0x{:04X}", audio.product_id), w);
    Ok(())
}
