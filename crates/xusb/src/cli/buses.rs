//! `buses`, `bus-info` and `bus-info-ex` subcommands.

use super::{
    BusInfoExKind, BusJson, BusesOutput, Result, Transport, XusbError, Xusb, kv, kv_indent,
    kv_width, print_json, version_label,
};

pub(super) fn buses_output<T: Transport>(x: &Xusb<T>) -> BusesOutput {
    let buses: Vec<BusJson> = x
        .buses()
        .iter()
        .map(|b| {
            let info = b.info();
            BusJson {
                instance: b.instance(),
                path: b.path().to_string(),
                version: b.version().to_string(),
                max_slots: info.max_count,
                device_count: info.device_count,
                vendor_id: info.vendor_id,
                product_id: info.product_id,
            }
        })
        .collect();
    BusesOutput {
        count: buses.len(),
        buses,
    }
}

pub(super) fn cmd_buses<T: Transport>(x: &Xusb<T>, json: bool) -> Result<()> {
    let output = buses_output(x);
    if json {
        return print_json(&output);
    }

    if output.buses.is_empty() {
        println!("No XUSB buses found.");
        return Ok(());
    }

    println!(
        "Found {} bus{}:",
        output.count,
        if output.count == 1 { "" } else { "es" }
    );
    println!();
    for b in &output.buses {
        println!("  [{}] {}", b.instance, b.path);
        println!(
            "      Version {}, {} of {} slots in use",
            b.version, b.device_count, b.max_slots
        );
    }
    Ok(())
}

pub(super) fn cmd_bus_info<T: Transport>(x: &Xusb<T>, bus: u8, json: bool) -> Result<()> {
    let info = x.bus_info(bus)?;
    if json {
        return print_json(&info);
    }

    let w = kv_width(
        &["Version:", "Slots:", "Connected:", "Status:", "Vendor ID:", "Product ID:"],
        &[],
    );
    kv("Version:", version_label(info.version), w);
    kv("Slots:", info.max_count, w);
    kv("Connected:", info.device_count, w);
    kv("Status:", format_args!("0x{:02X}", info.status), w);
    kv("Vendor ID:", format_args!("0x{:04X}", info.vendor_id), w);
    kv("Product ID:", format_args!("0x{:04X}", info.product_id), w);
    Ok(())
}

pub(super) fn cmd_bus_info_ex<T: Transport>(
    x: &Xusb<T>,
    bus: u8,
    kind: BusInfoExKind,
    json: bool,
) -> Result<()> {
    let info = x.bus_info_ex(bus, kind)?;
    if json {
        return print_json(&info);
    }

    let w = kv_width(
        &["Version:", "Failure:", "Data:"],
        &["Vendor ID:", "Product ID:", "Sub-records:"],
    );
    kv("Version:", version_label(info.version), w);
    kv("Failure:", info.failure, w);
    if info.is_empty() {
        kv("Data:", "(none)", w);
        return Ok(());
    }
    match info.kind() {
        Some(shape) => kv(
            "Data:",
            format_args!("{} bytes ({shape})", info.data_len()),
            w,
        ),
        None => kv(
            "Data:",
            format_args!("{} bytes (unrecognized shape)", info.data_len()),
            w,
        ),
    }
    if info.kind() != Some(kind) {
        log::warn!("requested {kind} records, driver answered with a different shape");
    }

    match info.kind() {
        Some(BusInfoExKind::Minimal) => {
            let m = info.minimal().map_err(XusbError::from)?;
            println!();
            kv_indent("Vendor ID:", format_args!("0x{:04X}", m.vendor_id()), w);
            kv_indent("Product ID:", format_args!("0x{:04X}", m.product_id()), w);
        }
        Some(BusInfoExKind::Basic) => {
            for (i, rec) in info.basic().map_err(XusbError::from)?.iter().enumerate() {
                println!();
                println!("[{i}]");
                kv_indent("Vendor ID:", format_args!("0x{:04X}", rec.vendor_id()), w);
                kv_indent("Product ID:", format_args!("0x{:04X}", rec.product_id()), w);
            }
        }
        Some(BusInfoExKind::Full) => {
            for (i, rec) in info.full().map_err(XusbError::from)?.iter().enumerate() {
                println!();
                println!("[{i}]");
                kv_indent("Sub-records:", rec.devices.len(), w);
            }
        }
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{client, driver};
    use super::*;

    #[test]
    fn buses_output_lists_both_buses() {
        let d = driver();
        let x = client(&d);
        let out = buses_output(&x);
        assert_eq!(out.count, 2);
        assert_eq!(out.buses[0].path, "bus-a");
        assert_eq!(out.buses[0].version, "1.2");
        assert_eq!(out.buses[1].instance, 1);
        assert_eq!(out.buses[1].device_count, 1);
    }

    #[test]
    fn bus_info_unknown_bus_fails() {
        let d = driver();
        let x = client(&d);
        let err = cmd_bus_info(&x, 7, false).unwrap_err();
        assert_eq!(err.to_string(), "Bus 7 not found");
    }
}
