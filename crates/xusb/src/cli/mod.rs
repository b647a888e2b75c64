//! CLI subcommands — bus listing, device state, LED/vibration, waits.

mod buses;
mod config_cmd;
mod devices;
mod info;
mod state;
mod wait;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use xusb_lib::config::Config;
pub(super) use xusb_lib::error::{Result, XusbError};
pub(super) use xusb_lib::transport::Transport;
pub(super) use xusb_lib::wire::{
    BusInfoExKind, InputState, LedSetting, SetStateFlags, SubDevice, Vibration, buttons,
};
pub(super) use xusb_lib::{ClientOptions, PlatformXusb, Xusb};

const PADDING: usize = 2;

/// Settings every command sees.
pub struct Context {
    pub json: bool,
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

/// Load config from `custom_path`, or the default location, logging parse
/// warnings.
pub fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}

/// `0x0102` → `"1.2"`.
pub(super) fn version_label(raw: u16) -> String {
    format!("{}.{}", raw >> 8, raw & 0xFF)
}

/// Pressed button names, comma-separated, or `"(none)"`.
pub(super) fn button_label(mask: u16) -> String {
    let names = buttons::names(mask);
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

fn parse_led(s: &str) -> std::result::Result<LedSetting, String> {
    LedSetting::parse(s).ok_or_else(|| {
        let names: Vec<_> = LedSetting::ALL.iter().map(|l| l.name()).collect();
        format!("unknown LED setting \"{s}\" (expected 0-14 or one of: {})", names.join(", "))
    })
}

fn parse_kind(s: &str) -> std::result::Result<BusInfoExKind, String> {
    BusInfoExKind::parse(s)
        .ok_or_else(|| format!("unknown kind \"{s}\" (expected minimal, basic or full)"))
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct BusJson {
    pub instance: u8,
    pub path: String,
    pub version: String,
    pub max_slots: u8,
    pub device_count: u8,
    pub vendor_id: u16,
    pub product_id: u16,
}

#[derive(Serialize)]
pub(super) struct BusesOutput {
    pub count: usize,
    pub buses: Vec<BusJson>,
}

#[derive(Serialize)]
pub(super) struct DeviceJson {
    pub user_index: u8,
    pub bus: u8,
    pub index_on_bus: u8,
}

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<DeviceJson>,
}

#[derive(Serialize)]
pub(super) struct StateOutput {
    pub user_index: u8,
    pub buttons: Vec<&'static str>,
    pub state: InputState,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
}

#[derive(Subcommand)]
pub enum Command {
    /// List XUSB buses
    Buses,

    /// List connected controllers by user index
    Devices,

    /// Show a bus's information
    BusInfo {
        /// Bus instance index (see `buses`)
        bus: u8,
    },

    /// Show a bus's extended information
    BusInfoEx {
        /// Bus instance index (see `buses`)
        bus: u8,
        /// Record shape to request: minimal, basic or full
        #[arg(long, default_value = "basic", value_parser = parse_kind)]
        kind: BusInfoExKind,
    },

    /// Show a controller's input state
    State {
        /// User index (see `devices`)
        user: u8,
    },

    /// Show a controller's LED pattern (1.0 and 1.1 buses only)
    Led {
        /// User index (see `devices`)
        user: u8,
    },

    /// Set a controller's LED and/or vibration
    Set {
        /// User index (see `devices`)
        user: u8,
        /// LED setting, by name (e.g. player2) or number (0-14)
        #[arg(long, value_parser = parse_led)]
        led: Option<LedSetting>,
        /// Left (low-frequency) motor speed
        #[arg(long)]
        left: Option<u8>,
        /// Right (high-frequency) motor speed
        #[arg(long)]
        right: Option<u8>,
    },

    /// Show a controller's capabilities
    Caps {
        /// User index (see `devices`)
        user: u8,
    },

    /// Show battery information
    Battery {
        /// User index (see `devices`)
        user: u8,
        /// Query the headset instead of the controller
        #[arg(long)]
        headset: bool,
    },

    /// Show audio device identity
    Audio {
        /// User index (see `devices`)
        user: u8,
    },

    /// Wait for the guide button (Ctrl+C cancels)
    WaitGuide {
        /// User index (see `devices`)
        user: u8,
    },

    /// Wait for any input (needs a focused non-console window; Ctrl+C cancels)
    WaitInput {
        /// User index (see `devices`)
        user: u8,
    },

    /// Power off a wireless controller
    PowerOff {
        /// User index (see `devices`)
        user: u8,
    },

    /// Show current configuration and file path
    Config,
}

/// Open the platform client and register its canceller for Ctrl+C.
fn open_client(ctx: &Context) -> PlatformXusb {
    let client = PlatformXusb::open_platform(ClientOptions::from(&ctx.config));
    let _ = crate::CANCELLER.set(client.wait_canceller());
    client
}

pub fn run(cmd: Command, ctx: &Context) -> Result<()> {
    if let Command::Config = cmd {
        return config_cmd::cmd_config(ctx);
    }
    let client = open_client(ctx);
    run_with(&client, cmd, ctx.json)
}

/// Run a device command against any client.
pub(super) fn run_with<T: Transport>(x: &Xusb<T>, cmd: Command, json: bool) -> Result<()> {
    match cmd {
        Command::Buses => buses::cmd_buses(x, json),
        Command::Devices => devices::cmd_devices(x, json),
        Command::BusInfo { bus } => buses::cmd_bus_info(x, bus, json),
        Command::BusInfoEx { bus, kind } => buses::cmd_bus_info_ex(x, bus, kind, json),
        Command::State { user } => state::cmd_state(x, user, json),
        Command::Led { user } => state::cmd_led(x, user, json),
        Command::Set {
            user,
            led,
            left,
            right,
        } => state::cmd_set(x, user, led, left, right),
        Command::Caps { user } => info::cmd_caps(x, user, json),
        Command::Battery { user, headset } => {
            let sub = if headset {
                SubDevice::Headset
            } else {
                SubDevice::Gamepad
            };
            info::cmd_battery(x, user, sub, json)
        }
        Command::Audio { user } => info::cmd_audio(x, user, json),
        Command::WaitGuide { user } => wait::cmd_wait(x, user, wait::Which::Guide, json),
        Command::WaitInput { user } => wait::cmd_wait(x, user, wait::Which::Input, json),
        Command::PowerOff { user } => state::cmd_power_off(x, user),
        Command::Config => Err(XusbError::InvalidArgument(
            "config is not a device command".into(),
        )),
    }
}



#[cfg(test)]
mod json_struct_tests {
    use super::*;

    #[test]
    fn devices_output_empty() {
        let output = DevicesOutput {
            count: 0,
            devices: vec![],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["count"], 0);
        assert!(parsed["devices"].as_array().unwrap().is_empty());
    }

    #[test]
    fn bus_json_has_expected_fields() {
        let bus = BusJson {
            instance: 0,
            path: r"\\?\root#xusb".into(),
            version: "1.2".into(),
            max_slots: 4,
            device_count: 1,
            vendor_id: 0x045E,
            product_id: 0x02A1,
        };
        let json = serde_json::to_value(&bus).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 7);
        assert_eq!(json["version"], "1.2");
    }

    #[test]
    fn config_output_missing_path_is_null() {
        let output = ConfigOutput {
            config_file: None,
            config_file_exists: false,
            settings: Config::default(),
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["config_file"].is_null());
        assert_eq!(parsed["settings"]["led_hint"], true);
        assert_eq!(parsed["settings"]["log_level"], "warn");
    }
}

#[cfg(test)]
mod command_tests {
    use super::test_support::{client, driver};
    use super::*;

    #[test]
    fn every_device_command_runs_against_mock() {
        let d = driver();
        let x = client(&d);
        for json in [false, true] {
            for cmd in [
                Command::Buses,
                Command::Devices,
                Command::BusInfo { bus: 1 },
                Command::BusInfoEx {
                    bus: 0,
                    kind: BusInfoExKind::Basic,
                },
                Command::State { user: 0 },
                Command::Led { user: 2 },
                Command::Caps { user: 0 },
                Command::Battery {
                    user: 0,
                    headset: true,
                },
                Command::Audio { user: 0 },
            ] {
                run_with(&x, cmd, json).unwrap();
            }
        }
    }

    #[test]
    fn unknown_user_index_fails() {
        let d = driver();
        let x = client(&d);
        let err = run_with(&x, Command::State { user: 9 }, false).unwrap_err();
        assert_eq!(err.to_string(), "Device 9 not found");
    }

    #[test]
    fn config_is_not_a_device_command() {
        let d = driver();
        let x = client(&d);
        assert!(run_with(&x, Command::Config, false).is_err());
    }
}
