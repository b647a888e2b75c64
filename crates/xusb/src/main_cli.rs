//! xusb CLI — console harness for the XUSB virtual controller bus.
//!
//! Console subsystem: works normally in PowerShell, cmd, and other terminals.

use std::path::PathBuf;
use std::sync::OnceLock;

use clap::{ArgAction, Parser};
use xusb_lib::WaitCanceller;
use xusb_lib::config::LOG_LEVELS;

mod cli;

/// Cancels outstanding waits on Ctrl+C. Set once the client is open.
pub static CANCELLER: OnceLock<WaitCanceller> = OnceLock::new();

#[derive(Parser)]
#[command(
    name = "xusb-cli",
    version,
    about = "Query and control controllers on the XUSB virtual bus"
)]
struct Args {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: cli::Command,
}

// ── Ctrl+C handler ──

fn cancel_waits() {
    if let Some(c) = CANCELLER.get() {
        c.cancel_all();
    }
}

#[cfg(windows)]
unsafe extern "system" fn ctrl_handler(_ctrl_type: u32) -> windows::core::BOOL {
    cancel_waits();
    windows::core::BOOL(1)
}

fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => {
            let level = configured.trim().to_ascii_lowercase();
            if LOG_LEVELS.contains(&level.as_str()) {
                level
            } else {
                "warn".into()
            }
        }
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    }
}

fn main() {
    let args = Args::parse();
    let config = cli::load_config(args.config.as_deref());

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(args.verbose, &config.log_level)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    if let Err(errors) = config.validate() {
        for e in &errors {
            log::warn!("{e}");
        }
    }

    // Install Ctrl+C handler
    #[cfg(windows)]
    unsafe {
        let _ = windows::Win32::System::Console::SetConsoleCtrlHandler(Some(ctrl_handler), true);
    }

    #[cfg(not(windows))]
    {
        ctrlc::set_handler(cancel_waits).ok();
    }

    let ctx = cli::Context {
        json: args.json || config.json,
        config_path: args.config,
        config,
    };
    if let Err(e) = cli::run(args.command, &ctx) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_overrides_configured_level() {
        assert_eq!(log_filter(0, " Debug "), "debug");
        assert_eq!(log_filter(1, "warn"), "info");
        assert_eq!(log_filter(2, "warn"), "debug");
        assert_eq!(log_filter(5, "off"), "trace");
        assert_eq!(log_filter(0, "loud"), "warn");
    }

    #[test]
    fn args_parse_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["xusb-cli", "devices", "--json", "-vv"]).unwrap();
        assert!(args.json);
        assert_eq!(args.verbose, 2);
    }
}
