//! `config` subcommand — show current configuration and file path.

use super::{Config, ConfigOutput, Context, Result, kv, kv_indent, kv_width, print_json};

pub(super) fn cmd_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let config_path = ctx.config_path.clone().or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    if ctx.json {
        return print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config.clone(),
        });
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "led_hint:",
            "refresh_after_power_off:",
            "json:",
            "log_level:",
        ],
    );

    match &config_path {
        Some(p) => {
            if config_exists {
                kv("Config file:", format_args!("{} (loaded)", p.display()), w);
            } else {
                kv(
                    "Config file:",
                    format_args!("{} (not found, using defaults)", p.display()),
                    w,
                );
            }
        }
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("led_hint:", config.led_hint, w);
    kv_indent("refresh_after_power_off:", config.refresh_after_power_off, w);
    kv_indent("json:", config.json, w);
    match config.validate() {
        Ok(()) => kv_indent("log_level:", &config.log_level, w),
        Err(_) => kv_indent(
            "log_level:",
            format_args!("{} (invalid, using warn)", config.log_level),
            w,
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(json: bool, config_path: Option<std::path::PathBuf>) -> Context {
        Context {
            json,
            config: Config::default(),
            config_path,
        }
    }

    #[test]
    fn cmd_config_succeeds() {
        assert!(cmd_config(&ctx(false, None)).is_ok());
        assert!(cmd_config(&ctx(true, None)).is_ok());
    }

    #[test]
    fn cmd_config_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();
        assert!(cmd_config(&ctx(false, Some(path.clone()))).is_ok());
        assert!(cmd_config(&ctx(true, Some(path))).is_ok());
    }
}
