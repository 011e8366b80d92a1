use std::{env, path::PathBuf};

use crate::error::{Error, Result};
use crate::timeline::MAX_SILENCE_SECONDS;

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` layers environment variables (prefix `SEGUE__`) over an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("SEGUE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeline;
        for (name, value) in [
            ("timeline.gap_seconds", t.gap_seconds),
            ("timeline.lead_seconds", t.lead_seconds),
            ("timeline.input_fallback_seconds", t.input_fallback_seconds),
        ] {
            if !value.is_finite() || !(0.0..=MAX_SILENCE_SECONDS).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be between 0 and {MAX_SILENCE_SECONDS} seconds"
                )));
            }
        }
        if self.sequencer.tick_ms == 0 {
            return Err(Error::InvalidConfig("sequencer.tick_ms must be >= 1".into()));
        }
        if self.ui.poll_ms == 0 {
            return Err(Error::InvalidConfig("ui.poll_ms must be >= 1".into()));
        }
        if !(self.ui.gap_step_seconds.is_finite() && self.ui.gap_step_seconds > 0.0) {
            return Err(Error::InvalidConfig("ui.gap_step_seconds must be > 0".into()));
        }
        if !(self.ui.trim_step_db.is_finite() && self.ui.trim_step_db > 0.0) {
            return Err(Error::InvalidConfig("ui.trim_step_db must be > 0".into()));
        }
        Ok(())
    }

    /// The settings rendered as TOML, for `--print-config`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

/// Resolve the config path from `SEGUE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("SEGUE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/segue/config.toml`, or `~/.config/segue/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("segue").join("config.toml"))
}

/// `$XDG_STATE_HOME/segue/segue.log`, or `~/.local/state/segue/segue.log`.
pub fn default_log_path() -> Option<PathBuf> {
    xdg_dir("XDG_STATE_HOME", ".local/state").map(|d| d.join("segue").join("segue.log"))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var).filter(|v| !v.is_empty()) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
