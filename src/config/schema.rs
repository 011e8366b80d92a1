use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/segue/config.toml` or `~/.config/segue/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `SEGUE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub timeline: TimelineSettings,
    pub sequencer: SequencerSettings,
    pub ui: UiSettings,
    pub library: LibrarySettings,
    pub levels: LevelSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimelineSettings {
    /// Silence between two tracks (seconds).
    pub gap_seconds: f64,
    /// Silence before the first track of a play-through (seconds).
    pub lead_seconds: f64,
    /// Value used when a typed gap/lead cannot be parsed on commit.
    pub input_fallback_seconds: f64,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            gap_seconds: 3.0,
            lead_seconds: 3.0,
            input_fallback_seconds: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SequencerSettings {
    /// Progress refresh period while a lead-in or gap is running (milliseconds).
    pub tick_ms: u64,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self { tick_ms: 100 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// How often the screen is redrawn while idle (milliseconds).
    pub poll_ms: u64,
    /// Step used by the gap/lead increment keys (seconds).
    pub gap_step_seconds: f64,
    /// Step used by the level trim keys (dB).
    pub trim_step_db: f64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ segue: one take, many clips ~ ".to_string(),
            poll_ms: 150,
            gap_step_seconds: 0.5,
            trim_step_db: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec![
                "mp3".into(),
                "flac".into(),
                "wav".into(),
                "ogg".into(),
                "m4a".into(),
            ],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LevelSettings {
    /// Measure every imported track's loudness in the background.
    pub auto_check: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, e.g. `info` or `segue=debug`.
    /// `SEGUE_LOG` overrides it.
    pub level: String,
    /// Log file; defaults to the XDG state directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
