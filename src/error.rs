//! Error types shared by the timeline, resolver, engine and sequencer.
//!
//! Most failures never cross a component boundary as an error: they are
//! absorbed into state (an `Unreadable` track, a disabled play surface).
//! The variants here are what those boundaries report when asked.

use thiserror::Error;

use crate::timeline::TrackId;

#[derive(Error, Debug)]
pub enum Error {
    /// The duration probe could not read a usable duration.
    #[error("duration could not be resolved for {path}: {reason}")]
    DurationUnresolvable { path: String, reason: String },

    /// A source could not be decoded for a level check.
    #[error("levels could not be measured for {path}: {reason}")]
    LevelCheckFailed { path: String, reason: String },

    /// No audio output could be opened; play/pause is disabled.
    #[error("no playback engine available: {0}")]
    PlaybackEngineUnavailable(String),

    /// A selection or edit pointed outside the track list.
    #[error("index {index} is out of range (timeline has {len} tracks)")]
    InvalidSelection { index: usize, len: usize },

    /// A resolution outcome arrived for a removed track or a superseded request.
    #[error("resolution for track {0} is stale")]
    StaleResolution(TrackId),

    /// The engine failed to load, seek or decode a source.
    #[error("playback engine error: {0}")]
    Engine(String),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
