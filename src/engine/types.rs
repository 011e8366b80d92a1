//! Handle, event and trait definitions for the engine adapter.

use crate::error::Result;
use crate::timeline::SourceRef;

/// One loaded source. Handles are never reused, so an event carrying a
/// released handle can be recognised and dropped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Asynchronous notifications, collected by `PlaybackEngine::poll_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The source is decoded far enough to know (or not) its length.
    Loaded {
        handle: EngineHandle,
        duration: Option<f64>,
    },
    /// Playback reached the end of the source on its own.
    Ended { handle: EngineHandle },
    /// The source could not be played after all.
    Failed { handle: EngineHandle, reason: String },
}

impl EngineEvent {
    pub fn handle(&self) -> EngineHandle {
        match self {
            EngineEvent::Loaded { handle, .. }
            | EngineEvent::Ended { handle }
            | EngineEvent::Failed { handle, .. } => *handle,
        }
    }
}

/// A single-track player. Calls with a handle that is no longer loaded are
/// ignored.
pub trait PlaybackEngine {
    /// Load `source` paused. Any previously loaded source is released first.
    fn load(&mut self, source: &SourceRef) -> Result<EngineHandle>;
    fn play(&mut self, handle: EngineHandle);
    fn pause(&mut self, handle: EngineHandle);
    fn stop(&mut self, handle: EngineHandle);
    fn unload(&mut self, handle: EngineHandle);
    fn seek(&mut self, handle: EngineHandle, seconds: f64) -> Result<()>;
    /// Current position in seconds.
    fn position(&self, handle: EngineHandle) -> f64;
    fn duration(&self, handle: EngineHandle) -> Option<f64>;
    fn is_playing(&self, handle: EngineHandle) -> bool;
    fn set_volume(&mut self, handle: EngineHandle, gain: f32);
    fn poll_events(&mut self) -> Vec<EngineEvent>;
}
