//! In-memory `PlaybackEngine` for sequencer tests.
//!
//! The engine and the test share one `FakeState`, so a test can keep a
//! `FakeControl` to inspect calls and inject events after the engine has
//! been moved into a `Sequencer`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::timeline::SourceRef;

use super::types::{EngineEvent, EngineHandle, PlaybackEngine};

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub loads: Vec<PathBuf>,
    pub live: Option<EngineHandle>,
    pub live_source: Option<PathBuf>,
    /// Times a load happened while another handle was still live.
    pub overlaps: usize,
    pub playing: bool,
    pub position: f64,
    pub durations: HashMap<PathBuf, f64>,
    pub failing: Vec<PathBuf>,
    pub volume: Option<f32>,
    pub seeks: Vec<f64>,
    pub events: Vec<EngineEvent>,
    pub next_handle: u64,
}

#[derive(Clone, Default)]
pub(crate) struct FakeControl(Rc<RefCell<FakeState>>);

impl FakeControl {
    pub fn engine(&self) -> FakeEngine {
        FakeEngine(self.0.clone())
    }

    pub fn with_duration(self, path: &str, seconds: f64) -> Self {
        self.0
            .borrow_mut()
            .durations
            .insert(PathBuf::from(path), seconds);
        self
    }

    pub fn failing(self, path: &str) -> Self {
        self.0.borrow_mut().failing.push(PathBuf::from(path));
        self
    }

    pub fn state(&self) -> std::cell::Ref<'_, FakeState> {
        self.0.borrow()
    }

    pub fn set_position(&self, seconds: f64) {
        self.0.borrow_mut().position = seconds;
    }

    /// Play the live source to its end and queue `Ended`.
    pub fn finish_current(&self) {
        let mut state = self.0.borrow_mut();
        if let Some(handle) = state.live {
            let end = state
                .live_source
                .as_ref()
                .and_then(|p| state.durations.get(p).copied())
                .unwrap_or(state.position);
            state.position = end;
            state.playing = false;
            state.events.push(EngineEvent::Ended { handle });
        }
    }

    pub fn push_event(&self, event: EngineEvent) {
        self.0.borrow_mut().events.push(event);
    }

    pub fn live(&self) -> Option<EngineHandle> {
        self.0.borrow().live
    }

    pub fn live_source(&self) -> Option<PathBuf> {
        self.0.borrow().live_source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }
}

pub(crate) struct FakeEngine(Rc<RefCell<FakeState>>);

impl FakeEngine {
    fn is_live(&self, handle: EngineHandle) -> bool {
        self.0.borrow().live == Some(handle)
    }
}

impl PlaybackEngine for FakeEngine {
    fn load(&mut self, source: &SourceRef) -> Result<EngineHandle> {
        let mut state = self.0.borrow_mut();
        let path = source.path().to_path_buf();
        state.loads.push(path.clone());
        if state.live.is_some() {
            state.overlaps += 1;
        }
        if state.failing.contains(&path) {
            return Err(Error::Engine(format!("cannot decode {}", source)));
        }
        state.next_handle += 1;
        let handle = EngineHandle::new(state.next_handle);
        let duration = state.durations.get(&path).copied();
        state.live = Some(handle);
        state.live_source = Some(path);
        state.playing = false;
        state.position = 0.0;
        state.events.push(EngineEvent::Loaded { handle, duration });
        Ok(handle)
    }

    fn play(&mut self, handle: EngineHandle) {
        if self.is_live(handle) {
            self.0.borrow_mut().playing = true;
        }
    }

    fn pause(&mut self, handle: EngineHandle) {
        if self.is_live(handle) {
            self.0.borrow_mut().playing = false;
        }
    }

    fn stop(&mut self, handle: EngineHandle) {
        if self.is_live(handle) {
            let mut state = self.0.borrow_mut();
            state.playing = false;
            state.position = 0.0;
        }
    }

    fn unload(&mut self, handle: EngineHandle) {
        if self.is_live(handle) {
            let mut state = self.0.borrow_mut();
            state.live = None;
            state.live_source = None;
            state.playing = false;
            state.position = 0.0;
        }
    }

    fn seek(&mut self, handle: EngineHandle, seconds: f64) -> Result<()> {
        if self.is_live(handle) {
            let mut state = self.0.borrow_mut();
            state.position = seconds;
            state.seeks.push(seconds);
        }
        Ok(())
    }

    fn position(&self, handle: EngineHandle) -> f64 {
        if self.is_live(handle) {
            self.0.borrow().position
        } else {
            0.0
        }
    }

    fn duration(&self, handle: EngineHandle) -> Option<f64> {
        let state = self.0.borrow();
        if state.live != Some(handle) {
            return None;
        }
        state
            .live_source
            .as_ref()
            .and_then(|p| state.durations.get(p).copied())
    }

    fn is_playing(&self, handle: EngineHandle) -> bool {
        self.is_live(handle) && self.0.borrow().playing
    }

    fn set_volume(&mut self, handle: EngineHandle, gain: f32) {
        if self.is_live(handle) {
            self.0.borrow_mut().volume = Some(gain);
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.0.borrow_mut().events)
    }
}
