//! `PlaybackEngine` on top of a `rodio` output stream.
//!
//! One `Sink` per loaded source. Loading always drops the previous sink, so
//! two tracks can never sound at once.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use crate::error::{Error, Result};
use crate::timeline::SourceRef;

use super::types::{EngineEvent, EngineHandle, PlaybackEngine};

struct Loaded {
    handle: EngineHandle,
    sink: Sink,
    duration: Option<f64>,
    /// `play` was called at least once.
    started: bool,
    /// `Ended` already emitted.
    ended: bool,
}

pub struct RodioEngine {
    stream: OutputStream,
    current: Option<Loaded>,
    next_handle: u64,
    events: Vec<EngineEvent>,
}

impl RodioEngine {
    /// Open the default output device.
    pub fn open() -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| Error::PlaybackEngineUnavailable(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped, which would land
        // on top of the terminal UI.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            current: None,
            next_handle: 1,
            events: Vec::new(),
        })
    }

    fn loaded(&self, handle: EngineHandle) -> Option<&Loaded> {
        self.current.as_ref().filter(|l| l.handle == handle)
    }

    fn loaded_mut(&mut self, handle: EngineHandle) -> Option<&mut Loaded> {
        self.current.as_mut().filter(|l| l.handle == handle)
    }

    fn release_current(&mut self) {
        if let Some(old) = self.current.take() {
            old.sink.stop();
            debug!(handle = ?old.handle, "released sink");
        }
    }
}

impl PlaybackEngine for RodioEngine {
    fn load(&mut self, source: &SourceRef) -> Result<EngineHandle> {
        self.release_current();

        let file = File::open(source.path())
            .map_err(|e| Error::Engine(format!("cannot open {}: {}", source, e)))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| Error::Engine(format!("cannot decode {}: {}", source, e)))?;
        let duration = decoder
            .total_duration()
            .map(|d| d.as_secs_f64())
            .filter(|d| *d > 0.0);

        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(decoder);
        sink.pause();

        let handle = EngineHandle::new(self.next_handle);
        self.next_handle += 1;
        self.current = Some(Loaded {
            handle,
            sink,
            duration,
            started: false,
            ended: false,
        });
        self.events.push(EngineEvent::Loaded { handle, duration });
        debug!(?handle, %source, ?duration, "loaded source");
        Ok(handle)
    }

    fn play(&mut self, handle: EngineHandle) {
        if let Some(l) = self.loaded_mut(handle) {
            l.started = true;
            l.sink.play();
        }
    }

    fn pause(&mut self, handle: EngineHandle) {
        if let Some(l) = self.loaded(handle) {
            l.sink.pause();
        }
    }

    fn stop(&mut self, handle: EngineHandle) {
        if let Some(l) = self.loaded_mut(handle) {
            // Mark as ended so the emptied sink is not reported as a natural end.
            l.ended = true;
            l.sink.stop();
        }
    }

    fn unload(&mut self, handle: EngineHandle) {
        if self.loaded(handle).is_some() {
            self.release_current();
        }
    }

    fn seek(&mut self, handle: EngineHandle, seconds: f64) -> Result<()> {
        let Some(l) = self.loaded(handle) else {
            return Ok(());
        };
        let target = Duration::from_secs_f64(seconds.max(0.0));
        l.sink
            .try_seek(target)
            .map_err(|e| Error::Engine(format!("seek failed: {}", e)))
    }

    fn position(&self, handle: EngineHandle) -> f64 {
        self.loaded(handle)
            .map(|l| l.sink.get_pos().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self, handle: EngineHandle) -> Option<f64> {
        self.loaded(handle).and_then(|l| l.duration)
    }

    fn is_playing(&self, handle: EngineHandle) -> bool {
        self.loaded(handle)
            .map(|l| l.started && !l.ended && !l.sink.is_paused() && !l.sink.empty())
            .unwrap_or(false)
    }

    fn set_volume(&mut self, handle: EngineHandle, gain: f32) {
        if let Some(l) = self.loaded(handle) {
            l.sink.set_volume(gain);
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        if let Some(l) = self.current.as_mut() {
            if l.started && !l.ended && l.sink.empty() {
                l.ended = true;
                self.events.push(EngineEvent::Ended { handle: l.handle });
            }
        }
        std::mem::take(&mut self.events)
    }
}
