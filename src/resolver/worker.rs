use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::timeline::{SourceRef, TrackId, TrackLevels};

use super::levels::LevelMeter;
use super::probe::DurationProbe;

/// One probe job. `ticket` comes from `Timeline::issue_ticket`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub track: TrackId,
    pub ticket: u64,
    pub source: SourceRef,
}

#[derive(Debug)]
pub struct ResolveOutcome {
    pub track: TrackId,
    pub ticket: u64,
    pub result: Result<f64>,
}

/// One level check job.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRequest {
    pub track: TrackId,
    pub source: SourceRef,
}

#[derive(Debug)]
pub struct LevelOutcome {
    pub track: TrackId,
    pub result: Result<TrackLevels>,
}

enum ResolverCmd {
    Resolve(ResolveRequest),
    Measure(LevelRequest),
    Quit,
}

pub struct ResolverWorker {
    tx: Sender<ResolverCmd>,
    rx: Receiver<ResolveOutcome>,
    levels_rx: Receiver<LevelOutcome>,
    join: Option<JoinHandle<()>>,
}

impl ResolverWorker {
    pub fn spawn<P: DurationProbe, M: LevelMeter>(probe: P, meter: M) -> Result<Self> {
        let (tx, cmd_rx) = mpsc::channel::<ResolverCmd>();
        let (out_tx, rx) = mpsc::channel::<ResolveOutcome>();
        let (levels_tx, levels_rx) = mpsc::channel::<LevelOutcome>();
        let join = thread::Builder::new()
            .name("segue-resolver".to_string())
            .spawn(move || {
                Jobs::new(probe, meter, out_tx, levels_tx).run(cmd_rx);
            })?;
        Ok(Self {
            tx,
            rx,
            levels_rx,
            join: Some(join),
        })
    }

    /// Queue a probe. The outcome arrives later through `try_recv`.
    pub fn resolve(&self, request: ResolveRequest) {
        self.send(ResolverCmd::Resolve(request));
    }

    /// Queue a level check. Probes queued at the same time go first, since a
    /// level check decodes the whole source.
    pub fn measure(&self, request: LevelRequest) {
        self.send(ResolverCmd::Measure(request));
    }

    pub fn try_recv(&self) -> Option<ResolveOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn try_recv_levels(&self) -> Option<LevelOutcome> {
        self.levels_rx.try_recv().ok()
    }

    #[cfg(test)]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ResolveOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }

    #[cfg(test)]
    pub fn recv_levels_timeout(&self, timeout: Duration) -> Option<LevelOutcome> {
        self.levels_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, cmd: ResolverCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("resolver thread is gone; request dropped");
        }
    }
}

impl Drop for ResolverWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(ResolverCmd::Quit);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Worker-side state: pending jobs and the channels results go back on.
struct Jobs<P, M> {
    probe: P,
    meter: M,
    resolves: VecDeque<ResolveRequest>,
    measures: VecDeque<LevelRequest>,
    out: Sender<ResolveOutcome>,
    levels_out: Sender<LevelOutcome>,
}

impl<P: DurationProbe, M: LevelMeter> Jobs<P, M> {
    fn new(
        probe: P,
        meter: M,
        out: Sender<ResolveOutcome>,
        levels_out: Sender<LevelOutcome>,
    ) -> Self {
        Self {
            probe,
            meter,
            resolves: VecDeque::new(),
            measures: VecDeque::new(),
            out,
            levels_out,
        }
    }

    fn run(mut self, rx: Receiver<ResolverCmd>) {
        loop {
            // Block only when there is nothing left to do.
            let idle = self.resolves.is_empty() && self.measures.is_empty();
            let cmd = if idle {
                match rx.recv_timeout(Duration::from_millis(200)) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match rx.try_recv() {
                    Ok(cmd) => Some(cmd),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            };

            match cmd {
                Some(ResolverCmd::Resolve(req)) => self.resolves.push_back(req),
                Some(ResolverCmd::Measure(req)) => self.measures.push_back(req),
                Some(ResolverCmd::Quit) => break,
                None => {
                    if !self.work_one() {
                        break;
                    }
                }
            }
        }
    }

    /// Run the next job, probes first. Returns false once the receiving side
    /// is gone.
    fn work_one(&mut self) -> bool {
        if let Some(req) = self.resolves.pop_front() {
            let result = self.probe.probe(&req.source);
            match &result {
                Ok(seconds) => debug!(track = %req.track, seconds, "resolved duration"),
                Err(e) => warn!(track = %req.track, error = %e, "duration unresolvable"),
            }
            let outcome = ResolveOutcome {
                track: req.track,
                ticket: req.ticket,
                result,
            };
            return self.out.send(outcome).is_ok();
        }
        if let Some(req) = self.measures.pop_front() {
            let result = self.meter.measure(&req.source);
            match &result {
                Ok(levels) => debug!(
                    track = %req.track,
                    avg_db = levels.avg_db,
                    peak_db = levels.peak_db,
                    "measured levels"
                ),
                Err(e) => warn!(track = %req.track, error = %e, "level check failed"),
            }
            let outcome = LevelOutcome {
                track: req.track,
                result,
            };
            return self.levels_out.send(outcome).is_ok();
        }
        true
    }
}
