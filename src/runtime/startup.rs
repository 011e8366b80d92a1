use std::time::Duration;

use tracing::info;

use crate::config;
use crate::engine::PlaybackEngine;
use crate::resolver::ResolverWorker;
use crate::sequencer::Sequencer;
use crate::timeline::{SourceRef, Timeline};

/// Build the sequencer for the imported sources and queue a duration probe
/// for each of them, plus a level check when those run automatically.
pub fn build_sequencer<E: PlaybackEngine>(
    settings: &config::Settings,
    engine: Option<E>,
    sources: Vec<SourceRef>,
    resolver: &ResolverWorker,
) -> Sequencer<E> {
    let timeline = Timeline::new(
        settings.timeline.gap_seconds,
        settings.timeline.lead_seconds,
    );
    let mut sequencer = Sequencer::new(
        timeline,
        engine,
        crate::sequencer::SystemClock,
        Duration::from_millis(settings.sequencer.tick_ms),
    );

    for source in sources {
        let id = sequencer.append(source);
        if let Some(request) = sequencer.resolution_request(id) {
            resolver.resolve(request);
        }
    }
    if settings.levels.auto_check {
        for request in sequencer.level_requests() {
            resolver.measure(request);
        }
    }
    info!(
        tracks = sequencer.timeline().len(),
        gap = sequencer.timeline().gap_seconds(),
        lead = sequencer.timeline().lead_seconds(),
        "timeline ready"
    );
    sequencer
}
