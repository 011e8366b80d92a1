use std::time::{Duration, Instant};

use super::*;
use crate::engine::fake::{FakeControl, FakeEngine};
use crate::engine::EngineEvent;
use crate::error::Error;
use crate::resolver::LevelOutcome;
use crate::timeline::{
    MAX_SILENCE_SECONDS, ResolutionState, SourceRef, Timeline, TotalDuration, TrackLevels,
};

type TestSequencer = Sequencer<FakeEngine, ManualClock>;

const TICK: Duration = Duration::from_millis(100);

fn path(i: usize) -> String {
    format!("/music/t{i}.mp3")
}

/// Timeline of resolved tracks, with the engine reporting the same lengths.
fn setup(durations: &[f64], gap: f64, lead: f64) -> (TestSequencer, FakeControl, ManualClock) {
    let mut tl = Timeline::new(gap, lead);
    let mut fake = FakeControl::default();
    for (i, d) in durations.iter().enumerate() {
        let id = tl.append(SourceRef::new(path(i)));
        let ticket = tl.issue_ticket(id).unwrap();
        tl.apply_resolution(id, ticket, Ok(*d)).unwrap();
        fake = fake.with_duration(&path(i), *d);
    }
    let clock = ManualClock::new();
    let seq = Sequencer::new(tl, Some(fake.engine()), clock.clone(), TICK);
    (seq, fake, clock)
}

fn phase_and_current(seq: &TestSequencer) -> (Phase, Option<usize>) {
    let state = seq.state();
    (state.phase, state.current)
}

#[test]
fn scenario_a_runs_lead_tracks_and_gaps_in_order() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0, 15.0], 2.0, 3.0);
    assert_eq!(seq.snapshot().total, TotalDuration::Known(52.0));

    let mut seen = vec![phase_and_current(&seq)];
    let mut record = |seq: &TestSequencer| {
        let now = phase_and_current(seq);
        if seen.last() != Some(&now) {
            seen.push(now);
        }
    };

    seq.select_and_play(0).unwrap();
    record(&seq);
    assert!(!fake.is_playing());
    assert_eq!(fake.live_source(), Some(path(0).into()));

    clock.advance(1.0);
    let snap = seq.snapshot();
    assert_eq!(snap.elapsed_seconds, 1.0);
    assert_eq!(snap.phase_countdown, Some(2.0));

    clock.advance(2.0);
    assert!(seq.poll());
    record(&seq);
    assert!(fake.is_playing());
    assert!(seq.state().has_played_once);

    for next in 1..3 {
        fake.finish_current();
        seq.poll();
        record(&seq);
        assert_eq!(seq.state().phase, Phase::Gap);
        assert!(fake.live().is_none());
        assert!(seq.timeline().get(next - 1).unwrap().finished);

        clock.advance(2.0);
        seq.poll();
        record(&seq);
        assert!(fake.is_playing());
        assert_eq!(fake.live_source(), Some(path(next).into()));
    }

    fake.finish_current();
    seq.poll();
    record(&seq);

    assert_eq!(
        seen,
        vec![
            (Phase::Idle, None),
            (Phase::LeadIn, Some(0)),
            (Phase::Playing, Some(0)),
            (Phase::Gap, Some(0)),
            (Phase::Playing, Some(1)),
            (Phase::Gap, Some(1)),
            (Phase::Playing, Some(2)),
            (Phase::Finished, Some(2)),
        ]
    );
    let snap = seq.snapshot();
    assert_eq!(snap.elapsed_seconds, 52.0);
    assert_eq!(snap.fraction(), Some(1.0));
    assert!(!seq.state().has_played_once);
    assert!(seq.next_deadline().is_none());
    assert_eq!(fake.state().overlaps, 0);
}

#[test]
fn scenario_b_zero_gap_goes_straight_to_next_track() {
    let (mut seq, fake, _clock) = setup(&[5.0, 6.0, 7.0], 0.0, 0.0);
    seq.select_and_play(0).unwrap();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(0)));

    for next in 1..3 {
        fake.finish_current();
        seq.poll();
        assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(next)));
        assert!(fake.is_playing());
    }
    fake.finish_current();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Finished);

    let loads: Vec<String> = fake
        .state()
        .loads
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(loads, vec![path(0), path(1), path(2)]);
    assert_eq!(fake.state().overlaps, 0);
}

#[test]
fn scenario_c_manual_switch_during_lead_in() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0, 15.0], 2.0, 3.0);
    seq.select_and_play(0).unwrap();
    clock.advance(1.0);

    seq.select_and_play(2).unwrap();
    let state = seq.state();
    assert_eq!((state.phase, state.current), (Phase::LeadIn, Some(2)));
    assert!(!state.has_played_once);
    assert_eq!(fake.live_source(), Some(path(2).into()));
    assert_eq!(fake.state().overlaps, 0);

    // The first lead-in would have ended here.
    clock.advance(2.5);
    seq.poll();
    assert_eq!(seq.state().phase, Phase::LeadIn);

    clock.advance(0.5);
    seq.poll();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(2)));
    assert!(fake.is_playing());
}

#[test]
fn manual_switch_after_playing_skips_lead_in() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0, 15.0], 2.0, 3.0);
    seq.select_and_play(0).unwrap();
    clock.advance(3.0);
    seq.poll();
    assert!(seq.state().has_played_once);

    seq.select_and_play(2).unwrap();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(2)));
    assert!(fake.is_playing());
    assert!(seq.next_deadline().is_none());
}

#[test]
fn scenario_d_pending_track_makes_total_pending() {
    let (mut seq, _fake, _clock) = setup(&[10.0], 2.0, 3.0);
    seq.append(SourceRef::new("/music/late.mp3"));
    let snap = seq.snapshot();
    assert_eq!(snap.total, TotalDuration::Pending);
    assert_eq!(snap.fraction(), None);
}

#[test]
fn resolution_round_trip_through_the_sequencer() {
    let (mut seq, _fake, _clock) = setup(&[10.0], 2.0, 3.0);
    let id = seq.append(SourceRef::new("/music/late.mp3"));
    let stale = seq.resolution_request(id).unwrap();
    let fresh = seq.resolution_request(id).unwrap();

    seq.apply_resolution(crate::resolver::ResolveOutcome {
        track: id,
        ticket: stale.ticket,
        result: Ok(99.0),
    });
    assert_eq!(seq.snapshot().total, TotalDuration::Pending);

    seq.apply_resolution(crate::resolver::ResolveOutcome {
        track: id,
        ticket: fresh.ticket,
        result: Ok(5.0),
    });
    assert_eq!(seq.snapshot().total, TotalDuration::Known(20.0));
}

#[test]
fn level_results_land_on_the_right_track() {
    let (mut seq, _fake, _clock) = setup(&[10.0, 20.0], 0.0, 0.0);
    let requests = seq.level_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].source, SourceRef::new(path(1)));
    let second = seq.timeline().get(1).unwrap().id;
    assert_eq!(seq.level_request(second), Some(requests[1].clone()));

    let levels = TrackLevels {
        avg_db: -14.2,
        peak_db: -0.8,
    };
    seq.apply_levels(LevelOutcome {
        track: second,
        result: Ok(levels),
    });
    assert_eq!(seq.timeline().get(1).unwrap().levels, Some(levels));
    assert_eq!(seq.timeline().get(0).unwrap().levels, None);

    seq.apply_levels(LevelOutcome {
        track: second,
        result: Err(Error::LevelCheckFailed {
            path: path(1),
            reason: "bad frame".to_string(),
        }),
    });
    assert_eq!(seq.timeline().get(1).unwrap().levels, None);

    seq.remove(1).unwrap();
    assert!(seq.level_request(second).is_none());
    seq.apply_levels(LevelOutcome {
        track: second,
        result: Ok(levels),
    });
    assert_eq!(seq.timeline().len(), 1);
}

#[test]
fn deleting_current_track_forces_idle() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0, 15.0], 2.0, 0.0);
    seq.select_and_play(0).unwrap();
    fake.finish_current();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Gap);

    seq.remove(0).unwrap();
    assert_eq!(seq.state(), SequencerState::default());
    assert!(seq.next_deadline().is_none());
    assert!(fake.live().is_none());

    clock.advance(5.0);
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Idle);
    assert_eq!(fake.state().loads.len(), 1);
}

#[test]
fn deleting_earlier_track_keeps_current_track() {
    let (mut seq, fake, _clock) = setup(&[10.0, 20.0, 15.0], 2.0, 0.0);
    seq.select_and_play(2).unwrap();
    let playing = seq.timeline().get(2).unwrap().id;

    seq.remove(0).unwrap();
    assert_eq!(seq.state().current, Some(1));
    assert_eq!(seq.timeline().get(1).unwrap().id, playing);
    assert!(fake.is_playing());

    seq.remove(1).unwrap();
    assert_eq!(seq.state().phase, Phase::Idle);
    assert!(matches!(
        seq.remove(4),
        Err(Error::InvalidSelection { index: 4, len: 1 })
    ));
}

#[test]
fn reordering_preserves_current_track_identity() {
    let (mut seq, _fake, _clock) = setup(&[1.0, 2.0, 3.0, 4.0], 0.0, 0.0);
    seq.select_and_play(1).unwrap();
    let playing = seq.timeline().get(1).unwrap().id;

    for (from, to) in [(1, 3), (0, 3), (3, 0), (2, 1)] {
        seq.move_track(from, to).unwrap();
        let cur = seq.state().current.unwrap();
        assert_eq!(seq.timeline().get(cur).unwrap().id, playing);
    }
}

#[test]
fn elapsed_never_decreases_when_duration_is_corrected() {
    let mut tl = Timeline::new(2.0, 0.0);
    tl.append(SourceRef::new(path(0)));
    tl.append(SourceRef::new(path(1)));
    let fake = FakeControl::default();
    let clock = ManualClock::new();
    let mut seq: TestSequencer = Sequencer::new(tl, Some(fake.engine()), clock.clone(), TICK);

    seq.select_and_play(0).unwrap();
    seq.poll();
    fake.set_position(50.0);
    let before = seq.snapshot().elapsed_seconds;
    assert_eq!(before, 50.0);

    let handle = fake.live().unwrap();
    fake.push_event(EngineEvent::Loaded {
        handle,
        duration: Some(48.0),
    });
    seq.poll();
    assert_eq!(seq.timeline().get(0).unwrap().duration, Some(48.0));
    assert_eq!(
        seq.timeline().get(0).unwrap().resolution,
        ResolutionState::Ready
    );

    let mut last = before;
    for _ in 0..5 {
        clock.advance(0.1);
        seq.poll();
        let now = seq.snapshot().elapsed_seconds;
        assert!(now >= last, "elapsed went from {last} to {now}");
        last = now;
    }

    // A user action starts a new uninterrupted stretch.
    seq.stop();
    assert_eq!(seq.snapshot().elapsed_seconds, 0.0);
}

#[test]
fn cancelled_gap_timer_never_fires() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0], 2.0, 0.0);
    seq.select_and_play(0).unwrap();
    fake.finish_current();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Gap);

    clock.advance(3.0);
    seq.stop();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Idle);
    assert_eq!(fake.state().loads.len(), 1);
}

#[test]
fn stale_engine_events_are_ignored() {
    let (mut seq, fake, _clock) = setup(&[10.0, 20.0], 0.0, 0.0);
    seq.select_and_play(0).unwrap();
    let old = fake.live().unwrap();
    seq.select_and_play(1).unwrap();

    fake.push_event(EngineEvent::Ended { handle: old });
    seq.poll();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(1)));
    assert!(!seq.timeline().get(1).unwrap().finished);
}

#[test]
fn unplayable_track_counts_as_played_through() {
    let mut tl = Timeline::new(0.0, 0.0);
    for i in 0..3 {
        tl.append(SourceRef::new(path(i)));
    }
    let fake = FakeControl::default()
        .with_duration(&path(0), 1.0)
        .failing(&path(1))
        .with_duration(&path(2), 1.0);
    let mut seq: TestSequencer =
        Sequencer::new(tl, Some(fake.engine()), ManualClock::new(), TICK);

    seq.select_and_play(0).unwrap();
    fake.finish_current();
    seq.poll();

    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(2)));
    assert_eq!(
        seq.timeline().get(1).unwrap().resolution,
        ResolutionState::Unreadable
    );
    assert!(fake.is_playing());
}

#[test]
fn engine_failure_mid_track_advances() {
    let (mut seq, fake, _clock) = setup(&[10.0, 20.0], 0.0, 0.0);
    seq.select_and_play(0).unwrap();
    let handle = fake.live().unwrap();
    fake.push_event(EngineEvent::Failed {
        handle,
        reason: "device lost".to_string(),
    });
    seq.poll();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(1)));
}

#[test]
fn toggle_covers_every_phase() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0], 2.0, 3.0);

    // Nothing selected: start from the top, with the lead-in.
    seq.toggle_play_pause().unwrap();
    assert_eq!(phase_and_current(&seq), (Phase::LeadIn, Some(0)));

    // Lead-in: skip the wait.
    seq.toggle_play_pause().unwrap();
    assert_eq!(seq.state().phase, Phase::Playing);
    assert!(fake.is_playing());
    assert!(seq.next_deadline().is_none());

    seq.toggle_play_pause().unwrap();
    assert!(!fake.is_playing());
    assert_eq!(seq.state().phase, Phase::Playing);

    seq.toggle_play_pause().unwrap();
    assert!(fake.is_playing());

    // Gap: skip to the next track.
    fake.finish_current();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Gap);
    seq.toggle_play_pause().unwrap();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(1)));

    // Finished: a fresh play-through gets the lead-in again.
    fake.finish_current();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Finished);
    seq.toggle_play_pause().unwrap();
    assert_eq!(phase_and_current(&seq), (Phase::LeadIn, Some(0)));
    assert!(!seq.timeline().get(0).unwrap().finished);

    clock.advance(3.0);
    seq.poll();
    assert!(fake.is_playing());
}

#[test]
fn select_only_cues_without_playing() {
    let (mut seq, fake, clock) = setup(&[10.0, 20.0], 2.0, 3.0);
    seq.select_only(1).unwrap();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(1)));
    assert!(!fake.is_playing());
    assert_eq!(fake.live_source(), Some(path(1).into()));

    // First start of the session still gets the lead-in.
    seq.toggle_play_pause().unwrap();
    assert_eq!(seq.state().phase, Phase::LeadIn);
    clock.advance(3.0);
    seq.poll();
    assert!(fake.is_playing());
}

#[test]
fn stop_resets_has_played_once() {
    let (mut seq, fake, _clock) = setup(&[10.0], 0.0, 3.0);
    seq.select_and_play(0).unwrap();
    seq.toggle_play_pause().unwrap();
    assert!(seq.state().has_played_once);

    seq.stop();
    assert_eq!(seq.state(), SequencerState::default());
    assert!(fake.live().is_none());

    seq.select_and_play(0).unwrap();
    assert_eq!(seq.state().phase, Phase::LeadIn);
}

#[test]
fn clear_stops_and_empties_timeline() {
    let (mut seq, fake, _clock) = setup(&[10.0, 20.0], 0.0, 0.0);
    seq.select_and_play(1).unwrap();
    seq.clear();
    assert_eq!(seq.state(), SequencerState::default());
    assert!(seq.timeline().is_empty());
    assert!(fake.live().is_none());
    assert_eq!(seq.snapshot().total, TotalDuration::Known(0.0));
}

#[test]
fn out_of_range_selection_is_rejected_without_change() {
    let (mut seq, fake, _clock) = setup(&[10.0], 0.0, 0.0);
    assert!(matches!(
        seq.select_and_play(3),
        Err(Error::InvalidSelection { index: 3, len: 1 })
    ));
    assert!(seq.select_only(1).is_err());
    assert_eq!(seq.state(), SequencerState::default());
    assert!(fake.state().loads.is_empty());
}

#[test]
fn without_engine_play_controls_fail_but_model_works() {
    let mut tl = Timeline::new(1.0, 1.0);
    tl.append(SourceRef::new(path(0)));
    let mut seq: TestSequencer = Sequencer::new(tl, None, ManualClock::new(), TICK);

    assert!(!seq.has_engine());
    assert!(matches!(
        seq.select_and_play(0),
        Err(Error::PlaybackEngineUnavailable(_))
    ));
    assert!(seq.toggle_play_pause().is_err());
    assert_eq!(seq.state().phase, Phase::Idle);

    seq.append(SourceRef::new(path(1)));
    assert_eq!(seq.set_gap_seconds(2.26), 2.3);
    assert_eq!(seq.timeline().len(), 2);
    seq.stop();
}

#[test]
fn level_trim_reaches_the_loaded_track() {
    let (mut seq, fake, _clock) = setup(&[10.0, 20.0], 0.0, 0.0);
    seq.select_and_play(0).unwrap();
    assert_eq!(fake.state().volume, Some(1.0));

    assert_eq!(seq.set_adjust_db(0, 20.0).unwrap(), 20.0);
    assert_eq!(fake.state().volume, Some(2.0));

    seq.set_adjust_db(1, -6.0).unwrap();
    assert_eq!(fake.state().volume, Some(2.0));
}

#[test]
fn seek_ratio_needs_a_known_duration() {
    let (mut seq, fake, _clock) = setup(&[10.0], 0.0, 0.0);
    seq.seek_ratio(0.5).unwrap();
    assert!(fake.state().seeks.is_empty());

    seq.select_and_play(0).unwrap();
    seq.seek_ratio(0.5).unwrap();
    seq.seek_ratio(7.0).unwrap();
    assert_eq!(fake.state().seeks, vec![5.0, 10.0]);
    assert_eq!(seq.track_progress(0), 1.0);
}

#[test]
fn dispose_releases_engine_and_returns_timeline() {
    let (mut seq, fake, _clock) = setup(&[10.0, 20.0], 2.0, 3.0);
    seq.select_and_play(0).unwrap();
    let tl = seq.dispose();
    assert_eq!(tl.len(), 2);
    assert!(fake.live().is_none());
}

#[test]
fn step_is_pure_and_ignores_stray_events() {
    let ctx = Context {
        track_count: 2,
        gap_seconds: 1.0,
        lead_seconds: 0.0,
        engine_playing: false,
        now: Instant::now(),
    };
    let idle = SequencerState::default();
    for event in [Event::PhaseElapsed, Event::TrackEnded, Event::SelectAndPlay(2)] {
        let step = step(idle, event, &ctx);
        assert_eq!(step.state, idle);
        assert!(step.effects.is_empty());
    }

    let playing = super::step(idle, Event::SelectAndPlay(0), &ctx);
    assert_eq!(
        playing.effects,
        vec![
            Effect::CancelTimers,
            Effect::Release,
            Effect::ResetFinished,
            Effect::Load(0),
            Effect::MarkUnfinished(0),
            Effect::Play,
        ]
    );

    let ended = super::step(playing.state, Event::TrackEnded, &ctx);
    assert_eq!(ended.state.phase, Phase::Gap);
    assert_eq!(ended.state.phase_duration, 1.0);
    assert_eq!(ended.effects.first(), Some(&Effect::ReconcileDuration(0)));
    assert_eq!(ended.effects.last(), Some(&Effect::StartWait(1.0)));
}

#[test]
fn oversized_gap_and_lead_wait_at_most_the_cap() {
    let (mut seq, fake, clock) = setup(&[4.0, 5.0], 0.0, 0.0);
    assert_eq!(seq.set_lead_seconds(1e20), MAX_SILENCE_SECONDS);
    assert_eq!(seq.set_gap_seconds(1e20), MAX_SILENCE_SECONDS);

    seq.select_and_play(0).unwrap();
    assert_eq!(seq.state().phase, Phase::LeadIn);
    assert_eq!(seq.snapshot().phase_countdown, Some(MAX_SILENCE_SECONDS));
    assert!(seq.next_deadline().is_some());

    clock.advance(MAX_SILENCE_SECONDS);
    seq.poll();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(0)));

    fake.finish_current();
    seq.poll();
    assert_eq!(seq.state().phase, Phase::Gap);
    assert_eq!(seq.state().phase_duration, MAX_SILENCE_SECONDS);

    clock.advance(MAX_SILENCE_SECONDS);
    seq.poll();
    assert_eq!(phase_and_current(&seq), (Phase::Playing, Some(1)));
}

#[test]
fn remap_index_follows_moved_items() {
    assert_eq!(remap_index(2, 2, 0), 0);
    assert_eq!(remap_index(1, 0, 3), 0);
    assert_eq!(remap_index(0, 3, 0), 1);
    assert_eq!(remap_index(4, 0, 3), 4);
    assert_eq!(remap_index(0, 1, 2), 0);
}

#[test]
fn timer_queue_cancel_is_idempotent_and_repeats_rearm() {
    let start = Instant::now();
    let mut timers = TimerQueue::new();
    let once = timers.once(TimerKind::PhaseEnd, Duration::from_secs(1), start);
    let tick = timers.repeating(TimerKind::ProgressTick, Duration::from_millis(100), start);

    assert_eq!(timers.pop_due(start), None);
    let at = start + Duration::from_millis(100);
    assert_eq!(timers.pop_due(at), Some((tick, TimerKind::ProgressTick)));
    assert_eq!(timers.pop_due(at), None);
    assert!(timers.is_active(tick));

    assert!(timers.cancel(once));
    assert!(!timers.cancel(once));
    assert_eq!(timers.pop_due(start + Duration::from_secs(2)), Some((tick, TimerKind::ProgressTick)));
    assert_eq!(timers.pop_due(start + Duration::from_secs(2)), None);

    timers.cancel_all();
    assert!(timers.is_empty());
    assert!(timers.next_deadline().is_none());
}
