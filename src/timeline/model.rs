use crate::error::{Error, Result};

use super::seconds::{normalize_seconds, round_tenth};
use super::track::{ResolutionState, SourceRef, Track, TrackId, TrackLevels};

/// Total length of the timeline, or `Pending` while a duration is still
/// being resolved.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TotalDuration {
    Known(f64),
    Pending,
}

impl TotalDuration {
    #[cfg(test)]
    pub fn seconds(self) -> Option<f64> {
        match self {
            TotalDuration::Known(s) => Some(s),
            TotalDuration::Pending => None,
        }
    }
}

/// The ordered tracks plus the silence inserted around them.
#[derive(Debug, Clone)]
pub struct Timeline {
    tracks: Vec<Track>,
    gap_seconds: f64,
    lead_seconds: f64,
    next_id: u64,
    next_ticket: u64,
}

impl Timeline {
    pub fn new(gap_seconds: f64, lead_seconds: f64) -> Self {
        Self {
            tracks: Vec::new(),
            gap_seconds: normalize_seconds(gap_seconds).unwrap_or(0.0),
            lead_seconds: normalize_seconds(lead_seconds).unwrap_or(0.0),
            next_id: 1,
            next_ticket: 1,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn gap_seconds(&self) -> f64 {
        self.gap_seconds
    }

    pub fn lead_seconds(&self) -> f64 {
        self.lead_seconds
    }

    /// Import a source at the end of the list. Its duration starts out pending.
    pub fn append(&mut self, source: SourceRef) -> TrackId {
        let id = TrackId::new(self.next_id);
        self.next_id += 1;
        self.tracks.push(Track::new(id, source));
        id
    }

    pub(crate) fn remove(&mut self, index: usize) -> Result<Track> {
        self.check_index(index)?;
        Ok(self.tracks.remove(index))
    }

    pub(crate) fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        Ok(())
    }

    pub(crate) fn clear(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.tracks)
    }

    /// Set the gap; returns the stored (clamped, rounded) value. Non-finite
    /// input leaves the setting unchanged.
    pub fn set_gap_seconds(&mut self, value: f64) -> f64 {
        if let Some(v) = normalize_seconds(value) {
            self.gap_seconds = v;
        }
        self.gap_seconds
    }

    pub fn set_lead_seconds(&mut self, value: f64) -> f64 {
        if let Some(v) = normalize_seconds(value) {
            self.lead_seconds = v;
        }
        self.lead_seconds
    }

    /// Issue a new resolution ticket for `id`. Only the outcome carrying the
    /// latest ticket is applied.
    pub fn issue_ticket(&mut self, id: TrackId) -> Option<u64> {
        let ticket = self.next_ticket;
        let track = self.tracks.iter_mut().find(|t| t.id == id)?;
        self.next_ticket += 1;
        track.ticket = ticket;
        Some(ticket)
    }

    /// Apply a resolver outcome. Neither a repeated success nor a later
    /// failure changes a duration that is already known.
    pub fn apply_resolution(
        &mut self,
        id: TrackId,
        ticket: u64,
        outcome: Result<f64>,
    ) -> Result<ResolutionState> {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == id) else {
            return Err(Error::StaleResolution(id));
        };
        if track.ticket != ticket {
            return Err(Error::StaleResolution(id));
        }
        match outcome {
            Ok(seconds) if seconds.is_finite() && seconds > 0.0 => {
                // A duration is immutable once known.
                if track.known_duration().is_none() {
                    track.duration = Some(seconds);
                }
                track.resolution = ResolutionState::Ready;
            }
            Ok(_) | Err(_) => {
                if track.resolution != ResolutionState::Ready {
                    track.duration = None;
                    track.resolution = ResolutionState::Unreadable;
                }
            }
        }
        Ok(track.resolution)
    }

    /// Store a level check result; a failed check clears older levels.
    /// Returns false when the track no longer exists.
    pub fn apply_levels(&mut self, id: TrackId, levels: Option<TrackLevels>) -> bool {
        match self.tracks.iter_mut().find(|t| t.id == id) {
            Some(track) => {
                track.levels = levels;
                true
            }
            None => false,
        }
    }

    /// Fill in a duration the engine discovered. Only unknown durations are
    /// replaced; returns whether the track changed.
    pub(crate) fn reconcile_duration(&mut self, index: usize, seconds: f64) -> bool {
        let Some(track) = self.tracks.get_mut(index) else {
            return false;
        };
        if track.known_duration().is_some() || !seconds.is_finite() || seconds <= 0.0 {
            return false;
        }
        track.duration = Some(seconds);
        track.resolution = ResolutionState::Ready;
        true
    }

    pub(crate) fn mark_unreadable(&mut self, index: usize) {
        if let Some(track) = self.tracks.get_mut(index) {
            if track.known_duration().is_none() {
                track.duration = None;
                track.resolution = ResolutionState::Unreadable;
            }
        }
    }

    pub(crate) fn set_finished(&mut self, index: usize, finished: bool) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.finished = finished;
        }
    }

    pub(crate) fn reset_finished(&mut self) {
        for track in &mut self.tracks {
            track.finished = false;
        }
    }

    pub(crate) fn set_adjust_db(&mut self, index: usize, db: f64) -> Result<f64> {
        self.check_index(index)?;
        let db = if db.is_finite() { round_tenth(db) } else { 0.0 };
        self.tracks[index].adjust_db = db;
        Ok(db)
    }

    /// `lead + Σ durations + gap × (n − 1)`, or `Pending` while any track is
    /// still resolving. Unreadable tracks contribute nothing.
    pub fn total(&self) -> TotalDuration {
        if self
            .tracks
            .iter()
            .any(|t| t.resolution == ResolutionState::Pending && t.known_duration().is_none())
        {
            return TotalDuration::Pending;
        }
        let tracks: f64 = self.tracks.iter().filter_map(Track::known_duration).sum();
        let gaps = self.tracks.len().saturating_sub(1) as f64;
        TotalDuration::Known(self.lead_seconds + tracks + self.gap_seconds * gaps)
    }

    /// Sum of the known durations strictly before `index`.
    pub fn known_duration_before(&self, index: usize) -> f64 {
        self.tracks
            .iter()
            .take(index)
            .filter_map(Track::known_duration)
            .sum()
    }

    pub fn unreadable_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.resolution == ResolutionState::Unreadable)
            .count()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(Error::InvalidSelection {
                index,
                len: self.tracks.len(),
            });
        }
        Ok(())
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
