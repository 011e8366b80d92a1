use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque identifier assigned when a track is imported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

impl TrackId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle the playback engine loads audio from. The core never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef(PathBuf);

impl SourceRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Where a track's duration lookup stands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ResolutionState {
    #[default]
    Pending,
    Ready,
    Unreadable,
}

/// Loudness of a whole track, in dBFS. Silence is `-inf`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrackLevels {
    /// RMS over every sample of every channel.
    pub avg_db: f64,
    pub peak_db: f64,
}

/// One imported audio clip.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub source: SourceRef,
    /// File name shown in the track list.
    pub name: String,
    /// Upper-cased extension, e.g. `MP3`.
    pub format: String,
    /// Playable length in seconds, once known.
    pub duration: Option<f64>,
    pub resolution: ResolutionState,
    /// Completed naturally during the current play-through.
    pub finished: bool,
    /// Level trim in dB, one decimal.
    pub adjust_db: f64,
    /// Measured loudness; `None` until a level check succeeds.
    pub levels: Option<TrackLevels>,
    pub(crate) ticket: u64,
}

impl Track {
    pub(crate) fn new(id: TrackId, source: SourceRef) -> Self {
        let name = source
            .path()
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source.to_string());
        let format = guess_format(source.path());
        Self {
            id,
            source,
            name,
            format,
            duration: None,
            resolution: ResolutionState::Pending,
            finished: false,
            adjust_db: 0.0,
            levels: None,
            ticket: 0,
        }
    }

    /// Duration usable for arithmetic: finite and positive.
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Linear gain for `adjust_db`, kept within `[0, 2]`.
    pub fn gain(&self) -> f32 {
        gain_for_db(self.adjust_db)
    }
}

pub fn gain_for_db(db: f64) -> f32 {
    if !db.is_finite() {
        return 1.0;
    }
    10f64.powf(db / 20.0).clamp(0.0, 2.0) as f32
}

/// Render a level trim with an explicit sign for boosts.
pub fn format_adjust_db(db: f64) -> String {
    if !db.is_finite() || db == 0.0 {
        "0.0".to_string()
    } else if db > 0.0 {
        format!("+{:.1}", db)
    } else {
        format!("{:.1}", db)
    }
}

/// A measured level with one decimal, or `--` for silence.
pub fn format_level_db(db: f64) -> String {
    if db.is_finite() {
        format!("{:.1}", db)
    } else {
        "--".to_string()
    }
}

fn guess_format(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_uppercase())
        .unwrap_or_else(|| "AUDIO".to_string())
}
