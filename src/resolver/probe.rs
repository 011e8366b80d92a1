use lofty::prelude::AudioFile;

use crate::error::{Error, Result};
use crate::timeline::SourceRef;

/// Reads the playable length of a source, in seconds.
pub trait DurationProbe: Send + 'static {
    fn probe(&self, source: &SourceRef) -> Result<f64>;
}

/// Probe that reads container properties with `lofty`, without decoding.
#[derive(Debug, Copy, Clone, Default)]
pub struct LoftyProbe;

impl DurationProbe for LoftyProbe {
    fn probe(&self, source: &SourceRef) -> Result<f64> {
        let unresolvable = |reason: String| Error::DurationUnresolvable {
            path: source.to_string(),
            reason,
        };
        let tagged = lofty::read_from_path(source.path()).map_err(|e| unresolvable(e.to_string()))?;
        let seconds = tagged.properties().duration().as_secs_f64();
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(unresolvable("container reports no duration".to_string()));
        }
        Ok(seconds)
    }
}
