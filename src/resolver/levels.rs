use std::fs::File;
use std::io::BufReader;

use rodio::Decoder;

use crate::error::{Error, Result};
use crate::timeline::{SourceRef, TrackLevels};

/// Measures the loudness of a whole source.
pub trait LevelMeter: Send + 'static {
    fn measure(&self, source: &SourceRef) -> Result<TrackLevels>;
}

/// Decodes the source with `rodio` and reads every sample.
#[derive(Debug, Copy, Clone, Default)]
pub struct DecoderMeter;

impl LevelMeter for DecoderMeter {
    fn measure(&self, source: &SourceRef) -> Result<TrackLevels> {
        let failed = |reason: String| Error::LevelCheckFailed {
            path: source.to_string(),
            reason,
        };
        let file = File::open(source.path()).map_err(|e| failed(e.to_string()))?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| failed(e.to_string()))?;
        levels_from_samples(decoder).ok_or_else(|| failed("no samples decoded".to_string()))
    }
}

/// RMS and peak over interleaved samples in `[-1, 1]`. `None` when there
/// are no usable samples.
pub fn levels_from_samples<I: IntoIterator<Item = f32>>(samples: I) -> Option<TrackLevels> {
    let mut peak = 0.0f64;
    let mut sum_squares = 0.0f64;
    let mut count = 0u64;
    for sample in samples {
        let v = f64::from(sample);
        if !v.is_finite() {
            continue;
        }
        peak = peak.max(v.abs());
        sum_squares += v * v;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let rms = (sum_squares / count as f64).sqrt();
    Some(TrackLevels {
        avg_db: to_db(rms),
        peak_db: to_db(peak),
    })
}

fn to_db(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        20.0 * amplitude.log10()
    } else {
        f64::NEG_INFINITY
    }
}
