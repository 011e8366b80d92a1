//! Helpers for the gap/lead second values and their text form.

/// Longest lead-in or gap accepted, in seconds.
pub const MAX_SILENCE_SECONDS: f64 = 3600.0;

/// Round to one decimal of a second.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamp to `[0, MAX_SILENCE_SECONDS]` and round to a tenth. Non-finite
/// input is rejected.
pub fn normalize_seconds(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let v = round_tenth(value.clamp(0.0, MAX_SILENCE_SECONDS));
    v.is_finite().then_some(v)
}

/// Interpret text typed into a gap/lead field.
///
/// While typing (`commit == false`) unparsable text yields `None` so the
/// previous value stays in effect. On commit it falls back to `fallback`.
pub fn parse_seconds_input(text: &str, commit: bool, fallback: f64) -> Option<f64> {
    match text.trim().parse::<f64>().ok().and_then(normalize_seconds) {
        Some(v) => Some(v),
        None if commit => normalize_seconds(fallback),
        None => None,
    }
}

/// Format seconds as `MM:SS`, rounding to the nearest second.
pub fn format_mmss(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let secs = seconds.round() as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
