//! Display formatting for track durations.
//!
//! The formatted string is a client-side convenience only; it is never
//! sent back to the backend.

/// Format a duration in seconds as `m:ss`, or `h:mm:ss` from one hour up.
///
/// Negative and non-finite inputs format as `0:00`. Fractional seconds
/// are truncated.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
