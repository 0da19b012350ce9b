//! Time-of-day handling.
//!
//! Timeline entries carry a wall-clock `HH:MM` string rather than a full
//! timestamp; sources that provide more (ISO timestamps, EXIF date-times,
//! model guesses) are reduced to that form here.

/// Time used when a source has no usable time of day.
pub const DEFAULT_TIME: &str = "12:00";

/// Validate and zero-pad a time of day.
///
/// Accepts `H:MM`, `HH:MM` and `HH:MM:SS` (seconds are dropped). Returns
/// `None` for anything else, including out-of-range hours or minutes.
pub fn normalize_hhmm(raw: &str) -> Option<String> {
    let mut parts = raw.trim().split(':');
    let hour = parts.next()?;
    let minute = parts.next()?;

    if let Some(second) = parts.next() {
        if !is_digits(second, 2) {
            return None;
        }
    }
    if parts.next().is_some() {
        return None;
    }

    if hour.is_empty() || hour.len() > 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !is_digits(minute, 2) {
        return None;
    }

    let h: u32 = hour.parse().ok()?;
    let m: u32 = minute.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }

    Some(format!("{:02}:{:02}", h, m))
}

/// Extract the `HH:MM` component from an ISO-8601 style timestamp.
///
/// The time is taken from after the date/time separator (`T` or a space)
/// when one is present, otherwise the whole string is tried. Offsets and
/// fractional seconds are ignored. Missing or malformed input yields
/// [`DEFAULT_TIME`].
pub fn time_from_iso(start: Option<&str>) -> String {
    let Some(raw) = start.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_TIME.to_string();
    };

    let time_part = match raw.find(['T', 't', ' ']) {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };

    time_part
        .get(..5)
        .and_then(normalize_hhmm)
        .unwrap_or_else(|| DEFAULT_TIME.to_string())
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}
