//! Field formatting and VBO clock conversion helpers.

/// Zero-pad an integer to a fixed width, sign-aware: `-300000` at width 9
/// becomes `-00300000`.
pub fn zero_pad(value: i64, width: usize) -> String {
    format!("{value:0width$}")
}

/// Format a heading-style value for VBO output: two decimal places, at least
/// five characters, zero-padded (`5.0` becomes `05.00`).
pub fn format_heading(degrees: f64) -> String {
    format!("{degrees:05.2}")
}

/// Convert a VBO clock value in `HHMMSS.CC` format (hours, minutes, seconds,
/// centiseconds) to milliseconds. Short values are left-padded with zeros, a
/// missing fractional part counts as `.00`. Returns `None` when the digits
/// cannot be read.
pub fn hhmmsscc_to_milliseconds(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (main, centis) = trimmed.split_once('.').unwrap_or((trimmed, "00"));

    let main = format!("{main:0>6}");
    let hours: i64 = main.get(0..2)?.parse().ok()?;
    let minutes: i64 = main.get(2..4)?.parse().ok()?;
    let seconds: i64 = main.get(4..6)?.parse().ok()?;
    let centis: i64 = format!("{centis:0<2}").parse().ok()?;

    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + centis * 10)
}
