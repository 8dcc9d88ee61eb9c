//! Parsing of heterogeneous sensor value encodings into validated floats.
//!
//! The tree backend reports formatted strings ("45,2 °C", "1350 RPM"), the
//! flat backend reports raw floats. Both funnel through here so the rest of
//! the pipeline only ever sees a validated value or nothing.

use crate::sensor::SensorKind;

/// Unit tokens the upstream daemon appends to formatted values.
///
/// Ordered longest-first so compound units are stripped before their
/// single-letter components.
const UNIT_SUFFIXES: &[&str] = &[
    "bytes/s", "KB/s", "MB/s", "GB/s", "°C", "°F", "RPM", "rpm", "MHz", "GHz",
    "Hz", "L/h", "dB", "mV", "mW", "mA", "GB", "MB", "KB", "TB", "%", "W", "V",
    "A", "T", "B",
];

/// Parse a formatted value string into a validated float.
///
/// Returns `None` for the not-a-number sentinel, empty input, anything that
/// fails numeric conversion, and negative readings for kinds that cannot
/// physically be negative. A `None` means the sensor is dropped for the
/// cycle; it is never substituted with zero.
pub fn parse(raw: &str, kind: SensorKind) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let stripped = strip_unit_suffix(trimmed);

    // Locale-formatted decimals use a comma in place of the point.
    let normalized = stripped.replace(',', ".");

    let cleaned = clean_numeric(&normalized);
    if cleaned.is_empty() || cleaned == "-" || cleaned == "." {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    validate(kind, value)
}

/// Validate an already-numeric reading against the kind's physical range.
pub fn validate(kind: SensorKind, value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    if value < 0.0 && kind.cannot_be_negative() {
        return None;
    }
    Some(value)
}

/// Strip one trailing unit token, if present.
fn strip_unit_suffix(s: &str) -> &str {
    for unit in UNIT_SUFFIXES {
        if let Some(rest) = s.strip_suffix(unit) {
            return rest.trim_end();
        }
    }
    s
}

/// Remove everything that is not part of a plain numeric literal: keep
/// digits, a minus only in the leading position, and the first decimal point.
fn clean_numeric(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut seen_point = false;

    for c in s.chars() {
        match c {
            '0'..='9' => result.push(c),
            '-' if result.is_empty() => result.push(c),
            '.' if !seen_point => {
                result.push(c);
                seen_point = true;
            }
            _ => {}
        }
    }

    result
}
