//! Punctuality verdict for a check-in.
//!
//! The operator configures an expected entry time (`HH:MM`, 24-hour).  A
//! student scanned at or before that minute is on time; later is late.
//!
//! Only the `HH:MM` at character offsets 11..16 of the reading is looked
//! at.  The date and whatever follows the minute (seconds, fractions, a zone
//! offset) are ignored, so a hand-edited reading still gets a verdict.
//!
//! The evaluator never fails: every problem maps to a sentinel
//! [`EntryStatus`] that is sent to the server as-is, so a bad clock setting
//! never blocks a check-in.
//!
//! | Situation                              | Wire text                  |
//! |----------------------------------------|----------------------------|
//! | punctuality control switched off       | `Funcion deshabilitada`    |
//! | no reading time, or unreadable         | `-`                        |
//! | expected time is not `HH:MM`           | `Hora esperada invalida`   |
//! | reading minute ≤ expected minute       | `A tiempo`                 |
//! | reading minute > expected minute       | `Tarde`                    |

use std::fmt;

use chrono::Local;
use serde::{Serialize, Serializer};

/// Format of `fecha_hora_lectura` on the wire and of [`reading_timestamp_now`].
pub const READING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Character range of `HH:MM` inside a reading time.
const READING_TIME_OF_DAY: std::ops::Range<usize> = 11..16;

/// The computed punctuality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    OnTime,
    Late,
    /// Punctuality control is switched off.
    Disabled,
    /// No usable reading time.
    Unknown,
    /// The configured expected time is not a valid `HH:MM`.
    InvalidExpectedTime,
}

impl EntryStatus {
    /// The exact text the server expects in `estado_ingreso`.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            EntryStatus::OnTime => "A tiempo",
            EntryStatus::Late => "Tarde",
            EntryStatus::Disabled => "Funcion deshabilitada",
            EntryStatus::Unknown => "-",
            EntryStatus::InvalidExpectedTime => "Hora esperada invalida",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

impl Serialize for EntryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire_str())
    }
}

/// Computes the punctuality verdict for one reading.
///
/// Checks run in a fixed order: disabled, blank reading, invalid expected
/// time, unreadable reading, then the comparison.
///
/// ```rust
/// use checkin_core::{evaluate, EntryStatus};
///
/// assert_eq!(evaluate("2024-03-01 06:59:00", true, "07:00"), EntryStatus::OnTime);
/// assert_eq!(evaluate("2024-03-01 07:01:00", true, "07:00"), EntryStatus::Late);
/// assert_eq!(evaluate("2024-03-01 07:00:00", true, "7:60"), EntryStatus::InvalidExpectedTime);
/// ```
pub fn evaluate(reading: &str, enabled: bool, expected: &str) -> EntryStatus {
    if !enabled {
        return EntryStatus::Disabled;
    }
    if reading.trim().is_empty() {
        return EntryStatus::Unknown;
    }
    let Some(expected_minutes) = parse_expected_time(expected) else {
        return EntryStatus::InvalidExpectedTime;
    };
    let Some(reading_minutes) = reading_minutes(reading) else {
        return EntryStatus::Unknown;
    };

    if reading_minutes <= expected_minutes {
        EntryStatus::OnTime
    } else {
        EntryStatus::Late
    }
}

/// Parses `H:MM` or `HH:MM` (hour 0–23, minute exactly two digits 00–59)
/// into minutes since midnight.
pub fn parse_expected_time(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if hours.len() > 2 || minutes.len() != 2 || !all_digits(hours) || !all_digits(minutes) {
        return None;
    }

    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Minutes since midnight of the `HH:MM` slice of a reading, or `None` when
/// the reading is shorter than 16 characters or the slice is not a time.
fn reading_minutes(reading: &str) -> Option<u32> {
    if reading.chars().count() < READING_TIME_OF_DAY.end {
        return None;
    }
    let time_of_day: String = reading
        .chars()
        .skip(READING_TIME_OF_DAY.start)
        .take(READING_TIME_OF_DAY.len())
        .collect();
    parse_expected_time(&time_of_day)
}

/// The local wall-clock time formatted with [`READING_TIME_FORMAT`].
pub fn reading_timestamp_now() -> String {
    Local::now().format(READING_TIME_FORMAT).to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_before_expected_is_on_time() {
        assert_eq!(
            evaluate("2024-03-01 06:59:00", true, "07:00"),
            EntryStatus::OnTime
        );
    }

    #[test]
    fn test_reading_in_expected_minute_is_on_time() {
        // Seconds are ignored: 07:00:59 is still the 07:00 minute.
        assert_eq!(
            evaluate("2024-03-01 07:00:59", true, "07:00"),
            EntryStatus::OnTime
        );
    }

    #[test]
    fn test_reading_after_expected_is_late() {
        assert_eq!(
            evaluate("2024-03-01 07:01:00", true, "07:00"),
            EntryStatus::Late
        );
    }

    #[test]
    fn test_disabled_wins_over_everything() {
        assert_eq!(evaluate("", false, "garbage"), EntryStatus::Disabled);
        assert_eq!(
            evaluate("2024-03-01 23:59:00", false, "07:00"),
            EntryStatus::Disabled
        );
    }

    #[test]
    fn test_blank_reading_is_unknown_even_with_bad_expected() {
        assert_eq!(evaluate("", true, "07:00"), EntryStatus::Unknown);
        assert_eq!(evaluate("   ", true, "99:99"), EntryStatus::Unknown);
    }

    #[test]
    fn test_invalid_expected_time() {
        for bad in ["7:60", "24:00", "07:0", "07-00", "", "007:00", "ab:cd", "7:5"] {
            assert_eq!(
                evaluate("2024-03-01 07:00:00", true, bad),
                EntryStatus::InvalidExpectedTime,
                "expected {bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_single_digit_hour_accepted() {
        assert_eq!(parse_expected_time("7:05"), Some(425));
        assert_eq!(parse_expected_time(" 07:05 "), Some(425));
        assert_eq!(parse_expected_time("23:59"), Some(1439));
        assert_eq!(parse_expected_time("0:00"), Some(0));
    }

    #[test]
    fn test_unreadable_reading_is_unknown() {
        assert_eq!(evaluate("ayer", true, "07:00"), EntryStatus::Unknown);
        assert_eq!(evaluate("2024-03-01", true, "07:00"), EntryStatus::Unknown);
        assert_eq!(
            evaluate("2024-03-01 25:00:00", true, "07:00"),
            EntryStatus::Unknown
        );
    }

    #[test]
    fn test_lenient_reading_formats() {
        assert_eq!(
            evaluate("2024-03-01T08:15:00", true, "08:00"),
            EntryStatus::Late
        );
        assert_eq!(
            evaluate("2024-03-01 07:45", true, "08:00"),
            EntryStatus::OnTime
        );
    }

    #[test]
    fn test_only_time_of_day_is_read() {
        // The date is never validated and trailing text is ignored.
        for reading in [
            "2024-02-30 07:00:00",
            "2024-03-01 06:59:00.123",
            "2024-03-01 06:59:00-05:00",
            "xxxx-xx-xx 06:30 (editado)",
        ] {
            assert_eq!(
                evaluate(reading, true, "07:00"),
                EntryStatus::OnTime,
                "reading {reading:?}"
            );
        }
    }

    #[test]
    fn test_time_of_day_must_sit_at_offset_eleven() {
        // Single-digit hour shifts the minute out of place.
        assert_eq!(
            evaluate("2024-03-01 7:00:00", true, "07:00"),
            EntryStatus::Unknown
        );
        // Exactly 16 characters is enough.
        assert_eq!(
            evaluate("2024-03-01 07:01", true, "07:00"),
            EntryStatus::Late
        );
        assert_eq!(
            evaluate("2024-03-01 07:0", true, "07:00"),
            EntryStatus::Unknown
        );
    }

    #[test]
    fn test_wire_strings_are_stable() {
        assert_eq!(EntryStatus::OnTime.to_string(), "A tiempo");
        assert_eq!(EntryStatus::Late.to_string(), "Tarde");
        assert_eq!(EntryStatus::Disabled.to_string(), "Funcion deshabilitada");
        assert_eq!(EntryStatus::Unknown.to_string(), "-");
        assert_eq!(
            EntryStatus::InvalidExpectedTime.to_string(),
            "Hora esperada invalida"
        );
    }

    #[test]
    fn test_timestamp_now_round_trips_through_evaluator() {
        // Arrange
        let now = reading_timestamp_now();

        // Act / Assert: the generator output is exactly 19 chars and readable.
        assert_eq!(now.len(), 19);
        assert_ne!(evaluate(&now, true, "23:59"), EntryStatus::Unknown);
        assert_eq!(evaluate(&now, true, "23:59"), EntryStatus::OnTime);
    }
}
