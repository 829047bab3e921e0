//! Small conversions applied while mapping provider responses.
//!
//! Times are rendered in the city's own UTC offset when the provider reports
//! one, so the same cached record reads the same on any machine.

use chrono::{DateTime, FixedOffset, Local, Utc};

fn format_epoch(epoch: i64, offset_secs: Option<i32>, fmt: &str) -> Option<String> {
    let utc = DateTime::<Utc>::from_timestamp(epoch, 0)?;
    let formatted = match offset_secs {
        Some(secs) => utc
            .with_timezone(&FixedOffset::east_opt(secs)?)
            .format(fmt)
            .to_string(),
        None => utc.with_timezone(&Local).format(fmt).to_string(),
    };
    Some(formatted)
}

/// Epoch seconds to a 24h `HH:MM` string.
pub fn clock_time(epoch: i64, offset_secs: Option<i32>) -> Option<String> {
    format_epoch(epoch, offset_secs, "%H:%M")
}

/// Epoch seconds to a `DD.MM` date string.
pub fn day_month(epoch: i64, offset_secs: Option<i32>) -> Option<String> {
    format_epoch(epoch, offset_secs, "%d.%m")
}

/// Offset in seconds to a signed `H:MM` string, e.g. `+3:00` or `-4:30`.
pub fn utc_offset(offset_secs: i32) -> String {
    let abs = offset_secs.unsigned_abs();
    let hours = abs / 3600;
    let minutes = (abs % 3600) / 60;
    let sign = if offset_secs >= 0 { '+' } else { '-' };
    format!("{}{}:{:02}", sign, hours, minutes)
}

/// Probability-of-precipitation fraction to a whole percent.
pub fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Uppercases the first letter of the first word only.
pub fn capitalize_first_word(words: &str) -> String {
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-01 12:34:00 UTC
    const NOON_ISH: i64 = 1_709_296_440;

    #[test]
    fn test_clock_time_applies_offset() {
        assert_eq!(clock_time(NOON_ISH, Some(0)).as_deref(), Some("12:34"));
        assert_eq!(clock_time(NOON_ISH, Some(3 * 3600)).as_deref(), Some("15:34"));
        assert_eq!(clock_time(NOON_ISH, Some(-5 * 3600)).as_deref(), Some("07:34"));
    }

    #[test]
    fn test_day_month_crosses_midnight() {
        assert_eq!(day_month(NOON_ISH, Some(0)).as_deref(), Some("01.03"));
        assert_eq!(day_month(NOON_ISH, Some(12 * 3600)).as_deref(), Some("02.03"));
    }

    #[test]
    fn test_invalid_offset_yields_none() {
        assert_eq!(clock_time(NOON_ISH, Some(90_000)), None);
    }

    #[test]
    fn test_utc_offset() {
        assert_eq!(utc_offset(10_800), "+3:00");
        assert_eq!(utc_offset(0), "+0:00");
        assert_eq!(utc_offset(-16_200), "-4:30");
        assert_eq!(utc_offset(19_800), "+5:30");
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(0.42), 42);
        assert_eq!(percent(0.005), 1);
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(1.0), 100);
    }

    #[test]
    fn test_capitalize_first_word() {
        assert_eq!(capitalize_first_word("light rain"), "Light rain");
        assert_eq!(capitalize_first_word("ясно"), "Ясно");
        assert_eq!(capitalize_first_word(""), "");
    }
}
