//! Recurrence expression parsing.
//!
//! Scheduled jobs accept a single restricted five-field form, "every N
//! minutes" (`*/N * * * *`). Anything else is rejected at registration
//! so a malformed expression never reaches a timer.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ScheduleError;

fn every_n_minutes() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\*/(\d{1,2})\s+\*\s+\*\s+\*\s+\*$").expect("valid regex"))
}

/// Parse `*/N * * * *` into N minutes. N must be within 1..=59.
pub fn parse_minutes(expr: &str) -> Result<u64, ScheduleError> {
    let trimmed = expr.trim();
    let caps = every_n_minutes()
        .captures(trimmed)
        .ok_or_else(|| ScheduleError::InvalidSchedule(expr.to_string()))?;

    let minutes: u64 = caps[1]
        .parse()
        .map_err(|_| ScheduleError::InvalidSchedule(expr.to_string()))?;

    if minutes == 0 || minutes > 59 {
        return Err(ScheduleError::InvalidSchedule(expr.to_string()));
    }

    Ok(minutes)
}

/// Parse a recurrence expression into its timer interval in milliseconds.
pub fn interval_ms(expr: &str) -> Result<u64, ScheduleError> {
    parse_minutes(expr).map(|minutes| minutes * 60_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_five_minutes() {
        assert_eq!(parse_minutes("*/5 * * * *").unwrap(), 5);
        assert_eq!(interval_ms("*/5 * * * *").unwrap(), 300_000);
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_minutes("*/1 * * * *").unwrap(), 1);
        assert_eq!(parse_minutes("*/59 * * * *").unwrap(), 59);
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        assert_eq!(parse_minutes("  */10 * * * *  ").unwrap(), 10);
    }

    #[test]
    fn test_rejects_zero_minutes() {
        assert!(matches!(
            parse_minutes("*/0 * * * *"),
            Err(ScheduleError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_rejects_over_fifty_nine() {
        assert!(parse_minutes("*/60 * * * *").is_err());
        assert!(parse_minutes("*/99 * * * *").is_err());
    }

    #[test]
    fn test_rejects_other_cron_forms() {
        assert!(parse_minutes("0 * * * *").is_err());
        assert!(parse_minutes("*/5 0 * * *").is_err());
        assert!(parse_minutes("5 4 * * *").is_err());
        assert!(parse_minutes("* * * * *").is_err());
        assert!(parse_minutes("*/5 * * *").is_err());
        assert!(parse_minutes("*/5 * * * * *").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_minutes("").is_err());
        assert!(parse_minutes("every 5 minutes").is_err());
        assert!(parse_minutes("*/five * * * *").is_err());
    }

    #[test]
    fn test_error_preserves_expression() {
        let err = parse_minutes("0 0 * * *").unwrap_err();
        assert!(err.to_string().contains("0 0 * * *"));
    }
}
