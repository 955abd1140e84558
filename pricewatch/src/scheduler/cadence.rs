//! Cron cadence expressions.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Daily at midnight (UTC).
pub const DEFAULT_CADENCE: &str = "0 0 * * *";

/// A parsed cron expression.
///
/// Accepts the classic 5-field form (minute resolution, seconds fixed at 0) as
/// well as the 6- and 7-field forms with seconds and optional year. Day-of-week
/// numbering follows the `cron` crate (1 = Sunday); names such as `MON` are
/// unambiguous.
#[derive(Debug, Clone)]
pub struct Cadence {
    expression: String,
    schedule: cron::Schedule,
}

impl Cadence {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let normalized = match trimmed.split_whitespace().count() {
            5 => format!("0 {}", trimmed),
            6 | 7 => trimmed.to_string(),
            n => {
                return Err(Error::invalid_cadence(
                    expression,
                    format!("expected 5, 6 or 7 fields, got {}", n),
                ));
            }
        };

        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| Error::invalid_cadence(expression, e.to_string()))?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    /// The expression as supplied (trimmed).
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Time to wait from now until the next fire time. `None` if the schedule
    /// never fires again.
    pub fn until_next(&self) -> Option<Duration> {
        let now = Utc::now();
        let next = self.next_after(now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl FromStr for Cadence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_five_field_daily_midnight() {
        let cadence = Cadence::parse(DEFAULT_CADENCE).unwrap();
        let from = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let next = cadence.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_six_field_every_second() {
        let cadence = Cadence::parse("* * * * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let next = cadence.next_after(from).unwrap();
        assert_eq!(next.second(), 27);
        assert!(cadence.until_next().unwrap() <= Duration::from_secs(1));
    }

    #[test]
    fn test_five_field_every_fifteen_minutes() {
        let cadence: Cadence = "*/15 * * * *".parse().unwrap();
        let from = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let next = cadence.next_after(from).unwrap();
        assert_eq!((next.hour(), next.minute(), next.second()), (15, 15, 0));
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in ["", "* *", "not a cron at all x y", "61 * * * *", "1 2 3 4 5 6 7 8"] {
            assert!(
                matches!(Cadence::parse(expr), Err(Error::InvalidCadence { .. })),
                "expected {:?} to be rejected",
                expr
            );
        }
    }
}
