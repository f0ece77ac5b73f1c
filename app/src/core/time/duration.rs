use std::str::FromStr;

use serde::Deserialize;

use super::DateTime;
use crate::core::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "DurationLiteral")]
pub struct Duration {
    pub(super) delegate: chrono::Duration,
}

impl Duration {
    pub(super) fn new(delegate: chrono::Duration) -> Self {
        Self { delegate }
    }

    pub fn zero() -> Self {
        Self::new(chrono::Duration::zero())
    }

    pub fn until(date_time: &DateTime) -> Self {
        Self::new(*date_time.delegate() - DateTime::now().delegate())
    }

    pub fn hours(hours: i64) -> Self {
        Self::new(chrono::Duration::hours(hours))
    }

    pub fn minutes(minutes: i64) -> Self {
        Self::new(chrono::Duration::minutes(minutes))
    }

    pub fn seconds(seconds: i64) -> Self {
        Self::new(chrono::Duration::seconds(seconds))
    }

    pub fn as_secs(&self) -> i64 {
        self.delegate.num_seconds()
    }

    pub fn as_minutes(&self) -> i64 {
        self.delegate.num_minutes()
    }

    pub fn is_zero(&self) -> bool {
        self.delegate.is_zero()
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.as_secs())
    }
}

//negative durations (timers in the past) are mapped to zero
impl From<Duration> for std::time::Duration {
    fn from(val: Duration) -> Self {
        val.delegate.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}

/// Plain integers are seconds, otherwise `<amount><unit>` with unit one of `s`, `m`, `h`, `d`, `w`.
/// Anything that is not alphanumeric is ignored, so `1 h` and `1h` are the same.
impl FromStr for Duration {
    type Err = ParseError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidDuration {
            literal: literal.to_owned(),
        };

        if let Ok(seconds) = literal.trim().parse::<i64>() {
            return match seconds {
                s if s >= 0 => chrono::Duration::try_seconds(s).map(Duration::new).ok_or_else(invalid),
                _ => Err(invalid()),
            };
        }

        if literal.contains('-') {
            return Err(invalid());
        }

        let cleaned: String = literal.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        let Some(unit) = cleaned.chars().last() else {
            return Err(invalid());
        };

        let amount: i64 = cleaned[..cleaned.len() - 1].parse().map_err(|_| invalid())?;

        let delegate = match unit.to_ascii_lowercase() {
            's' => chrono::Duration::try_seconds(amount),
            'm' => chrono::Duration::try_minutes(amount),
            'h' => chrono::Duration::try_hours(amount),
            'd' => chrono::Duration::try_days(amount),
            'w' => chrono::Duration::try_weeks(amount),
            _ => None,
        };

        delegate.map(Duration::new).ok_or_else(invalid)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationLiteral {
    Seconds(i64),
    Text(String),
}

impl TryFrom<DurationLiteral> for Duration {
    type Error = ParseError;

    fn try_from(value: DurationLiteral) -> Result<Self, Self::Error> {
        match value {
            DurationLiteral::Seconds(s) => s.to_string().parse(),
            DurationLiteral::Text(s) => s.parse(),
        }
    }
}
