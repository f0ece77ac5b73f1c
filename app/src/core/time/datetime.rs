use std::{fmt::Display, ops::Add};

use chrono::Datelike;
use tokio::task_local;

use super::{Duration, Time};

task_local! {
    pub static FIXED_NOW: DateTime;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::Local>,
}

impl DateTime {
    fn new<T: chrono::TimeZone>(delegate: chrono::DateTime<T>) -> Self {
        Self {
            delegate: delegate.with_timezone(&chrono::Local),
        }
    }

    pub(super) fn delegate(&self) -> &chrono::DateTime<chrono::Local> {
        &self.delegate
    }

    pub fn now() -> Self {
        FIXED_NOW
            .try_with(|t| *t)
            .unwrap_or_else(|_| chrono::Local::now().into())
    }

    /// Wall-clock date-time in the local time zone, e.g. `2024-11-04T07:00:00` or `2024-11-04T07:00:00.250`.
    pub fn from_local_iso(iso8601: &str) -> anyhow::Result<Self> {
        let naive = chrono::NaiveDateTime::parse_from_str(iso8601, "%Y-%m-%dT%H:%M:%S%.f")?;
        naive
            .and_local_timezone(chrono::Local)
            .earliest()
            .map(Into::into)
            .ok_or_else(|| anyhow::anyhow!("{} does not exist in the local time zone", iso8601))
    }

    pub fn time(&self) -> Time {
        Time::new(self.delegate.time())
    }

    /// ISO weekday, 1 is Monday and 7 is Sunday
    pub fn weekday(&self) -> u32 {
        self.delegate.weekday().number_from_monday()
    }

    pub fn at(&self, time: Time) -> anyhow::Result<Self> {
        let dt = self
            .delegate
            .with_time(time.delegate)
            .earliest()
            .ok_or_else(|| anyhow::anyhow!("Time {} does not exist on {}", time, self.delegate.date_naive()))?;

        Ok(dt.into())
    }

    /// First instant strictly after `self` with the given wall-clock time. Days where the time is skipped by a
    /// DST change are passed over.
    pub fn next_occurrence_of(&self, time: Time) -> anyhow::Result<Self> {
        let mut day = *self;

        for _ in 0..3 {
            if let Ok(candidate) = day.at(time) {
                if candidate > *self {
                    return Ok(candidate);
                }
            }
            day = day.on_next_day();
        }

        anyhow::bail!("No occurrence of {} found after {}", time, self)
    }

    //same wall-clock time on the next day, or 24h later if that time does not exist
    pub fn on_next_day(&self) -> Self {
        let next = self
            .delegate
            .checked_add_days(chrono::Days::new(1))
            .unwrap_or_else(|| self.delegate + chrono::Duration::days(1));
        Self::new(next)
    }

    pub fn elapsed_since(&self, since: Self) -> Duration {
        Duration::new(self.delegate - since.delegate)
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate.format("%Y-%m-%d %H:%M:%S"))
    }
}

impl Add<Duration> for DateTime {
    type Output = DateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        Self::new(self.delegate + rhs.delegate)
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        DateTime::new(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::t;

    #[test]
    fn weekday_starts_on_monday() {
        assert_eq!(DateTime::from_local_iso("2024-11-04T12:00:00").unwrap().weekday(), 1);
        assert_eq!(DateTime::from_local_iso("2024-11-10T12:00:00").unwrap().weekday(), 7);
    }

    #[test]
    fn local_iso_accepts_fractional_seconds() {
        let dt = DateTime::from_local_iso("2024-11-04T09:00:00.001").unwrap();

        assert!(dt > DateTime::from_local_iso("2024-11-04T09:00:00").unwrap());
        assert!(dt.time() > t!(9:00));
    }

    #[test]
    fn next_occurrence_later_today() {
        let now = DateTime::from_local_iso("2024-11-04T05:00:00").unwrap();

        assert_eq!(
            now.next_occurrence_of(t!(6:30)).unwrap(),
            DateTime::from_local_iso("2024-11-04T06:30:00").unwrap()
        );
    }

    #[test]
    fn next_occurrence_rolls_over_to_tomorrow() {
        let now = DateTime::from_local_iso("2024-11-04T06:30:00").unwrap();

        assert_eq!(
            now.next_occurrence_of(t!(6:30)).unwrap(),
            DateTime::from_local_iso("2024-11-05T06:30:00").unwrap()
        );
    }

    #[test]
    fn fixed_now_is_used_within_scope() {
        let fixed = DateTime::from_local_iso("2024-11-04T07:00:00").unwrap();

        FIXED_NOW.sync_scope(fixed, || assert_eq!(t!(now), fixed));
    }
}
