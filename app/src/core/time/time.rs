use std::{fmt::Display, str::FromStr};

use anyhow::Context;
use chrono::Timelike;
use serde::Deserialize;

use crate::core::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Time {
    pub(super) delegate: chrono::NaiveTime,
}

impl Time {
    pub(super) fn new(delegate: chrono::NaiveTime) -> Self {
        Self { delegate }
    }

    pub fn at(hour: u32, minute: u32) -> anyhow::Result<Self> {
        Ok(Self {
            delegate: chrono::NaiveTime::from_hms_opt(hour, minute, 0)
                .context(format!("Error parsing time {}:{}", hour, minute))?,
        })
    }

    pub fn hour(&self) -> u32 {
        self.delegate.hour()
    }

    pub fn minute(&self) -> u32 {
        self.delegate.minute()
    }
}

/// Accepts `H`, `H:M` and `H:M:S`. Missing components count as zero, so `7` is 07:00 and `:30` is 00:30.
impl FromStr for Time {
    type Err = ParseError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidTime {
            literal: literal.to_owned(),
        };

        let component = |c: Option<&str>| -> Result<u32, ParseError> {
            match c.map(str::trim) {
                None | Some("") => Ok(0),
                Some(c) => c.parse().map_err(|_| invalid()),
            }
        };

        let mut parts = literal.trim().splitn(3, ':');
        let hour = parts.next();
        let minute = parts.next();
        let second = parts.next();

        let is_blank = |c: Option<&str>| c.is_none_or(|c| c.trim().is_empty());
        if is_blank(hour) && is_blank(minute) {
            return Err(invalid());
        }

        chrono::NaiveTime::from_hms_opt(component(hour)?, component(minute)?, component(second)?)
            .map(Time::new)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Time {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.delegate.second() == 0 {
            write!(f, "{}", self.delegate.format("%H:%M"))
        } else {
            write!(f, "{}", self.delegate.format("%H:%M:%S"))
        }
    }
}
