use std::fmt::Debug;
use std::str::FromStr;

use serde::Deserialize;

use crate::core::ParseError;

/// Set of ISO weekdays, 1 is Monday and 7 is Sunday
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn all() -> Self {
        Self(0b111_1111)
    }

    pub fn contains(&self, weekday: u32) -> bool {
        (1..=7).contains(&weekday) && self.0 & (1 << (weekday - 1)) != 0
    }

    pub fn days(&self) -> Vec<u32> {
        (1..=7).filter(|d| self.contains(*d)).collect()
    }

    fn from_days(days: impl IntoIterator<Item = i64>, literal: impl Fn() -> String) -> Result<Self, ParseError> {
        let mut mask = 0u8;

        for day in days {
            if !(1..=7).contains(&day) {
                return Err(ParseError::InvalidWeekdays { literal: literal() });
            }
            mask |= 1 << (day - 1);
        }

        Ok(if mask == 0 { Self::all() } else { Self(mask) })
    }
}

impl Default for WeekdaySet {
    fn default() -> Self {
        Self::all()
    }
}

impl Debug for WeekdaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.days()).finish()
    }
}

/// `"1,3,5"`, `"2-4"` or a single day. Blank means every day.
impl FromStr for WeekdaySet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidWeekdays { literal: s.to_owned() };
        let number = |part: &str| part.trim().parse::<i64>().map_err(|_| invalid());

        if s.trim().is_empty() {
            return Ok(Self::all());
        }

        let days: Vec<i64> = match s.split_once('-') {
            Some((from, to)) => {
                let (from, to) = (number(from)?, number(to)?);
                if from > to || from < 1 || to > 7 {
                    return Err(invalid());
                }
                (from..=to).collect()
            }
            None => s.split(',').map(number).collect::<Result<_, _>>()?,
        };

        Self::from_days(days, || s.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeekdaySpec {
    Day(i64),
    Days(Vec<i64>),
    Literal(String),
}

impl TryFrom<&WeekdaySpec> for WeekdaySet {
    type Error = ParseError;

    fn try_from(spec: &WeekdaySpec) -> Result<Self, Self::Error> {
        match spec {
            WeekdaySpec::Day(day) => Self::from_days([*day], || day.to_string()),
            WeekdaySpec::Days(days) => Self::from_days(days.iter().copied(), || format!("{:?}", days)),
            WeekdaySpec::Literal(literal) => literal.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_literal() {
        let set: WeekdaySet = "1,3,5".parse().unwrap();

        assert_eq!(set.days(), vec![1, 3, 5]);
        assert!(set.contains(3));
        assert!(!set.contains(2));
    }

    #[test]
    fn parses_inclusive_range() {
        let set: WeekdaySet = "2-4".parse().unwrap();

        assert_eq!(set.days(), vec![2, 3, 4]);
    }

    #[test]
    fn parses_whitespace_tolerant() {
        assert_eq!(" 6 - 7 ".parse::<WeekdaySet>().unwrap().days(), vec![6, 7]);
        assert_eq!("1, 2".parse::<WeekdaySet>().unwrap().days(), vec![1, 2]);
    }

    #[test]
    fn blank_means_every_day() {
        assert_eq!("".parse::<WeekdaySet>(), Ok(WeekdaySet::all()));
        assert_eq!(WeekdaySet::try_from(&WeekdaySpec::Days(vec![])), Ok(WeekdaySet::all()));
    }

    #[test]
    fn rejects_invalid_literals() {
        for literal in ["0", "8", "5-2", "1-3,5", "mon", "1,,2"] {
            assert_eq!(
                literal.parse::<WeekdaySet>(),
                Err(ParseError::InvalidWeekdays {
                    literal: literal.to_owned()
                }),
                "{}",
                literal
            );
        }
    }

    #[test]
    fn accepts_integer_and_list_forms() {
        assert_eq!(WeekdaySet::try_from(&WeekdaySpec::Day(7)).unwrap().days(), vec![7]);
        assert_eq!(
            WeekdaySet::try_from(&WeekdaySpec::Days(vec![5, 1])).unwrap().days(),
            vec![1, 5]
        );
        assert!(WeekdaySet::try_from(&WeekdaySpec::Days(vec![1, 9])).is_err());
    }

    #[test]
    fn deserializes_all_forms() {
        let specs: Vec<WeekdaySpec> = serde_json::from_str(r#"[3, [1, 2], "1-5"]"#).unwrap();

        assert_eq!(
            specs,
            vec![
                WeekdaySpec::Day(3),
                WeekdaySpec::Days(vec![1, 2]),
                WeekdaySpec::Literal("1-5".to_owned())
            ]
        );
    }
}
