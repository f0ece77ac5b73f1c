use crate::core::time::{DailyTimeRange, DateTime};
use crate::core::unit::DegreeCelsius;
use crate::port::StateAccess;

use super::gate::Gate;
use super::weekday::WeekdaySet;

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    window: DailyTimeRange,
    setpoint: DegreeCelsius,
    weekdays: WeekdaySet,
    gates: Vec<Gate>,
}

impl ScheduleEntry {
    pub fn new(window: DailyTimeRange, setpoint: DegreeCelsius, weekdays: WeekdaySet, gates: Vec<Gate>) -> Self {
        Self {
            window,
            setpoint,
            weekdays,
            gates,
        }
    }

    pub fn window(&self) -> &DailyTimeRange {
        &self.window
    }

    pub fn setpoint(&self) -> DegreeCelsius {
        self.setpoint
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn matches(&self, now: &DateTime, states: &impl StateAccess) -> bool {
        self.window.contains(now.time())
            && self.weekdays.contains(now.weekday())
            && self.gates.iter().all(|gate| gate.current(states))
    }
}

/// Default setpoint and prioritized schedule of one room in one mode
#[derive(Debug, Clone)]
pub struct ModeControl {
    default: DegreeCelsius,
    schedule: Vec<ScheduleEntry>,
}

impl ModeControl {
    pub fn new(default: DegreeCelsius, schedule: Vec<ScheduleEntry>) -> Self {
        Self { default, schedule }
    }

    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    /// Setpoint of the first matching entry, the default if none matches
    pub fn resolve(&self, now: &DateTime, states: &impl StateAccess) -> DegreeCelsius {
        self.schedule
            .iter()
            .find(|entry| entry.matches(now, states))
            .map(|entry| entry.setpoint)
            .unwrap_or(self.default)
    }
}
