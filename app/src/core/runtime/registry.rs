use std::collections::BTreeMap;

use crate::core::EntityId;
use crate::core::time::{DateTime, Duration, Time};

use super::Handle;

#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    State(EntityId),
    Daily(Time),
    Every { first: DateTime, period: Duration },
    Once(Duration),
}

impl Schedule {
    fn is_one_shot(&self) -> bool {
        matches!(self, Schedule::Once(_))
    }
}

#[derive(Debug)]
struct Registration<T> {
    schedule: Schedule,
    trigger: T,
}

/// Active registrations of one app. Handles are never reused, so a delivery for a removed handle can always be
/// recognized as stale.
#[derive(Debug)]
pub struct Registry<T> {
    next_id: u64,
    entries: BTreeMap<Handle, Registration<T>>,
}

impl<T: Clone> Registry<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, schedule: Schedule, trigger: T) -> Handle {
        let handle = Handle(self.next_id);
        self.next_id += 1;
        self.entries.insert(handle, Registration { schedule, trigger });
        handle
    }

    pub fn remove(&mut self, handle: Handle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Trigger to deliver for the handle, `None` if it is no longer active. One-shot registrations are consumed.
    pub fn take_trigger(&mut self, handle: Handle) -> Option<T> {
        let registration = self.entries.get(&handle)?;

        if registration.schedule.is_one_shot() {
            self.entries.remove(&handle).map(|r| r.trigger)
        } else {
            Some(registration.trigger.clone())
        }
    }

    pub fn listeners_of(&self, entity: &EntityId) -> Vec<Handle> {
        self.entries
            .iter()
            .filter(|(_, r)| matches!(&r.schedule, Schedule::State(e) if e == entity))
            .map(|(handle, _)| *handle)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Schedule, &T)> {
        self.entries.iter().map(|(h, r)| (*h, &r.schedule, &r.trigger))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
