use crate::core::EntityId;
use crate::core::runtime::Handle;
use crate::port::{Scheduler, StateAccess};

const TRUTHY: [&str; 3] = ["on", "true", "home"];

/// Boolean precondition read from an entity. Missing or unavailable states read as closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    entity: EntityId,
}

impl Gate {
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn current(&self, states: &impl StateAccess) -> bool {
        states.state(&self.entity).is_some_and(|s| is_truthy(&s.state))
    }

    pub fn listen<T>(&self, scheduler: &mut impl Scheduler<T>, trigger: T) -> Handle {
        scheduler.listen_state(&self.entity, trigger)
    }
}

pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(value))
}
