use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::core::time::{DateTime, Duration, Time};
use crate::core::{EntityId, EntityState, ServiceCall, StateChange};
use crate::port::{Scheduler, ServiceCaller, StateAccess};

use super::{App, Fired, Handle, Registry, Schedule};

/// In-memory host for app tests. Device commands are echoed into the state like the real host would do shortly
/// after receiving them, nothing is ever delivered unless a test fires it.
pub struct FakeRuntime<T> {
    states: RefCell<HashMap<EntityId, EntityState>>,
    calls: RefCell<Vec<ServiceCall>>,
    failing: HashSet<EntityId>,
    registry: Registry<T>,
}

impl<T: Clone> FakeRuntime<T> {
    pub fn new() -> Self {
        Self {
            states: RefCell::new(HashMap::new()),
            calls: RefCell::new(vec![]),
            failing: HashSet::new(),
            registry: Registry::new(),
        }
    }

    pub fn with_state(self, entity: &str, state: EntityState) -> Self {
        self.set_state(entity, state);
        self
    }

    pub fn set_state(&self, entity: &str, state: EntityState) {
        self.states.borrow_mut().insert(EntityId::from(entity), state);
    }

    pub fn fail_calls_for(&mut self, entity: &str) {
        self.failing.insert(EntityId::from(entity));
    }

    pub fn take_calls(&self) -> Vec<ServiceCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn daily_timers(&self) -> Vec<Time> {
        let mut times: Vec<Time> = self
            .registry
            .iter()
            .filter_map(|(_, schedule, _)| match schedule {
                Schedule::Daily(at) => Some(*at),
                _ => None,
            })
            .collect();
        times.sort();
        times
    }

    pub fn listened_entities(&self) -> Vec<EntityId> {
        self.registry
            .iter()
            .filter_map(|(_, schedule, _)| match schedule {
                Schedule::State(entity) => Some(entity.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn registrations(&self) -> Vec<(Handle, Schedule, T)> {
        self.registry
            .iter()
            .map(|(h, s, t)| (h, s.clone(), t.clone()))
            .collect()
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.registry.is_active(handle)
    }

    /// Delivers the handle like a due timer. Inactive handles are dropped like the live runtime does.
    pub fn fire<A: App<Trigger = T>>(&mut self, app: &mut A, handle: Handle) -> anyhow::Result<bool> {
        self.deliver(app, handle, None)
    }

    /// Delivers all daily timers registered for the given time, in registration order
    pub fn fire_daily<A: App<Trigger = T>>(&mut self, app: &mut A, at: Time) -> anyhow::Result<usize> {
        let due: Vec<Handle> = self
            .registry
            .iter()
            .filter(|(_, schedule, _)| matches!(schedule, Schedule::Daily(t) if *t == at))
            .map(|(h, _, _)| h)
            .collect();

        let mut delivered = 0;
        for handle in due {
            if self.deliver(app, handle, None)? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    pub fn fire_once<A: App<Trigger = T>>(&mut self, app: &mut A) -> anyhow::Result<usize> {
        let due: Vec<Handle> = self
            .registry
            .iter()
            .filter(|(_, schedule, _)| matches!(schedule, Schedule::Once(_)))
            .map(|(h, _, _)| h)
            .collect();

        let mut delivered = 0;
        for handle in due {
            if self.deliver(app, handle, None)? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Updates the state and notifies all listeners of the entity
    pub fn change_state<A: App<Trigger = T>>(
        &mut self,
        app: &mut A,
        entity: &str,
        new: EntityState,
    ) -> anyhow::Result<()> {
        let entity = EntityId::from(entity);
        let old = self.states.borrow_mut().insert(entity.clone(), new.clone());
        let change = StateChange {
            entity: entity.clone(),
            old,
            new: Some(new),
        };

        for handle in self.registry.listeners_of(&entity) {
            if self.registry.is_active(handle) {
                self.deliver(app, handle, Some(change.clone()))?;
            }
        }

        Ok(())
    }

    fn deliver<A: App<Trigger = T>>(
        &mut self,
        app: &mut A,
        handle: Handle,
        change: Option<StateChange>,
    ) -> anyhow::Result<bool> {
        let Some(trigger) = self.registry.take_trigger(handle) else {
            return Ok(false);
        };

        app.on_trigger(Fired { handle, trigger, change }, self)?;
        Ok(true)
    }

    fn echo(&self, call: &ServiceCall) {
        let Some(entity) = call.target() else {
            return;
        };

        let mut states = self.states.borrow_mut();
        let current = states.entry(entity).or_insert_with(|| EntityState::new("unknown"));

        match (call.domain.as_str(), call.service.as_str()) {
            ("input_number", "set_value") => {
                if let Some(value) = call.data.get("value").and_then(Value::as_f64) {
                    current.state = value.to_string();
                }
            }
            ("climate", "set_temperature") => {
                if let Some(value) = call.data.get("temperature") {
                    current.attributes.insert("temperature".to_owned(), value.clone());
                }
            }
            ("input_select", "select_option") => {
                if let Some(option) = call.data.get("option").and_then(Value::as_str) {
                    current.state = option.to_owned();
                }
            }
            ("input_select", "set_options") => {
                if let Some(options) = call.data.get("options") {
                    current.attributes.insert("options".to_owned(), options.clone());
                }
            }
            _ => {}
        }
    }
}

impl<T> StateAccess for FakeRuntime<T> {
    fn state(&self, entity: &EntityId) -> Option<EntityState> {
        self.states.borrow().get(entity).cloned()
    }
}

impl<T: Clone> ServiceCaller for FakeRuntime<T> {
    fn call_service(&self, call: ServiceCall) -> anyhow::Result<()> {
        if let Some(entity) = call.target() {
            if self.failing.contains(&entity) {
                anyhow::bail!("{} rejected by {}", call, entity);
            }
        }

        self.echo(&call);
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl<T: Clone> Scheduler<T> for FakeRuntime<T> {
    fn listen_state(&mut self, entity: &EntityId, trigger: T) -> Handle {
        self.registry.add(Schedule::State(entity.clone()), trigger)
    }

    fn run_daily(&mut self, at: Time, trigger: T) -> Handle {
        self.registry.add(Schedule::Daily(at), trigger)
    }

    fn run_every(&mut self, first: DateTime, period: Duration, trigger: T) -> Handle {
        self.registry.add(Schedule::Every { first, period }, trigger)
    }

    fn run_in(&mut self, delay: Duration, trigger: T) -> Handle {
        self.registry.add(Schedule::Once(delay), trigger)
    }

    fn cancel(&mut self, handle: Handle) {
        self.registry.remove(handle);
    }
}
