use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use infrastructure::EventEmitter;

use crate::core::{EntityId, EntityState, StateChange};
use crate::port::StateAccess;

use super::client::{HaHttpClient, HaMqttClient};
use super::StateChangedEvent;

/// Last known state of every Home Assistant entity
#[derive(Debug, Clone, Default)]
pub struct HaStateStore {
    states: Arc<RwLock<HashMap<EntityId, EntityState>>>,
}

impl HaStateStore {
    pub async fn load(&self, client: &HaHttpClient) -> anyhow::Result<usize> {
        let snapshot = client.get_states().await?;
        let count = snapshot.len();

        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        for state in snapshot {
            states.insert(EntityId::new(state.entity_id.clone()), state.into());
        }

        Ok(count)
    }

    /// Stores the new state. Returns the change to publish if the state value itself changed, attribute-only
    /// updates are stored silently.
    fn apply(&self, event: StateChangedEvent) -> Option<StateChange> {
        let new: Option<EntityState> = event.new_state.map(Into::into);

        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        let previous = match &new {
            Some(state) => states.insert(event.entity_id.clone(), state.clone()),
            None => states.remove(&event.entity_id),
        };
        drop(states);

        let old = previous.or_else(|| event.old_state.map(Into::into));

        let changed = old.as_ref().map(|s| &s.state) != new.as_ref().map(|s| &s.state);
        changed.then_some(StateChange {
            entity: event.entity_id,
            old,
            new,
        })
    }
}

impl StateAccess for HaStateStore {
    fn state(&self, entity: &EntityId) -> Option<EntityState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
    }
}

/// Feeds state changes from the event stream into the store and on to the apps
pub struct HaStatePump {
    events: HaMqttClient,
    store: HaStateStore,
    emitter: EventEmitter<StateChange>,
}

impl HaStatePump {
    pub fn new(events: HaMqttClient, store: HaStateStore, emitter: EventEmitter<StateChange>) -> Self {
        Self { events, store, emitter }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if let Some(change) = self.store.apply(event) {
                tracing::debug!(
                    "{} changed from {:?} to {:?}",
                    change.entity,
                    change.old.as_ref().map(|s| &s.state),
                    change.new.as_ref().map(|s| &s.state)
                );
                self.emitter.send(change);
            }
        }

        tracing::error!("HA event stream ended");
    }
}
