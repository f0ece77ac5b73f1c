mod client;
mod incoming;
mod outgoing;

use std::collections::HashMap;

use anyhow::Context;
use infrastructure::{EventBus, Mqtt};
use serde::Deserialize;
use serde_json::Value;

use crate::core::{EntityId, EntityState, StateChange};
use client::{HaHttpClient, HaMqttClient};

pub use incoming::{HaStatePump, HaStateStore};
pub use outgoing::{HaCommandSender, HaServiceClient};

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistant {
    pub topic_event: String,
    pub url: String,
    pub token: String,
}

/// Everything the apps need from Home Assistant, plus the two loops that keep it running
pub struct HaConnection {
    pub states: HaStateStore,
    pub services: HaServiceClient,
    pub state_changes: EventBus<StateChange>,
    pub pump: HaStatePump,
    pub sender: HaCommandSender,
}

impl HomeAssistant {
    /// Subscribes to the event stream and loads the snapshot. The subscription only delivers once the MQTT loop
    /// runs, so changes made while the snapshot loads can be missed until the next reconciliation.
    pub async fn connect(&self, mqtt: &mut Mqtt) -> anyhow::Result<HaConnection> {
        let http_client = HaHttpClient::new(&self.url, &self.token).context("Error creating HA HTTP client")?;

        let subscription = mqtt
            .subscribe(self.topic_event.clone())
            .await
            .context("Error subscribing to HA event stream")?;

        let states = HaStateStore::default();
        let count = states.load(&http_client).await?;
        tracing::info!("Loaded {} entity states from Home Assistant", count);

        let state_changes = EventBus::new(256);
        let pump = HaStatePump::new(HaMqttClient::new(subscription), states.clone(), state_changes.emitter());
        let (services, sender) = outgoing::channel(http_client);

        Ok(HaConnection {
            states,
            services,
            state_changes,
            pump,
            sender,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
struct HaState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: HashMap<String, Value>,
}

impl From<HaState> for EntityState {
    fn from(value: HaState) -> Self {
        EntityState {
            state: value.state,
            attributes: value.attributes,
        }
    }
}

#[derive(Deserialize, Debug)]
struct HaEvent {
    event_type: String,
    #[serde(default)]
    event_data: Value,
}

#[derive(Deserialize, Debug, Clone)]
struct StateChangedEvent {
    entity_id: EntityId,
    old_state: Option<HaState>,
    new_state: Option<HaState>,
}

impl StateChangedEvent {
    /// `None` for events of other types
    fn parse(payload: &str) -> anyhow::Result<Option<Self>> {
        let event: HaEvent = serde_json::from_str(payload).context("Error parsing HA event")?;

        if event.event_type != "state_changed" {
            return Ok(None);
        }

        let event = serde_json::from_value(event.event_data).context("Error parsing HA state_changed event")?;
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_state_changed_event() {
        let payload = r#"{
            "event_type": "state_changed",
            "event_data": {
                "entity_id": "climate.living",
                "old_state": { "entity_id": "climate.living", "state": "heat", "attributes": { "temperature": 19 } },
                "new_state": {
                    "entity_id": "climate.living",
                    "state": "heat",
                    "attributes": { "temperature": 21.5, "friendly_name": "Living" },
                    "last_changed": "2024-11-04T07:00:00.123+00:00"
                }
            }
        }"#;

        let event = StateChangedEvent::parse(payload).unwrap().unwrap();

        assert_eq!(event.entity_id, EntityId::from("climate.living"));
        let new: EntityState = event.new_state.unwrap().into();
        assert_eq!(new.attribute_f64("temperature"), Some(21.5));
        assert!(event.old_state.is_some());
    }

    #[test]
    fn removed_entity_has_no_new_state() {
        let payload = r#"{"event_type":"state_changed","event_data":{"entity_id":"input_boolean.x","old_state":{"entity_id":"input_boolean.x","state":"on"},"new_state":null}}"#;

        let event = StateChangedEvent::parse(payload).unwrap().unwrap();

        assert!(event.new_state.is_none());
    }

    #[test]
    fn ignores_other_event_types() {
        let payload = r#"{"event_type":"call_service","event_data":{"domain":"light"}}"#;

        assert!(StateChangedEvent::parse(payload).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(StateChangedEvent::parse("not json").is_err());
        assert!(StateChangedEvent::parse(r#"{"event_type":"state_changed","event_data":{}}"#).is_err());
    }
}
