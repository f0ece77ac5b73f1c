use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `climate` for `climate.living_room`
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map(|(domain, _)| domain).unwrap_or_default()
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.state.as_str(), "unavailable" | "unknown")
    }

    pub fn state_f64(&self) -> Option<f64> {
        self.state.trim().parse().ok()
    }

    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub entity: EntityId,
    pub old: Option<EntityState>,
    pub new: Option<EntityState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, derive_more::Display)]
#[display("{domain}/{service}")]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

impl ServiceCall {
    pub fn new(domain: impl Into<String>, service: impl Into<String>, data: Value) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data,
        }
    }

    pub fn target(&self) -> Option<EntityId> {
        self.data.get("entity_id").and_then(Value::as_str).map(EntityId::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_is_prefix_before_dot() {
        assert_eq!(EntityId::from("climate.living_room").domain(), "climate");
        assert_eq!(EntityId::from("nodot").domain(), "");
    }

    #[test]
    fn numeric_state_and_attributes() {
        let state = EntityState::new("21.5").with_attribute("temperature", 19).with_attribute("text", "20.5");

        assert_eq!(state.state_f64(), Some(21.5));
        assert_eq!(state.attribute_f64("temperature"), Some(19.0));
        assert_eq!(state.attribute_f64("text"), Some(20.5));
        assert_eq!(state.attribute_f64("missing"), None);
        assert_eq!(EntityState::new("heat").state_f64(), None);
    }

    #[test]
    fn unavailable_and_unknown_are_not_available() {
        assert!(!EntityState::new("unavailable").is_available());
        assert!(!EntityState::new("unknown").is_available());
        assert!(EntityState::new("off").is_available());
    }

    #[test]
    fn service_call_target_and_name() {
        let call = ServiceCall::new("input_number", "set_value", json!({"entity_id": "input_number.x", "value": 20}));

        assert_eq!(call.to_string(), "input_number/set_value");
        assert_eq!(call.target(), Some(EntityId::from("input_number.x")));
    }
}
