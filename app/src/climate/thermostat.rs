use serde_json::json;

use crate::core::unit::DegreeCelsius;
use crate::core::{EntityId, ServiceCall};
use crate::port::{ServiceCaller, StateAccess};

use super::{MAX_SETPOINT, MIN_SETPOINT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceKind {
    /// helper entity holding the target as its state
    InputNumber,
    /// thermostat entity reporting the target in its `temperature` attribute
    Climate,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("'{entity}' is neither an input_number nor a climate entity")]
pub struct UnknownDeviceKind {
    pub entity: String,
}

#[derive(Debug, Clone)]
pub struct Thermostat {
    entity: EntityId,
    offset: DegreeCelsius,
    kind: DeviceKind,
}

impl Thermostat {
    pub fn new(entity: EntityId, offset: DegreeCelsius) -> Result<Self, UnknownDeviceKind> {
        let kind = match entity.domain() {
            "input_number" => DeviceKind::InputNumber,
            "climate" => DeviceKind::Climate,
            _ => {
                return Err(UnknownDeviceKind {
                    entity: entity.to_string(),
                });
            }
        };

        Ok(Self { entity, offset, kind })
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn effective_setpoint(&self, setpoint: DegreeCelsius) -> DegreeCelsius {
        (setpoint + self.offset).rounded().clamp(MIN_SETPOINT, MAX_SETPOINT)
    }

    fn current(&self, states: &impl StateAccess) -> Option<DegreeCelsius> {
        let state = states.state(&self.entity).filter(|s| s.is_available())?;

        let value = match self.kind {
            DeviceKind::InputNumber => state.state_f64(),
            DeviceKind::Climate => state.attribute_f64("temperature"),
        };

        value.map(DegreeCelsius)
    }

    fn set_command(&self, value: DegreeCelsius) -> ServiceCall {
        match self.kind {
            DeviceKind::InputNumber => ServiceCall::new(
                "input_number",
                "set_value",
                json!({ "entity_id": self.entity, "value": value.0 }),
            ),
            DeviceKind::Climate => ServiceCall::new(
                "climate",
                "set_temperature",
                json!({ "entity_id": self.entity, "temperature": value.0 }),
            ),
        }
    }

    /// Sends the effective setpoint unless the device already reports it. Returns the value sent, if any.
    pub fn command(
        &self,
        setpoint: DegreeCelsius,
        rt: &(impl StateAccess + ServiceCaller),
    ) -> anyhow::Result<Option<DegreeCelsius>> {
        let effective = self.effective_setpoint(setpoint);

        if let Some(current) = self.current(rt) {
            if current.is_close_to(&effective) {
                tracing::debug!("{} already at {}, skipping", self.entity, current);
                return Ok(None);
            }
        }

        rt.call_service(self.set_command(effective))?;
        Ok(Some(effective))
    }
}
