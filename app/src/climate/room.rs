use crate::core::time::DateTime;
use crate::core::unit::DegreeCelsius;
use crate::port::{ServiceCaller, StateAccess};

use super::mode::Mode;
use super::schedule::ModeControl;
use super::thermostat::Thermostat;

#[derive(Debug, Clone)]
pub struct ModeControls {
    pub comfort: ModeControl,
    pub energy_saving: ModeControl,
    pub frost_protection: ModeControl,
}

impl ModeControls {
    pub fn get(&self, mode: Mode) -> Option<&ModeControl> {
        match mode {
            Mode::Comfort => Some(&self.comfort),
            Mode::EnergySaving => Some(&self.energy_saving),
            Mode::FrostProtection => Some(&self.frost_protection),
            Mode::Off => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    name: String,
    thermostats: Vec<Thermostat>,
    controls: ModeControls,
}

impl Room {
    pub fn new(name: impl Into<String>, thermostats: Vec<Thermostat>, controls: ModeControls) -> Self {
        Self {
            name: name.into(),
            thermostats,
            controls,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control(&self, mode: Mode) -> Option<&ModeControl> {
        self.controls.get(mode)
    }

    /// `None` in Off mode, the room is left alone then
    pub fn evaluate(&self, mode: Mode, now: &DateTime, states: &impl StateAccess) -> Option<DegreeCelsius> {
        self.control(mode).map(|control| control.resolve(now, states))
    }

    /// Pushes the evaluated setpoint to all thermostats. A failing thermostat does not stop the others, the next
    /// trigger tries again.
    pub fn apply(&self, mode: Mode, now: &DateTime, rt: &(impl StateAccess + ServiceCaller)) -> Option<DegreeCelsius> {
        let setpoint = self.evaluate(mode, now, rt)?;

        tracing::info!("Room '{}' in mode {}: setpoint {}", self.name, mode, setpoint);

        for thermostat in &self.thermostats {
            match thermostat.command(setpoint, rt) {
                Ok(Some(sent)) => tracing::info!("Set {} to {}", thermostat.entity(), sent),
                Ok(None) => {}
                Err(e) => tracing::warn!("Error setting {} to {}: {:?}", thermostat.entity(), setpoint, e),
            }
        }

        Some(setpoint)
    }
}
