use std::collections::BTreeMap;

use serde::Deserialize;

use crate::core::time::{DailyTimeRange, Duration, Time};
use crate::core::unit::DegreeCelsius;
use crate::core::{EntityId, ParseError};
use crate::presence::PresenceError;

use super::gate::Gate;
use super::mode::{ModeError, ModeLabels};
use super::room::{ModeControls, Room};
use super::schedule::{ModeControl, ScheduleEntry};
use super::thermostat::{Thermostat, UnknownDeviceKind};
use super::weekday::{WeekdaySet, WeekdaySpec};
use super::{MAX_SETPOINT, MIN_SETPOINT};

#[derive(Debug, Clone, Deserialize)]
pub struct ClimateConfig {
    pub mode: ModeConfig,
    pub rooms: BTreeMap<String, RoomConfig>,
    pub reconcile_interval: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeConfig {
    pub entity: String,
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    #[serde(default)]
    pub init_options: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    pub thermostats: Vec<ThermostatConfig>,
    pub comfort: ModeControlConfig,
    pub energy: ModeControlConfig,
    pub frost: ModeControlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThermostatConfig {
    Entity(String),
    WithOffset {
        entity: String,
        #[serde(default)]
        offset: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeControlConfig {
    pub setpoint: f64,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEntryConfig {
    pub start: String,
    pub end: String,
    pub setpoint: f64,
    pub weekdays: Option<WeekdaySpec>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
#[display("{path}: {problem}")]
pub struct ConfigError {
    pub path: String,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum Problem {
    #[display("{_0}")]
    Parse(ParseError),
    #[display("{_0}")]
    Mode(ModeError),
    #[display("{_0}")]
    Device(UnknownDeviceKind),
    #[display("{_0}")]
    Presence(PresenceError),
    #[display("label '{label}' is used for more than one state")]
    DuplicateLabel { label: String },
    #[display("{value} is outside of {min}..={max}")]
    SetpointOutOfRange { value: f64, min: f64, max: f64 },
    #[display("at least one thermostat is required")]
    NoThermostats,
    #[display("must not be empty")]
    Empty,
}

impl ConfigError {
    pub fn new(path: impl Into<String>, problem: Problem) -> Self {
        Self {
            path: path.into(),
            problem,
        }
    }
}

/// Validated object graph of the climate section
#[derive(Debug, Clone)]
pub struct ClimateSetup {
    pub mode_entity: EntityId,
    pub labels: ModeLabels,
    pub init_options: bool,
    pub reconcile_interval: Duration,
    pub rooms: Vec<Room>,
}

impl TryFrom<&ClimateConfig> for ClimateSetup {
    type Error = ConfigError;

    fn try_from(config: &ClimateConfig) -> Result<Self, Self::Error> {
        let mode_entity = entity_id("mode.entity", &config.mode.entity)?;

        let labels = ModeLabels::new(config.mode.map.clone())
            .map_err(|e| ConfigError::new("mode.map", Problem::Mode(e)))?;

        let rooms = config
            .rooms
            .iter()
            .map(|(name, room)| room_from(&format!("rooms.{}", name), name, room))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mode_entity,
            labels,
            init_options: config.mode.init_options,
            reconcile_interval: config.reconcile_interval.unwrap_or_else(Duration::zero),
            rooms,
        })
    }
}

fn room_from(path: &str, name: &str, config: &RoomConfig) -> Result<Room, ConfigError> {
    if config.thermostats.is_empty() {
        return Err(ConfigError::new(format!("{}.thermostats", path), Problem::NoThermostats));
    }

    let thermostats = config
        .thermostats
        .iter()
        .enumerate()
        .map(|(i, t)| thermostat_from(&format!("{}.thermostats[{}]", path, i), t))
        .collect::<Result<Vec<_>, _>>()?;

    let controls = ModeControls {
        comfort: control_from(&format!("{}.comfort", path), &config.comfort)?,
        energy_saving: control_from(&format!("{}.energy", path), &config.energy)?,
        frost_protection: control_from(&format!("{}.frost", path), &config.frost)?,
    };

    Ok(Room::new(name, thermostats, controls))
}

fn thermostat_from(path: &str, config: &ThermostatConfig) -> Result<Thermostat, ConfigError> {
    let (entity, offset) = match config {
        ThermostatConfig::Entity(entity) => (entity, 0.0),
        ThermostatConfig::WithOffset { entity, offset } => (entity, *offset),
    };

    Thermostat::new(entity_id(path, entity)?, DegreeCelsius(offset))
        .map_err(|e| ConfigError::new(path, Problem::Device(e)))
}

fn control_from(path: &str, config: &ModeControlConfig) -> Result<ModeControl, ConfigError> {
    let default = setpoint(&format!("{}.setpoint", path), config.setpoint)?;

    let schedule = config
        .schedule
        .iter()
        .enumerate()
        .map(|(i, entry)| entry_from(&format!("{}.schedule[{}]", path, i), entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModeControl::new(default, schedule))
}

fn entry_from(path: &str, config: &ScheduleEntryConfig) -> Result<ScheduleEntry, ConfigError> {
    let time = |field: &str, literal: &str| {
        literal
            .parse::<Time>()
            .map_err(|e| ConfigError::new(format!("{}.{}", path, field), Problem::Parse(e)))
    };

    let window = DailyTimeRange::new(time("start", &config.start)?, time("end", &config.end)?);
    let setpoint = setpoint(&format!("{}.setpoint", path), config.setpoint)?;

    let weekdays = match &config.weekdays {
        Some(spec) => WeekdaySet::try_from(spec)
            .map_err(|e| ConfigError::new(format!("{}.weekdays", path), Problem::Parse(e)))?,
        None => WeekdaySet::all(),
    };

    let gates = config
        .constraints
        .iter()
        .enumerate()
        .map(|(i, entity)| entity_id(&format!("{}.constraints[{}]", path, i), entity).map(Gate::new))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ScheduleEntry::new(window, setpoint, weekdays, gates))
}

fn setpoint(path: &str, value: f64) -> Result<DegreeCelsius, ConfigError> {
    if !(MIN_SETPOINT.0..=MAX_SETPOINT.0).contains(&value) {
        return Err(ConfigError::new(
            path,
            Problem::SetpointOutOfRange {
                value,
                min: MIN_SETPOINT.0,
                max: MAX_SETPOINT.0,
            },
        ));
    }

    Ok(DegreeCelsius(value))
}

pub(crate) fn entity_id(path: &str, value: &str) -> Result<EntityId, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::new(path, Problem::Empty));
    }
    Ok(EntityId::new(value))
}
