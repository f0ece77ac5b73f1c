mod config;
mod gate;
mod mode;
mod room;
mod schedule;
mod thermostat;
mod weekday;

use serde_json::json;

use crate::core::runtime::{App, Fired, Handle};
use crate::core::time::Duration;
use crate::core::unit::DegreeCelsius;
use crate::core::{EntityId, ServiceCall};
use crate::port::Runtime;
use crate::t;

pub(crate) use config::entity_id;
pub use config::{ClimateConfig, ClimateSetup, ConfigError, Problem};
pub use mode::{Mode, ModeError, ModeLabels};
pub use room::Room;

pub const MIN_SETPOINT: DegreeCelsius = DegreeCelsius(8.0);
pub const MAX_SETPOINT: DegreeCelsius = DegreeCelsius(28.0);

#[derive(Debug, Clone, PartialEq)]
pub enum ClimateTrigger {
    ModeChanged,
    /// start or end of a schedule entry of the room at the given index
    Boundary { room: usize },
    GateChanged { room: usize },
    Reconcile,
}

pub struct ClimateController {
    mode_entity: EntityId,
    labels: ModeLabels,
    init_options: bool,
    reconcile_interval: Duration,
    rooms: Vec<Room>,
    mode: Option<Mode>,
    schedule_handles: Vec<Handle>,
}

impl ClimateController {
    pub fn new(setup: ClimateSetup) -> Self {
        Self {
            mode_entity: setup.mode_entity,
            labels: setup.labels,
            init_options: setup.init_options,
            reconcile_interval: setup.reconcile_interval,
            rooms: setup.rooms,
            mode: None,
            schedule_handles: vec![],
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    fn enter_mode(&mut self, mode: Mode, rt: &mut impl Runtime<ClimateTrigger>) {
        //all registrations of the previous mode are gone before anything new is registered
        let stale = std::mem::take(&mut self.schedule_handles);
        tracing::debug!("Removing {} schedule registrations", stale.len());
        for handle in stale {
            rt.cancel(handle);
        }

        self.mode = Some(mode);
        self.apply_all(mode, rt);

        for (idx, room) in self.rooms.iter().enumerate() {
            let Some(control) = room.control(mode) else {
                continue;
            };

            for entry in control.schedule() {
                for at in [entry.window().start(), entry.window().end()] {
                    tracing::debug!("Scheduling room '{}' for {} daily at {}", room.name(), mode, at);
                    self.schedule_handles
                        .push(rt.run_daily(at, ClimateTrigger::Boundary { room: idx }));
                }

                for gate in entry.gates() {
                    tracing::debug!("Watching {} for room '{}'", gate.entity(), room.name());
                    self.schedule_handles
                        .push(gate.listen(rt, ClimateTrigger::GateChanged { room: idx }));
                }
            }
        }

        tracing::info!(
            "Climate mode {} active with {} schedule registrations",
            mode,
            self.schedule_handles.len()
        );
    }

    fn apply_all(&self, mode: Mode, rt: &mut impl Runtime<ClimateTrigger>) {
        let now = t!(now);
        for room in &self.rooms {
            room.apply(mode, &now, &*rt);
        }
    }

    fn apply_room(&self, idx: usize, rt: &mut impl Runtime<ClimateTrigger>) -> anyhow::Result<()> {
        let mode = self.current_mode()?;
        let room = self
            .rooms
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("No room with index {}", idx))?;

        room.apply(mode, &t!(now), &*rt);
        Ok(())
    }

    fn current_mode(&self) -> anyhow::Result<Mode> {
        self.mode
            .ok_or_else(|| anyhow::anyhow!("Climate controller is not initialized"))
    }

    fn read_mode_label(&self, rt: &impl Runtime<ClimateTrigger>) -> anyhow::Result<String> {
        rt.state(&self.mode_entity)
            .map(|s| s.state)
            .ok_or_else(|| anyhow::anyhow!("Mode entity {} has no state", self.mode_entity))
    }

    fn observed_mode(&self, rt: &impl Runtime<ClimateTrigger>) -> Option<(String, Mode)> {
        let label = rt.state(&self.mode_entity)?.state;
        match self.labels.resolve(&label) {
            Ok(mode) => Some((label, mode)),
            Err(e) => {
                tracing::debug!("Ignoring mode entity during reconciliation: {}", e);
                None
            }
        }
    }

    /// Publishes the valid labels to the mode selector and restores the previous selection, Off if it is no
    /// longer valid. Returns the selected label.
    fn publish_mode_options(&self, rt: &impl Runtime<ClimateTrigger>) -> anyhow::Result<String> {
        let previous = rt.state(&self.mode_entity).map(|s| s.state);
        let options = self.labels.options();

        rt.call_service(ServiceCall::new(
            "input_select",
            "set_options",
            json!({ "entity_id": self.mode_entity, "options": options }),
        ))?;

        let selected = match previous {
            Some(previous) if options.contains(&previous) => previous,
            previous => {
                let fallback = self.labels.label_of(Mode::Off);
                tracing::warn!(
                    "Previous climate mode {:?} is not a valid option anymore, selecting '{}'",
                    previous,
                    fallback
                );
                fallback
            }
        };

        rt.call_service(ServiceCall::new(
            "input_select",
            "select_option",
            json!({ "entity_id": self.mode_entity, "option": selected }),
        ))?;

        Ok(selected)
    }

    fn on_mode_changed(&mut self, label: String, rt: &mut impl Runtime<ClimateTrigger>) -> anyhow::Result<()> {
        let mode = self.labels.resolve(&label)?;

        if self.mode == Some(mode) {
            tracing::info!("Mode entity changed to '{}', still in mode {}", label, mode);
            self.apply_all(mode, rt);
        } else {
            tracing::info!("Climate mode changed from {:?} to {} ('{}')", self.mode, mode, label);
            self.enter_mode(mode, rt);
        }

        Ok(())
    }
}

impl App for ClimateController {
    type Trigger = ClimateTrigger;

    fn name(&self) -> String {
        "climate".to_owned()
    }

    fn initialize(&mut self, rt: &mut impl Runtime<ClimateTrigger>) -> anyhow::Result<()> {
        let label = if self.init_options {
            self.publish_mode_options(&*rt)?
        } else {
            self.read_mode_label(&*rt)?
        };

        let mode = self.labels.resolve(&label)?;
        tracing::info!("Initial climate mode is {} ('{}')", mode, label);

        rt.listen_state(&self.mode_entity, ClimateTrigger::ModeChanged);
        self.enter_mode(mode, rt);

        if !self.reconcile_interval.is_zero() {
            let first = t!(now) + self.reconcile_interval;
            rt.run_every(first, self.reconcile_interval, ClimateTrigger::Reconcile);
            tracing::info!("Reconciling all rooms every {}", self.reconcile_interval);
        }

        Ok(())
    }

    fn on_trigger(&mut self, fired: Fired<ClimateTrigger>, rt: &mut impl Runtime<ClimateTrigger>) -> anyhow::Result<()> {
        match fired.trigger {
            ClimateTrigger::ModeChanged => {
                let label = match fired.change.and_then(|c| c.new) {
                    Some(state) => state.state,
                    None => self.read_mode_label(&*rt)?,
                };
                self.on_mode_changed(label, rt)
            }
            ClimateTrigger::Boundary { room } => {
                tracing::debug!("Schedule boundary for room {}", room);
                self.apply_room(room, rt)
            }
            ClimateTrigger::GateChanged { room } => {
                let entity = fired.change.map(|c| c.entity.to_string()).unwrap_or_default();
                tracing::debug!("Gate {} changed for room {}", entity, room);
                self.apply_room(room, rt)
            }
            ClimateTrigger::Reconcile => {
                let mode = self.current_mode()?;

                //a mode change can be missed while the event stream is down
                match self.observed_mode(&*rt) {
                    Some((label, observed)) if observed != mode => {
                        tracing::warn!("Mode entity shows '{}' but controller is in mode {}", label, mode);
                        self.on_mode_changed(label, rt)
                    }
                    _ => {
                        tracing::debug!("Reconciling all rooms in mode {}", mode);
                        self.apply_all(mode, rt);
                        Ok(())
                    }
                }
            }
        }
    }
}
