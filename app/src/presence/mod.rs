mod config;
mod state;

use serde_json::json;

use crate::core::runtime::{App, Fired, Handle};
use crate::core::{EntityId, ServiceCall};
use crate::port::Runtime;

pub use config::{PresenceConfig, PresenceLabels, PresenceSetup};
pub use state::{PresenceDelays, PresenceError, PresenceState, TrackerState};

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceTrigger {
    TrackerChanged,
    FollowUp(PresenceState),
}

/// Derives a person's presence state from a device tracker and mirrors it into a selector entity
pub struct PresenceTracker {
    tracker: EntityId,
    state_entity: EntityId,
    labels: PresenceLabels,
    delays: PresenceDelays,
    init_options: bool,
    current: Option<PresenceState>,
    follow_up: Option<Handle>,
}

impl PresenceTracker {
    pub fn new(setup: PresenceSetup) -> Self {
        Self {
            tracker: setup.tracker,
            state_entity: setup.state_entity,
            labels: setup.labels,
            delays: setup.delays,
            init_options: setup.init_options,
            current: None,
            follow_up: None,
        }
    }

    pub fn current(&self) -> Option<PresenceState> {
        self.current
    }

    fn tracker_state(&self, rt: &impl Runtime<PresenceTrigger>) -> anyhow::Result<TrackerState> {
        let state = rt
            .state(&self.tracker)
            .ok_or_else(|| anyhow::anyhow!("Tracker {} has no state", self.tracker))?;
        Ok(state.state.parse()?)
    }

    fn publish_options(&self, rt: &impl Runtime<PresenceTrigger>) -> anyhow::Result<PresenceState> {
        let previous = rt.state(&self.state_entity).map(|s| s.state);
        let options = self.labels.options();

        tracing::info!("Setting options of {} to {:?}", self.state_entity, options);
        rt.call_service(ServiceCall::new(
            "input_select",
            "set_options",
            json!({ "entity_id": self.state_entity, "options": options }),
        ))?;

        match previous.as_deref().and_then(|label| self.labels.state_of(label)) {
            Some(state) => Ok(state),
            None => {
                tracing::warn!("Previous state {:?} of {} is not valid anymore", previous, self.state_entity);
                Ok(PresenceState::Home)
            }
        }
    }

    fn set_state(&mut self, state: PresenceState, rt: &mut impl Runtime<PresenceTrigger>) -> anyhow::Result<()> {
        tracing::info!("Presence of {} is {}", self.tracker, state);

        if let Some(handle) = self.follow_up.take() {
            rt.cancel(handle);
        }

        rt.call_service(ServiceCall::new(
            "input_select",
            "select_option",
            json!({ "entity_id": self.state_entity, "option": self.labels.label(state) }),
        ))?;
        self.current = Some(state);

        if let Some((delay, next)) = state.follow_up(&self.delays) {
            tracing::debug!("{} becomes {} in {}", self.tracker, next, delay);
            self.follow_up = Some(rt.run_in(delay, PresenceTrigger::FollowUp(next)));
        }

        Ok(())
    }
}

impl App for PresenceTracker {
    type Trigger = PresenceTrigger;

    fn name(&self) -> String {
        format!("presence {}", self.tracker)
    }

    fn initialize(&mut self, rt: &mut impl Runtime<PresenceTrigger>) -> anyhow::Result<()> {
        let restored = if self.init_options {
            Some(self.publish_options(&*rt)?)
        } else {
            None
        };

        let selected = restored.or_else(|| {
            rt.state(&self.state_entity)
                .and_then(|s| self.labels.state_of(&s.state))
        });
        let selected = selected.unwrap_or_else(|| {
            tracing::warn!("State of {} is not a valid option, assuming {}", self.state_entity, PresenceState::Home);
            PresenceState::Home
        });

        let tracker = self.tracker_state(&*rt)?;
        let state = selected.reconciled_with(tracker);
        if state != selected {
            tracing::info!("{} does not fit tracker state {}, resetting to {}", selected, tracker, state);
        }

        self.set_state(state, rt)?;
        rt.listen_state(&self.tracker, PresenceTrigger::TrackerChanged);

        Ok(())
    }

    fn on_trigger(
        &mut self,
        fired: Fired<PresenceTrigger>,
        rt: &mut impl Runtime<PresenceTrigger>,
    ) -> anyhow::Result<()> {
        match fired.trigger {
            PresenceTrigger::TrackerChanged => {
                let Some(change) = fired.change else {
                    return Ok(());
                };
                let (Some(old), Some(new)) = (change.old, change.new) else {
                    tracing::debug!("Ignoring appearance or removal of {}", change.entity);
                    return Ok(());
                };

                let old: TrackerState = old.state.parse()?;
                let new: TrackerState = new.state.parse()?;
                tracing::debug!("Tracker {} changed from {} to {}", self.tracker, old, new);

                let current = self.current.unwrap_or(PresenceState::Home);
                match current.on_tracker_change(old, new) {
                    Some(next) => self.set_state(next, rt),
                    None => Ok(()),
                }
            }
            PresenceTrigger::FollowUp(next) => {
                //the one-shot timer is consumed by now
                self.follow_up = None;
                self.set_state(next, rt)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;

    use super::*;
    use crate::core::EntityState;
    use crate::core::runtime::{FakeRuntime, Schedule};
    use crate::core::time::Duration;

    const TRACKER: &str = "person.anna";
    const STATE: &str = "input_select.anna_presence";

    fn tracker(init_options: bool) -> PresenceTracker {
        let config: PresenceConfig = serde_json::from_value(json!({
            "tracker": TRACKER,
            "state": STATE,
            "map": { "away": "Away", "home": "Home" },
            "init_options": init_options
        }))
        .unwrap();

        PresenceTracker::new(PresenceSetup::from_config("presence[0]", &config).unwrap())
    }

    fn runtime(tracker: &str, state: &str) -> FakeRuntime<PresenceTrigger> {
        FakeRuntime::new()
            .with_state(TRACKER, EntityState::new(tracker))
            .with_state(STATE, EntityState::new(state))
    }

    fn selected(rt: &FakeRuntime<PresenceTrigger>) -> Vec<String> {
        rt.take_calls()
            .into_iter()
            .filter(|c| c.service == "select_option")
            .filter_map(|c| c.data["option"].as_str().map(str::to_owned))
            .collect()
    }

    fn pending_follow_ups(rt: &FakeRuntime<PresenceTrigger>) -> Vec<(Duration, PresenceTrigger)> {
        rt.registrations()
            .into_iter()
            .filter_map(|(_, schedule, trigger)| match schedule {
                Schedule::Once(delay) => Some((delay, trigger)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn keeps_valid_state_on_startup() {
        let mut app = tracker(false);
        let mut rt = runtime("home", "just_arrived");

        app.initialize(&mut rt).unwrap();

        assert_eq!(app.current(), Some(PresenceState::JustArrived));
        assert_eq!(selected(&rt), vec!["just_arrived"]);
        assert_eq!(
            pending_follow_ups(&rt),
            vec![(Duration::minutes(5), PresenceTrigger::FollowUp(PresenceState::Home))]
        );
    }

    #[test]
    fn resets_state_that_contradicts_tracker() {
        let mut app = tracker(false);
        let mut rt = runtime("not_home", "Home");

        app.initialize(&mut rt).unwrap();

        assert_eq!(app.current(), Some(PresenceState::Away));
        assert_eq!(selected(&rt), vec!["Away"]);
    }

    #[test]
    fn invalid_selection_falls_back_to_home() {
        let mut app = tracker(false);
        let mut rt = runtime("home", "sleeping");

        app.initialize(&mut rt).unwrap();

        assert_eq!(app.current(), Some(PresenceState::Home));
        assert!(pending_follow_ups(&rt).is_empty());
    }

    #[test]
    fn unknown_tracker_state_refuses_to_start() {
        let mut app = tracker(false);
        let mut rt = runtime("work", "Home");

        assert!(app.initialize(&mut rt).is_err());
    }

    #[test]
    fn publishes_options_before_restoring() {
        let mut app = tracker(true);
        let mut rt = runtime("home", "Home");

        app.initialize(&mut rt).unwrap();

        let calls = rt.take_calls();
        assert_eq!(calls[0].to_string(), "input_select/set_options");
        assert_json_eq!(
            calls[0].data,
            json!({ "entity_id": STATE, "options": ["Home", "just_arrived", "Away", "just_left", "extended_away"] })
        );
        assert_json_eq!(calls[1].data, json!({ "entity_id": STATE, "option": "Home" }));
    }

    #[test]
    fn leaving_and_coming_back() {
        let mut app = tracker(false);
        let mut rt = runtime("home", "Home");
        app.initialize(&mut rt).unwrap();
        rt.take_calls();

        rt.change_state(&mut app, TRACKER, EntityState::new("not_home")).unwrap();
        assert_eq!(app.current(), Some(PresenceState::JustLeft));
        assert_eq!(
            pending_follow_ups(&rt),
            vec![(Duration::minutes(5), PresenceTrigger::FollowUp(PresenceState::Away))]
        );

        rt.fire_once(&mut app).unwrap();
        assert_eq!(app.current(), Some(PresenceState::Away));
        assert_eq!(
            pending_follow_ups(&rt),
            vec![(Duration::hours(24), PresenceTrigger::FollowUp(PresenceState::ExtendedAway))]
        );

        rt.change_state(&mut app, TRACKER, EntityState::new("home")).unwrap();
        assert_eq!(app.current(), Some(PresenceState::JustArrived));

        rt.fire_once(&mut app).unwrap();
        assert_eq!(app.current(), Some(PresenceState::Home));
        assert!(pending_follow_ups(&rt).is_empty());
        assert_eq!(selected(&rt), vec!["just_left", "Away", "just_arrived", "Home"]);
    }

    #[test]
    fn short_tracking_loss_goes_straight_home() {
        let mut app = tracker(false);
        let mut rt = runtime("home", "Home");
        app.initialize(&mut rt).unwrap();

        rt.change_state(&mut app, TRACKER, EntityState::new("not_home")).unwrap();
        rt.change_state(&mut app, TRACKER, EntityState::new("home")).unwrap();

        assert_eq!(app.current(), Some(PresenceState::Home));
        assert!(pending_follow_ups(&rt).is_empty());
    }

    #[test]
    fn unknown_tracker_label_is_an_error() {
        let mut app = tracker(false);
        let mut rt = runtime("home", "Home");
        app.initialize(&mut rt).unwrap();

        let result = rt.change_state(&mut app, TRACKER, EntityState::new("office"));

        assert!(result.is_err());
        assert_eq!(app.current(), Some(PresenceState::Home));
    }
}
