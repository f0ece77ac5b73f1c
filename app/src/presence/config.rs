use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::climate::{ConfigError, Problem, entity_id};
use crate::core::EntityId;
use crate::core::time::Duration;

use super::state::{PresenceDelays, PresenceState};

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    pub tracker: String,
    pub state: String,
    /// state -> option label of the state entity
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    pub just_left_delay: Option<Duration>,
    pub just_arrived_delay: Option<Duration>,
    pub extended_away_delay: Option<Duration>,
    #[serde(default)]
    pub init_options: bool,
}

/// Option labels of the state entity, one per presence state
#[derive(Debug, Clone, Default)]
pub struct PresenceLabels {
    labels: HashMap<PresenceState, String>,
}

impl PresenceLabels {
    pub fn label(&self, state: PresenceState) -> &str {
        self.labels.get(&state).map(String::as_str).unwrap_or(state.label())
    }

    /// Exact match, the labels are what the state entity reports
    pub fn state_of(&self, label: &str) -> Option<PresenceState> {
        PresenceState::ALL.into_iter().find(|s| self.label(*s) == label)
    }

    pub fn options(&self) -> Vec<String> {
        PresenceState::ALL.iter().map(|s| self.label(*s).to_owned()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PresenceSetup {
    pub tracker: EntityId,
    pub state_entity: EntityId,
    pub labels: PresenceLabels,
    pub delays: PresenceDelays,
    pub init_options: bool,
}

impl PresenceSetup {
    pub fn from_config(path: &str, config: &PresenceConfig) -> Result<Self, ConfigError> {
        let tracker = entity_id(&format!("{}.tracker", path), &config.tracker)?;
        let state_entity = entity_id(&format!("{}.state", path), &config.state)?;

        let mut labels = HashMap::new();
        for (key, label) in &config.map {
            let state = key
                .parse::<PresenceState>()
                .map_err(|e| ConfigError::new(format!("{}.map.{}", path, key), Problem::Presence(e)))?;
            labels.insert(state, label.clone());
        }
        let labels = PresenceLabels { labels };

        let options = labels.options();
        if let Some(label) = options.iter().find(|l| options.iter().filter(|o| o == l).count() > 1) {
            return Err(ConfigError::new(
                format!("{}.map", path),
                Problem::DuplicateLabel { label: label.clone() },
            ));
        }

        let defaults = PresenceDelays::default();
        let delays = PresenceDelays {
            just_left: config.just_left_delay.unwrap_or(defaults.just_left),
            just_arrived: config.just_arrived_delay.unwrap_or(defaults.just_arrived),
            extended_away: config.extended_away_delay.unwrap_or(defaults.extended_away),
        };

        Ok(Self {
            tracker,
            state_entity,
            labels,
            delays,
            init_options: config.init_options,
        })
    }
}
