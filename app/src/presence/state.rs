use std::str::FromStr;

use crate::core::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PresenceState {
    Home,
    JustArrived,
    Away,
    JustLeft,
    ExtendedAway,
}

impl PresenceState {
    pub const ALL: [PresenceState; 5] = [
        PresenceState::Home,
        PresenceState::JustArrived,
        PresenceState::Away,
        PresenceState::JustLeft,
        PresenceState::ExtendedAway,
    ];

    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            PresenceState::Home => &["home"],
            PresenceState::JustArrived => &["just_arrived", "arrived", "just arrived"],
            PresenceState::Away => &["away", "not_home"],
            PresenceState::JustLeft => &["just_left", "left", "just left"],
            PresenceState::ExtendedAway => &["extended_away", "extended away"],
        }
    }

    /// Canonical label, also the default option label
    pub fn label(&self) -> &'static str {
        self.synonyms()[0]
    }

    /// State this one moves on to by itself if nothing else happens
    pub fn follow_up(&self, delays: &PresenceDelays) -> Option<(Duration, PresenceState)> {
        match self {
            PresenceState::JustArrived => Some((delays.just_arrived, PresenceState::Home)),
            PresenceState::JustLeft => Some((delays.just_left, PresenceState::Away)),
            PresenceState::Away => Some((delays.extended_away, PresenceState::ExtendedAway)),
            PresenceState::Home | PresenceState::ExtendedAway => None,
        }
    }

    /// Current state corrected to what the tracker reports
    pub fn reconciled_with(self, tracker: TrackerState) -> PresenceState {
        use PresenceState::*;

        match (tracker, self) {
            (TrackerState::Home, Home | JustArrived) => self,
            (TrackerState::Home, _) => Home,
            (TrackerState::NotHome, JustLeft | Away | ExtendedAway) => self,
            (TrackerState::NotHome, _) => Away,
        }
    }

    /// Transition caused by a tracker change, `None` if the change does not affect presence
    pub fn on_tracker_change(self, old: TrackerState, new: TrackerState) -> Option<PresenceState> {
        match (old, new) {
            //tracking was only lost for a moment
            (TrackerState::NotHome, TrackerState::Home) if self == PresenceState::JustLeft => Some(PresenceState::Home),
            (TrackerState::NotHome, TrackerState::Home) => Some(PresenceState::JustArrived),
            (TrackerState::Home, TrackerState::NotHome) => Some(PresenceState::JustLeft),
            _ => None,
        }
    }
}

impl FromStr for PresenceState {
    type Err = PresenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();

        PresenceState::ALL
            .into_iter()
            .find(|state| state.synonyms().contains(&label.as_str()))
            .ok_or_else(|| PresenceError::UnknownState { label: s.to_owned() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TrackerState {
    #[display("home")]
    Home,
    #[display("not_home")]
    NotHome,
}

impl FromStr for TrackerState {
    type Err = PresenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(TrackerState::Home),
            "not_home" => Ok(TrackerState::NotHome),
            _ => Err(PresenceError::UnknownTrackerState { label: s.to_owned() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum PresenceError {
    #[display("'{label}' is not a presence state")]
    UnknownState { label: String },
    #[display("'{label}' is not a tracker state")]
    UnknownTrackerState { label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceDelays {
    pub just_left: Duration,
    pub just_arrived: Duration,
    pub extended_away: Duration,
}

impl Default for PresenceDelays {
    fn default() -> Self {
        Self {
            just_left: Duration::minutes(5),
            just_arrived: Duration::minutes(5),
            extended_away: Duration::hours(24),
        }
    }
}
