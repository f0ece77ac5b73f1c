use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum Mode {
    Comfort,
    EnergySaving,
    FrostProtection,
    Off,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Comfort, Mode::EnergySaving, Mode::FrostProtection, Mode::Off];

    /// Accepted labels, the first one is the canonical label
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Mode::Comfort => &["comfort"],
            Mode::EnergySaving => &["energy", "saving", "energy saving"],
            Mode::FrostProtection => &["frost", "protection", "frost protection"],
            Mode::Off => &["off"],
        }
    }

    pub fn label(&self) -> &'static str {
        self.synonyms()[0]
    }
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();

        Mode::ALL
            .into_iter()
            .find(|mode| mode.synonyms().contains(&label.as_str()))
            .ok_or_else(|| ModeError::UnknownLabel { label: s.to_owned() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ModeError {
    #[display("'{label}' does not name a climate mode")]
    UnknownLabel { label: String },
    #[display("'{label}' is a label of {owner} and cannot be mapped to {target}")]
    ShadowedLabel { label: String, owner: Mode, target: Mode },
}

/// Host labels that are translated before the synonym lookup, e.g. `Home Mode` -> `comfort`
#[derive(Debug, Clone, Default)]
pub struct ModeLabels {
    remap: BTreeMap<String, (String, Mode)>,
}

impl ModeLabels {
    pub fn new(remap: impl IntoIterator<Item = (String, String)>) -> Result<Self, ModeError> {
        let mut labels = BTreeMap::new();

        for (raw, target) in remap {
            let mode = target.parse::<Mode>()?;

            //published labels must resolve back to their own mode
            match raw.parse::<Mode>() {
                Ok(owner) if owner != mode => {
                    return Err(ModeError::ShadowedLabel {
                        label: raw,
                        owner,
                        target: mode,
                    });
                }
                _ => {}
            }

            labels.insert(raw.to_lowercase(), (raw, mode));
        }

        Ok(Self { remap: labels })
    }

    pub fn resolve(&self, label: &str) -> Result<Mode, ModeError> {
        match self.remap.get(&label.to_lowercase()) {
            Some((_, mode)) => Ok(*mode),
            None => label.parse(),
        }
    }

    /// Label published for the mode, a configured host label if there is one
    pub fn label_of(&self, mode: Mode) -> String {
        self.remap
            .values()
            .find(|(_, m)| *m == mode)
            .map(|(raw, _)| raw.clone())
            .unwrap_or_else(|| mode.label().to_owned())
    }

    pub fn options(&self) -> Vec<String> {
        Mode::ALL.iter().map(|mode| self.label_of(*mode)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> ModeLabels {
        ModeLabels::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string()))).unwrap()
    }

    #[test]
    fn resolves_every_synonym() {
        let expected = [
            ("comfort", Mode::Comfort),
            ("energy", Mode::EnergySaving),
            ("saving", Mode::EnergySaving),
            ("energy saving", Mode::EnergySaving),
            ("frost", Mode::FrostProtection),
            ("protection", Mode::FrostProtection),
            ("frost protection", Mode::FrostProtection),
            ("off", Mode::Off),
        ];

        for (label, mode) in expected {
            assert_eq!(label.parse::<Mode>(), Ok(mode), "{}", label);
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!("Energy Saving".parse::<Mode>(), Ok(Mode::EnergySaving));
        assert_eq!("OFF".parse::<Mode>(), Ok(Mode::Off));
    }

    #[test]
    fn partial_labels_are_rejected() {
        assert!("energy-saving".parse::<Mode>().is_err());
        assert!("comfortable".parse::<Mode>().is_err());
        assert!("".parse::<Mode>().is_err());
    }

    #[test]
    fn remap_is_applied_before_synonyms() {
        let labels = labels(&[("Home Mode", "comfort"), ("Holiday", "frost")]);

        assert_eq!(labels.resolve("Home Mode"), Ok(Mode::Comfort));
        assert_eq!(labels.resolve("holiday"), Ok(Mode::FrostProtection));
        assert_eq!(labels.resolve("energy"), Ok(Mode::EnergySaving));
    }

    #[test]
    fn remap_to_unknown_mode_is_rejected() {
        let result = ModeLabels::new([("Party".to_owned(), "disco".to_owned())]);

        assert_eq!(
            result.err(),
            Some(ModeError::UnknownLabel {
                label: "disco".to_owned()
            })
        );
    }

    #[test]
    fn remap_of_another_modes_label_is_rejected() {
        let result = ModeLabels::new([("off".to_owned(), "frost".to_owned())]);

        assert_eq!(
            result.err(),
            Some(ModeError::ShadowedLabel {
                label: "off".to_owned(),
                owner: Mode::Off,
                target: Mode::FrostProtection,
            })
        );
    }

    #[test]
    fn remap_of_own_synonym_is_accepted() {
        let labels = labels(&[("Energy Saving", "energy")]);

        assert_eq!(labels.options(), vec!["comfort", "Energy Saving", "frost", "off"]);
        assert_eq!(labels.resolve(&labels.label_of(Mode::Off)), Ok(Mode::Off));
    }

    #[test]
    fn unknown_label_is_reported() {
        let err = labels(&[]).resolve("Vacation").unwrap_err();

        assert_eq!(err.to_string(), "'Vacation' does not name a climate mode");
    }

    #[test]
    fn options_use_host_labels_where_configured() {
        let labels = labels(&[("Home Mode", "comfort"), ("Away", "energy saving")]);

        assert_eq!(labels.options(), vec!["Home Mode", "Away", "frost", "off"]);
    }
}
