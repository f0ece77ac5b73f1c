use config::{Config, ConfigError, Environment, File};
use infrastructure::{MonitoringConfig, MqttConfig};
use serde::Deserialize;

use crate::adapter::homeassistant::HomeAssistant;
use crate::climate::ClimateConfig;
use crate::presence::PresenceConfig;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub monitoring: MonitoringConfig,
    pub mqtt: MqttConfig,
    pub homeassistant: HomeAssistant,
    pub climate: ClimateConfig,
    #[serde(default)]
    pub presence: Vec<PresenceConfig>,
}

impl Settings {
    /// `config.toml` in the working directory unless `CLIMATE_CONFIG` points elsewhere. Environment variables like
    /// `CLIMATE_HOMEASSISTANT__TOKEN` override single values.
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("CLIMATE_CONFIG").unwrap_or_else(|_| "config.toml".to_owned());

        let builder = Config::builder().add_source(File::with_name(&path)).add_source(
            Environment::with_prefix("CLIMATE")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }
}
