use std::sync::Arc;

use anyhow::Context;
use settings::Settings;
use tokio::task::JoinSet;

use crate::climate::{ClimateController, ClimateSetup};
use crate::core::runtime::AppRunner;
use crate::presence::{PresenceSetup, PresenceTracker};

mod adapter;
mod climate;
mod core;
pub mod port;
mod presence;
mod settings;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> anyhow::Result<()> {
    let settings = Settings::new().context("Error reading configuration")?;
    settings.monitoring.init().context("Error initializing monitoring")?;

    //validate everything before touching the outside world
    let climate = ClimateController::new(ClimateSetup::try_from(&settings.climate).context("Invalid climate configuration")?);
    let trackers = settings
        .presence
        .iter()
        .enumerate()
        .map(|(i, config)| PresenceSetup::from_config(&format!("presence[{}]", i), config).map(PresenceTracker::new))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid presence configuration")?;

    let mut mqtt = settings.mqtt.new_client();

    tracing::info!("Connecting to Home Assistant");
    let ha = settings
        .homeassistant
        .connect(&mut mqtt)
        .await
        .context("Error connecting to Home Assistant")?;

    let states = Arc::new(ha.states.clone());
    let services = Arc::new(ha.services.clone());

    let mut apps = JoinSet::new();
    apps.spawn(AppRunner::new(climate, states.clone(), services.clone(), ha.state_changes.subscribe()).run());
    for tracker in trackers {
        apps.spawn(AppRunner::new(tracker, states.clone(), services.clone(), ha.state_changes.subscribe()).run());
    }

    tracing::info!("Starting main loop with {} apps", apps.len());

    tokio::select!(
        _ = mqtt.run() => tracing::error!("MQTT event loop ended"),
        _ = ha.pump.run() => tracing::error!("HA state updates ended"),
        _ = ha.sender.run() => tracing::error!("HA service sender ended"),
        Some(result) = apps.join_next() => match result {
            Ok(Ok(())) => tracing::error!("App stopped unexpectedly"),
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(e).context("App panicked"),
        },
    );

    anyhow::bail!("Main loop ended")
}
