use infrastructure::MqttSubscription;

use crate::adapter::homeassistant::StateChangedEvent;

pub struct HaMqttClient {
    subscription: MqttSubscription,
}

impl HaMqttClient {
    pub fn new(subscription: MqttSubscription) -> Self {
        Self { subscription }
    }

    /// Next state change, other events and unparsable messages are skipped
    pub async fn recv(&mut self) -> Option<StateChangedEvent> {
        loop {
            let msg = self.subscription.recv().await?;

            match StateChangedEvent::parse(&msg.payload) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => tracing::trace!("Skipping non-state event on {}", msg.topic),
                Err(e) => tracing::error!("Error parsing HA event on {}: {:?}", msg.topic, e),
            }
        }
    }
}
