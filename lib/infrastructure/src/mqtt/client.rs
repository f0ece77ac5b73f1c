use rumqttc::v5::{
    AsyncClient, EventLoop, MqttOptions,
    mqttbytes::{
        QoS,
        v5::{ConnectProperties, Packet, Publish, SubscribeProperties},
    },
};

use rumqttc::v5::Event::Incoming;
use tokio::sync::mpsc;

use super::*;

pub struct Mqtt {
    client: AsyncClient,
    event_loop: EventLoop,
    subscriptions: Vec<Subscription>,
}

struct Subscription {
    topic: String,
    tx: mpsc::Sender<MqttInMessage>,
}

impl Mqtt {
    pub fn connect(host: &str, port: u16, client_id: &str, credentials: Option<(&str, &str)>) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(std::time::Duration::from_secs(5));
        options.set_clean_start(false);

        if let Some((user, password)) = credentials {
            options.set_credentials(user, password);
        }

        let mut connect_props = ConnectProperties::new();
        connect_props.session_expiry_interval = 60.into();
        connect_props.max_packet_size = Some(1024 * 1024);
        options.set_connect_properties(connect_props);

        let (client, event_loop) = AsyncClient::new(options, 10);

        Mqtt {
            client,
            event_loop,
            subscriptions: vec![],
        }
    }

    /// Subscribes to a topic filter. Incoming publishes are routed back by subscription identifier, so
    /// wildcard filters work without topic matching on our side.
    pub async fn subscribe(&mut self, topic: impl Into<String>) -> anyhow::Result<MqttSubscription> {
        let topic = topic.into();
        let (tx, rx) = mpsc::channel::<MqttInMessage>(64);

        tracing::info!("Subscribing to MQTT topic {}", topic);

        self.subscriptions.push(Subscription {
            topic: topic.clone(),
            tx,
        });

        self.client
            .subscribe_with_properties(
                topic,
                QoS::AtLeastOnce,
                SubscribeProperties {
                    id: Some(self.subscriptions.len()), //must be > 0
                    user_properties: vec![],
                },
            )
            .await?;

        Ok(MqttSubscription::new(rx))
    }

    pub async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Incoming(Packet::Publish(publish))) => self.forward(publish).await,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT connection error: {}", e);
                    //avoid spinning while the broker is unreachable, the event loop reconnects on next poll
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn forward(&self, publish: Publish) {
        let message: MqttInMessage = match (&publish).try_into() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Error decoding MQTT message: {}", e);
                return;
            }
        };

        let subscription_ids = match publish.properties {
            Some(p) => p.subscription_identifiers,
            None => {
                tracing::warn!("MQTT message on {} without subscription identifier", message.topic);
                return;
            }
        };

        for id in subscription_ids {
            let Some(subscription) = id.checked_sub(1).and_then(|idx| self.subscriptions.get(idx)) else {
                tracing::error!("No MQTT subscription for id {}", id);
                continue;
            };

            tracing::trace!("Forwarding MQTT message on {} to {}", message.topic, subscription.topic);

            if let Err(e) = subscription.tx.send(message.clone()).await {
                tracing::error!("Subscriber of {} is gone: {}", subscription.topic, e);
            }
        }
    }
}
