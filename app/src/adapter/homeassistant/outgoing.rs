use tokio::sync::mpsc;

use crate::core::ServiceCall;
use crate::port::ServiceCaller;

use super::client::HaHttpClient;

pub fn channel(client: HaHttpClient) -> (HaServiceClient, HaCommandSender) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HaServiceClient { tx }, HaCommandSender { rx, client })
}

/// Queues service calls, they are sent in order by the [`HaCommandSender`]
#[derive(Debug, Clone)]
pub struct HaServiceClient {
    tx: mpsc::UnboundedSender<ServiceCall>,
}

impl ServiceCaller for HaServiceClient {
    fn call_service(&self, call: ServiceCall) -> anyhow::Result<()> {
        self.tx
            .send(call)
            .map_err(|e| anyhow::anyhow!("Service call {} dropped, sender is not running", e.0))
    }
}

pub struct HaCommandSender {
    rx: mpsc::UnboundedReceiver<ServiceCall>,
    client: HaHttpClient,
}

impl HaCommandSender {
    pub async fn run(mut self) {
        while let Some(call) = self.rx.recv().await {
            //not retried, the next trigger of the app sends again
            if let Err(e) = self.client.call_service(&call.domain, &call.service, call.data).await {
                tracing::error!("Error calling HA service {}/{}: {:?}", call.domain, call.service, e);
            }
        }

        tracing::info!("All HA service callers are gone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn queues_calls_in_order() {
        let client = HaHttpClient::new("http://localhost:8123", "token").unwrap();
        let (caller, mut sender) = channel(client);

        caller
            .call_service(ServiceCall::new("input_number", "set_value", json!({ "value": 20 })))
            .unwrap();
        caller
            .call_service(ServiceCall::new("climate", "set_temperature", json!({ "temperature": 21 })))
            .unwrap();

        assert_eq!(sender.rx.recv().await.map(|c| c.to_string()), Some("input_number/set_value".to_owned()));
        assert_eq!(sender.rx.recv().await.map(|c| c.to_string()), Some("climate/set_temperature".to_owned()));
    }

    #[tokio::test]
    async fn fails_when_sender_is_gone() {
        let client = HaHttpClient::new("http://localhost:8123", "token").unwrap();
        let (caller, sender) = channel(client);
        drop(sender);

        let result = caller.call_service(ServiceCall::new("input_number", "set_value", json!({})));

        assert!(result.is_err());
    }
}
