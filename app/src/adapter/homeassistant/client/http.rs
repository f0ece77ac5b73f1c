use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;

use crate::adapter::homeassistant::HaState;

#[derive(Debug, Clone)]
pub struct HaHttpClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HaHttpClient {
    pub fn new(url: &str, token: &str) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(Some(token.to_owned())).new_tracing_client()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
        })
    }
}

impl HaHttpClient {
    pub async fn get_states(&self) -> anyhow::Result<Vec<HaState>> {
        let response = self.client.get(format!("{}/api/states", self.base_url)).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Error getting all states: HTTP {}", response.status());
        }

        response
            .json::<Vec<HaState>>()
            .await
            .context("Error parsing all states")
    }

    #[tracing::instrument(skip(self, service_data))]
    pub async fn call_service(&self, domain: &str, service: &str, service_data: serde_json::Value) -> anyhow::Result<()> {
        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);

        tracing::info!("Calling HA service {}: {}", url, service_data);

        let response = self.client.post(url).json(&service_data).send().await?;
        let status = response.status();

        if !status.is_success() {
            anyhow::bail!("HA service {}/{} failed with HTTP {}: {}", domain, service, status, response.text().await?);
        }

        tracing::debug!("Response: {}", status);
        Ok(())
    }
}
