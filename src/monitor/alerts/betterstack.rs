use anyhow::{bail, Result};
use lazy_static::lazy_static;
use reqwest::Url;
use serde::Serialize;

use crate::monitor::env::BetterStackConfig;

lazy_static! {
    static ref INCIDENTS_URL: Url = "https://uptime.betterstack.com/api/v2/incidents"
        .parse()
        .unwrap();
}

#[derive(Debug, PartialEq, Serialize)]
struct IncidentRequest<'a> {
    summary: &'a str,
    requester_email: &'a str,
    description: &'a str,
}

/// Opens incidents through the Better Stack Uptime API.
pub struct BetterStack {
    client: reqwest::Client,
    config: BetterStackConfig,
    incidents_url: Url,
}

impl BetterStack {
    pub fn new(client: reqwest::Client, config: BetterStackConfig) -> Self {
        Self::with_incidents_url(client, config, INCIDENTS_URL.clone())
    }

    pub fn with_incidents_url(
        client: reqwest::Client,
        config: BetterStackConfig,
        incidents_url: Url,
    ) -> Self {
        Self {
            client,
            config,
            incidents_url,
        }
    }

    fn incident_request<'a>(
        &'a self,
        summary: &'a str,
        description: &'a str,
    ) -> IncidentRequest<'a> {
        IncidentRequest {
            summary,
            requester_email: &self.config.requester_email,
            description,
        }
    }

    pub async fn create_incident(&self, summary: &str, description: &str) -> Result<()> {
        let response = self
            .client
            .post(self.incidents_url.clone())
            .bearer_auth(&self.config.token)
            .json(&self.incident_request(summary, description))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(summary, "created better stack incident");
            return Ok(());
        }

        match response.text().await {
            Ok(body) => bail!(
                "failed to create incident with Better Stack, status: {}, body: {}",
                status,
                body
            ),
            Err(err) => bail!(
                "failed to create incident with Better Stack, status: {}, err: {}",
                status,
                err
            ),
        }
    }
}
