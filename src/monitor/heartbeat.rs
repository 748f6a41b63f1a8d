use anyhow::Result;
use chrono::Duration;
use lazy_static::lazy_static;
use reqwest::Url;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

lazy_static! {
    static ref HEARTBEAT_INTERVAL: Duration = Duration::minutes(1);
}

/// The heartbeat url holds the monitor token, errors are returned without it.
async fn send_heartbeat(client: &reqwest::Client, url: &Url) -> reqwest::Result<()> {
    client
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map(|_| ())
        .map_err(reqwest::Error::without_url)
}

/// Pings the uptime monitor now and then every minute, forever.
pub async fn run_heartbeat(client: reqwest::Client, url: Url) -> Result<()> {
    info!(
        "sending heartbeats every {} seconds",
        HEARTBEAT_INTERVAL.num_seconds()
    );

    let mut ticker = interval(HEARTBEAT_INTERVAL.to_std()?);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match send_heartbeat(&client, &url).await {
            Ok(_) => debug!("sent heartbeat"),
            Err(err) => error!(?err, "failed to send heartbeat"),
        }
    }
}
