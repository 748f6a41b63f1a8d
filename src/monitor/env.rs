use std::time;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use lazy_static::lazy_static;
use reqwest::Url;
use serde::Deserialize;
use serde_with::{json::JsonString, serde_as};
use tracing::{error, info};

use crate::env::{deserialize_optional_string, deserialize_optional_url, get_app_config};

use super::account::{resolve_accounts, AccountEntry, MonitoredAccount};

lazy_static! {
    static ref MAINNET_RPC_URL: Url = "https://api.mainnet-beta.solana.com".parse().unwrap();
}

/// Raw environment, as read by envy. See [`MonitorConfig`] for the validated form.
#[serde_as]
#[derive(Deserialize)]
pub struct AppConfig {
    /// JSON list of accounts, bare addresses or `{name, address, minLamports}` objects.
    #[serde_as(as = "Option<JsonString>")]
    pub accounts: Option<Vec<AccountEntry>>,
    /// Older deployments call the list `ADDRESSES`.
    #[serde_as(as = "Option<JsonString>")]
    pub addresses: Option<Vec<AccountEntry>>,
    /// Single account deployments.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_url")]
    pub rpc: Option<Url>,
    #[serde(default)]
    pub minimum_lamports: Option<u64>,
    /// Seconds between balance checks.
    pub interval: u64,
    /// Seconds before a low balance alert for the same account is repeated.
    #[serde(default = "default_alert_interval")]
    pub alert_interval: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default, deserialize_with = "deserialize_optional_url")]
    pub discord_webhook_url: Option<Url>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub betterstack_token: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub requester_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_url")]
    pub betterstack_heartbeat_url: Option<Url>,
}

fn default_alert_interval() -> u64 {
    60 * 60
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Clone, Debug, PartialEq)]
pub struct BetterStackConfig {
    pub token: String,
    pub requester_email: String,
}

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub accounts: Vec<MonitoredAccount>,
    pub rpc_url: Url,
    pub interval: time::Duration,
    pub alert_interval: Duration,
    pub request_timeout: time::Duration,
    pub discord_webhook_url: Option<Url>,
    pub betterstack: Option<BetterStackConfig>,
    pub heartbeat_url: Option<Url>,
}

impl AppConfig {
    fn account_entries(&mut self) -> Result<Vec<AccountEntry>> {
        if let Some(accounts) = self.accounts.take() {
            return Ok(accounts);
        }
        if let Some(addresses) = self.addresses.take() {
            return Ok(addresses);
        }
        match self.address.take() {
            Some(address) => Ok(vec![AccountEntry::Address(address)]),
            None => bail!("no accounts configured, set ACCOUNTS, ADDRESSES or ADDRESS"),
        }
    }

    pub fn into_monitor_config(mut self) -> Result<MonitorConfig> {
        let entries = self.account_entries()?;
        let accounts =
            resolve_accounts(entries, self.minimum_lamports).context("invalid account list")?;

        if self.interval == 0 {
            bail!("INTERVAL must be at least one second");
        }
        if self.request_timeout == 0 {
            bail!("REQUEST_TIMEOUT must be at least one second");
        }

        let alert_interval = i64::try_from(self.alert_interval)
            .ok()
            .and_then(Duration::try_seconds)
            .with_context(|| format!("ALERT_INTERVAL {} is too large", self.alert_interval))?;

        let betterstack = match (self.betterstack_token, self.requester_email) {
            (Some(token), Some(requester_email)) => Some(BetterStackConfig {
                token,
                requester_email,
            }),
            (Some(_), None) => bail!("BETTERSTACK_TOKEN is set but REQUESTER_EMAIL is missing"),
            (None, _) => None,
        };

        Ok(MonitorConfig {
            accounts,
            rpc_url: self.rpc.unwrap_or_else(|| MAINNET_RPC_URL.clone()),
            interval: time::Duration::from_secs(self.interval),
            alert_interval,
            request_timeout: time::Duration::from_secs(self.request_timeout),
            discord_webhook_url: self.discord_webhook_url,
            betterstack,
            heartbeat_url: self.betterstack_heartbeat_url,
        })
    }
}

impl MonitorConfig {
    /// Reads and validates the process environment, exiting on any problem.
    pub fn from_env() -> Self {
        let app_config: AppConfig = get_app_config();

        match app_config.into_monitor_config() {
            Ok(config) => {
                info!(
                    accounts = config.accounts.len(),
                    rpc_url = %config.rpc_url,
                    interval = config.interval.as_secs(),
                    alert_interval = config.alert_interval.num_seconds(),
                    discord = config.discord_webhook_url.is_some(),
                    betterstack = config.betterstack.is_some(),
                    heartbeat = config.heartbeat_url.is_some(),
                    "loaded config"
                );
                config
            }
            Err(err) => {
                error!("invalid config: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
