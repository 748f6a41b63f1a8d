mod account;
mod alarm;
mod alerts;
mod env;
mod heartbeat;
mod rpc;

use std::time;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::log;

use self::{
    account::MonitoredAccount,
    alarm::AlertState,
    alerts::{Alerts, LowBalanceAlert, SendAlert},
    env::MonitorConfig,
    heartbeat::run_heartbeat,
    rpc::{BalanceProvider, SolanaRpc},
};

/// Checks every account once per cycle and alerts on low balances.
pub struct BalanceMonitor<P, A> {
    accounts: Vec<MonitoredAccount>,
    provider: P,
    alerts: A,
    alert_state: AlertState,
}

impl<P, A> BalanceMonitor<P, A>
where
    P: BalanceProvider + Send + Sync,
    A: SendAlert + Send + Sync,
{
    pub fn new(
        accounts: Vec<MonitoredAccount>,
        provider: P,
        alerts: A,
        alert_interval: Duration,
    ) -> Self {
        Self {
            accounts,
            provider,
            alerts,
            alert_state: AlertState::new(alert_interval),
        }
    }

    /// Runs one check over all accounts in order, returns the number of alerts sent.
    pub async fn check_accounts(&mut self, now: DateTime<Utc>) -> usize {
        let mut alerts_sent = 0;

        for account in self.accounts.iter() {
            let lamports = match self.provider.get_balance(&account.address).await {
                Ok(lamports) => lamports,
                Err(err) => {
                    error!(
                        name = %account.name,
                        address = %account.address,
                        ?err,
                        "failed to get balance"
                    );
                    continue;
                }
            };

            info!(
                name = %account.name,
                address = %account.address,
                lamports,
                min_lamports = account.min_lamports,
                "checked balance"
            );

            if self
                .alert_state
                .should_notify(&account.address, lamports, account.min_lamports, now)
            {
                warn!(
                    name = %account.name,
                    address = %account.address,
                    lamports,
                    min_lamports = account.min_lamports,
                    "balance below minimum, sending alert"
                );
                self.alerts
                    .send_low_balance(&LowBalanceAlert::new(account, lamports))
                    .await;
                alerts_sent += 1;
            }
        }

        alerts_sent
    }
}

async fn run_balance_loop<P, A>(
    mut monitor: BalanceMonitor<P, A>,
    check_interval: time::Duration,
) -> Result<()>
where
    P: BalanceProvider + Send + Sync,
    A: SendAlert + Send + Sync,
{
    info!(
        accounts = monitor.accounts.len(),
        "checking balances every {} seconds",
        check_interval.as_secs()
    );

    let mut ticker = interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let alerts_sent = monitor.check_accounts(Utc::now()).await;
        debug!(alerts_sent, "finished balance check");
    }
}

pub async fn monitor_balances() -> Result<()> {
    log::init();

    let config = MonitorConfig::from_env();

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let monitor = BalanceMonitor::new(
        config.accounts.clone(),
        SolanaRpc::new(client.clone(), config.rpc_url.clone()),
        Alerts::from_config(&client, &config),
        config.alert_interval,
    );

    let heartbeat = async {
        match config.heartbeat_url.clone() {
            Some(url) => run_heartbeat(client.clone(), url).await,
            None => {
                info!("no heartbeat url configured, skipping heartbeats");
                Ok(())
            }
        }
    };

    let result = tokio::try_join!(run_balance_loop(monitor, config.interval), heartbeat);

    match result {
        Ok(_) => {
            error!("balance monitor exited unexpectedly");
            Err(anyhow!("balance monitor exited unexpectedly"))
        }
        Err(err) => {
            error!("balance monitor exited with error: {}", err);
            Err(err)
        }
    }
}
