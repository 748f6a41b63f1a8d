mod betterstack;
mod discord;

use async_trait::async_trait;
use indoc::formatdoc;
use tracing::{debug, error, warn};

use super::{
    account::{Address, MonitoredAccount},
    env::MonitorConfig,
};

pub use self::{
    betterstack::BetterStack,
    discord::{DiscordSafeMessage, DiscordWebhook},
};

const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

fn format_sol(lamports: u64) -> String {
    format!(
        "{}.{:09}",
        lamports / LAMPORTS_PER_SOL,
        lamports % LAMPORTS_PER_SOL
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct LowBalanceAlert {
    pub name: String,
    pub address: Address,
    pub lamports: u64,
    pub min_lamports: u64,
}

impl LowBalanceAlert {
    pub fn new(account: &MonitoredAccount, lamports: u64) -> Self {
        Self {
            name: account.name.clone(),
            address: account.address.clone(),
            lamports,
            min_lamports: account.min_lamports,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "LOW BALANCE {} ({}) has {} lamports ({} SOL), minimum is {} lamports ({} SOL)",
            self.name,
            self.address,
            self.lamports,
            format_sol(self.lamports),
            self.min_lamports,
            format_sol(self.min_lamports),
        )
    }

    fn incident_summary(&self) -> String {
        format!("Low balance on {}", self.name)
    }

    fn incident_description(&self) -> String {
        let name = &self.name;
        let address = &self.address;
        let lamports = self.lamports;
        let sol = format_sol(self.lamports);
        let min_lamports = self.min_lamports;
        let min_sol = format_sol(self.min_lamports);
        formatdoc!(
            "
            account: {name}
            address: {address}
            balance: {lamports} lamports ({sol} SOL)
            minimum: {min_lamports} lamports ({min_sol} SOL)
            "
        )
    }
}

#[async_trait]
pub trait SendAlert {
    /// Delivers the alert on every configured channel. Delivery problems are logged.
    async fn send_low_balance(&self, alert: &LowBalanceAlert);
}

/// Fans an alert out to Discord and Better Stack, whichever are configured.
pub struct Alerts {
    discord: Option<DiscordWebhook>,
    betterstack: Option<BetterStack>,
}

impl Alerts {
    pub fn new(discord: Option<DiscordWebhook>, betterstack: Option<BetterStack>) -> Self {
        if discord.is_none() && betterstack.is_none() {
            warn!("no alert channels configured, low balances will only be logged");
        }

        Self {
            discord,
            betterstack,
        }
    }

    pub fn from_config(client: &reqwest::Client, config: &MonitorConfig) -> Self {
        let discord = config
            .discord_webhook_url
            .clone()
            .map(|url| DiscordWebhook::new(client.clone(), url));
        let betterstack = config
            .betterstack
            .clone()
            .map(|betterstack| BetterStack::new(client.clone(), betterstack));

        Self::new(discord, betterstack)
    }
}

#[async_trait]
impl SendAlert for Alerts {
    async fn send_low_balance(&self, alert: &LowBalanceAlert) {
        let message = alert.message();

        if let Some(discord) = &self.discord {
            discord.send_message(&DiscordSafeMessage::new(&message)).await;
        }

        if let Some(betterstack) = &self.betterstack {
            let result = betterstack
                .create_incident(&alert.incident_summary(), &alert.incident_description())
                .await;

            match result {
                Ok(_) => {
                    debug!(address = %alert.address, "created low balance incident");
                }
                // Let the chat channel know the incident is missing.
                Err(err) => {
                    error!(
                        address = %alert.address,
                        ?err,
                        "failed to create Better Stack incident"
                    );

                    if let Some(discord) = &self.discord {
                        let message = format!(
                            "failed to create Better Stack incident for {}: {}",
                            alert.name, err
                        );
                        discord.send_message(&DiscordSafeMessage::new(&message)).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::monitor::account::tests::ADDRESS_A;

    fn alert() -> LowBalanceAlert {
        LowBalanceAlert {
            name: "fee payer".to_string(),
            address: ADDRESS_A.parse().unwrap(),
            lamports: 500_000_000,
            min_lamports: 2_000_000_000,
        }
    }

    #[test]
    fn formats_sol() {
        assert_eq!(format_sol(0), "0.000000000");
        assert_eq!(format_sol(1), "0.000000001");
        assert_eq!(format_sol(1_500_000_000), "1.500000000");
        assert_eq!(format_sol(u64::MAX), "18446744073.709551615");
    }

    #[test]
    fn formats_low_balance_message() {
        assert_eq!(
            alert().message(),
            format!(
                "LOW BALANCE fee payer ({ADDRESS_A}) has 500000000 lamports (0.500000000 SOL), minimum is 2000000000 lamports (2.000000000 SOL)"
            )
        );
    }

    #[test]
    fn formats_incident() {
        let alert = alert();
        assert_eq!(alert.incident_summary(), "Low balance on fee payer");
        assert_eq!(
            alert.incident_description(),
            format!(
                "account: fee payer\naddress: {ADDRESS_A}\nbalance: 500000000 lamports (0.500000000 SOL)\nminimum: 2000000000 lamports (2.000000000 SOL)\n"
            )
        );
    }

    fn alerts(server: &MockServer) -> Alerts {
        let client = reqwest::Client::new();
        let discord_url = format!("{}/discord", server.uri()).parse().unwrap();
        let incidents_url = format!("{}/incidents", server.uri()).parse().unwrap();

        Alerts::new(
            Some(DiscordWebhook::new(client.clone(), discord_url)),
            Some(BetterStack::with_incidents_url(
                client,
                super::betterstack::tests::config(),
                incidents_url,
            )),
        )
    }

    async fn discord_messages(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|request| request.url.path() == "/discord")
            .map(|request| {
                let body: serde_json::Value = request.body_json().unwrap();
                body["content"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn sends_discord_message_and_opens_incident() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/discord"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/incidents"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        alerts(&server).send_low_balance(&alert()).await;

        assert_eq!(discord_messages(&server).await, vec![alert().message()]);
    }

    #[tokio::test]
    async fn failed_incident_is_reported_on_discord() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/discord"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/incidents"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        alerts(&server).send_low_balance(&alert()).await;

        let messages = discord_messages(&server).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], alert().message());
        assert!(messages[1].starts_with("failed to create Better Stack incident for fee payer"));
        assert!(messages[1].contains("500"));
        assert!(messages[1].contains("upstream down"));
        assert!(!messages[1].contains(&server.uri()));
    }
}
