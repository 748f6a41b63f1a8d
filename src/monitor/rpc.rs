use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use super::account::Address;

#[async_trait]
pub trait BalanceProvider {
    /// Balance in lamports.
    async fn get_balance(&self, address: &Address) -> Result<u64>;
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct BalanceResult {
    value: u64,
}

/// Minimal Solana JSON-RPC client, only what balance checks need.
pub struct SolanaRpc {
    client: reqwest::Client,
    url: Url,
}

impl SolanaRpc {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

fn balance_from_response(response: RpcResponse<BalanceResult>) -> Result<u64> {
    match (response.result, response.error) {
        (_, Some(err)) => Err(anyhow!(
            "getBalance returned error, code: {}, message: {}",
            err.code,
            err.message
        )),
        (Some(result), None) => Ok(result.value),
        (None, None) => Err(anyhow!("getBalance returned neither result nor error")),
    }
}

#[async_trait]
impl BalanceProvider for SolanaRpc {
    async fn get_balance(&self, address: &Address) -> Result<u64> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getBalance",
                "params": [address.as_str(), {"commitment": "confirmed"}],
            }))
            .send()
            .await
            // Rpc urls often embed an api key.
            .map_err(reqwest::Error::without_url)
            .context("failed to send getBalance request")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)?
            .json::<RpcResponse<BalanceResult>>()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to decode getBalance response")?;

        balance_from_response(response)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::monitor::account::tests::ADDRESS_A;

    fn rpc(server: &MockServer) -> SolanaRpc {
        let url = format!("{}/SECRETKEY", server.uri());
        SolanaRpc::new(reqwest::Client::new(), url.parse().unwrap())
    }

    fn parse(json: &str) -> RpcResponse<BalanceResult> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reads_balance_value() {
        let response = parse(
            r#"{"jsonrpc":"2.0","result":{"context":{"apiVersion":"1.18.22","slot":283047215},"value":1500000000},"id":1}"#,
        );
        assert_eq!(balance_from_response(response).unwrap(), 1_500_000_000);
    }

    #[test]
    fn surfaces_rpc_errors() {
        let response = parse(
            r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param: Invalid"},"id":1}"#,
        );
        let err = balance_from_response(response).unwrap_err();
        assert!(err.to_string().contains("-32602"));
    }

    #[test]
    fn empty_response_is_an_error() {
        let response = parse(r#"{"jsonrpc":"2.0","id":1}"#);
        assert!(balance_from_response(response).is_err());
    }

    #[tokio::test]
    async fn requests_confirmed_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/SECRETKEY"))
            .and(body_partial_json(json!({
                "method": "getBalance",
                "params": [ADDRESS_A, {"commitment": "confirmed"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": {"context": {"slot": 283047215}, "value": 42},
                "id": 1,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let balance = rpc(&server)
            .get_balance(&ADDRESS_A.parse().unwrap())
            .await
            .unwrap();

        assert_eq!(balance, 42);
    }

    #[tokio::test]
    async fn error_status_is_an_error_without_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = rpc(&server)
            .get_balance(&ADDRESS_A.parse().unwrap())
            .await
            .unwrap_err();

        let err = format!("{:?}", err);
        assert!(err.contains("503"));
        assert!(!err.contains("SECRETKEY"));
    }
}
