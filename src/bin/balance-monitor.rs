use anyhow::Result;

#[tokio::main]
pub async fn main() -> Result<()> {
    balance_monitor::monitor_balances().await?;
    Ok(())
}
