use affiliate_auth::cli;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let (action, _telemetry) = cli::start()?;

    action.execute().await?;

    Ok(())
}
