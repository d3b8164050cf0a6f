//! Health command - Check the assistant server.

use anyhow::Result;
use clap::Args;
use tracing::info;

use studybyte_chat::HttpTransport;

use super::Context;

#[derive(Args)]
pub struct HealthArgs {
    /// Print the raw health response as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: HealthArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    info!("Checking server health at {}", config.health_endpoint());

    let transport = HttpTransport::new(&config)?;
    let status = transport.health().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.is_healthy() {
        println!("✅ {} ({})", status.status, status.message);
    } else {
        println!("⚠️  {} ({})", status.status, status.message);
    }

    if !status.is_healthy() {
        anyhow::bail!("Server reported status '{}'", status.status);
    }
    Ok(())
}
