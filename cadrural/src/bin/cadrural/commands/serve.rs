use anyhow::{Context, Result};
use cadrural::{AppConfig, http, seed::seed};
use chrono::Utc;
use clap::Args;

use super::connect;
use crate::help::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "HTTP API",
    commands: &[
        "cadrural serve                         # Serve /api/v1 on the configured address",
        "cadrural serve --bind 0.0.0.0:3000     # Override the bind address",
        "cadrural serve --seed                  # Start with demo data (handy with the memory store)",
    ],
}];

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Insert demo data before serving
    #[arg(long)]
    pub seed: bool,
}

pub async fn handle_serve(args: ServeArgs, config: &AppConfig, output: &OutputManager) -> Result<()> {
    let client = connect(config, output).await?;

    if args.seed {
        let summary = seed(&client, Utc::now().date_naive())
            .await
            .context("Failed to seed demo data")?;
        output.info(&format!(
            "Seeded {} producers and {} properties",
            summary.produtores, summary.propriedades
        ));
    }

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    output.success(&format!("Serving http://{bind}/api/v1 (Ctrl-C to stop)"));
    http::serve(client, &bind).await
}
