use anyhow::{Context, Result};
use cadrural::{AppConfig, seed::SeedSummary};
use chrono::Utc;
use comfy_table::Table;

use super::{connect, warn_if_ephemeral};
use crate::help::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Demo Data",
    commands: &[
        "cadrural seed                          # Insert demo producers, properties, units and herds",
        "cadrural --config prod.toml seed       # Seed the Redis store configured in prod.toml",
    ],
}];

impl TableDisplay for SeedSummary {
    fn to_table(&self, output: &OutputManager) -> Vec<Table> {
        vec![output.key_value_table(
            &["Coleção", "Inseridos"],
            &[
                ("produtores", self.produtores.to_string()),
                ("propriedades", self.propriedades.to_string()),
                ("unidades", self.unidades.to_string()),
                ("rebanhos", self.rebanhos.to_string()),
                ("ignorados", self.ignorados.to_string()),
            ],
        )]
    }
}

pub async fn handle_seed(config: &AppConfig, output: &OutputManager) -> Result<()> {
    warn_if_ephemeral(config, output);
    let client = connect(config, output).await?;
    let summary = cadrural::seed::seed(&client, Utc::now().date_naive())
        .await
        .context("Failed to seed demo data")?;
    output.display(&summary)?;
    output.success("Demo data inserted");
    Ok(())
}
