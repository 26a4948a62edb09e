use anyhow::{Context, Result};
use cadrural::{AppConfig, reports::Dashboard};
use chrono::Utc;
use comfy_table::{Cell, CellAlignment, Table};

use super::{connect, warn_if_ephemeral};
use crate::help::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Dashboard",
    commands: &[
        "cadrural dashboard                     # Totals and the 12-month registration chart",
        "cadrural --output json dashboard       # Same payload as GET /api/v1/dashboard",
    ],
}];

impl TableDisplay for Dashboard {
    fn to_table(&self, output: &OutputManager) -> Vec<Table> {
        let totals = output.key_value_table(
            &["Total", "Valor"],
            &[
                ("produtores", self.totais.produtores.to_string()),
                ("propriedades", self.totais.propriedades.to_string()),
                ("unidades", self.totais.unidades.to_string()),
                ("animais", self.totais.animais.to_string()),
                ("hectares", format!("{:.2}", self.totais.hectares)),
            ],
        );

        let mut evolution = output.table(&["Mês", "Produtores", "Propriedades"]);
        for point in &self.evolucao_cadastros {
            evolution.add_row(vec![
                Cell::new(&point.mes),
                Cell::new(point.produtores).set_alignment(CellAlignment::Right),
                Cell::new(point.propriedades).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut municipalities = output.table(&["Município", "Propriedades"]);
        for row in &self.propriedades_por_municipio {
            municipalities.add_row(vec![
                Cell::new(&row.municipio),
                Cell::new(row.total).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut species = output.table(&["Espécie", "Animais"]);
        for row in &self.animais_por_especie {
            species.add_row(vec![
                Cell::new(&row.especie),
                Cell::new(row.total).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut crops = output.table(&["Cultura", "Hectares"]);
        for row in &self.hectares_por_cultura {
            crops.add_row(vec![
                Cell::new(&row.cultura),
                Cell::new(format!("{:.2}", row.hectares)).set_alignment(CellAlignment::Right),
            ]);
        }

        vec![totals, evolution, municipalities, species, crops]
    }
}

pub async fn handle_dashboard(config: &AppConfig, output: &OutputManager) -> Result<()> {
    warn_if_ephemeral(config, output);
    let client = connect(config, output).await?;
    let dashboard = client
        .dashboard(Utc::now().date_naive())
        .await
        .context("Failed to compute dashboard")?;
    output.heading("Dashboard");
    output.display(&dashboard)
}
