//! Dashboard figures and consolidated reports.
//!
//! Everything here is computed from store aggregates (`group_by`, `sum`,
//! `monthly_counts`) so the Redis backend answers them with FT.AGGREGATE
//! instead of loading rows.

pub mod monthly;

use std::{cmp::Ordering, collections::BTreeMap};

use chrono::NaiveDate;
use serde::Serialize;

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

pub use monthly::{MonthBucket, MonthlyPoint, TRAILING_MONTHS, build_monthly_series, month_buckets, window_start};

use crate::{
    client::Client,
    errors::RepoError,
    filters::normalizers::capitalize_first,
    models::{Herd, Producer, Property},
    search::FilterCondition,
    store::GroupRow,
    types::EntityKind,
};

const TOP_MUNICIPALITIES: usize = 10;
const TOP_CROPS: usize = 8;

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub produtores: u64,
    pub propriedades: u64,
    pub unidades: u64,
    pub animais: u64,
    pub hectares: f64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityCount {
    pub municipio: String,
    pub total: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityUfCount {
    pub municipio: String,
    pub uf: String,
    pub total: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesTotal {
    pub especie: String,
    pub total: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionPoint {
    pub mes: String,
    pub produtores: u64,
    pub propriedades: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropHectares {
    pub cultura: String,
    pub hectares: f64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropTotal {
    pub cultura: String,
    pub total_hectares: f64,
}

/// Everything the dashboard home shows in one payload.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub totais: Totals,
    pub propriedades_por_municipio: Vec<MunicipalityCount>,
    pub animais_por_especie: Vec<SpeciesTotal>,
    pub evolucao_cadastros: Vec<EvolutionPoint>,
    pub hectares_por_cultura: Vec<CropHectares>,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesReport {
    pub especie: String,
    pub total_animais: u64,
    pub total_rebanhos: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropReport {
    pub nome_cultura: String,
    pub total_hectares: f64,
    pub total_unidades: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relatorios {
    pub propriedades_municipio: Vec<MunicipalityUfCount>,
    pub animais_especie: Vec<SpeciesReport>,
    pub hectares_cultura: Vec<CropReport>,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityReport {
    pub data: Vec<MunicipalityUfCount>,
    pub total_geral: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesSummary {
    pub data: Vec<SpeciesReport>,
    pub total_geral_animais: u64,
    pub total_geral_rebanhos: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropSummary {
    pub data: Vec<CropReport>,
    pub total_geral_hectares: f64,
    pub total_geral_unidades: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HerdReportLine {
    pub rebanho: Herd,
    pub propriedade: Property,
}

/// Every herd of a producer across their properties.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HerdReport {
    pub produtor: Producer,
    pub rebanhos: Vec<HerdReportLine>,
    pub total_animais: u64,
    pub total_por_especie: BTreeMap<String, u64>,
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn whole(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 { value.round() as u64 } else { 0 }
}

/// Larger first; equal values keep key order.
fn by_value_desc<K: Ord>(a: (f64, K), b: (f64, K)) -> Ordering {
    b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then_with(|| a.1.cmp(&b.1))
}

fn sorted_desc(mut rows: Vec<GroupRow>, metric: fn(&GroupRow) -> f64) -> Vec<GroupRow> {
    rows.sort_by(|a, b| by_value_desc((metric(a), &a.keys), (metric(b), &b.keys)));
    rows
}

fn by_count(row: &GroupRow) -> f64 {
    row.count as f64
}

fn by_sum(row: &GroupRow) -> f64 {
    row.sum
}

impl Client {
    async fn grouped(&self, kind: EntityKind, fields: &[&str], sum: Option<&str>) -> Result<Vec<GroupRow>, RepoError> {
        self.store().group_by(kind, &FilterCondition::match_all(), fields, sum).await
    }

    pub async fn totals(&self) -> Result<Totals, RepoError> {
        let store = self.store();
        Ok(Totals {
            produtores: store.count_all(EntityKind::Producer).await?,
            propriedades: store.count_all(EntityKind::Property).await?,
            unidades: store.count_all(EntityKind::ProductionUnit).await?,
            animais: whole(store.sum(EntityKind::Herd, "quantidade").await?),
            hectares: round2(store.sum(EntityKind::ProductionUnit, "area_total_ha").await?),
        })
    }

    /// Property counts per municipality and state, blank municipalities excluded.
    pub async fn properties_by_municipality(&self) -> Result<Vec<MunicipalityUfCount>, RepoError> {
        let rows = self.grouped(EntityKind::Property, &["municipio", "uf"], None).await?;
        Ok(sorted_desc(rows, by_count)
            .into_iter()
            .filter(|row| !row.key(0).trim().is_empty())
            .map(|row| MunicipalityUfCount {
                municipio: row.key(0).to_string(),
                uf: row.key(1).to_string(),
                total: row.count,
            })
            .collect())
    }

    /// Head count and herd count per species, largest head count first.
    pub async fn species_report(&self) -> Result<Vec<SpeciesReport>, RepoError> {
        let rows = self.grouped(EntityKind::Herd, &["especie"], Some("quantidade")).await?;
        Ok(sorted_desc(rows, by_sum)
            .into_iter()
            .map(|row| SpeciesReport {
                especie: capitalize_first(row.key(0)),
                total_animais: whole(row.sum),
                total_rebanhos: row.count,
            })
            .collect())
    }

    /// Hectares and unit count per crop, largest area first.
    pub async fn crop_report(&self) -> Result<Vec<CropReport>, RepoError> {
        let rows = self.grouped(EntityKind::ProductionUnit, &["nome_cultura"], Some("area_total_ha")).await?;
        Ok(sorted_desc(rows, by_sum)
            .into_iter()
            .map(|row| CropReport {
                nome_cultura: capitalize_first(row.key(0)),
                total_hectares: round2(row.sum),
                total_unidades: row.count,
            })
            .collect())
    }

    /// New producers and properties per month over the trailing window ending at `today`.
    pub async fn registration_evolution(&self, today: NaiveDate) -> Result<Vec<EvolutionPoint>, RepoError> {
        let since = window_start(today, TRAILING_MONTHS);
        let producers = self.store().monthly_counts(EntityKind::Producer, "data_cadastro", since).await?;
        let properties = self.store().monthly_counts(EntityKind::Property, "data_cadastro", since).await?;
        Ok(build_monthly_series(today, TRAILING_MONTHS, &[&producers, &properties])
            .into_iter()
            .map(|point| EvolutionPoint {
                mes: point.label,
                produtores: point.counts.first().copied().unwrap_or(0),
                propriedades: point.counts.get(1).copied().unwrap_or(0),
            })
            .collect())
    }

    pub async fn dashboard(&self, today: NaiveDate) -> Result<Dashboard, RepoError> {
        let totais = self.totals().await?;

        let municipality_rows = self.grouped(EntityKind::Property, &["municipio"], None).await?;
        let propriedades_por_municipio = sorted_desc(municipality_rows, by_count)
            .into_iter()
            .filter(|row| !row.key(0).trim().is_empty())
            .take(TOP_MUNICIPALITIES)
            .map(|row| MunicipalityCount {
                municipio: row.key(0).to_string(),
                total: row.count,
            })
            .collect();

        let animais_por_especie = self
            .species_report()
            .await?
            .into_iter()
            .map(|row| SpeciesTotal {
                especie: row.especie,
                total: row.total_animais,
            })
            .collect();

        let hectares_por_cultura = self
            .crop_report()
            .await?
            .into_iter()
            .take(TOP_CROPS)
            .map(|row| CropHectares {
                cultura: row.nome_cultura,
                hectares: row.total_hectares,
            })
            .collect();

        Ok(Dashboard {
            totais,
            propriedades_por_municipio,
            animais_por_especie,
            evolucao_cadastros: self.registration_evolution(today).await?,
            hectares_por_cultura,
        })
    }

    pub async fn crop_totals(&self) -> Result<Vec<CropTotal>, RepoError> {
        Ok(self
            .crop_report()
            .await?
            .into_iter()
            .map(|row| CropTotal {
                cultura: row.nome_cultura,
                total_hectares: row.total_hectares,
            })
            .collect())
    }

    pub async fn relatorios(&self) -> Result<Relatorios, RepoError> {
        Ok(Relatorios {
            propriedades_municipio: self.properties_by_municipality().await?,
            animais_especie: self.species_report().await?,
            hectares_cultura: self.crop_report().await?,
        })
    }

    pub async fn municipality_report(&self) -> Result<MunicipalityReport, RepoError> {
        let data = self.properties_by_municipality().await?;
        let total_geral = data.iter().map(|row| row.total).sum();
        Ok(MunicipalityReport { data, total_geral })
    }

    pub async fn species_summary(&self) -> Result<SpeciesSummary, RepoError> {
        let data = self.species_report().await?;
        Ok(SpeciesSummary {
            total_geral_animais: data.iter().map(|row| row.total_animais).sum(),
            total_geral_rebanhos: data.iter().map(|row| row.total_rebanhos).sum(),
            data,
        })
    }

    pub async fn crop_summary(&self) -> Result<CropSummary, RepoError> {
        let data = self.crop_report().await?;
        Ok(CropSummary {
            total_geral_hectares: round2(data.iter().map(|row| row.total_hectares).sum()),
            total_geral_unidades: data.iter().map(|row| row.total_unidades).sum(),
            data,
        })
    }

    /// Herds of every property owned by `produtor_id`, ordered by species.
    pub async fn herd_report(&self, produtor_id: &str) -> Result<HerdReport, RepoError> {
        let produtor = self.collection::<Producer>().get_required(produtor_id).await?;
        let properties = self
            .collection::<Property>()
            .find_all(&FilterCondition::equals("produtor_id", produtor_id))
            .await?;

        let mut rebanhos = Vec::new();
        for propriedade in properties {
            let herds = self
                .collection::<Herd>()
                .find_all(&FilterCondition::equals("propriedade_id", propriedade.id.as_str()))
                .await?;
            rebanhos.extend(herds.into_iter().map(|rebanho| HerdReportLine {
                rebanho,
                propriedade: propriedade.clone(),
            }));
        }
        rebanhos.sort_by(|a, b| {
            a.rebanho
                .especie
                .cmp(&b.rebanho.especie)
                .then_with(|| a.propriedade.nome.cmp(&b.propriedade.nome))
                .then_with(|| a.rebanho.id.cmp(&b.rebanho.id))
        });

        let mut total_por_especie = BTreeMap::new();
        for line in &rebanhos {
            *total_por_especie.entry(line.rebanho.especie.clone()).or_insert(0) += line.rebanho.quantidade.max(0) as u64;
        }
        let total_animais = total_por_especie.values().sum();

        Ok(HerdReport {
            produtor,
            rebanhos,
            total_animais,
            total_por_especie,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        documents::{DEFAULT_MAX_BYTES, DocumentStorage},
        models::{HerdInput, ProducerInput, ProductionUnit, ProductionUnitInput, PropertyInput},
    };

    async fn seeded(dir: &TempDir) -> (Client, Producer) {
        let client = Client::in_memory(DocumentStorage::new(dir.path(), DEFAULT_MAX_BYTES));
        let producer = client
            .create::<Producer>(ProducerInput {
                nome: Some("Ana Pereira".into()),
                cpf_cnpj: Some("12345678901".into()),
                telefone: Some("(19) 99999-0000".into()),
                email: Some("ana@example.com".into()),
                endereco: Some("Rodovia SP-340".into()),
                data_cadastro: None,
            })
            .await
            .expect("producer");

        let mut property_ids = Vec::new();
        for (nome, municipio, area) in [("Sítio A", "Campinas", 10.0), ("Sítio B", "Campinas", 20.5), ("Sítio C", "Limeira", 5.25)] {
            let property = client
                .create::<Property>(PropertyInput {
                    nome: Some(nome.into()),
                    municipio: Some(municipio.into()),
                    uf: Some("SP".into()),
                    area_total: Some(area),
                    produtor_id: Some(producer.id.clone()),
                    ..Default::default()
                })
                .await
                .expect("property");
            property_ids.push(property.id);
        }

        for (especie, quantidade, property) in [("Bovino", 40, 0), ("Suíno", 60, 1), ("Bovino", 30, 2)] {
            client
                .create::<Herd>(HerdInput {
                    especie: Some(especie.into()),
                    quantidade: Some(quantidade),
                    data_atualizacao: Some("2025-06-01".into()),
                    propriedade_id: Some(property_ids[property].clone()),
                    ..Default::default()
                })
                .await
                .expect("herd");
        }

        for (cultura, area) in [("Milho", 4.333), ("Feijão", 2.0), ("Milho", 1.0)] {
            client
                .create::<ProductionUnit>(ProductionUnitInput {
                    nome_cultura: Some(cultura.into()),
                    area_total_ha: Some(area),
                    propriedade_id: Some(property_ids[0].clone()),
                    ..Default::default()
                })
                .await
                .expect("unit");
        }
        (client, producer)
    }

    #[tokio::test]
    async fn dashboard_aggregates_every_section() {
        let dir = TempDir::new().expect("tempdir");
        let (client, _) = seeded(&dir).await;
        let today = chrono::Utc::now().date_naive();

        let dashboard = client.dashboard(today).await.expect("dashboard");
        assert_eq!(dashboard.totais.produtores, 1);
        assert_eq!(dashboard.totais.propriedades, 3);
        assert_eq!(dashboard.totais.unidades, 3);
        assert_eq!(dashboard.totais.animais, 130);
        assert_eq!(dashboard.totais.hectares, 7.33);

        assert_eq!(dashboard.propriedades_por_municipio[0].municipio, "Campinas");
        assert_eq!(dashboard.propriedades_por_municipio[0].total, 2);

        assert_eq!(dashboard.animais_por_especie[0].especie, "Bovino");
        assert_eq!(dashboard.animais_por_especie[0].total, 70);

        assert_eq!(dashboard.hectares_por_cultura[0].cultura, "Milho");
        assert_eq!(dashboard.hectares_por_cultura[0].hectares, 5.33);

        assert_eq!(dashboard.evolucao_cadastros.len(), 12);
        let last = dashboard.evolucao_cadastros.last().expect("current month");
        assert_eq!(last.produtores, 1);
        assert_eq!(last.propriedades, 3);
    }

    #[tokio::test]
    async fn summaries_carry_grand_totals() {
        let dir = TempDir::new().expect("tempdir");
        let (client, _) = seeded(&dir).await;

        let species = client.species_summary().await.expect("species");
        assert_eq!(species.total_geral_animais, 130);
        assert_eq!(species.total_geral_rebanhos, 3);

        let crops = client.crop_summary().await.expect("crops");
        assert_eq!(crops.total_geral_unidades, 3);
        assert_eq!(crops.total_geral_hectares, 7.33);

        let municipalities = client.municipality_report().await.expect("municipalities");
        assert_eq!(municipalities.total_geral, 3);
        assert_eq!(municipalities.data[1].municipio, "Limeira");
        assert_eq!(municipalities.data[1].uf, "SP");
    }

    #[tokio::test]
    async fn herd_report_groups_by_species() {
        let dir = TempDir::new().expect("tempdir");
        let (client, producer) = seeded(&dir).await;

        let report = client.herd_report(&producer.id).await.expect("report");
        assert_eq!(report.rebanhos.len(), 3);
        assert_eq!(report.rebanhos[0].rebanho.especie, "Bovino");
        assert_eq!(report.rebanhos[2].rebanho.especie, "Suíno");
        assert_eq!(report.total_animais, 130);
        assert_eq!(report.total_por_especie.get("Bovino"), Some(&70));

        let err = client.herd_report("missing").await.expect_err("unknown producer");
        assert!(matches!(err, RepoError::NotFound { .. }));
    }

    #[test]
    fn ties_break_on_key() {
        let rows = vec![
            GroupRow {
                keys: vec!["b".into()],
                count: 2,
                sum: 0.0,
            },
            GroupRow {
                keys: vec!["a".into()],
                count: 2,
                sum: 0.0,
            },
            GroupRow {
                keys: vec!["c".into()],
                count: 5,
                sum: 0.0,
            },
        ];
        let keys: Vec<_> = sorted_desc(rows, by_count).iter().map(|row| row.key(0).to_string()).collect();
        assert_eq!(keys, ["c", "a", "b"]);
    }
}
