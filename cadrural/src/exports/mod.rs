//! Downloadable spreadsheets: every property with its owner, and one producer's herds.
//!
//! Files are `;`-separated CSV with a UTF-8 byte order mark so spreadsheet tools
//! open them with accents and decimal commas intact.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use csv::WriterBuilder;

use crate::{
    client::Client,
    errors::RepoError,
    filters::normalizers::remove_accents,
    models::{Producer, Property},
    search::FilterCondition,
};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const MISSING: &str = "N/A";

pub const PROPERTY_HEADINGS: [&str; 9] = [
    "ID",
    "Nome da Propriedade",
    "Produtor Rural",
    "CPF/CNPJ",
    "Município",
    "UF",
    "Inscrição Estadual",
    "Área Total (ha)",
    "Data de Cadastro",
];

pub const HERD_HEADINGS: [&str; 7] = [
    "Espécie",
    "Quantidade",
    "Finalidade",
    "Propriedade",
    "Município",
    "UF",
    "Data de Atualização",
];

/// A generated file ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `1234.5` as `1.234,50`.
pub fn format_decimal_br(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped},{cents}")
}

/// ASCII-only file name stem: accents folded, anything else but letters and digits as `_`.
fn file_stem(text: &str) -> String {
    remove_accents(text)
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

fn stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d_%H%M%S").to_string()
}

fn csv_error(err: impl std::fmt::Display) -> RepoError {
    RepoError::other(format!("failed to write export: {err}"))
}

/// Writes `records` as one sheet. Records may differ in length.
fn sheet<I, R>(records: I) -> Result<Vec<u8>, RepoError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(UTF8_BOM.to_vec());
    for record in records {
        writer.write_record(record).map_err(csv_error)?;
    }
    writer.into_inner().map_err(csv_error)
}

fn property_record(property: &Property, owner: Option<&Producer>) -> Vec<String> {
    vec![
        property.id.clone(),
        property.nome.clone(),
        owner.map_or_else(|| MISSING.to_string(), |producer| producer.nome.clone()),
        owner.map_or_else(|| MISSING.to_string(), |producer| producer.cpf_cnpj.clone()),
        property.municipio.clone(),
        property.uf.clone(),
        property.inscricao_estadual.clone().unwrap_or_default(),
        format_decimal_br(property.area_total),
        property.created_at.format("%d/%m/%Y").to_string(),
    ]
}

impl Client {
    /// Every property with its producer's name and CPF/CNPJ, ordered by name.
    pub async fn export_properties(&self, now: DateTime<Utc>) -> Result<ExportFile, RepoError> {
        let mut properties = self
            .collection::<Property>()
            .find_all(&FilterCondition::match_all())
            .await?;
        properties.sort_by(|a, b| a.nome.cmp(&b.nome).then_with(|| a.id.cmp(&b.id)));

        let mut owners: BTreeMap<String, Option<Producer>> = BTreeMap::new();
        for property in &properties {
            if !owners.contains_key(&property.produtor_id) {
                let owner = self.collection::<Producer>().get(&property.produtor_id).await?;
                owners.insert(property.produtor_id.clone(), owner);
            }
        }

        let headings = PROPERTY_HEADINGS.map(String::from).to_vec();
        let rows = properties
            .iter()
            .map(|property| property_record(property, owners.get(&property.produtor_id).and_then(Option::as_ref)));
        Ok(ExportFile {
            file_name: format!("propriedades_{}.csv", stamp(now)),
            content_type: CSV_CONTENT_TYPE,
            bytes: sheet(std::iter::once(headings).chain(rows))?,
        })
    }

    /// One producer's herds with per-species and overall totals.
    pub async fn export_herds(&self, produtor_id: &str, now: DateTime<Utc>) -> Result<ExportFile, RepoError> {
        let report = self.herd_report(produtor_id).await?;
        let produtor = &report.produtor;

        let mut records: Vec<Vec<String>> = vec![
            vec!["Produtor".into(), produtor.nome.clone()],
            vec!["CPF/CNPJ".into(), produtor.cpf_cnpj.clone()],
            vec!["Gerado em".into(), now.format("%d/%m/%Y %H:%M:%S").to_string()],
            Vec::new(),
            HERD_HEADINGS.map(String::from).to_vec(),
        ];
        for line in &report.rebanhos {
            records.push(vec![
                line.rebanho.especie.clone(),
                line.rebanho.quantidade.to_string(),
                line.rebanho.finalidade.clone().unwrap_or_default(),
                line.propriedade.nome.clone(),
                line.propriedade.municipio.clone(),
                line.propriedade.uf.clone(),
                line.rebanho.data_atualizacao.format("%d/%m/%Y").to_string(),
            ]);
        }
        records.push(Vec::new());
        records.push(vec!["Total por espécie".into()]);
        for (especie, total) in &report.total_por_especie {
            records.push(vec![especie.clone(), total.to_string()]);
        }
        records.push(vec!["Total de animais".into(), report.total_animais.to_string()]);

        Ok(ExportFile {
            file_name: format!("rebanhos_{}_{}.csv", file_stem(&produtor.nome), stamp(now)),
            content_type: CSV_CONTENT_TYPE,
            bytes: sheet(records)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        documents::{DEFAULT_MAX_BYTES, DocumentStorage},
        models::{Herd, HerdInput, ProducerInput, PropertyInput},
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()
    }

    fn lines(file: &ExportFile) -> Vec<String> {
        let text = std::str::from_utf8(&file.bytes).unwrap();
        let text = text.strip_prefix('\u{feff}').expect("byte order mark");
        text.lines().map(str::to_string).collect()
    }

    async fn seeded(dir: &TempDir) -> (Client, Producer) {
        let client = Client::in_memory(DocumentStorage::new(dir.path(), DEFAULT_MAX_BYTES));
        let producer = client
            .create::<Producer>(ProducerInput {
                nome: Some("João da Silva".into()),
                cpf_cnpj: Some("123.456.789-01".into()),
                telefone: Some("(19) 99999-0000".into()),
                email: Some("joao@example.com".into()),
                endereco: Some("Estrada Velha, km 3".into()),
                data_cadastro: None,
            })
            .await
            .unwrap();
        for (nome, area) in [("Sítio Ipê", 12.5), ("Fazenda Aurora", 1234.5)] {
            let property = client
                .create::<Property>(PropertyInput {
                    nome: Some(nome.into()),
                    municipio: Some("Campinas".into()),
                    uf: Some("SP".into()),
                    inscricao_estadual: Some("123456".into()),
                    area_total: Some(area),
                    produtor_id: Some(producer.id.clone()),
                    ..Default::default()
                })
                .await
                .unwrap();
            client
                .create::<Herd>(HerdInput {
                    especie: Some("Bovino".into()),
                    quantidade: Some(10),
                    finalidade: Some("Corte".into()),
                    data_atualizacao: Some("2025-02-01".into()),
                    propriedade_id: Some(property.id.clone()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        (client, producer)
    }

    #[test]
    fn decimals_use_brazilian_separators() {
        assert_eq!(format_decimal_br(1234.5), "1.234,50");
        assert_eq!(format_decimal_br(12.346), "12,35");
        assert_eq!(format_decimal_br(0.0), "0,00");
        assert_eq!(format_decimal_br(1_000_000.0), "1.000.000,00");
        assert_eq!(format_decimal_br(-2500.0), "-2.500,00");
    }

    #[test]
    fn file_stems_are_plain_ascii() {
        assert_eq!(file_stem("João da Silva"), "Joao_da_Silva");
        assert_eq!(file_stem("a/b\"c"), "a_b_c");
    }

    #[tokio::test]
    async fn property_sheet_lists_owners_and_formats_values() {
        let dir = TempDir::new().unwrap();
        let (client, _) = seeded(&dir).await;

        let file = client.export_properties(now()).await.unwrap();
        assert_eq!(file.file_name, "propriedades_2025-03-04_050607.csv");
        assert_eq!(file.content_type, CSV_CONTENT_TYPE);

        let lines = lines(&file);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PROPERTY_HEADINGS.join(";"));
        assert!(lines[1].contains(";Fazenda Aurora;João da Silva;12345678901;Campinas;SP;123456;1.234,50;"));
        assert!(lines[2].contains(";Sítio Ipê;João da Silva;"));
        assert!(lines[2].contains(";12,50;"));

        let created = Utc::now().date_naive().format("%d/%m/%Y").to_string();
        assert!(lines[1].ends_with(&created));
    }

    #[tokio::test]
    async fn herd_sheet_carries_totals() {
        let dir = TempDir::new().unwrap();
        let (client, producer) = seeded(&dir).await;

        let file = client.export_herds(&producer.id, now()).await.unwrap();
        assert_eq!(file.file_name, "rebanhos_Joao_da_Silva_2025-03-04_050607.csv");

        let lines = lines(&file);
        assert_eq!(lines[0], "Produtor;João da Silva");
        assert_eq!(lines[2], "Gerado em;04/03/2025 05:06:07");
        assert_eq!(lines[4], HERD_HEADINGS.join(";"));
        assert_eq!(
            lines
                .iter()
                .filter(|line| line.starts_with("Bovino;10;Corte;") && line.ends_with(";Campinas;SP;01/02/2025"))
                .count(),
            2
        );
        assert!(lines.contains(&"Bovino;20".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Total de animais;20"));
    }

    #[tokio::test]
    async fn herd_sheet_of_unknown_producer_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (client, _) = seeded(&dir).await;
        let err = client.export_herds("missing", now()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}
