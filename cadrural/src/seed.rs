//! Small deterministic demo data set.

use chrono::{Months, NaiveDate};
use log::info;
use serde::Serialize;

use crate::{
    client::Client,
    errors::RepoError,
    filters::digits_only,
    models::{
        CROPS, Herd, HerdInput, Producer, ProducerInput, ProductionUnit, ProductionUnitInput, Property,
        PropertyInput, SPECIES,
    },
    search::FilterCondition,
};

const FIRST_NAMES: [&str; 6] = ["João", "Maria", "José", "Ana", "Francisco", "Antônia"];
const SURNAMES: [&str; 6] = ["Silva", "Santos", "Oliveira", "Souza", "Lima", "Pereira"];
const PROPERTY_KINDS: [&str; 4] = ["Fazenda", "Sítio", "Chácara", "Estância"];
const PROPERTY_NAMES: [&str; 6] = ["Boa Esperança", "São José", "Vista Alegre", "Água Limpa", "Ipê Amarelo", "Santa Luzia"];
const MUNICIPALITIES: [(&str, &str); 5] = [
    ("Campinas", "SP"),
    ("Uberlândia", "MG"),
    ("Rio Verde", "GO"),
    ("Petrolina", "PE"),
    ("Chapecó", "SC"),
];
const PURPOSES: [&str; 3] = ["Corte", "Leite", "Reprodução"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub produtores: u64,
    pub propriedades: u64,
    pub unidades: u64,
    pub rebanhos: u64,
    /// Producers already present (matched by CPF/CNPJ) and left untouched.
    pub ignorados: u64,
}

fn months_before(today: NaiveDate, months: u32) -> String {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

fn cpf(index: usize) -> String {
    let base = 10_000_000_000u64 + (index as u64 + 1) * 1_234_567;
    let digits = format!("{base:011}");
    format!("{}.{}.{}-{}", &digits[0..3], &digits[3..6], &digits[6..9], &digits[9..11])
}

/// Inserts producers with properties, production units and herds.
///
/// Registration dates are spread over the months before `today`. Running it twice
/// skips producers whose CPF is already registered.
pub async fn seed(client: &Client, today: NaiveDate) -> Result<SeedSummary, RepoError> {
    let mut summary = SeedSummary::default();

    for (index, first_name) in FIRST_NAMES.iter().enumerate() {
        let document = cpf(index);
        let taken = client
            .collection::<Producer>()
            .count(&FilterCondition::equals("cpf_cnpj", digits_only(&document)))
            .await?;
        if taken > 0 {
            summary.ignorados += 1;
            continue;
        }

        let surname = SURNAMES[(index * 5 + 1) % SURNAMES.len()];
        let producer = client
            .create::<Producer>(ProducerInput {
                nome: Some(format!("{first_name} {surname}")),
                cpf_cnpj: Some(document),
                telefone: Some(format!("(19) 9{:04}-{:04}", 1000 + index * 37, 2000 + index * 53)),
                email: Some(format!("{}.{}@example.com", digits_only(&cpf(index)), surname.to_lowercase())),
                endereco: Some(format!("Estrada Municipal, km {}", 3 + index * 4)),
                data_cadastro: Some(months_before(today, (index * 2) as u32)),
            })
            .await?;
        summary.produtores += 1;

        for slot in 0..2 {
            let n = index * 2 + slot;
            let (municipio, uf) = MUNICIPALITIES[n % MUNICIPALITIES.len()];
            let property = client
                .create::<Property>(PropertyInput {
                    nome: Some(format!(
                        "{} {}",
                        PROPERTY_KINDS[n % PROPERTY_KINDS.len()],
                        PROPERTY_NAMES[n % PROPERTY_NAMES.len()]
                    )),
                    municipio: Some(municipio.to_string()),
                    uf: Some(uf.to_string()),
                    inscricao_estadual: (slot == 0).then(|| format!("{:09}", 100_000_000 + n * 7919)),
                    area_total: Some(25.0 + (n * 37 % 400) as f64 + 0.5),
                    data_cadastro: Some(months_before(today, n as u32)),
                    produtor_id: Some(producer.id.clone()),
                })
                .await?;
            summary.propriedades += 1;

            for unit in 0..2 {
                let m = n * 2 + unit;
                client
                    .create::<ProductionUnit>(ProductionUnitInput {
                        nome_cultura: Some(CROPS[m * 3 % CROPS.len()].to_string()),
                        area_total_ha: Some(2.0 + (m * 13 % 60) as f64 + 0.25),
                        coordenadas_geograficas: Some(format!("-22.{:04}, -47.{:04}", 1000 + m * 17, 2000 + m * 29)),
                        data_cadastro: None,
                        propriedade_id: Some(property.id.clone()),
                    })
                    .await?;
                summary.unidades += 1;

                client
                    .create::<Herd>(HerdInput {
                        especie: Some(SPECIES[m % SPECIES.len()].to_string()),
                        quantidade: Some(10 + (m as i64 * 23) % 300),
                        finalidade: Some(PURPOSES[m % PURPOSES.len()].to_string()),
                        data_atualizacao: Some(months_before(today, (m % 3) as u32)),
                        data_cadastro: None,
                        propriedade_id: Some(property.id.clone()),
                    })
                    .await?;
                summary.rebanhos += 1;
            }
        }
    }

    info!(
        "seeded {} producers, {} properties, {} units, {} herds ({} skipped)",
        summary.produtores, summary.propriedades, summary.unidades, summary.rebanhos, summary.ignorados
    );
    Ok(summary)
}
