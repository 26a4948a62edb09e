use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use super::{Listed, Resource, Writable, date_or, id_field, required_text, timestamp_field};
use crate::{
    errors::{IssueCollector, ValidationResult},
    filters::{FilterSpec, MatchStrategy, digits_only},
    search::{FieldIndex, IndexedField, Listing, SortField, SortOrder},
    types::EntityKind,
    validators::{char_len, is_valid_email},
};

/// A rural producer (person or company) owning properties.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub id: String,
    pub nome: String,
    /// Digits only.
    pub cpf_cnpj: String,
    pub telefone: String,
    pub email: String,
    pub endereco: String,
    pub data_cadastro: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. Absent fields keep their current value on update.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProducerInput {
    pub nome: Option<String>,
    pub cpf_cnpj: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub endereco: Option<String>,
    pub data_cadastro: Option<String>,
}

impl ProducerInput {
    /// Validates the payload against `current` (for updates) and builds the entity.
    pub fn into_entity(self, id: String, current: Option<&Producer>, now: DateTime<Utc>) -> ValidationResult<Producer> {
        let mut issues = IssueCollector::new();

        let nome = required_text(&mut issues, "nome", self.nome, current.map(|p| p.nome.as_str()), 255);

        let cpf_raw = required_text(
            &mut issues,
            "cpf_cnpj",
            self.cpf_cnpj,
            current.map(|p| p.cpf_cnpj.as_str()),
            18,
        );
        let cpf_cnpj = digits_only(&cpf_raw);
        issues.check(
            !cpf_raw.is_empty() && cpf_cnpj.is_empty(),
            "cpf_cnpj",
            "validation.digits",
            "O campo cpf_cnpj deve conter dígitos.",
        );

        let telefone = required_text(&mut issues, "telefone", self.telefone, current.map(|p| p.telefone.as_str()), 20);

        let email = required_text(&mut issues, "email", self.email, current.map(|p| p.email.as_str()), 255).to_lowercase();
        issues.check(
            !email.is_empty() && char_len(&email) <= 255 && !is_valid_email(&email),
            "email",
            "validation.email",
            "O campo email deve ser um endereço de e-mail válido.",
        );

        let endereco = required_text(&mut issues, "endereco", self.endereco, current.map(|p| p.endereco.as_str()), usize::MAX);

        let data_cadastro = date_or(
            &mut issues,
            "data_cadastro",
            self.data_cadastro,
            current.map(|p| p.data_cadastro),
            Some(now.date_naive()),
        );

        issues.finish()?;

        Ok(Producer {
            id,
            nome,
            cpf_cnpj,
            telefone,
            email,
            endereco,
            data_cadastro: data_cadastro.unwrap_or_else(|| now.date_naive()),
            created_at: current.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

impl Resource for Producer {
    const KIND: EntityKind = EntityKind::Producer;

    const INDEXED: &'static [IndexedField] = &[
        id_field(),
        IndexedField::new("nome", FieldIndex::Text),
        IndexedField::new("cpf_cnpj", FieldIndex::Digits),
        IndexedField::new("telefone", FieldIndex::Digits),
        IndexedField::new("email", FieldIndex::Text),
        IndexedField::new("endereco", FieldIndex::Text),
        timestamp_field("data_cadastro"),
        timestamp_field("created_at"),
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

impl Writable for Producer {
    type Input = ProducerInput;

    const UNIQUE: &'static [&'static str] = &["cpf_cnpj"];

    const CREATED: &'static str = "Produtor rural cadastrado com sucesso!";
    const UPDATED: &'static str = "Produtor rural atualizado com sucesso!";
    const DELETED: &'static str = "Produtor rural excluído com sucesso!";

    fn build(input: ProducerInput, id: String, current: Option<&Self>, now: DateTime<Utc>) -> ValidationResult<Self> {
        input.into_entity(id, current, now)
    }
}

const FILTERS: &[FilterSpec] = &[
    FilterSpec::direct("nome", "nome", MatchStrategy::Tokens),
    FilterSpec::direct("cpf_cnpj", "cpf_cnpj", MatchStrategy::DigitsPrefix),
    FilterSpec::direct("endereco", "endereco", MatchStrategy::Tokens),
    FilterSpec::direct("telefone", "telefone", MatchStrategy::DigitsContains),
    FilterSpec::direct("email", "email", MatchStrategy::Tokens),
    FilterSpec::direct("data_cadastro_inicio", "data_cadastro", MatchStrategy::DateFrom),
    FilterSpec::direct("data_cadastro_fim", "data_cadastro", MatchStrategy::DateTo),
];

const SORTS: &[SortField] = &[
    SortField::new("nome"),
    SortField::new("cpf_cnpj"),
    SortField::new("telefone"),
    SortField::new("email"),
    SortField::new("endereco"),
    SortField::new("data_cadastro"),
    SortField::new("created_at"),
];

static LISTING: Listing = Listing {
    filters: FILTERS,
    sorts: SORTS,
    default_sort: SortField::new("nome"),
    default_order: SortOrder::Asc,
    page_sizes: &[10, 15, 25, 50, 100],
    default_page_size: 15,
};

impl Listed for Producer {
    fn listing() -> &'static Listing {
        &LISTING
    }
}
