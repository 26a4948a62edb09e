use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use super::{
    Listed, MAX_AREA, Reference, Resource, Writable, bounded_number, date_or, id_field, optional_text,
    required_text, timestamp_field,
};
use crate::{
    errors::{IssueCollector, ValidationResult},
    filters::{FilterSpec, MatchStrategy},
    search::{FieldIndex, IndexedField, Listing, SortField, SortOrder},
    types::{EntityKind, RelationStep},
    validators::is_valid_uf,
};

/// A parcel of land owned by a producer.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub nome: String,
    pub municipio: String,
    pub uf: String,
    pub inscricao_estadual: Option<String>,
    pub area_total: f64,
    pub data_cadastro: NaiveDate,
    pub produtor_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PropertyInput {
    pub nome: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub inscricao_estadual: Option<String>,
    pub area_total: Option<f64>,
    pub data_cadastro: Option<String>,
    pub produtor_id: Option<String>,
}

impl PropertyInput {
    /// Validates field shapes; the producer reference is checked against the store by the caller.
    pub fn into_entity(self, id: String, current: Option<&Property>, now: DateTime<Utc>) -> ValidationResult<Property> {
        let mut issues = IssueCollector::new();

        let nome = required_text(&mut issues, "nome", self.nome, current.map(|p| p.nome.as_str()), 255);
        let municipio = required_text(
            &mut issues,
            "municipio",
            self.municipio,
            current.map(|p| p.municipio.as_str()),
            255,
        );

        let uf = required_text(&mut issues, "uf", self.uf, current.map(|p| p.uf.as_str()), 2).to_uppercase();
        issues.check(
            !uf.is_empty() && !is_valid_uf(&uf),
            "uf",
            "validation.size",
            "O campo uf deve ter exatamente 2 letras.",
        );

        let inscricao_estadual = optional_text(
            &mut issues,
            "inscricao_estadual",
            self.inscricao_estadual,
            current.and_then(|p| p.inscricao_estadual.as_deref()),
            50,
        );

        let area_total = bounded_number(
            &mut issues,
            "area_total",
            self.area_total,
            current.map(|p| p.area_total),
            0.0,
            MAX_AREA,
        );

        let data_cadastro = date_or(
            &mut issues,
            "data_cadastro",
            self.data_cadastro,
            current.map(|p| p.data_cadastro),
            Some(now.date_naive()),
        );

        let produtor_id = required_text(
            &mut issues,
            "produtor_id",
            self.produtor_id,
            current.map(|p| p.produtor_id.as_str()),
            255,
        );

        issues.finish()?;

        Ok(Property {
            id,
            nome,
            municipio,
            uf,
            inscricao_estadual,
            area_total,
            data_cadastro: data_cadastro.unwrap_or_else(|| now.date_naive()),
            produtor_id,
            created_at: current.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

impl Resource for Property {
    const KIND: EntityKind = EntityKind::Property;

    const INDEXED: &'static [IndexedField] = &[
        id_field(),
        IndexedField::new("nome", FieldIndex::Text),
        IndexedField::new("municipio", FieldIndex::Text),
        IndexedField::new("uf", FieldIndex::Tag),
        IndexedField::new("inscricao_estadual", FieldIndex::Digits),
        IndexedField::new("area_total", FieldIndex::Numeric),
        IndexedField::new("produtor_id", FieldIndex::Tag),
        timestamp_field("data_cadastro"),
        timestamp_field("created_at"),
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

impl Writable for Property {
    type Input = PropertyInput;

    const CREATED: &'static str = "Propriedade cadastrada com sucesso!";
    const UPDATED: &'static str = "Propriedade atualizada com sucesso!";
    const DELETED: &'static str = "Propriedade excluída com sucesso!";

    fn build(input: PropertyInput, id: String, current: Option<&Self>, now: DateTime<Utc>) -> ValidationResult<Self> {
        input.into_entity(id, current, now)
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference {
            field: RelationStep::TO_PRODUCER.foreign_key,
            target: RelationStep::TO_PRODUCER.target,
            id: self.produtor_id.clone(),
        }]
    }
}

const TO_PRODUCER: &[RelationStep] = &[RelationStep::TO_PRODUCER];

const FILTERS: &[FilterSpec] = &[
    FilterSpec::direct("nome", "nome", MatchStrategy::Tokens),
    FilterSpec::direct("municipio", "municipio", MatchStrategy::Tokens),
    FilterSpec::direct("uf", "uf", MatchStrategy::ExactUpper),
    FilterSpec::direct("inscricao_estadual", "inscricao_estadual", MatchStrategy::DigitsPrefix),
    FilterSpec::direct("area_total_min", "area_total", MatchStrategy::Min),
    FilterSpec::direct("area_total_max", "area_total", MatchStrategy::Max),
    FilterSpec::direct("produtor_id", "produtor_id", MatchStrategy::Exact),
    FilterSpec::related("produtor_nome", TO_PRODUCER, "nome", MatchStrategy::Tokens),
    FilterSpec::direct("created_at_inicio", "created_at", MatchStrategy::DateFrom),
    FilterSpec::direct("created_at_fim", "created_at", MatchStrategy::DateTo),
];

const SORTS: &[SortField] = &[
    SortField::new("nome"),
    SortField::new("municipio"),
    SortField::new("uf"),
    SortField::new("inscricao_estadual"),
    SortField::new("area_total"),
    SortField::new("created_at"),
];

static LISTING: Listing = Listing {
    filters: FILTERS,
    sorts: SORTS,
    default_sort: SortField::new("nome"),
    default_order: SortOrder::Asc,
    page_sizes: &[15, 25, 50, 100],
    default_page_size: 15,
};

impl Listed for Property {
    fn listing() -> &'static Listing {
        &LISTING
    }
}
