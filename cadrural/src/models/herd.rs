use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use super::{Listed, Reference, Resource, Writable, date_or, id_field, one_of, optional_text, required_text, timestamp_field};
use crate::{
    errors::{IssueCollector, ValidationResult},
    filters::{FilterSpec, MatchStrategy},
    search::{FieldIndex, IndexedField, Listing, SortField, SortOrder},
    types::{EntityKind, RelationStep},
};

/// Species a herd may hold.
pub const SPECIES: &[&str] = &["Bovino", "Suíno", "Ovino", "Caprino", "Aves", "Equino", "Bubalino", "Outros"];

/// A livestock group kept on a property.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Herd {
    pub id: String,
    pub especie: String,
    pub quantidade: i64,
    pub finalidade: Option<String>,
    pub data_atualizacao: NaiveDate,
    pub data_cadastro: NaiveDate,
    pub propriedade_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HerdInput {
    pub especie: Option<String>,
    pub quantidade: Option<i64>,
    pub finalidade: Option<String>,
    pub data_atualizacao: Option<String>,
    pub data_cadastro: Option<String>,
    pub propriedade_id: Option<String>,
}

impl HerdInput {
    pub fn into_entity(self, id: String, current: Option<&Herd>, now: DateTime<Utc>) -> ValidationResult<Herd> {
        let mut issues = IssueCollector::new();

        let especie = required_text(&mut issues, "especie", self.especie, current.map(|h| h.especie.as_str()), 255);
        one_of(&mut issues, "especie", &especie, SPECIES);

        let quantidade = match self.quantidade.or(current.map(|h| h.quantidade)) {
            Some(quantidade) => {
                issues.check(
                    quantidade < 1,
                    "quantidade",
                    "validation.min",
                    "O campo quantidade deve ser pelo menos 1.",
                );
                quantidade
            }
            None => {
                issues.push("quantidade", "validation.required", "O campo quantidade é obrigatório.");
                0
            }
        };

        let finalidade = optional_text(
            &mut issues,
            "finalidade",
            self.finalidade,
            current.and_then(|h| h.finalidade.as_deref()),
            500,
        );

        let data_atualizacao = date_or(
            &mut issues,
            "data_atualizacao",
            self.data_atualizacao,
            current.map(|h| h.data_atualizacao),
            None,
        );
        if data_atualizacao.is_none() && !issues.has_field("data_atualizacao") {
            issues.push(
                "data_atualizacao",
                "validation.required",
                "O campo data_atualizacao é obrigatório.",
            );
        }

        let data_cadastro = date_or(
            &mut issues,
            "data_cadastro",
            self.data_cadastro,
            current.map(|h| h.data_cadastro),
            Some(now.date_naive()),
        );

        let propriedade_id = required_text(
            &mut issues,
            "propriedade_id",
            self.propriedade_id,
            current.map(|h| h.propriedade_id.as_str()),
            255,
        );

        issues.finish()?;

        Ok(Herd {
            id,
            especie,
            quantidade,
            finalidade,
            data_atualizacao: data_atualizacao.unwrap_or_else(|| now.date_naive()),
            data_cadastro: data_cadastro.unwrap_or_else(|| now.date_naive()),
            propriedade_id,
            created_at: current.map(|h| h.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

impl Resource for Herd {
    const KIND: EntityKind = EntityKind::Herd;

    const INDEXED: &'static [IndexedField] = &[
        id_field(),
        IndexedField::new("especie", FieldIndex::Text),
        IndexedField::new("quantidade", FieldIndex::Numeric),
        IndexedField::new("finalidade", FieldIndex::Text),
        IndexedField::new("propriedade_id", FieldIndex::Tag),
        timestamp_field("data_atualizacao"),
        timestamp_field("data_cadastro"),
        timestamp_field("created_at"),
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

impl Writable for Herd {
    type Input = HerdInput;

    const CREATED: &'static str = "Rebanho cadastrado com sucesso!";
    const UPDATED: &'static str = "Rebanho atualizado com sucesso!";
    const DELETED: &'static str = "Rebanho excluído com sucesso!";

    fn build(input: HerdInput, id: String, current: Option<&Self>, now: DateTime<Utc>) -> ValidationResult<Self> {
        input.into_entity(id, current, now)
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference {
            field: RelationStep::TO_PROPERTY.foreign_key,
            target: RelationStep::TO_PROPERTY.target,
            id: self.propriedade_id.clone(),
        }]
    }
}

const TO_PROPERTY: &[RelationStep] = &[RelationStep::TO_PROPERTY];
const TO_PROPERTY_PRODUCER: &[RelationStep] = &[RelationStep::TO_PROPERTY, RelationStep::TO_PRODUCER];

const FILTERS: &[FilterSpec] = &[
    FilterSpec::direct("especie", "especie", MatchStrategy::Tokens),
    FilterSpec::direct("finalidade", "finalidade", MatchStrategy::Tokens),
    FilterSpec::direct("quantidade_min", "quantidade", MatchStrategy::Min),
    FilterSpec::direct("quantidade_max", "quantidade", MatchStrategy::Max),
    FilterSpec::direct("propriedade_id", "propriedade_id", MatchStrategy::Exact),
    FilterSpec::related("propriedade_nome", TO_PROPERTY, "nome", MatchStrategy::Tokens),
    FilterSpec::related("municipio", TO_PROPERTY, "municipio", MatchStrategy::Tokens),
    FilterSpec::related("uf", TO_PROPERTY, "uf", MatchStrategy::ExactUpper),
    FilterSpec::related("produtor_id", TO_PROPERTY, "produtor_id", MatchStrategy::Exact),
    FilterSpec::related("produtor_nome", TO_PROPERTY_PRODUCER, "nome", MatchStrategy::Tokens),
    FilterSpec::direct("data_atualizacao_inicio", "data_atualizacao", MatchStrategy::DateFrom),
    FilterSpec::direct("data_atualizacao_fim", "data_atualizacao", MatchStrategy::DateTo),
    FilterSpec::direct("created_at_inicio", "created_at", MatchStrategy::DateFrom),
    FilterSpec::direct("created_at_fim", "created_at", MatchStrategy::DateTo),
];

const SORTS: &[SortField] = &[
    SortField::new("id"),
    SortField::new("especie"),
    SortField::new("quantidade"),
    SortField::new("finalidade"),
    SortField::new("data_atualizacao"),
    SortField::new("created_at"),
];

static LISTING: Listing = Listing {
    filters: FILTERS,
    sorts: SORTS,
    default_sort: SortField::new("created_at"),
    default_order: SortOrder::Desc,
    page_sizes: &[15, 25, 50, 100],
    default_page_size: 15,
};

impl Listed for Herd {
    fn listing() -> &'static Listing {
        &LISTING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> HerdInput {
        HerdInput {
            especie: Some("Bovino".into()),
            quantidade: Some(40),
            data_atualizacao: Some("2025-06-01".into()),
            propriedade_id: Some("f1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_a_valid_herd() {
        let herd = valid().into_entity("h1".into(), None, Utc::now()).expect("valid");
        assert_eq!(herd.quantidade, 40);
        assert_eq!(herd.data_atualizacao, NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"));
    }

    #[test]
    fn rejects_zero_animals_unknown_species_and_missing_update_date() {
        let err = HerdInput {
            especie: Some("Dragão".into()),
            quantidade: Some(0),
            data_atualizacao: None,
            ..valid()
        }
        .into_entity("h1".into(), None, Utc::now())
        .expect_err("invalid");
        let fields = err.by_field();
        assert!(fields.contains_key("especie"));
        assert!(fields.contains_key("quantidade"));
        assert_eq!(fields["data_atualizacao"].len(), 1);
    }

    #[test]
    fn malformed_update_date_reports_once() {
        let err = HerdInput {
            data_atualizacao: Some("ontem".into()),
            ..valid()
        }
        .into_entity("h1".into(), None, Utc::now())
        .expect_err("invalid");
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].code, "validation.date");
    }
}
