use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use super::{
    Listed, MAX_AREA, Reference, Resource, Writable, bounded_number, date_or, id_field, one_of, optional_text, required_text,
    timestamp_field,
};
use crate::{
    errors::{IssueCollector, ValidationResult},
    filters::{FilterSpec, MatchStrategy},
    search::{FieldIndex, IndexedField, Listing, SortField, SortOrder},
    types::{EntityKind, RelationStep},
};

/// Crops a production unit may grow.
pub const CROPS: &[&str] = &[
    "Laranja Pera",
    "Melancia Crimson Sweet",
    "Goiaba Paluma",
    "Manga",
    "Banana",
    "Coco",
    "Abacaxi",
    "Maracujá",
    "Limão",
    "Acerola",
    "Caju",
    "Mamão",
    "Milho",
    "Feijão",
    "Mandioca",
    "Batata Doce",
    "Cana-de-açúcar",
    "Arroz",
    "Hortaliças",
    "Outras Culturas",
];

/// A crop allocation within a property.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionUnit {
    pub id: String,
    pub nome_cultura: String,
    pub area_total_ha: f64,
    pub coordenadas_geograficas: Option<String>,
    pub data_cadastro: NaiveDate,
    pub propriedade_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductionUnitInput {
    pub nome_cultura: Option<String>,
    pub area_total_ha: Option<f64>,
    pub coordenadas_geograficas: Option<String>,
    pub data_cadastro: Option<String>,
    pub propriedade_id: Option<String>,
}

impl ProductionUnitInput {
    pub fn into_entity(
        self,
        id: String,
        current: Option<&ProductionUnit>,
        now: DateTime<Utc>,
    ) -> ValidationResult<ProductionUnit> {
        let mut issues = IssueCollector::new();

        let nome_cultura = required_text(
            &mut issues,
            "nome_cultura",
            self.nome_cultura,
            current.map(|u| u.nome_cultura.as_str()),
            255,
        );
        one_of(&mut issues, "nome_cultura", &nome_cultura, CROPS);

        let area_total_ha = bounded_number(
            &mut issues,
            "area_total_ha",
            self.area_total_ha,
            current.map(|u| u.area_total_ha),
            0.0,
            MAX_AREA,
        );

        let coordenadas_geograficas = optional_text(
            &mut issues,
            "coordenadas_geograficas",
            self.coordenadas_geograficas,
            current.and_then(|u| u.coordenadas_geograficas.as_deref()),
            255,
        );

        let data_cadastro = date_or(
            &mut issues,
            "data_cadastro",
            self.data_cadastro,
            current.map(|u| u.data_cadastro),
            Some(now.date_naive()),
        );

        let propriedade_id = required_text(
            &mut issues,
            "propriedade_id",
            self.propriedade_id,
            current.map(|u| u.propriedade_id.as_str()),
            255,
        );

        issues.finish()?;

        Ok(ProductionUnit {
            id,
            nome_cultura,
            area_total_ha,
            coordenadas_geograficas,
            data_cadastro: data_cadastro.unwrap_or_else(|| now.date_naive()),
            propriedade_id,
            created_at: current.map(|u| u.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

impl Resource for ProductionUnit {
    const KIND: EntityKind = EntityKind::ProductionUnit;

    const INDEXED: &'static [IndexedField] = &[
        id_field(),
        IndexedField::new("nome_cultura", FieldIndex::Text),
        IndexedField::new("area_total_ha", FieldIndex::Numeric),
        IndexedField::new("coordenadas_geograficas", FieldIndex::Phrase),
        IndexedField::new("propriedade_id", FieldIndex::Tag),
        timestamp_field("data_cadastro"),
        timestamp_field("created_at"),
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

impl Writable for ProductionUnit {
    type Input = ProductionUnitInput;

    const CREATED: &'static str = "Unidade de produção cadastrada com sucesso!";
    const UPDATED: &'static str = "Unidade de produção atualizada com sucesso!";
    const DELETED: &'static str = "Unidade de produção excluída com sucesso!";

    fn build(
        input: ProductionUnitInput,
        id: String,
        current: Option<&Self>,
        now: DateTime<Utc>,
    ) -> ValidationResult<Self> {
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
    FilterSpec::direct("nome_cultura", "nome_cultura", MatchStrategy::Tokens),
    FilterSpec::direct("area_total_ha_min", "area_total_ha", MatchStrategy::Min),
    FilterSpec::direct("area_total_ha_max", "area_total_ha", MatchStrategy::Max),
    FilterSpec::direct("coordenadas_geograficas", "coordenadas_geograficas", MatchStrategy::Phrase),
    FilterSpec::direct("propriedade_id", "propriedade_id", MatchStrategy::Exact),
    FilterSpec::related("propriedade_nome", TO_PROPERTY, "nome", MatchStrategy::Tokens),
    FilterSpec::related("municipio", TO_PROPERTY, "municipio", MatchStrategy::Tokens),
    FilterSpec::related("uf", TO_PROPERTY, "uf", MatchStrategy::ExactUpper),
    FilterSpec::related("produtor_id", TO_PROPERTY, "produtor_id", MatchStrategy::Exact),
    FilterSpec::related("produtor_nome", TO_PROPERTY_PRODUCER, "nome", MatchStrategy::Tokens),
    FilterSpec::direct("created_at_inicio", "created_at", MatchStrategy::DateFrom),
    FilterSpec::direct("created_at_fim", "created_at", MatchStrategy::DateTo),
];

const SORTS: &[SortField] = &[
    SortField::new("id"),
    SortField::new("nome_cultura"),
    SortField::new("area_total_ha"),
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

impl Listed for ProductionUnit {
    fn listing() -> &'static Listing {
        &LISTING
    }
}
