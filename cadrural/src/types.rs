use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// Every collection persisted by cadrural.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Producer,
    Property,
    ProductionUnit,
    Herd,
    Document,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Producer,
        EntityKind::Property,
        EntityKind::ProductionUnit,
        EntityKind::Herd,
        EntityKind::Document,
    ];

    /// Collection name used for storage keys and index names.
    #[inline]
    pub const fn collection(self) -> &'static str {
        match self {
            EntityKind::Producer => "produtores_rurais",
            EntityKind::Property => "propriedades",
            EntityKind::ProductionUnit => "unidades_producao",
            EntityKind::Herd => "rebanhos",
            EntityKind::Document => "documentos",
        }
    }

    /// Singular label used in messages.
    #[inline]
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Producer => "produtor rural",
            EntityKind::Property => "propriedade",
            EntityKind::ProductionUnit => "unidade de produção",
            EntityKind::Herd => "rebanho",
            EntityKind::Document => "documento",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One existence step across a belongs-to relationship: read `foreign_key` on the
/// current row and continue on the `target` row it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationStep {
    pub foreign_key: &'static str,
    pub target: EntityKind,
}

impl RelationStep {
    pub const TO_PRODUCER: RelationStep = RelationStep {
        foreign_key: "produtor_id",
        target: EntityKind::Producer,
    };

    pub const TO_PROPERTY: RelationStep = RelationStep {
        foreign_key: "propriedade_id",
        target: EntityKind::Property,
    };
}

/// Child collections removed together with a parent row.
#[derive(Debug, Clone, Copy)]
pub struct CascadeRule {
    pub child: EntityKind,
    pub foreign_key: &'static str,
}

impl EntityKind {
    pub const fn cascades(self) -> &'static [CascadeRule] {
        const PRODUCER: &[CascadeRule] = &[CascadeRule {
            child: EntityKind::Property,
            foreign_key: "produtor_id",
        }];
        const PROPERTY: &[CascadeRule] = &[
            CascadeRule {
                child: EntityKind::ProductionUnit,
                foreign_key: "propriedade_id",
            },
            CascadeRule {
                child: EntityKind::Herd,
                foreign_key: "propriedade_id",
            },
        ];
        match self {
            EntityKind::Producer => PRODUCER,
            EntityKind::Property => PROPERTY,
            _ => &[],
        }
    }
}
