use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use super::{Resource, id_field, timestamp_field};
use crate::{
    search::{FieldIndex, IndexedField},
    types::EntityKind,
};

/// Entity kinds a document may be attached to.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Produtor,
    Propriedade,
}

impl OwnerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Produtor => "produtor",
            OwnerKind::Propriedade => "propriedade",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "produtor" => Some(OwnerKind::Produtor),
            "propriedade" => Some(OwnerKind::Propriedade),
            _ => None,
        }
    }

    pub const fn entity_kind(self) -> EntityKind {
        match self {
            OwnerKind::Produtor => EntityKind::Producer,
            OwnerKind::Propriedade => EntityKind::Property,
        }
    }

    pub fn from_entity_kind(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Producer => Some(OwnerKind::Produtor),
            EntityKind::Property => Some(OwnerKind::Propriedade),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    #[serde(rename = "CPF")]
    Cpf,
    #[serde(rename = "CNPJ")]
    Cnpj,
    #[serde(rename = "RG")]
    Rg,
    Escritura,
    Foto,
    Outros,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 6] = [
        DocumentCategory::Cpf,
        DocumentCategory::Cnpj,
        DocumentCategory::Rg,
        DocumentCategory::Escritura,
        DocumentCategory::Foto,
        DocumentCategory::Outros,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentCategory::Cpf => "CPF",
            DocumentCategory::Cnpj => "CNPJ",
            DocumentCategory::Rg => "RG",
            DocumentCategory::Escritura => "Escritura",
            DocumentCategory::Foto => "Foto",
            DocumentCategory::Outros => "Outros",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == raw.trim())
    }
}

/// An uploaded file attached to a producer or property.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub documentavel_tipo: OwnerKind,
    pub documentavel_id: String,
    pub nome_original: String,
    /// Generated name under the storage root.
    pub nome_arquivo: String,
    /// MIME type.
    pub tipo: String,
    /// Size in bytes.
    pub tamanho: u64,
    pub categoria: Option<DocumentCategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_imagem(&self) -> bool {
        matches!(self.tipo.as_str(), "image/jpeg" | "image/jpg" | "image/png")
    }

    pub fn is_pdf(&self) -> bool {
        self.tipo == "application/pdf"
    }

    pub fn tamanho_formatado(&self) -> String {
        format_file_size(self.tamanho)
    }

    pub fn view(self) -> DocumentView {
        DocumentView {
            tamanho_formatado: self.tamanho_formatado(),
            is_imagem: self.is_imagem(),
            is_pdf: self.is_pdf(),
            document: self,
        }
    }
}

impl Resource for Document {
    const KIND: EntityKind = EntityKind::Document;

    const INDEXED: &'static [IndexedField] = &[
        id_field(),
        IndexedField::new("documentavel_tipo", FieldIndex::Tag),
        IndexedField::new("documentavel_id", FieldIndex::Tag),
        IndexedField::new("nome_original", FieldIndex::Text),
        timestamp_field("created_at"),
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

/// Wire form of a document with derived display fields.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub tamanho_formatado: String,
    pub is_imagem: bool,
    pub is_pdf: bool,
}

/// Format file size in human-readable format
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB"];

    if size < 1024 {
        return format!("{size} bytes");
    }

    let mut size_f = size as f64 / 1024.0;
    let mut unit_index = 0;

    while size_f >= 1024.0 && unit_index < UNITS.len() - 1 {
        size_f /= 1024.0;
        unit_index += 1;
    }

    format!("{size_f:.2} {}", UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 bytes");
        assert_eq!(format_file_size(1023), "1023 bytes");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(1_048_576), "1.00 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5120.00 MB");
    }

    #[test]
    fn view_flattens_derived_fields() {
        let now = Utc::now();
        let document = Document {
            id: "d1".into(),
            documentavel_tipo: OwnerKind::Produtor,
            documentavel_id: "p1".into(),
            nome_original: "rg.png".into(),
            nome_arquivo: "abc.png".into(),
            tipo: "image/png".into(),
            tamanho: 2048,
            categoria: Some(DocumentCategory::Rg),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(document.view()).expect("serializes");
        assert_eq!(json["documentavel_tipo"], "produtor");
        assert_eq!(json["categoria"], "RG");
        assert_eq!(json["tamanho_formatado"], "2.00 KB");
        assert_eq!(json["is_imagem"], true);
        assert_eq!(json["is_pdf"], false);
    }

    #[test]
    fn owner_and_category_parse() {
        assert_eq!(OwnerKind::parse("Propriedade"), Some(OwnerKind::Propriedade));
        assert_eq!(OwnerKind::parse("rebanho"), None);
        assert_eq!(OwnerKind::Produtor.entity_kind(), EntityKind::Producer);
        assert_eq!(DocumentCategory::parse("Escritura"), Some(DocumentCategory::Escritura));
        assert_eq!(DocumentCategory::parse("cpf"), None);
    }
}
