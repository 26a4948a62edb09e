use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use super::Client;
use crate::{
    errors::RepoError,
    models::{Herd, Listed, Producer, ProductionUnit, Property, Writable, format_hectares},
    search::{FilterCondition, eval::field_text},
    store::Store,
    types::EntityKind,
};

/// A listed entity with the related figures shown next to it.
#[async_trait]
pub trait Presented: Listed + Writable {
    type Row: Serialize + Send;

    async fn present(client: &Client, items: Vec<Self>) -> Result<Vec<Self::Row>, RepoError>;
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct ProducerRow {
    #[serde(flatten)]
    pub producer: Producer,
    pub total_propriedades: u64,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct PropertyRow {
    #[serde(flatten)]
    pub property: Property,
    pub produtor_nome: Option<String>,
    pub total_unidades: u64,
    pub total_rebanhos: u64,
    pub area_total_formatada: String,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct ProductionUnitRow {
    #[serde(flatten)]
    pub unit: ProductionUnit,
    pub propriedade_nome: Option<String>,
    pub produtor_nome: Option<String>,
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct HerdRow {
    #[serde(flatten)]
    pub herd: Herd,
    pub propriedade_nome: Option<String>,
    pub produtor_nome: Option<String>,
}

/// Per-request cache of related rows.
struct Lookup<'a> {
    store: &'a dyn Store,
    rows: HashMap<(EntityKind, String), Option<JsonValue>>,
}

impl<'a> Lookup<'a> {
    fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            rows: HashMap::new(),
        }
    }

    async fn field(&mut self, kind: EntityKind, id: &str, field: &str) -> Result<Option<String>, RepoError> {
        let key = (kind, id.to_string());
        if !self.rows.contains_key(&key) {
            let row = self.store.get(kind, id).await?;
            self.rows.insert(key.clone(), row);
        }
        Ok(self
            .rows
            .get(&key)
            .and_then(Option::as_ref)
            .and_then(|row| field_text(row, field)))
    }

    /// Property and producer names reached from a property id.
    async fn owner_names(&mut self, propriedade_id: &str) -> Result<(Option<String>, Option<String>), RepoError> {
        let propriedade_nome = self.field(EntityKind::Property, propriedade_id, "nome").await?;
        let produtor_nome = match self.field(EntityKind::Property, propriedade_id, "produtor_id").await? {
            Some(produtor_id) => self.field(EntityKind::Producer, &produtor_id, "nome").await?,
            None => None,
        };
        Ok((propriedade_nome, produtor_nome))
    }
}

async fn count_children(client: &Client, kind: EntityKind, foreign_key: &str, id: &str) -> Result<u64, RepoError> {
    client.store.count(kind, &FilterCondition::equals(foreign_key, id)).await
}

#[async_trait]
impl Presented for Producer {
    type Row = ProducerRow;

    async fn present(client: &Client, items: Vec<Self>) -> Result<Vec<ProducerRow>, RepoError> {
        let mut rows = Vec::with_capacity(items.len());
        for producer in items {
            let total_propriedades = count_children(client, EntityKind::Property, "produtor_id", &producer.id).await?;
            rows.push(ProducerRow {
                producer,
                total_propriedades,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl Presented for Property {
    type Row = PropertyRow;

    async fn present(client: &Client, items: Vec<Self>) -> Result<Vec<PropertyRow>, RepoError> {
        let mut lookup = Lookup::new(client.store.as_ref());
        let mut rows = Vec::with_capacity(items.len());
        for property in items {
            let produtor_nome = lookup.field(EntityKind::Producer, &property.produtor_id, "nome").await?;
            let total_unidades =
                count_children(client, EntityKind::ProductionUnit, "propriedade_id", &property.id).await?;
            let total_rebanhos = count_children(client, EntityKind::Herd, "propriedade_id", &property.id).await?;
            rows.push(PropertyRow {
                area_total_formatada: format_hectares(property.area_total),
                property,
                produtor_nome,
                total_unidades,
                total_rebanhos,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl Presented for ProductionUnit {
    type Row = ProductionUnitRow;

    async fn present(client: &Client, items: Vec<Self>) -> Result<Vec<ProductionUnitRow>, RepoError> {
        let mut lookup = Lookup::new(client.store.as_ref());
        let mut rows = Vec::with_capacity(items.len());
        for unit in items {
            let (propriedade_nome, produtor_nome) = lookup.owner_names(&unit.propriedade_id).await?;
            rows.push(ProductionUnitRow {
                unit,
                propriedade_nome,
                produtor_nome,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl Presented for Herd {
    type Row = HerdRow;

    async fn present(client: &Client, items: Vec<Self>) -> Result<Vec<HerdRow>, RepoError> {
        let mut lookup = Lookup::new(client.store.as_ref());
        let mut rows = Vec::with_capacity(items.len());
        for herd in items {
            let (propriedade_nome, produtor_nome) = lookup.owner_names(&herd.propriedade_id).await?;
            rows.push(HerdRow {
                herd,
                propriedade_nome,
                produtor_nome,
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        documents::{DEFAULT_MAX_BYTES, DocumentStorage},
        models::{HerdInput, ProducerInput, PropertyInput},
    };

    #[tokio::test]
    async fn rows_carry_related_names_and_counts() {
        let dir = TempDir::new().expect("tempdir");
        let client = Client::in_memory(DocumentStorage::new(dir.path(), DEFAULT_MAX_BYTES));
        let producer = client
            .create::<Producer>(ProducerInput {
                nome: Some("José da Silva".into()),
                cpf_cnpj: Some("11122233344".into()),
                telefone: Some("11 3333-4444".into()),
                email: Some("jose@example.com".into()),
                endereco: Some("Estrada Velha".into()),
                data_cadastro: None,
            })
            .await
            .expect("producer");
        let property = client
            .create::<Property>(PropertyInput {
                nome: Some("Fazenda Boa Vista".into()),
                municipio: Some("Campinas".into()),
                uf: Some("SP".into()),
                area_total: Some(1234.5),
                produtor_id: Some(producer.id.clone()),
                ..Default::default()
            })
            .await
            .expect("property");
        let herd = client
            .create::<Herd>(HerdInput {
                especie: Some("Aves".into()),
                quantidade: Some(300),
                data_atualizacao: Some("2025-08-01".into()),
                propriedade_id: Some(property.id.clone()),
                ..Default::default()
            })
            .await
            .expect("herd");

        let producers = Producer::present(&client, vec![producer]).await.expect("rows");
        assert_eq!(producers[0].total_propriedades, 1);

        let properties = Property::present(&client, vec![property]).await.expect("rows");
        assert_eq!(properties[0].produtor_nome.as_deref(), Some("José da Silva"));
        assert_eq!(properties[0].total_rebanhos, 1);
        assert_eq!(properties[0].total_unidades, 0);
        assert_eq!(properties[0].area_total_formatada, "1.234,50 ha");

        let herds = Herd::present(&client, vec![herd]).await.expect("rows");
        let json = serde_json::to_value(&herds[0]).expect("serialize");
        assert_eq!(json["especie"], "Aves");
        assert_eq!(json["propriedade_nome"], "Fazenda Boa Vista");
        assert_eq!(json["produtor_nome"], "José da Silva");
    }
}
