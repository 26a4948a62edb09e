use chrono::Utc;
use log::{debug, info};
use serde_json::Value as JsonValue;

use super::Client;
use crate::{
    errors::{IssueCollector, RepoError},
    id::generate_entity_id,
    models::{OwnerKind, Writable},
    search::FilterCondition,
    types::EntityKind,
};

impl Client {
    /// Validates and stores a new entity.
    pub async fn create<T: Writable>(&self, input: T::Input) -> Result<T, RepoError> {
        let entity = T::build(input, generate_entity_id(), None, Utc::now())?;
        self.check_integrity(&entity).await?;
        self.collection::<T>().save(&entity).await?;
        info!("created {} {}", T::KIND.collection(), entity.id());
        Ok(entity)
    }

    /// Merges `input` over the stored entity. Absent fields keep their value.
    pub async fn update<T: Writable>(&self, id: &str, input: T::Input) -> Result<T, RepoError> {
        let repo = self.collection::<T>();
        let current = repo.get_required(id).await?;
        let entity = T::build(input, id.to_string(), Some(&current), Utc::now())?;
        self.check_integrity(&entity).await?;
        repo.save(&entity).await?;
        info!("updated {} {}", T::KIND.collection(), id);
        Ok(entity)
    }

    /// Deletes an entity with every dependent row and document.
    pub async fn delete<T: Writable>(&self, id: &str) -> Result<(), RepoError> {
        if !self.collection::<T>().exists(id).await? {
            return Err(RepoError::not_found(T::KIND, id));
        }
        self.delete_cascade(T::KIND, id).await
    }

    async fn check_integrity<T: Writable>(&self, entity: &T) -> Result<(), RepoError> {
        let mut issues = IssueCollector::new();
        for reference in entity.references() {
            let exists = self.store.get(reference.target, &reference.id).await?.is_some();
            issues.check(
                !exists,
                reference.field,
                "validation.exists",
                format!("O campo {} selecionado é inválido.", reference.field),
            );
        }
        issues.finish()?;

        if T::UNIQUE.is_empty() {
            return Ok(());
        }
        let value = serde_json::to_value(entity)?;
        for field in T::UNIQUE {
            let Some(stored) = value.get(*field).and_then(JsonValue::as_str) else {
                continue;
            };
            let holders = self
                .store
                .ids_where(T::KIND, &FilterCondition::equals(*field, stored))
                .await?;
            if let Some(existing) = holders.into_iter().find(|id| id != entity.id()) {
                return Err(RepoError::UniqueConstraintViolation {
                    field: field.to_string(),
                    value: stored.to_string(),
                    existing_entity_id: existing,
                });
            }
        }
        Ok(())
    }

    async fn delete_cascade(&self, kind: EntityKind, id: &str) -> Result<(), RepoError> {
        let mut pending = vec![(kind, id.to_string())];
        let mut doomed = Vec::new();
        while let Some((kind, id)) = pending.pop() {
            for rule in kind.cascades() {
                let condition = FilterCondition::equals(rule.foreign_key, id.as_str());
                for child in self.store.ids_where(rule.child, &condition).await? {
                    pending.push((rule.child, child));
                }
            }
            doomed.push((kind, id));
        }

        // Children were discovered after their parents.
        let dependents = doomed.len() - 1;
        for (kind, id) in doomed.into_iter().rev() {
            if let Some(owner) = OwnerKind::from_entity_kind(kind) {
                self.delete_documents_of(owner, &id).await?;
            }
            self.store.delete(kind, &id).await?;
            debug!("deleted {} {}", kind.collection(), id);
        }
        info!("deleted {} {} and {} dependent rows", kind.collection(), id, dependents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        documents::{DEFAULT_MAX_BYTES, DocumentStorage, Upload},
        models::{Herd, HerdInput, Producer, ProducerInput, ProductionUnit, ProductionUnitInput, Property, PropertyInput},
    };

    fn client(dir: &TempDir) -> Client {
        Client::in_memory(DocumentStorage::new(dir.path(), DEFAULT_MAX_BYTES))
    }

    fn producer_input(nome: &str, cpf: &str) -> ProducerInput {
        ProducerInput {
            nome: Some(nome.into()),
            cpf_cnpj: Some(cpf.into()),
            telefone: Some("(11) 3333-4444".into()),
            email: Some("contato@example.com".into()),
            endereco: Some("Zona rural".into()),
            data_cadastro: None,
        }
    }

    fn property_input(produtor_id: &str) -> PropertyInput {
        PropertyInput {
            nome: Some("Fazenda Boa Vista".into()),
            municipio: Some("Campinas".into()),
            uf: Some("SP".into()),
            area_total: Some(100.0),
            produtor_id: Some(produtor_id.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cpf_must_be_unique_after_canonicalization() {
        let dir = TempDir::new().expect("tempdir");
        let client = client(&dir);
        let first = client
            .create::<Producer>(producer_input("José", "111.222.333-44"))
            .await
            .expect("create");

        let err = client
            .create::<Producer>(producer_input("Outro", "11122233344"))
            .await
            .expect_err("duplicate");
        match err {
            RepoError::UniqueConstraintViolation {
                field,
                existing_entity_id,
                ..
            } => {
                assert_eq!(field, "cpf_cnpj");
                assert_eq!(existing_entity_id, first.id);
            }
            other => panic!("unexpected {other:?}"),
        }

        let same = client
            .update::<Producer>(&first.id, producer_input("José da Silva", "11122233344"))
            .await
            .expect("own value is allowed");
        assert_eq!(same.nome, "José da Silva");
    }

    #[tokio::test]
    async fn references_must_exist() {
        let dir = TempDir::new().expect("tempdir");
        let client = client(&dir);
        let err = client
            .create::<Property>(property_input("missing"))
            .await
            .expect_err("dangling producer");
        let RepoError::Validation(err) = err else {
            panic!("expected validation error");
        };
        assert_eq!(err.issues[0].field, "produtor_id");
        assert_eq!(err.issues[0].code, "validation.exists");
    }

    #[tokio::test]
    async fn deleting_a_producer_cascades() {
        let dir = TempDir::new().expect("tempdir");
        let client = client(&dir);
        let producer = client
            .create::<Producer>(producer_input("José", "11122233344"))
            .await
            .expect("producer");
        let property = client.create::<Property>(property_input(&producer.id)).await.expect("property");
        let unit = client
            .create::<ProductionUnit>(ProductionUnitInput {
                nome_cultura: Some("Milho".into()),
                area_total_ha: Some(10.0),
                propriedade_id: Some(property.id.clone()),
                ..Default::default()
            })
            .await
            .expect("unit");
        let herd = client
            .create::<Herd>(HerdInput {
                especie: Some("Bovino".into()),
                quantidade: Some(12),
                data_atualizacao: Some("2025-05-01".into()),
                propriedade_id: Some(property.id.clone()),
                ..Default::default()
            })
            .await
            .expect("herd");
        let document = client
            .upload_document(
                OwnerKind::Propriedade,
                &property.id,
                Some(Upload {
                    file_name: "escritura.pdf".into(),
                    bytes: b"%PDF".to_vec(),
                    categoria: Some("Escritura".into()),
                }),
            )
            .await
            .expect("document");

        client.delete::<Producer>(&producer.id).await.expect("delete");

        assert!(!client.collection::<Property>().exists(&property.id).await.expect("exists"));
        assert!(!client.collection::<ProductionUnit>().exists(&unit.id).await.expect("exists"));
        assert!(!client.collection::<Herd>().exists(&herd.id).await.expect("exists"));
        assert!(client.documents_of(OwnerKind::Propriedade, &property.id).await.expect("docs").is_empty());
        assert_eq!(client.documents().read(&document.nome_arquivo).await.expect("read"), None);

        let err = client.delete::<Producer>(&producer.id).await.expect_err("already gone");
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}
