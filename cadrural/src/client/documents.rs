use chrono::Utc;
use log::{info, warn};

use super::Client;
use crate::{
    documents::Upload,
    errors::RepoError,
    id::generate_entity_id,
    models::{Document, OwnerKind},
    search::FilterCondition,
};

impl Client {
    /// Validates and stores an uploaded file for a producer or property.
    pub async fn upload_document(
        &self,
        owner: OwnerKind,
        owner_id: &str,
        upload: Option<Upload>,
    ) -> Result<Document, RepoError> {
        let owner_kind = owner.entity_kind();
        if self.store.get(owner_kind, owner_id).await?.is_none() {
            return Err(RepoError::not_found(owner_kind, owner_id));
        }

        let accepted = self.documents.validate(upload.as_ref())?;
        let upload = upload.ok_or_else(|| RepoError::InvalidRequest {
            message: "missing upload".to_string(),
        })?;
        let nome_arquivo = self.documents.store(accepted.extension, &upload.bytes).await?;

        let now = Utc::now();
        let document = Document {
            id: generate_entity_id(),
            documentavel_tipo: owner,
            documentavel_id: owner_id.to_string(),
            nome_original: upload.file_name,
            nome_arquivo,
            tipo: accepted.mime.to_string(),
            tamanho: upload.bytes.len() as u64,
            categoria: accepted.categoria,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.collection::<Document>().save(&document).await {
            if let Err(cleanup) = self.documents.remove(&document.nome_arquivo).await {
                warn!("could not remove orphaned file {}: {cleanup}", document.nome_arquivo);
            }
            return Err(err);
        }
        info!("stored document {} for {} {}", document.id, owner, owner_id);
        Ok(document)
    }

    /// Documents attached to an owner, newest first.
    pub async fn documents_of(&self, owner: OwnerKind, owner_id: &str) -> Result<Vec<Document>, RepoError> {
        let condition = FilterCondition::and([
            FilterCondition::equals("documentavel_tipo", owner.as_str()),
            FilterCondition::equals("documentavel_id", owner_id),
        ]);
        let mut documents = self.collection::<Document>().find_all(&condition).await?;
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(documents)
    }

    /// The document record and the bytes of its stored file.
    pub async fn download_document(&self, id: &str) -> Result<(Document, Vec<u8>), RepoError> {
        let document = self.collection::<Document>().get_required(id).await?;
        let bytes = self
            .documents
            .read(&document.nome_arquivo)
            .await?
            .ok_or_else(|| RepoError::FileMissing {
                name: document.nome_arquivo.clone(),
            })?;
        Ok((document, bytes))
    }

    /// Removes the stored file if present, then the record.
    pub async fn delete_document(&self, id: &str) -> Result<(), RepoError> {
        let document = self.collection::<Document>().get_required(id).await?;
        self.documents.remove(&document.nome_arquivo).await?;
        self.collection::<Document>().delete(id).await?;
        info!("deleted document {id}");
        Ok(())
    }

    pub(super) async fn delete_documents_of(&self, owner: OwnerKind, owner_id: &str) -> Result<(), RepoError> {
        for document in self.documents_of(owner, owner_id).await? {
            self.documents.remove(&document.nome_arquivo).await?;
            self.collection::<Document>().delete(&document.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        documents::{DEFAULT_MAX_BYTES, DocumentStorage},
        models::{Producer, ProducerInput},
    };

    async fn setup(dir: &TempDir) -> (Client, Producer) {
        let client = Client::in_memory(DocumentStorage::new(dir.path(), DEFAULT_MAX_BYTES));
        let producer = client
            .create::<Producer>(ProducerInput {
                nome: Some("Maria Souza".into()),
                cpf_cnpj: Some("55566677788".into()),
                telefone: Some("11 90000-0000".into()),
                email: Some("maria@example.com".into()),
                endereco: Some("Sítio das Flores".into()),
                data_cadastro: None,
            })
            .await
            .expect("producer");
        (client, producer)
    }

    fn upload(name: &str) -> Option<Upload> {
        Some(Upload {
            file_name: name.into(),
            bytes: vec![7; 2048],
            categoria: Some("RG".into()),
        })
    }

    #[tokio::test]
    async fn upload_download_and_delete() {
        let dir = TempDir::new().expect("tempdir");
        let (client, producer) = setup(&dir).await;

        let document = client
            .upload_document(OwnerKind::Produtor, &producer.id, upload("rg.png"))
            .await
            .expect("upload");
        assert_eq!(document.tipo, "image/png");
        assert_eq!(document.tamanho, 2048);
        assert_eq!(document.nome_original, "rg.png");
        assert_ne!(document.nome_arquivo, "rg.png");

        let (found, bytes) = client.download_document(&document.id).await.expect("download");
        assert_eq!(found, document);
        assert_eq!(bytes.len(), 2048);

        client.delete_document(&document.id).await.expect("delete");
        assert!(client.documents_of(OwnerKind::Produtor, &producer.id).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_reported_and_record_still_deletable() {
        let dir = TempDir::new().expect("tempdir");
        let (client, producer) = setup(&dir).await;
        let document = client
            .upload_document(OwnerKind::Produtor, &producer.id, upload("rg.jpg"))
            .await
            .expect("upload");
        client.documents().remove(&document.nome_arquivo).await.expect("remove file");

        let err = client.download_document(&document.id).await.expect_err("file gone");
        assert!(matches!(err, RepoError::FileMissing { .. }));
        client.delete_document(&document.id).await.expect("record removed");
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let (client, _) = setup(&dir).await;
        let err = client
            .upload_document(OwnerKind::Propriedade, "nope", upload("a.pdf"))
            .await
            .expect_err("no owner");
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}
