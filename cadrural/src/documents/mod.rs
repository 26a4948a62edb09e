//! File storage for uploaded documents.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    errors::{IssueCollector, RepoError, ValidationResult},
    id::generate_stored_name,
    models::DocumentCategory,
};

/// Default upload limit: 5 MB.
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Accepted extensions and the MIME type recorded for each.
const ACCEPTED: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub categoria: Option<String>,
}

/// An upload that passed validation.
#[derive(Debug, Clone)]
pub struct AcceptedUpload {
    pub extension: &'static str,
    pub mime: &'static str,
    pub categoria: Option<DocumentCategory>,
}

/// Directory holding stored document files.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    root: PathBuf,
    max_bytes: u64,
}

impl DocumentStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Checks type, size and category, reporting every failing field.
    pub fn validate(&self, upload: Option<&Upload>) -> ValidationResult<AcceptedUpload> {
        let mut issues = IssueCollector::new();

        let accepted = match upload {
            None => {
                issues.push("arquivo", "validation.required", "O arquivo é obrigatório.");
                None
            }
            Some(upload) => {
                let accepted = extension_of(&upload.file_name).and_then(accepted_type);
                issues.check(
                    accepted.is_none(),
                    "arquivo",
                    "validation.mimes",
                    "O arquivo deve ser do tipo: PDF, JPG, JPEG ou PNG.",
                );
                issues.check(
                    upload.bytes.len() as u64 > self.max_bytes,
                    "arquivo",
                    "validation.max",
                    format!("O arquivo não pode ser maior que {}MB.", self.max_bytes / (1024 * 1024)),
                );
                accepted
            }
        };

        let raw_category = upload
            .and_then(|upload| upload.categoria.as_deref())
            .map(str::trim)
            .filter(|raw| !raw.is_empty());
        let categoria = raw_category.and_then(DocumentCategory::parse);
        issues.check(
            raw_category.is_some() && categoria.is_none(),
            "categoria",
            "validation.in",
            "A categoria deve ser uma das opções: CPF, CNPJ, RG, Escritura, Foto ou Outros.",
        );

        issues.finish()?;
        let (extension, mime) = accepted.unwrap_or(ACCEPTED[0]);
        Ok(AcceptedUpload {
            extension,
            mime,
            categoria,
        })
    }

    /// Writes `bytes` under a freshly generated name and returns that name.
    pub async fn store(&self, extension: &str, bytes: &[u8]) -> Result<String, RepoError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let name = generate_stored_name(extension);
        tokio::fs::write(self.path_for(&name), bytes).await?;
        debug!("stored document file {name} ({} bytes)", bytes.len());
        Ok(name)
    }

    /// Reads a stored file; `None` when it is gone.
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, RepoError> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a stored file, returning whether it existed.
    pub async fn remove(&self, name: &str) -> Result<bool, RepoError> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("document file {name} already missing from {}", self.root.display());
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Stored names never contain separators; anything else maps to its file name only.
    fn path_for(&self, name: &str) -> PathBuf {
        let file_name = Path::new(name).file_name().map(PathBuf::from).unwrap_or_default();
        self.root.join(file_name)
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn accepted_type(extension: String) -> Option<(&'static str, &'static str)> {
    ACCEPTED.iter().copied().find(|(accepted, _)| *accepted == extension)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn upload(name: &str, size: usize, categoria: Option<&str>) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes: vec![0; size],
            categoria: categoria.map(str::to_string),
        }
    }

    #[test]
    fn validate_accepts_known_types() {
        let storage = DocumentStorage::new("unused", 1024);
        let accepted = storage.validate(Some(&upload("Escritura.PDF", 10, Some("Escritura")))).expect("valid");
        assert_eq!(accepted.extension, "pdf");
        assert_eq!(accepted.mime, "application/pdf");
        assert_eq!(accepted.categoria, Some(DocumentCategory::Escritura));

        let accepted = storage.validate(Some(&upload("foto.jpeg", 10, None))).expect("valid");
        assert_eq!(accepted.mime, "image/jpeg");
    }

    #[test]
    fn validate_collects_type_size_and_category() {
        let storage = DocumentStorage::new("unused", 1024);
        let err = storage
            .validate(Some(&upload("planilha.xlsx", 2048, Some("Contrato"))))
            .expect_err("invalid");
        let fields = err.by_field();
        assert_eq!(fields["arquivo"].len(), 2);
        assert_eq!(fields["categoria"].len(), 1);

        let err = storage.validate(None).expect_err("missing");
        assert_eq!(err.issues[0].message, "O arquivo é obrigatório.");
    }

    #[tokio::test]
    async fn store_read_and_remove() {
        let dir = TempDir::new().expect("tempdir");
        let storage = DocumentStorage::new(dir.path().join("documentos"), DEFAULT_MAX_BYTES);

        let name = storage.store("png", b"image").await.expect("store");
        assert!(name.ends_with(".png"));
        assert_eq!(storage.read(&name).await.expect("read"), Some(b"image".to_vec()));

        assert!(storage.remove(&name).await.expect("remove"));
        assert!(!storage.remove(&name).await.expect("remove again"));
        assert_eq!(storage.read(&name).await.expect("read"), None);
    }
}
