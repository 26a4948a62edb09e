use axum::{
    Json, Router,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde_json::{Value as JsonValue, json};

use super::api_error::ApiError;
use crate::{client::Client, documents::Upload, models::OwnerKind};

/// Document routes. The first segment is an owner kind or a document id, depending on the route.
pub(super) fn routes() -> Router<Client> {
    Router::new()
        .route("/documentos/{key}/{id}", get(list).post(upload))
        .route("/documentos/{key}/download", get(download))
        .route("/documentos/{key}", delete(remove))
}

fn owner_kind(raw: &str) -> Result<OwnerKind, ApiError> {
    OwnerKind::parse(raw).ok_or_else(|| ApiError::not_found("Entidade não encontrada."))
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Reads the `arquivo` file part and the optional `categoria` text part.
async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut categoria = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("arquivo") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((name, bytes.to_vec()));
            }
            Some("categoria") => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    categoria = Some(text);
                }
            }
            _ => {}
        }
    }
    Ok(file.map(|(file_name, bytes)| Upload {
        file_name,
        bytes,
        categoria,
    }))
}

async fn upload(
    State(client): State<Client>,
    Path((tipo, id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let owner = owner_kind(&tipo)?;
    let upload = read_upload(multipart).await?;
    let document = client.upload_document(owner, &id, upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Documento enviado com sucesso!",
            "data": document.view(),
        })),
    ))
}

async fn list(
    State(client): State<Client>,
    Path((tipo, id)): Path<(String, String)>,
) -> Result<Json<JsonValue>, ApiError> {
    let owner = owner_kind(&tipo)?;
    let documents: Vec<_> = client
        .documents_of(owner, &id)
        .await?
        .into_iter()
        .map(|document| document.view())
        .collect();
    Ok(Json(json!({ "success": true, "data": documents })))
}

async fn download(State(client): State<Client>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let (document, bytes) = client.download_document(&id).await?;
    let file_name = document.nome_original.replace(['"', '\\', '\r', '\n'], "_");
    Ok((
        [
            (header::CONTENT_TYPE, document.tipo),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        bytes,
    )
        .into_response())
}

async fn remove(State(client): State<Client>, Path(id): Path<String>) -> Result<Json<JsonValue>, ApiError> {
    client.delete_document(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Documento excluído com sucesso!" })))
}
