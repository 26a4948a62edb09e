use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use super::api_error::ApiError;
use crate::{client::Client, exports::ExportFile};

pub(super) fn routes() -> Router<Client> {
    Router::new()
        .route("/exportar/propriedades", get(properties))
        .route("/exportar/rebanhos/{produtor_id}", get(herds))
}

fn attachment(file: ExportFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.file_name)),
        ],
        file.bytes,
    )
        .into_response()
}

async fn properties(State(client): State<Client>) -> Result<Response, ApiError> {
    Ok(attachment(client.export_properties(Utc::now()).await?))
}

async fn herds(State(client): State<Client>, Path(produtor_id): Path<String>) -> Result<Response, ApiError> {
    Ok(attachment(client.export_herds(&produtor_id, Utc::now()).await?))
}
