use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use serde::Serialize;

use crate::{errors::RepoError, types::EntityKind};

/// Error body shared by every handler: `{success: false, message, errors?}`.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            status_code: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Os dados fornecidos são inválidos.".to_string(),
            errors: Some(errors),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

fn not_found_message(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Producer => "Produtor rural não encontrado.",
        EntityKind::Property => "Propriedade não encontrada.",
        EntityKind::ProductionUnit => "Unidade de produção não encontrada.",
        EntityKind::Herd => "Rebanho não encontrado.",
        EntityKind::Document => "Documento não encontrado.",
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(validation) => Self::unprocessable(validation.by_field()),
            RepoError::UniqueConstraintViolation { field, .. } => {
                let message = format!("O campo {field} já está sendo utilizado.");
                Self::unprocessable(BTreeMap::from([(field, vec![message])]))
            }
            RepoError::NotFound { kind, .. } => Self::not_found(not_found_message(kind)),
            RepoError::FileMissing { .. } => Self::not_found("Arquivo não encontrado no servidor."),
            RepoError::InvalidRequest { message } => Self::bad_request(message),
            other => {
                error!("request failed: {other}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
            errors: self.errors.as_ref(),
        };
        (self.status_code, Json(body)).into_response()
    }
}
