use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
};
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

use super::api_error::ApiError;
use crate::{
    client::{Client, Presented},
    search::ListQuery,
};

/// List, show, create, update and delete routes for one resource.
pub(super) fn routes<T: Presented>(path: &str) -> Router<Client> {
    Router::new()
        .route(path, get(index::<T>).post(store::<T>))
        .route(&format!("{path}/{{id}}"), get(show::<T>).put(update::<T>).delete(destroy::<T>))
}

/// Decodes a JSON object body. An empty body reads as `{}`.
pub(super) fn parse_body<I: DeserializeOwned>(body: &[u8]) -> Result<I, ApiError> {
    let value: JsonValue = if body.iter().all(u8::is_ascii_whitespace) {
        JsonValue::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|err| ApiError::bad_request(format!("JSON inválido: {err}")))?
    };
    if !value.is_object() {
        return Err(ApiError::bad_request("O corpo da requisição deve ser um objeto JSON."));
    }
    serde_json::from_value(value).map_err(|err| ApiError::bad_request(format!("Corpo da requisição inválido: {err}")))
}

async fn index<T: Presented>(
    State(client): State<Client>,
    RawQuery(query): RawQuery,
) -> Result<Json<JsonValue>, ApiError> {
    let query = ListQuery::from_query(query.as_deref().unwrap_or_default());
    let (page, filters) = client.collection::<T>().list(query).await?;
    let pagination = page.pagination();
    let data = T::present(&client, page.items).await?;
    Ok(Json(json!({
        "success": true,
        "data": data,
        "pagination": pagination,
        "filters": filters,
    })))
}

async fn show<T: Presented>(State(client): State<Client>, Path(id): Path<String>) -> Result<Json<JsonValue>, ApiError> {
    let entity = client.collection::<T>().get_required(&id).await?;
    let data = T::present(&client, vec![entity]).await?.into_iter().next();
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn store<T: Presented>(
    State(client): State<Client>,
    body: Bytes,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let input = parse_body::<T::Input>(&body)?;
    let entity = client.create::<T>(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": T::CREATED, "data": entity })),
    ))
}

async fn update<T: Presented>(
    State(client): State<Client>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<JsonValue>, ApiError> {
    let input = parse_body::<T::Input>(&body)?;
    let entity = client.update::<T>(&id, input).await?;
    Ok(Json(json!({ "success": true, "message": T::UPDATED, "data": entity })))
}

async fn destroy<T: Presented>(State(client): State<Client>, Path(id): Path<String>) -> Result<Json<JsonValue>, ApiError> {
    client.delete::<T>(&id).await?;
    Ok(Json(json!({ "success": true, "message": T::DELETED })))
}
