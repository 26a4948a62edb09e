use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use super::api_error::ApiError;
use crate::{
    client::Client,
    reports::{CropSummary, MunicipalityReport, SpeciesSummary, SpeciesTotal},
    types::EntityKind,
};

/// `{success: true, ...body}` for reports whose totals sit next to `data`.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

fn data(value: impl Serialize) -> Result<Json<JsonValue>, ApiError> {
    Ok(Json(json!({ "success": true, "data": value })))
}

fn flattened<T: Serialize>(body: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, body })
}

pub(super) fn routes() -> Router<Client> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/total-produtores", get(total_producers))
        .route("/dashboard/total-propriedades", get(total_properties))
        .route("/dashboard/propriedades-por-municipio", get(dashboard_municipalities))
        .route("/dashboard/animais-por-especie", get(dashboard_species))
        .route("/dashboard/hectares-por-cultura", get(dashboard_crops))
        .route("/relatorios", get(relatorios))
        .route("/relatorios/propriedades-por-municipio", get(report_municipalities))
        .route("/relatorios/animais-por-especie", get(report_species))
        .route("/relatorios/hectares-por-cultura", get(report_crops))
        .route("/relatorios/rebanhos/{produtor_id}", get(herd_report))
}

async fn dashboard(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    data(client.dashboard(Utc::now().date_naive()).await?)
}

async fn total_producers(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    let total = client.store().count_all(EntityKind::Producer).await?;
    data(json!({ "total": total }))
}

async fn total_properties(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    let total = client.store().count_all(EntityKind::Property).await?;
    data(json!({ "total": total }))
}

async fn dashboard_municipalities(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    data(client.properties_by_municipality().await?)
}

async fn dashboard_species(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    let totals: Vec<SpeciesTotal> = client
        .species_report()
        .await?
        .into_iter()
        .map(|row| SpeciesTotal {
            especie: row.especie,
            total: row.total_animais,
        })
        .collect();
    data(totals)
}

async fn dashboard_crops(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    data(client.crop_totals().await?)
}

async fn relatorios(State(client): State<Client>) -> Result<Json<JsonValue>, ApiError> {
    data(client.relatorios().await?)
}

async fn report_municipalities(State(client): State<Client>) -> Result<Json<Envelope<MunicipalityReport>>, ApiError> {
    Ok(flattened(client.municipality_report().await?))
}

async fn report_species(State(client): State<Client>) -> Result<Json<Envelope<SpeciesSummary>>, ApiError> {
    Ok(flattened(client.species_summary().await?))
}

async fn report_crops(State(client): State<Client>) -> Result<Json<Envelope<CropSummary>>, ApiError> {
    Ok(flattened(client.crop_summary().await?))
}

async fn herd_report(
    State(client): State<Client>,
    Path(produtor_id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    data(client.herd_report(&produtor_id).await?)
}
