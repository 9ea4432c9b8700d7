use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{auth::extractors::AuthProfessional, state::AppState};

use super::dto::{CreatePatientRequest, Pagination, Patient};
use super::repo;

pub fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", get(get_patient))
}

#[instrument(
    skip(state, auth, payload),
    fields(professional_id = %auth.professional_id, email = %auth.email)
)]
pub async fn create_patient(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Json(payload): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), (StatusCode, String)> {
    if payload.full_name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "fullName is required".into()));
    }
    let patient = repo::insert_patient(&state.db, auth.professional_id, &payload)
        .await
        .map_err(internal)?;
    info!(patient_id = %patient.id, "patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

#[instrument(skip(state, auth), fields(professional_id = %auth.professional_id))]
pub async fn list_patients(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Patient>>, (StatusCode, String)> {
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);
    let patients = repo::list_by_professional(&state.db, auth.professional_id, limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(patients))
}

#[instrument(skip(state, auth), fields(professional_id = %auth.professional_id))]
pub async fn get_patient(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, (StatusCode, String)> {
    repo::find_owned(&state.db, auth.professional_id, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Patient not found".into()))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "patient query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}
