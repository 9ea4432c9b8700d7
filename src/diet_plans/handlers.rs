use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{auth::extractors::AuthProfessional, state::AppState};

use super::dto::{CreateDietPlanRequest, UpdateDietPlanRequest};
use super::errors::PlanError;
use super::model::{DietPlan, DietPlanSummary};
use super::services;

pub fn diet_plan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/patients/:patient_id/diet-plans",
            post(create_diet_plan).get(list_diet_plans),
        )
        .route(
            "/diet-plans/:id",
            get(get_diet_plan)
                .patch(update_diet_plan)
                .delete(delete_diet_plan),
        )
}

#[instrument(
    skip(state, auth, payload),
    fields(professional_id = %auth.professional_id, profession = ?auth.profession)
)]
pub async fn create_diet_plan(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Path(patient_id): Path<Uuid>,
    Json(payload): Json<CreateDietPlanRequest>,
) -> Result<(StatusCode, HeaderMap, Json<DietPlan>), (StatusCode, String)> {
    let plan = services::create_plan(
        state.plans.as_ref(),
        patient_id,
        auth.professional_id,
        payload,
    )
    .await
    .map_err(reject)?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/diet-plans/{}", plan.id))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(plan)))
}

#[instrument(skip(state, auth), fields(professional_id = %auth.professional_id))]
pub async fn list_diet_plans(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<DietPlanSummary>>, (StatusCode, String)> {
    let plans = services::list_plans(state.plans.as_ref(), patient_id, auth.professional_id)
        .await
        .map_err(reject)?;
    Ok(Json(plans))
}

#[instrument(skip(state, auth), fields(professional_id = %auth.professional_id))]
pub async fn get_diet_plan(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Path(id): Path<Uuid>,
) -> Result<Json<DietPlan>, (StatusCode, String)> {
    services::get_plan(state.plans.as_ref(), id, auth.professional_id)
        .await
        .map_err(reject)?
        .map(Json)
        .ok_or_else(|| reject(PlanError::NotFound))
}

#[instrument(skip(state, auth, payload), fields(professional_id = %auth.professional_id))]
pub async fn update_diet_plan(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDietPlanRequest>,
) -> Result<Json<DietPlan>, (StatusCode, String)> {
    let plan = services::update_plan(state.plans.as_ref(), id, auth.professional_id, payload)
        .await
        .map_err(reject)?;
    Ok(Json(plan))
}

#[instrument(skip(state, auth), fields(professional_id = %auth.professional_id))]
pub async fn delete_diet_plan(
    State(state): State<AppState>,
    auth: AuthProfessional,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    services::delete_plan(state.plans.as_ref(), id, auth.professional_id)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

fn reject(e: PlanError) -> (StatusCode, String) {
    if e.status().is_server_error() {
        error!(error = %e, "diet plan request failed");
    }
    e.into()
}
