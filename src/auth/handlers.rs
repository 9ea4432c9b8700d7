use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicProfessional, RefreshRequest, RegisterRequest},
        extractors::AuthProfessional,
        jwt::JwtKeys,
        password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN},
        repo::Professional,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

impl From<Professional> for PublicProfessional {
    fn from(p: Professional) -> Self {
        Self {
            id: p.id,
            email: p.email,
            full_name: p.full_name,
            profession: p.profession,
        }
    }
}

/// Logs the cause and answers with a fixed body.
fn server_error(what: &str, e: impl std::fmt::Display) -> (StatusCode, String) {
    error!(error = %e, "{what}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}

fn issue_tokens(
    keys: &JwtKeys,
    professional: Professional,
) -> Result<AuthResponse, (StatusCode, String)> {
    let access_token = keys
        .sign_access(professional.id, &professional.email, professional.profession)
        .map_err(|e| server_error("jwt sign access failed", e))?;
    let refresh_token = keys
        .sign_refresh(professional.id, &professional.email, professional.profession)
        .map_err(|e| server_error("jwt sign refresh failed", e))?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        professional: professional.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if payload.full_name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Full name is required".into()));
    }

    // Ensure email is not taken
    match Professional::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email already registered".into()));
        }
        Ok(None) => {}
        Err(e) => return Err(server_error("find_by_email failed", e)),
    }

    let hash = hash_password(&payload.password)
        .map_err(|e| server_error("hash_password failed", e))?;

    let professional = Professional::create(
        &state.db,
        &payload.email,
        &hash,
        payload.full_name.trim(),
        payload.profession,
    )
    .await
    .map_err(|e| server_error("create professional failed", e))?;

    info!(professional_id = %professional.id, email = %professional.email, "professional registered");
    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(issue_tokens(&keys, professional)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let professional = match Professional::find_by_email(&state.db, &payload.email).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(server_error("find_by_email failed", e)),
    };

    let ok = verify_password(&payload.password, &professional.password_hash)
        .map_err(|e| server_error("verify_password failed", e))?;

    if !ok {
        warn!(email = %payload.email, professional_id = %professional.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(professional_id = %professional.id, "professional logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, professional)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            (StatusCode::UNAUTHORIZED, "Invalid refresh token".to_string())
        })?;

    // Reload so a changed profile ends up in the new pair
    let professional = Professional::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| server_error("lookup failed", e))?
        .ok_or((StatusCode::UNAUTHORIZED, "Professional not found".to_string()))?;

    Ok(Json(issue_tokens(&keys, professional)?))
}

#[instrument(
    skip(state, auth),
    fields(professional_id = %auth.professional_id, email = %auth.email)
)]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthProfessional,
) -> Result<Json<PublicProfessional>, (StatusCode, String)> {
    let professional = Professional::find_by_id(&state.db, auth.professional_id)
        .await
        .map_err(|e| server_error("lookup failed", e))?
        .ok_or((StatusCode::UNAUTHORIZED, "Professional not found".to_string()))?;

    Ok(Json(professional.into()))
}
