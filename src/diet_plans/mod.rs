pub mod dto;
pub mod errors;
mod guard;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod model;
pub mod patch;
pub mod reconcile;
pub mod repo;
pub mod services;
pub mod store;
mod writer;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::diet_plan_routes()
}
