use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::claims::Profession;

/// Professional record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Professional {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub profession: Profession,
    pub created_at: OffsetDateTime,
}
