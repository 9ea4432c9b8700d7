use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::claims::Profession;
pub use super::repo_types::Professional;

impl Professional {
    /// Find a professional by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Professional>> {
        let professional = sqlx::query_as::<_, Professional>(
            r#"
            SELECT id, email, password_hash, full_name, profession, created_at
            FROM professionals
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find professional by email")?;
        Ok(professional)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Professional>> {
        let professional = sqlx::query_as::<_, Professional>(
            r#"
            SELECT id, email, password_hash, full_name, profession, created_at
            FROM professionals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find professional by id")?;
        Ok(professional)
    }

    /// Create a new professional with hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        full_name: &str,
        profession: Profession,
    ) -> anyhow::Result<Professional> {
        let professional = sqlx::query_as::<_, Professional>(
            r#"
            INSERT INTO professionals (email, password_hash, full_name, profession)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, full_name, profession, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(profession)
        .fetch_one(db)
        .await
        .context("insert professional")?;
        Ok(professional)
    }
}
