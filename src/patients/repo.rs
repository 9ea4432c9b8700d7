use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{CreatePatientRequest, Patient};

pub async fn insert_patient(
    db: &PgPool,
    professional_id: Uuid,
    req: &CreatePatientRequest,
) -> anyhow::Result<Patient> {
    let patient = sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO patients (professional_id, full_name, email, phone, birth_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, professional_id, full_name, email, phone, birth_date, created_at
        "#,
    )
    .bind(professional_id)
    .bind(req.full_name.trim())
    .bind(&req.email)
    .bind(&req.phone)
    .bind(req.birth_date)
    .fetch_one(db)
    .await
    .context("insert patient")?;
    Ok(patient)
}

pub async fn list_by_professional(
    db: &PgPool,
    professional_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Patient>> {
    let rows = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, professional_id, full_name, email, phone, birth_date, created_at
          FROM patients
         WHERE professional_id = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(professional_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list patients")?;
    Ok(rows)
}

/// Only returns the patient when it is managed by `professional_id`.
pub async fn find_owned(
    db: &PgPool,
    professional_id: Uuid,
    patient_id: Uuid,
) -> anyhow::Result<Option<Patient>> {
    let row = sqlx::query_as::<_, Patient>(
        r#"
        SELECT id, professional_id, full_name, email, phone, birth_date, created_at
          FROM patients
         WHERE id = $1 AND professional_id = $2
        "#,
    )
    .bind(patient_id)
    .bind(professional_id)
    .fetch_optional(db)
    .await
    .context("find patient")?;
    Ok(row)
}
