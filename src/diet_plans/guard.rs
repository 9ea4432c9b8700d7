use uuid::Uuid;

use super::errors::PlanError;
use super::store::PlanStore;

/// Whether the patient exists and is managed by `professional_id`.
pub async fn patient_belongs_to(
    store: &dyn PlanStore,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<bool, PlanError> {
    let owner = store.patient_professional(patient_id).await?;
    Ok(owner == Some(professional_id))
}

/// Whether a live plan is owned, through its patient, by `professional_id`.
/// A missing or soft-deleted plan is `NotFound`.
pub async fn plan_belongs_to(
    store: &dyn PlanStore,
    plan_id: Uuid,
    professional_id: Uuid,
) -> Result<bool, PlanError> {
    match store.plan_professional(plan_id).await? {
        Some(owner) => Ok(owner == professional_id),
        None => Err(PlanError::NotFound),
    }
}
