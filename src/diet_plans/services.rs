use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateDietPlanRequest, UpdateDietPlanRequest};
use super::errors::PlanError;
use super::guard::{patient_belongs_to, plan_belongs_to};
use super::model::{DietPlan, DietPlanSummary};
use super::store::PlanStore;
use super::writer::PlanWriter;

#[instrument(skip(store, req))]
pub async fn create_plan(
    store: &dyn PlanStore,
    patient_id: Uuid,
    professional_id: Uuid,
    req: CreateDietPlanRequest,
) -> Result<DietPlan, PlanError> {
    req.validate()?;
    if !patient_belongs_to(store, patient_id, professional_id).await? {
        return Err(PlanError::PatientNotFound);
    }
    let (plan, meals) = req.into_new_plan(patient_id, professional_id);
    PlanWriter::new(store).create(plan, meals).await
}

/// `None` when the plan is missing, soft-deleted or someone else's.
#[instrument(skip(store))]
pub async fn get_plan(
    store: &dyn PlanStore,
    plan_id: Uuid,
    professional_id: Uuid,
) -> Result<Option<DietPlan>, PlanError> {
    let Some((owned, meals)) = store.load_plan(plan_id).await? else {
        return Ok(None);
    };
    if !owned.is_owned_by(professional_id) {
        warn!(%plan_id, %professional_id, "diet plan read by another professional");
        return Ok(None);
    }
    Ok(Some(DietPlan::compose(owned.plan, meals)))
}

#[instrument(skip(store, req))]
pub async fn update_plan(
    store: &dyn PlanStore,
    plan_id: Uuid,
    professional_id: Uuid,
    req: UpdateDietPlanRequest,
) -> Result<DietPlan, PlanError> {
    req.validate()?;
    if !plan_belongs_to(store, plan_id, professional_id).await? {
        return Err(PlanError::NotFound);
    }
    let (changes, meals) = req.into_parts();
    PlanWriter::new(store)
        .update(plan_id, professional_id, changes, meals)
        .await
}

#[instrument(skip(store))]
pub async fn delete_plan(
    store: &dyn PlanStore,
    plan_id: Uuid,
    professional_id: Uuid,
) -> Result<(), PlanError> {
    if !plan_belongs_to(store, plan_id, professional_id).await? {
        return Err(PlanError::NotFound);
    }
    if !store.soft_delete_plan(plan_id).await? {
        return Err(PlanError::NotFound);
    }
    info!(%plan_id, "diet plan soft-deleted");
    Ok(())
}

#[instrument(skip(store))]
pub async fn list_plans(
    store: &dyn PlanStore,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<Vec<DietPlanSummary>, PlanError> {
    if !patient_belongs_to(store, patient_id, professional_id).await? {
        return Err(PlanError::PatientNotFound);
    }
    let rows = store.list_plans(patient_id).await?;
    Ok(rows.into_iter().map(DietPlanSummary::from).collect())
}
