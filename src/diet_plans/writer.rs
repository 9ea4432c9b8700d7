use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{validate_range, MealInput, PlanFieldChanges};
use super::errors::PlanError;
use super::model::{DietPlan, NewDietPlan};
use super::reconcile::reconcile;
use super::store::{PlanStore, PlanTx};

/// Runs plan writes inside a single store transaction. Any error drops the
/// transaction uncommitted, so nothing of a failed call is persisted.
pub struct PlanWriter<'a> {
    store: &'a dyn PlanStore,
}

impl<'a> PlanWriter<'a> {
    pub fn new(store: &'a dyn PlanStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self, plan, meals), fields(patient_id = %plan.patient_id))]
    pub async fn create(
        &self,
        plan: NewDietPlan,
        meals: Vec<MealInput>,
    ) -> Result<DietPlan, PlanError> {
        let mut tx = self.store.begin().await?;

        let plan_id = tx.insert_plan(&plan).await?;
        let meals: Vec<&MealInput> = meals.iter().collect();
        tx.insert_meals(plan_id, &meals).await?;

        let created = read_back(tx.as_mut(), plan_id).await?;
        tx.commit().await?;

        info!(%plan_id, meals = created.meals.len(), "diet plan created");
        Ok(created)
    }

    #[instrument(skip(self, changes, meals))]
    pub async fn update(
        &self,
        plan_id: Uuid,
        professional_id: Uuid,
        changes: PlanFieldChanges,
        meals: Option<Vec<MealInput>>,
    ) -> Result<DietPlan, PlanError> {
        let mut tx = self.store.begin().await?;

        let owned = tx.lock_plan(plan_id).await?.ok_or(PlanError::NotFound)?;
        if !owned.is_owned_by(professional_id) {
            warn!(%plan_id, %professional_id, "diet plan owned by another professional");
            return Err(PlanError::Unauthorized);
        }

        // A single date in the payload is checked against the stored one.
        if !changes.start_date.is_absent() || !changes.end_date.is_absent() {
            validate_range(
                changes.start_date.clone().unwrap_or(owned.plan.start_date),
                changes.end_date.clone().unwrap_or(owned.plan.end_date),
            )?;
        }

        if !changes.is_empty() {
            tx.update_plan(plan_id, &changes).await?;
        }

        if let Some(desired) = meals.as_deref() {
            let existing = tx.list_meals(plan_id).await?;
            let diff = reconcile(&existing, desired)?;

            if !diff.is_empty() {
                let deleted = tx.delete_meals(plan_id, &diff.to_delete).await?;
                for (meal_id, meal) in &diff.to_update {
                    tx.update_meal(plan_id, *meal_id, meal).await?;
                }
                tx.insert_meals(plan_id, &diff.to_create).await?;

                debug!(
                    %plan_id,
                    created = diff.to_create.len(),
                    updated = diff.to_update.len(),
                    deleted,
                    "meals reconciled"
                );
            }
        }

        let updated = read_back(tx.as_mut(), plan_id).await?;
        tx.commit().await?;

        info!(%plan_id, "diet plan updated");
        Ok(updated)
    }
}

async fn read_back(tx: &mut dyn PlanTx, plan_id: Uuid) -> Result<DietPlan, PlanError> {
    let (plan, meals) = tx
        .read_plan(plan_id)
        .await?
        .ok_or(PlanError::Inconsistent(plan_id))?;
    Ok(DietPlan::compose(plan, meals))
}
