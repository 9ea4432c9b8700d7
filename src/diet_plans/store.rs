use async_trait::async_trait;
use uuid::Uuid;

use super::dto::{MealInput, PlanFieldChanges};
use super::model::{DietPlanRow, MealRow, NewDietPlan, OwnedPlan};

/// Storage handle for diet plans. Lookups here never return soft-deleted
/// plans.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Professional that owns the patient, if the patient exists.
    async fn patient_professional(&self, patient_id: Uuid) -> anyhow::Result<Option<Uuid>>;

    /// Professional of the plan's patient, if the plan exists.
    async fn plan_professional(&self, plan_id: Uuid) -> anyhow::Result<Option<Uuid>>;

    async fn load_plan(&self, plan_id: Uuid) -> anyhow::Result<Option<(OwnedPlan, Vec<MealRow>)>>;

    async fn list_plans(&self, patient_id: Uuid) -> anyhow::Result<Vec<DietPlanRow>>;

    /// Returns false when there was nothing to delete.
    async fn soft_delete_plan(&self, plan_id: Uuid) -> anyhow::Result<bool>;

    async fn begin(&self) -> anyhow::Result<Box<dyn PlanTx>>;
}

/// One atomic unit of work. Dropping it without `commit` discards every
/// write made through it.
#[async_trait]
pub trait PlanTx: Send {
    /// Loads the plan with its patient's professional and holds it for the
    /// rest of the transaction.
    async fn lock_plan(&mut self, plan_id: Uuid) -> anyhow::Result<Option<OwnedPlan>>;

    async fn list_meals(&mut self, plan_id: Uuid) -> anyhow::Result<Vec<MealRow>>;

    async fn insert_plan(&mut self, plan: &NewDietPlan) -> anyhow::Result<Uuid>;

    async fn update_plan(&mut self, plan_id: Uuid, changes: &PlanFieldChanges)
        -> anyhow::Result<()>;

    /// Deletes only meals of `plan_id`; returns the number removed.
    async fn delete_meals(&mut self, plan_id: Uuid, meal_ids: &[Uuid]) -> anyhow::Result<u64>;

    async fn update_meal(
        &mut self,
        plan_id: Uuid,
        meal_id: Uuid,
        meal: &MealInput,
    ) -> anyhow::Result<()>;

    async fn insert_meals(&mut self, plan_id: Uuid, meals: &[&MealInput]) -> anyhow::Result<()>;

    async fn read_plan(&mut self, plan_id: Uuid) -> anyhow::Result<Option<(DietPlanRow, Vec<MealRow>)>>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}
