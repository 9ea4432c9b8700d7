use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{MealInput, PlanFieldChanges};
use super::patch::Patch;
use super::model::{DietPlanRow, MealRow, NewDietPlan, OwnedPlan};
use super::store::{PlanStore, PlanTx};

fn set<T>(field: Patch<T>, target: &mut T) {
    if let Patch::Present(v) = field {
        *target = v;
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    patients: HashMap<Uuid, Uuid>,
    plans: HashMap<Uuid, DietPlanRow>,
    meals: Vec<MealRow>,
}

impl Tables {
    fn live_plan(&self, plan_id: Uuid) -> Option<&DietPlanRow> {
        self.plans.get(&plan_id).filter(|p| !p.is_deleted)
    }

    fn owned(&self, plan_id: Uuid) -> Option<OwnedPlan> {
        let plan = self.live_plan(plan_id)?.clone();
        let patient_professional_id = *self.patients.get(&plan.patient_id)?;
        Some(OwnedPlan {
            plan,
            patient_professional_id,
        })
    }

    fn meals_of(&self, plan_id: Uuid) -> Vec<MealRow> {
        self.meals
            .iter()
            .filter(|m| m.diet_plan_id == plan_id)
            .cloned()
            .collect()
    }
}

/// Process-local [`PlanStore`]. A transaction works on a copy of the tables
/// and swaps it in on commit.
#[derive(Clone, Default)]
pub struct MemoryPlanStore {
    tables: Arc<Mutex<Tables>>,
    fail_meal_inserts: Arc<AtomicBool>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_patient(&self, professional_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().patients.insert(id, professional_id);
        id
    }

    /// Makes every following bulk meal insert fail.
    pub fn fail_meal_inserts(&self, fail: bool) {
        self.fail_meal_inserts.store(fail, Ordering::SeqCst);
    }

    /// Raw row access, including soft-deleted plans.
    pub fn raw_plan(&self, plan_id: Uuid) -> Option<DietPlanRow> {
        self.lock().plans.get(&plan_id).cloned()
    }

    pub fn meal_count(&self, plan_id: Uuid) -> usize {
        self.lock().meals_of(plan_id).len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn patient_professional(&self, patient_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        Ok(self.lock().patients.get(&patient_id).copied())
    }

    async fn plan_professional(&self, plan_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        Ok(self.lock().owned(plan_id).map(|o| o.patient_professional_id))
    }

    async fn load_plan(&self, plan_id: Uuid) -> anyhow::Result<Option<(OwnedPlan, Vec<MealRow>)>> {
        let tables = self.lock();
        Ok(tables.owned(plan_id).map(|o| (o, tables.meals_of(plan_id))))
    }

    async fn list_plans(&self, patient_id: Uuid) -> anyhow::Result<Vec<DietPlanRow>> {
        let mut rows: Vec<_> = self
            .lock()
            .plans
            .values()
            .filter(|p| p.patient_id == patient_id && !p.is_deleted)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn soft_delete_plan(&self, plan_id: Uuid) -> anyhow::Result<bool> {
        let mut tables = self.lock();
        match tables.plans.get_mut(&plan_id) {
            Some(p) if !p.is_deleted => {
                let now = OffsetDateTime::now_utc();
                p.is_deleted = true;
                p.deleted_at = Some(now);
                p.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn PlanTx>> {
        let working = self.lock().clone();
        Ok(Box::new(MemoryPlanTx {
            target: self.tables.clone(),
            working,
            fail_meal_inserts: self.fail_meal_inserts.load(Ordering::SeqCst),
        }))
    }
}

struct MemoryPlanTx {
    target: Arc<Mutex<Tables>>,
    working: Tables,
    fail_meal_inserts: bool,
}

#[async_trait]
impl PlanTx for MemoryPlanTx {
    async fn lock_plan(&mut self, plan_id: Uuid) -> anyhow::Result<Option<OwnedPlan>> {
        Ok(self.working.owned(plan_id))
    }

    async fn list_meals(&mut self, plan_id: Uuid) -> anyhow::Result<Vec<MealRow>> {
        Ok(self.working.meals_of(plan_id))
    }

    async fn insert_plan(&mut self, plan: &NewDietPlan) -> anyhow::Result<Uuid> {
        anyhow::ensure!(
            self.working.patients.contains_key(&plan.patient_id),
            "patient {} does not exist",
            plan.patient_id
        );
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        self.working.plans.insert(
            id,
            DietPlanRow {
                id,
                patient_id: plan.patient_id,
                professional_id: plan.professional_id,
                title: plan.title.clone(),
                description: plan.description.clone(),
                start_date: plan.start_date,
                end_date: plan.end_date,
                objectives: plan.objectives.clone(),
                notes: plan.notes.clone(),
                is_active: plan.is_active,
                is_deleted: false,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_plan(
        &mut self,
        plan_id: Uuid,
        changes: &PlanFieldChanges,
    ) -> anyhow::Result<()> {
        let row = self
            .working
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| anyhow::anyhow!("diet plan {plan_id} not updated"))?;
        let c = changes.clone();
        set(c.title, &mut row.title);
        set(c.description, &mut row.description);
        set(c.start_date, &mut row.start_date);
        set(c.end_date, &mut row.end_date);
        set(c.objectives, &mut row.objectives);
        set(c.notes, &mut row.notes);
        set(c.is_active, &mut row.is_active);
        row.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn delete_meals(&mut self, plan_id: Uuid, meal_ids: &[Uuid]) -> anyhow::Result<u64> {
        let before = self.working.meals.len();
        self.working
            .meals
            .retain(|m| !(m.diet_plan_id == plan_id && meal_ids.contains(&m.id)));
        Ok((before - self.working.meals.len()) as u64)
    }

    async fn update_meal(
        &mut self,
        plan_id: Uuid,
        meal_id: Uuid,
        meal: &MealInput,
    ) -> anyhow::Result<()> {
        let row = self
            .working
            .meals
            .iter_mut()
            .find(|m| m.id == meal_id && m.diet_plan_id == plan_id)
            .ok_or_else(|| anyhow::anyhow!("meal {meal_id} not updated"))?;
        row.meal_type = meal.meal_type;
        row.day_of_week = meal.day_of_week;
        row.content = meal.content.clone();
        Ok(())
    }

    async fn insert_meals(&mut self, plan_id: Uuid, meals: &[&MealInput]) -> anyhow::Result<()> {
        if meals.is_empty() {
            return Ok(());
        }
        anyhow::ensure!(!self.fail_meal_inserts, "insert diet plan meals: injected failure");
        for m in meals {
            self.working.meals.push(MealRow {
                id: Uuid::new_v4(),
                diet_plan_id: plan_id,
                meal_type: m.meal_type,
                day_of_week: m.day_of_week,
                content: m.content.clone(),
            });
        }
        Ok(())
    }

    async fn read_plan(
        &mut self,
        plan_id: Uuid,
    ) -> anyhow::Result<Option<(DietPlanRow, Vec<MealRow>)>> {
        Ok(self
            .working
            .live_plan(plan_id)
            .cloned()
            .map(|p| (p, self.working.meals_of(plan_id))))
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryPlanTx {
            target, working, ..
        } = *self;
        *target.lock().expect("memory store poisoned") = working;
        Ok(())
    }
}
