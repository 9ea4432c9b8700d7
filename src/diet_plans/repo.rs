use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::dto::{MealInput, PlanFieldChanges};
use super::model::{DietPlanRow, MealRow, NewDietPlan, OwnedPlan};
use super::patch::Patch;
use super::store::{PlanStore, PlanTx};

#[derive(Debug, FromRow)]
struct OwnedPlanRecord {
    #[sqlx(flatten)]
    plan: DietPlanRow,
    patient_professional_id: Uuid,
}

impl From<OwnedPlanRecord> for OwnedPlan {
    fn from(r: OwnedPlanRecord) -> Self {
        Self {
            plan: r.plan,
            patient_professional_id: r.patient_professional_id,
        }
    }
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn patient_professional(&self, patient_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT professional_id FROM patients WHERE id = $1"#,
        )
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await
        .context("lookup patient owner")?;
        Ok(owner)
    }

    async fn plan_professional(&self, plan_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT pt.professional_id
              FROM diet_plans p
              JOIN patients pt ON pt.id = p.patient_id
             WHERE p.id = $1 AND NOT p.is_deleted
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&self.db)
        .await
        .context("lookup diet plan owner")?;
        Ok(owner)
    }

    /// Plan and meals are read from one snapshot so a concurrent update is
    /// seen either entirely or not at all.
    async fn load_plan(&self, plan_id: Uuid) -> anyhow::Result<Option<(OwnedPlan, Vec<MealRow>)>> {
        let mut tx = self.db.begin().await.context("begin read tx")?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .context("set read snapshot")?;

        let record = sqlx::query_as::<_, OwnedPlanRecord>(
            r#"
            SELECT p.*, pt.professional_id AS patient_professional_id
              FROM diet_plans p
              JOIN patients pt ON pt.id = p.patient_id
             WHERE p.id = $1 AND NOT p.is_deleted
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await
        .context("load diet plan")?;

        let Some(record) = record else {
            return Ok(None);
        };

        let meals = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, diet_plan_id, meal_type, day_of_week, content
              FROM diet_plan_meals
             WHERE diet_plan_id = $1
            "#,
        )
        .bind(plan_id)
        .fetch_all(&mut *tx)
        .await
        .context("load diet plan meals")?;

        tx.commit().await.context("end read tx")?;
        Ok(Some((record.into(), meals)))
    }

    async fn list_plans(&self, patient_id: Uuid) -> anyhow::Result<Vec<DietPlanRow>> {
        let rows = sqlx::query_as::<_, DietPlanRow>(
            r#"
            SELECT *
              FROM diet_plans
             WHERE patient_id = $1 AND NOT is_deleted
             ORDER BY created_at DESC
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.db)
        .await
        .context("list diet plans")?;
        Ok(rows)
    }

    async fn soft_delete_plan(&self, plan_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE diet_plans
               SET is_deleted = TRUE, deleted_at = now(), updated_at = now()
             WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(plan_id)
        .execute(&self.db)
        .await
        .context("soft delete diet plan")?;
        Ok(res.rows_affected() > 0)
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn PlanTx>> {
        let tx = self.db.begin().await.context("begin tx")?;
        Ok(Box::new(PgPlanTx { tx }))
    }
}

pub struct PgPlanTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PlanTx for PgPlanTx {
    async fn lock_plan(&mut self, plan_id: Uuid) -> anyhow::Result<Option<OwnedPlan>> {
        let record = sqlx::query_as::<_, OwnedPlanRecord>(
            r#"
            SELECT p.*, pt.professional_id AS patient_professional_id
              FROM diet_plans p
              JOIN patients pt ON pt.id = p.patient_id
             WHERE p.id = $1 AND NOT p.is_deleted
               FOR UPDATE OF p
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("lock diet plan")?;
        Ok(record.map(OwnedPlan::from))
    }

    async fn list_meals(&mut self, plan_id: Uuid) -> anyhow::Result<Vec<MealRow>> {
        let meals = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, diet_plan_id, meal_type, day_of_week, content
              FROM diet_plan_meals
             WHERE diet_plan_id = $1
            "#,
        )
        .bind(plan_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("list diet plan meals")?;
        Ok(meals)
    }

    async fn insert_plan(&mut self, plan: &NewDietPlan) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO diet_plans
                (patient_id, professional_id, title, description, start_date, end_date,
                 objectives, notes, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(plan.patient_id)
        .bind(plan.professional_id)
        .bind(&plan.title)
        .bind(&plan.description)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(&plan.objectives)
        .bind(&plan.notes)
        .bind(plan.is_active)
        .fetch_one(&mut *self.tx)
        .await
        .context("insert diet plan")?;
        Ok(id)
    }

    async fn update_plan(
        &mut self,
        plan_id: Uuid,
        changes: &PlanFieldChanges,
    ) -> anyhow::Result<()> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE diet_plans SET updated_at = now()");
        if let Patch::Present(v) = &changes.title {
            qb.push(", title = ").push_bind(v.clone());
        }
        if let Patch::Present(v) = &changes.description {
            qb.push(", description = ").push_bind(v.clone());
        }
        if let Patch::Present(v) = changes.start_date {
            qb.push(", start_date = ").push_bind(v);
        }
        if let Patch::Present(v) = changes.end_date {
            qb.push(", end_date = ").push_bind(v);
        }
        if let Patch::Present(v) = &changes.objectives {
            qb.push(", objectives = ").push_bind(v.clone());
        }
        if let Patch::Present(v) = &changes.notes {
            qb.push(", notes = ").push_bind(v.clone());
        }
        if let Patch::Present(v) = changes.is_active {
            qb.push(", is_active = ").push_bind(v);
        }
        qb.push(" WHERE id = ").push_bind(plan_id);

        let res = qb
            .build()
            .execute(&mut *self.tx)
            .await
            .context("update diet plan")?;
        anyhow::ensure!(res.rows_affected() == 1, "diet plan {plan_id} not updated");
        Ok(())
    }

    async fn delete_meals(&mut self, plan_id: Uuid, meal_ids: &[Uuid]) -> anyhow::Result<u64> {
        if meal_ids.is_empty() {
            return Ok(0);
        }
        let res = sqlx::query(
            r#"DELETE FROM diet_plan_meals WHERE diet_plan_id = $1 AND id = ANY($2)"#,
        )
        .bind(plan_id)
        .bind(meal_ids)
        .execute(&mut *self.tx)
        .await
        .context("delete diet plan meals")?;
        Ok(res.rows_affected())
    }

    async fn update_meal(
        &mut self,
        plan_id: Uuid,
        meal_id: Uuid,
        meal: &MealInput,
    ) -> anyhow::Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE diet_plan_meals
               SET meal_type = $1, day_of_week = $2, content = $3
             WHERE id = $4 AND diet_plan_id = $5
            "#,
        )
        .bind(meal.meal_type)
        .bind(meal.day_of_week)
        .bind(&meal.content)
        .bind(meal_id)
        .bind(plan_id)
        .execute(&mut *self.tx)
        .await
        .with_context(|| format!("update meal {meal_id}"))?;
        anyhow::ensure!(res.rows_affected() == 1, "meal {meal_id} not updated");
        Ok(())
    }

    async fn insert_meals(&mut self, plan_id: Uuid, meals: &[&MealInput]) -> anyhow::Result<()> {
        if meals.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO diet_plan_meals (diet_plan_id, meal_type, day_of_week, content) ",
        );
        qb.push_values(meals, |mut b, m| {
            b.push_bind(plan_id)
                .push_bind(m.meal_type)
                .push_bind(m.day_of_week)
                .push_bind(m.content.clone());
        });
        qb.build()
            .execute(&mut *self.tx)
            .await
            .context("insert diet plan meals")?;
        Ok(())
    }

    async fn read_plan(
        &mut self,
        plan_id: Uuid,
    ) -> anyhow::Result<Option<(DietPlanRow, Vec<MealRow>)>> {
        let plan = sqlx::query_as::<_, DietPlanRow>(
            r#"SELECT * FROM diet_plans WHERE id = $1 AND NOT is_deleted"#,
        )
        .bind(plan_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("read back diet plan")?;

        let Some(plan) = plan else {
            return Ok(None);
        };
        let meals = self.list_meals(plan_id).await?;
        Ok(Some((plan, meals)))
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await.context("commit tx")?;
        Ok(())
    }
}

// Run with a reachable Postgres: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::diet_plans::services;

    async fn seed_patient(db: &PgPool) -> (Uuid, Uuid) {
        let pro = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO professionals (email, password_hash, full_name, profession)
            VALUES ($1, 'x', 'Ana', 'NUTRITIONIST')
            RETURNING id
            "#,
        )
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .fetch_one(db)
        .await
        .unwrap();
        let patient = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO patients (professional_id, full_name) VALUES ($1, 'Bo') RETURNING id"#,
        )
        .bind(pro)
        .fetch_one(db)
        .await
        .unwrap();
        (pro, patient)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn load_plan_reads_plan_and_meals_together(db: PgPool) {
        let store = PgPlanStore::new(db.clone());
        let (pro, patient) = seed_patient(&db).await;
        let plan = services::create_plan(
            &store,
            patient,
            pro,
            serde_json::from_str(
                r#"{"title": "Week", "meals": [
                    {"mealType": "LUNCH", "dayOfWeek": "MONDAY", "content": "Rice"},
                    {"mealType": "DINNER", "dayOfWeek": "MONDAY", "content": "Soup"}
                ]}"#,
            )
            .unwrap(),
        )
        .await
        .unwrap();

        let (owned, meals) = store.load_plan(plan.id).await.unwrap().unwrap();
        assert!(owned.is_owned_by(pro));
        assert_eq!(owned.plan.title, "Week");
        assert_eq!(meals.len(), 2);
        assert!(meals.iter().all(|m| m.diet_plan_id == plan.id));

        // An open writer transaction is not visible to readers.
        let mut tx = store.begin().await.unwrap();
        tx.delete_meals(plan.id, &[meals[0].id]).await.unwrap();
        let (_, during) = store.load_plan(plan.id).await.unwrap().unwrap();
        assert_eq!(during.len(), 2);
        tx.commit().await.unwrap();
        let (_, after) = store.load_plan(plan.id).await.unwrap().unwrap();
        assert_eq!(after.len(), 1);

        assert!(store.soft_delete_plan(plan.id).await.unwrap());
        assert!(store.load_plan(plan.id).await.unwrap().is_none());
    }
}
