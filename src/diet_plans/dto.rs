use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::errors::PlanError;
use super::model::{DayOfWeek, MealType, NewDietPlan, PlanStatus};
use super::patch::Patch;

/// A meal in a create or update payload. `id` marks an existing meal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub meal_type: MealType,
    pub day_of_week: DayOfWeek,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDietPlanRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub meals: Vec<MealInput>,
}

impl CreateDietPlanRequest {
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.title.trim().is_empty() {
            return Err(PlanError::validation("title is required"));
        }
        validate_range(self.start_date, self.end_date)?;
        validate_meals(&self.meals)?;
        if self.meals.iter().any(|m| m.id.is_some()) {
            return Err(PlanError::validation("new meals cannot carry an id"));
        }
        Ok(())
    }

    /// A missing status means the plan starts active.
    pub fn into_new_plan(
        self,
        patient_id: Uuid,
        professional_id: Uuid,
    ) -> (NewDietPlan, Vec<MealInput>) {
        let is_active = self
            .status
            .as_deref()
            .map(PlanStatus::is_active)
            .unwrap_or(true);
        let plan = NewDietPlan {
            patient_id,
            professional_id,
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            objectives: self.objectives,
            notes: self.notes,
            is_active,
        };
        (plan, self.meals)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDietPlanRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<Option<String>>,
    #[serde(default)]
    pub start_date: Patch<Option<Date>>,
    #[serde(default)]
    pub end_date: Patch<Option<Date>>,
    #[serde(default)]
    pub objectives: Patch<Option<String>>,
    #[serde(default)]
    pub notes: Patch<Option<String>>,
    #[serde(default)]
    pub status: Patch<String>,
    #[serde(default)]
    pub meals: Option<Vec<MealInput>>,
}

/// Column changes for an existing plan; only `Present` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanFieldChanges {
    pub title: Patch<String>,
    pub description: Patch<Option<String>>,
    pub start_date: Patch<Option<Date>>,
    pub end_date: Patch<Option<Date>>,
    pub objectives: Patch<Option<String>>,
    pub notes: Patch<Option<String>>,
    pub is_active: Patch<bool>,
}

impl PlanFieldChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_absent()
            && self.description.is_absent()
            && self.start_date.is_absent()
            && self.end_date.is_absent()
            && self.objectives.is_absent()
            && self.notes.is_absent()
            && self.is_active.is_absent()
    }
}

impl UpdateDietPlanRequest {
    pub fn validate(&self) -> Result<(), PlanError> {
        let no_fields = self.title.is_absent()
            && self.description.is_absent()
            && self.start_date.is_absent()
            && self.end_date.is_absent()
            && self.objectives.is_absent()
            && self.notes.is_absent()
            && self.status.is_absent();
        if no_fields && self.meals.is_none() {
            return Err(PlanError::validation("no fields to update"));
        }
        if let Patch::Present(title) = &self.title {
            if title.trim().is_empty() {
                return Err(PlanError::validation("title cannot be empty"));
            }
        }
        if let (Patch::Present(start), Patch::Present(end)) = (&self.start_date, &self.end_date) {
            validate_range(*start, *end)?;
        }
        if let Some(meals) = &self.meals {
            validate_meals(meals)?;
        }
        Ok(())
    }

    pub fn into_parts(self) -> (PlanFieldChanges, Option<Vec<MealInput>>) {
        let changes = PlanFieldChanges {
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            objectives: self.objectives,
            notes: self.notes,
            is_active: self.status.map(|s| PlanStatus::is_active(&s)),
        };
        (changes, self.meals)
    }
}

pub(super) fn validate_range(start: Option<Date>, end: Option<Date>) -> Result<(), PlanError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(PlanError::validation(
            "endDate must be on or after startDate",
        )),
        _ => Ok(()),
    }
}

fn validate_meals(meals: &[MealInput]) -> Result<(), PlanError> {
    if meals.iter().any(|m| m.content.trim().is_empty()) {
        return Err(PlanError::validation("meal content cannot be empty"));
    }
    Ok(())
}
