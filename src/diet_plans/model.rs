use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Meal slot within a day. Declaration order is the display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    MidMorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Public face of the `is_active` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    Draft,
}

impl PlanStatus {
    pub const ACTIVE: &'static str = "ACTIVE";

    /// Only the exact string `ACTIVE` activates a plan.
    pub fn is_active(status: &str) -> bool {
        status == Self::ACTIVE
    }

    pub fn from_active(active: bool) -> Self {
        if active {
            PlanStatus::Active
        } else {
            PlanStatus::Draft
        }
    }
}

/// `diet_plans` row.
#[derive(Debug, Clone, FromRow)]
pub struct DietPlanRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    // Read only by the in-memory store; SQL filters on these columns.
    #[allow(dead_code)]
    pub is_deleted: bool,
    #[allow(dead_code)]
    pub deleted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// `diet_plan_meals` row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub diet_plan_id: Uuid,
    pub meal_type: MealType,
    pub day_of_week: DayOfWeek,
    pub content: String,
}

/// Plan row together with the professional of its owning patient.
#[derive(Debug, Clone)]
pub struct OwnedPlan {
    pub plan: DietPlanRow,
    pub patient_professional_id: Uuid,
}

impl OwnedPlan {
    pub fn is_owned_by(&self, professional_id: Uuid) -> bool {
        self.patient_professional_id == professional_id
    }
}

/// Values for a fresh `diet_plans` row.
#[derive(Debug, Clone)]
pub struct NewDietPlan {
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: Uuid,
    pub meal_type: MealType,
    pub day_of_week: DayOfWeek,
    pub content: String,
}

impl From<MealRow> for Meal {
    fn from(r: MealRow) -> Self {
        Self {
            id: r.id,
            meal_type: r.meal_type,
            day_of_week: r.day_of_week,
            content: r.content,
        }
    }
}

/// A plan as returned to callers: status string instead of the flag, meals
/// sorted by day then meal type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    pub status: PlanStatus,
    pub meals: Vec<Meal>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl DietPlan {
    pub fn compose(plan: DietPlanRow, mut meals: Vec<MealRow>) -> Self {
        meals.sort_by_key(|m| (m.day_of_week, m.meal_type));
        Self {
            id: plan.id,
            patient_id: plan.patient_id,
            professional_id: plan.professional_id,
            title: plan.title,
            description: plan.description,
            start_date: plan.start_date,
            end_date: plan.end_date,
            objectives: plan.objectives,
            notes: plan.notes,
            status: PlanStatus::from_active(plan.is_active),
            meals: meals.into_iter().map(Meal::from).collect(),
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}

/// List entry; meals are left out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlanSummary {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status: PlanStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<DietPlanRow> for DietPlanSummary {
    fn from(p: DietPlanRow) -> Self {
        Self {
            id: p.id,
            patient_id: p.patient_id,
            title: p.title,
            start_date: p.start_date,
            end_date: p.end_date,
            status: PlanStatus::from_active(p.is_active),
            created_at: p.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_only_exact_active() {
        assert!(PlanStatus::is_active("ACTIVE"));
        assert!(!PlanStatus::is_active("DRAFT"));
        assert!(!PlanStatus::is_active("active"));
        assert!(!PlanStatus::is_active("ARCHIVED"));
        assert!(!PlanStatus::is_active(""));
    }

    #[test]
    fn status_round_trips_through_flag() {
        for (input, expected) in [("ACTIVE", PlanStatus::Active), ("DRAFT", PlanStatus::Draft)] {
            let flag = PlanStatus::is_active(input);
            assert_eq!(PlanStatus::from_active(flag), expected);
        }
        let json = serde_json::to_string(&PlanStatus::Draft).unwrap();
        assert_eq!(json, "\"DRAFT\"");
    }

    #[test]
    fn meal_enums_use_screaming_case_on_the_wire() {
        let t: MealType = serde_json::from_str("\"MID_MORNING_SNACK\"").unwrap();
        assert_eq!(t, MealType::MidMorningSnack);
        let d: DayOfWeek = serde_json::from_str("\"SUNDAY\"").unwrap();
        assert_eq!(d, DayOfWeek::Sunday);
        assert!(serde_json::from_str::<MealType>("\"BRUNCH\"").is_err());
    }

    #[test]
    fn compose_orders_meals_by_day_then_type() {
        let plan_id = Uuid::new_v4();
        let meal = |day, ty| MealRow {
            id: Uuid::new_v4(),
            diet_plan_id: plan_id,
            meal_type: ty,
            day_of_week: day,
            content: "x".into(),
        };
        let now = OffsetDateTime::now_utc();
        let row = DietPlanRow {
            id: plan_id,
            patient_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            title: "Cut".into(),
            description: None,
            start_date: None,
            end_date: None,
            objectives: None,
            notes: None,
            is_active: false,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let plan = DietPlan::compose(
            row,
            vec![
                meal(DayOfWeek::Tuesday, MealType::Breakfast),
                meal(DayOfWeek::Monday, MealType::Dinner),
                meal(DayOfWeek::Monday, MealType::Breakfast),
            ],
        );
        let order: Vec<_> = plan.meals.iter().map(|m| (m.day_of_week, m.meal_type)).collect();
        assert_eq!(
            order,
            vec![
                (DayOfWeek::Monday, MealType::Breakfast),
                (DayOfWeek::Monday, MealType::Dinner),
                (DayOfWeek::Tuesday, MealType::Breakfast),
            ]
        );
        assert_eq!(plan.status, PlanStatus::Draft);
    }
}
