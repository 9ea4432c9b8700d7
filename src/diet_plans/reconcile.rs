use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use super::dto::MealInput;
use super::model::MealRow;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("meal {0} does not belong to this diet plan")]
    UnknownMeal(Uuid),
    #[error("meal {0} appears more than once")]
    DuplicateMeal(Uuid),
}

/// Writes needed to turn the stored meal set into the desired one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MealDiff<'a> {
    pub to_create: Vec<&'a MealInput>,
    pub to_update: Vec<(Uuid, &'a MealInput)>,
    pub to_delete: Vec<Uuid>,
}

impl MealDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Set-based diff of `existing` against the full replacement list `desired`.
///
/// Desired meals without an id are created, desired meals whose id is stored
/// are updated in place, stored meals missing from `desired` are deleted.
/// An id that is not stored, or that appears twice, fails the whole diff.
pub fn reconcile<'a>(
    existing: &[MealRow],
    desired: &'a [MealInput],
) -> Result<MealDiff<'a>, ReconcileError> {
    let existing_ids: HashSet<Uuid> = existing.iter().map(|m| m.id).collect();

    let mut desired_ids = HashSet::with_capacity(desired.len());
    let mut diff = MealDiff::default();

    for meal in desired {
        match meal.id {
            None => diff.to_create.push(meal),
            Some(id) => {
                if !existing_ids.contains(&id) {
                    return Err(ReconcileError::UnknownMeal(id));
                }
                if !desired_ids.insert(id) {
                    return Err(ReconcileError::DuplicateMeal(id));
                }
                diff.to_update.push((id, meal));
            }
        }
    }

    // Iterate the stored rows rather than the set so the order is stable.
    diff.to_delete = existing
        .iter()
        .map(|m| m.id)
        .filter(|id| !desired_ids.contains(id))
        .collect();

    Ok(diff)
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::diet_plans::model::{DayOfWeek, MealType};
    use proptest::prelude::*;

    fn stored(plan: Uuid, count: usize) -> Vec<MealRow> {
        (0..count)
            .map(|_| MealRow {
                id: Uuid::new_v4(),
                diet_plan_id: plan,
                meal_type: MealType::Lunch,
                day_of_week: DayOfWeek::Wednesday,
                content: "rice".into(),
            })
            .collect()
    }

    fn wanted(id: Option<Uuid>) -> MealInput {
        MealInput {
            id,
            meal_type: MealType::Dinner,
            day_of_week: DayOfWeek::Thursday,
            content: "beans".into(),
        }
    }

    proptest! {
        /// Kept ids are updated, dropped ids deleted, id-less meals created.
        #[test]
        fn diff_matches_set_difference(
            keep in proptest::collection::vec(any::<bool>(), 0..12),
            fresh in 0usize..6,
            shift in any::<usize>(),
        ) {
            let existing = stored(Uuid::new_v4(), keep.len());
            let mut desired: Vec<MealInput> = existing
                .iter()
                .zip(&keep)
                .filter(|(_, kept)| **kept)
                .map(|(m, _)| wanted(Some(m.id)))
                .chain((0..fresh).map(|_| wanted(None)))
                .collect();
            if !desired.is_empty() {
                let n = shift % desired.len();
                desired.rotate_left(n);
            }

            let diff = reconcile(&existing, &desired).unwrap();

            let existing_ids: HashSet<Uuid> = existing.iter().map(|m| m.id).collect();
            let desired_ids: HashSet<Uuid> = desired.iter().filter_map(|m| m.id).collect();
            let deleted: HashSet<Uuid> = diff.to_delete.iter().copied().collect();
            let updated: HashSet<Uuid> = diff.to_update.iter().map(|(id, _)| *id).collect();

            let dropped: HashSet<Uuid> = existing_ids.difference(&desired_ids).copied().collect();
            prop_assert_eq!(&deleted, &dropped);
            prop_assert_eq!(deleted.len(), diff.to_delete.len());
            prop_assert_eq!(&updated, &desired_ids);
            prop_assert!(updated.is_subset(&existing_ids));
            prop_assert!(updated.is_disjoint(&deleted));
            prop_assert_eq!(diff.to_create.len(), fresh);
            prop_assert!(diff.to_create.iter().all(|m| m.id.is_none()));
            for (id, meal) in &diff.to_update {
                prop_assert_eq!(meal.id, Some(*id));
            }
        }

        /// Submitting every stored id back yields updates only.
        #[test]
        fn resubmission_is_idempotent(count in 0usize..12, shift in any::<usize>()) {
            let existing = stored(Uuid::new_v4(), count);
            let mut desired: Vec<MealInput> =
                existing.iter().map(|m| wanted(Some(m.id))).collect();
            if !desired.is_empty() {
                let n = shift % desired.len();
                desired.rotate_left(n);
            }

            let diff = reconcile(&existing, &desired).unwrap();

            prop_assert!(diff.to_create.is_empty());
            prop_assert!(diff.to_delete.is_empty());
            prop_assert_eq!(diff.to_update.len(), count);
        }
    }
}
