use serde::{Deserialize, Serialize};
use time::Date;

use super::{MealEntry, MealPlan, MealSlot};

/// Address of one entry inside a plan.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MealPosition {
    #[serde(with = "crate::iso_date")]
    pub date: Date,
    pub slot: MealSlot,
    pub index: usize,
}

impl MealPosition {
    pub fn new(date: Date, slot: MealSlot, index: usize) -> Self {
        Self { date, slot, index }
    }
}

impl MealPlan {
    fn slot_mut(&mut self, date: Date, slot: MealSlot) -> crate::Result<&mut Vec<MealEntry>> {
        let week = self.week_key();
        match self.day_mut(date) {
            Some(day) => Ok(day.slot_mut(slot)),
            None => crate::invalid!("{} is outside the week of {}", crate::format_date(date), week),
        }
    }

    /// Appends `entry` at the end of the slot.
    pub fn add_meal(&mut self, date: Date, slot: MealSlot, entry: MealEntry) -> crate::Result<()> {
        self.slot_mut(date, slot)?.push(entry);

        Ok(())
    }

    pub fn remove_meal(&mut self, position: MealPosition) -> crate::Result<MealEntry> {
        let entries = self.slot_mut(position.date, position.slot)?;
        if position.index >= entries.len() {
            return Err(crate::Error::NotFound);
        }

        Ok(entries.remove(position.index))
    }

    pub fn replace_meal(&mut self, position: MealPosition, entry: MealEntry) -> crate::Result<()> {
        let entries = self.slot_mut(position.date, position.slot)?;
        let Some(current) = entries.get_mut(position.index) else {
            return Err(crate::Error::NotFound);
        };

        *current = entry;

        Ok(())
    }

    /// Moves an entry inside this week. `to` is clamped to the target slot length.
    pub fn move_meal(&mut self, from: MealPosition, to: MealPosition) -> crate::Result<()> {
        // validate the target before detaching anything
        let target_len = self.slot_mut(to.date, to.slot)?.len();
        let entry = self.remove_meal(from)?;

        let same_slot = from.date == to.date && from.slot == to.slot;
        let max = if same_slot { target_len - 1 } else { target_len };
        let entries = self.slot_mut(to.date, to.slot)?;
        entries.insert(to.index.min(max), entry);

        Ok(())
    }
}

/// Moves an entry from one week's plan into another's.
pub fn move_meal_between(
    source: &mut MealPlan,
    from: MealPosition,
    target: &mut MealPlan,
    to: MealPosition,
) -> crate::Result<()> {
    let target_len = target.slot_mut(to.date, to.slot)?.len();
    let entry = source.remove_meal(from)?;
    target
        .slot_mut(to.date, to.slot)?
        .insert(to.index.min(target_len), entry);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeekKey;
    use time::macros::date;

    fn plan() -> MealPlan {
        let mut plan = MealPlan::empty("john", WeekKey::new(date!(2024 - 03 - 11)));
        plan.add_meal(date!(2024 - 03 - 11), MealSlot::Breakfast, MealEntry::new("r1", "Oats"))
            .unwrap();
        plan.add_meal(date!(2024 - 03 - 11), MealSlot::Breakfast, MealEntry::new("r2", "Eggs"))
            .unwrap();
        plan
    }

    #[test]
    fn test_add_meal_outside_week_is_rejected() {
        let mut plan = plan();
        let result = plan.add_meal(
            date!(2024 - 03 - 18),
            MealSlot::Lunch,
            MealEntry::new("r3", "Soup"),
        );

        assert!(matches!(result, Err(crate::Error::Validate(_))));
        assert_eq!(plan.entry_count(), 2);
    }

    #[test]
    fn test_remove_meal() {
        let mut plan = plan();
        let removed = plan
            .remove_meal(MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 0))
            .unwrap();

        assert_eq!(removed.recipe_name, "Oats");
        assert_eq!(plan.days[0].breakfast[0].recipe_name, "Eggs");

        let missing =
            plan.remove_meal(MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 5));
        assert!(matches!(missing, Err(crate::Error::NotFound)));
    }

    #[test]
    fn test_move_meal_across_days() {
        let mut plan = plan();
        plan.move_meal(
            MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 1),
            MealPosition::new(date!(2024 - 03 - 15), MealSlot::Dinner, 0),
        )
        .unwrap();

        assert_eq!(plan.days[0].breakfast.len(), 1);
        assert_eq!(plan.days[4].dinner[0].recipe_name, "Eggs");
    }

    #[test]
    fn test_move_meal_reorders_within_slot() {
        let mut plan = plan();
        plan.move_meal(
            MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 0),
            MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 10),
        )
        .unwrap();

        let names: Vec<_> = plan.days[0]
            .breakfast
            .iter()
            .map(|e| e.recipe_name.as_str())
            .collect();
        assert_eq!(names, vec!["Eggs", "Oats"]);
    }

    #[test]
    fn test_move_meal_to_invalid_target_keeps_entry() {
        let mut plan = plan();
        let result = plan.move_meal(
            MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 0),
            MealPosition::new(date!(2024 - 04 - 01), MealSlot::Dinner, 0),
        );

        assert!(result.is_err());
        assert_eq!(plan.entry_count(), 2);
    }

    #[test]
    fn test_move_meal_between_weeks() {
        let mut source = plan();
        let mut target = MealPlan::empty("john", WeekKey::new(date!(2024 - 03 - 18)));

        move_meal_between(
            &mut source,
            MealPosition::new(date!(2024 - 03 - 11), MealSlot::Breakfast, 0),
            &mut target,
            MealPosition::new(date!(2024 - 03 - 19), MealSlot::Lunch, 0),
        )
        .unwrap();

        assert_eq!(source.entry_count(), 1);
        assert_eq!(target.days[1].lunch[0].recipe_name, "Oats");
    }
}
