mod edit;

pub use edit::*;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};
use time::{Date, Duration, OffsetDateTime};

use crate::WeekKey;

#[derive(
    EnumString,
    VariantArray,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

/// Snapshot of a recipe at planning time. Later recipe edits do not reach it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub recipe_id: String,
    pub recipe_name: String,
    #[serde(default = "default_servings")]
    pub servings: u16,
    #[serde(default)]
    pub prep_time: u16,
    #[serde(default)]
    pub cooking_time: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
}

fn default_servings() -> u16 {
    1
}

impl MealEntry {
    pub fn new(recipe_id: impl Into<String>, recipe_name: impl Into<String>) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            recipe_name: recipe_name.into(),
            servings: default_servings(),
            ..Default::default()
        }
    }

    pub fn total_time(&self) -> u16 {
        self.prep_time.saturating_add(self.cooking_time)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Day {
    #[serde(with = "crate::iso_date")]
    pub date: Date,
    #[serde(default)]
    pub breakfast: Vec<MealEntry>,
    #[serde(default)]
    pub lunch: Vec<MealEntry>,
    #[serde(default)]
    pub dinner: Vec<MealEntry>,
    #[serde(default)]
    pub snacks: Vec<MealEntry>,
}

impl Day {
    pub fn new(date: Date) -> Self {
        Self {
            date,
            breakfast: vec![],
            lunch: vec![],
            dinner: vec![],
            snacks: vec![],
        }
    }

    pub fn slot(&self, slot: MealSlot) -> &Vec<MealEntry> {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Dinner => &self.dinner,
            MealSlot::Snacks => &self.snacks,
        }
    }

    pub fn slot_mut(&mut self, slot: MealSlot) -> &mut Vec<MealEntry> {
        match slot {
            MealSlot::Breakfast => &mut self.breakfast,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::Dinner => &mut self.dinner,
            MealSlot::Snacks => &mut self.snacks,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &MealEntry> {
        MealSlot::VARIANTS
            .iter()
            .flat_map(move |slot| self.slot(*slot).iter())
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// One calendar week of planned meals for one owner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(with = "crate::iso_date")]
    pub week_start_date: Date,
    pub days: Vec<Day>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_calories: u32,
    #[serde(default)]
    pub shopping_list_generated: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl MealPlan {
    /// An unpersisted plan with seven empty days.
    pub fn empty(owner_id: impl Into<String>, week: WeekKey) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            week_start_date: week.start(),
            days: week.days().into_iter().map(Day::new).collect(),
            title: format!("Week of {week}"),
            tags: vec![],
            total_calories: 0,
            shopping_list_generated: false,
            updated_at: 0,
        }
    }

    pub fn week_key(&self) -> WeekKey {
        WeekKey::new(self.week_start_date)
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn day(&self, date: Date) -> Option<&Day> {
        let index = self.week_key().day_index(date)?;
        self.days.get(index)
    }

    pub fn day_mut(&mut self, date: Date) -> Option<&mut Day> {
        let index = self.week_key().day_index(date)?;
        self.days.get_mut(index)
    }

    pub fn entry_count(&self) -> usize {
        self.days.iter().map(|day| day.entries().count()).sum()
    }

    /// Snaps the week start to its Monday and re-dates the days by position.
    ///
    /// Fails when the plan does not hold exactly seven days.
    pub fn normalize(&mut self) -> crate::Result<()> {
        if self.days.len() != 7 {
            crate::invalid!("a meal plan needs 7 days, got {}", self.days.len());
        }

        let week = self.week_key();
        self.week_start_date = week.start();

        for (index, day) in self.days.iter_mut().enumerate() {
            day.date = week.start().saturating_add(Duration::days(index as i64));
        }

        Ok(())
    }

    pub fn recompute_totals(&mut self) {
        self.total_calories = self
            .days
            .iter()
            .flat_map(|day| day.entries())
            .filter_map(|entry| entry.calories)
            .fold(0u32, |total, calories| total.saturating_add(calories));
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc().unix_timestamp();
    }
}

/// Fields a store update is allowed to change.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanChanges {
    pub title: String,
    pub days: Vec<Day>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_calories: u32,
    #[serde(default)]
    pub shopping_list_generated: bool,
}

impl From<&MealPlan> for MealPlanChanges {
    fn from(value: &MealPlan) -> Self {
        Self {
            title: value.title.to_owned(),
            days: value.days.to_owned(),
            tags: value.tags.to_owned(),
            total_calories: value.total_calories,
            shopping_list_generated: value.shopping_list_generated,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlanId {
    pub id: String,
}
