mod mealplan_week;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "mealsync",
    "m0001",
    vec_box![],
    vec_box![mealplan_week::CreateTable, mealplan_week::CreateUk1]
);
