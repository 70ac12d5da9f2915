use async_trait::async_trait;
use mealsync_db::table::MealPlanWeek;
use mealsync_shared::{
    Error, Result, WeekKey,
    mealplan::{Day, MealPlan},
};
use sea_query::{Expr, ExprTrait, OnConflict, Query, SelectStatement, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use sqlx::{SqlitePool, prelude::FromRow, types::Json};
use time::OffsetDateTime;
use ulid::Ulid;

use crate::PlanStore;

#[derive(FromRow)]
pub struct WeekRow {
    pub id: String,
    pub owner_id: String,
    pub week_start: i64,
    pub title: String,
    pub days: Json<Vec<Day>>,
    pub tags: Json<Vec<String>>,
    pub total_calories: i64,
    pub shopping_list_generated: bool,
    pub updated_at: i64,
}

impl TryFrom<WeekRow> for MealPlan {
    type Error = Error;

    fn try_from(value: WeekRow) -> Result<Self> {
        Ok(Self {
            id: Some(value.id),
            owner_id: value.owner_id,
            week_start_date: WeekKey::from_unix_timestamp(value.week_start)?.start(),
            days: value.days.0,
            title: value.title,
            tags: value.tags.0,
            total_calories: u32::try_from(value.total_calories)?,
            shopping_list_generated: value.shopping_list_generated,
            updated_at: value.updated_at,
        })
    }
}

/// [`PlanStore`] over the `meal_plan_week` table.
#[derive(Clone)]
pub struct SqliteStore {
    read_db: SqlitePool,
    write_db: SqlitePool,
}

impl SqliteStore {
    pub fn new(read_db: SqlitePool, write_db: SqlitePool) -> Self {
        Self { read_db, write_db }
    }

    fn select() -> SelectStatement {
        Query::select()
            .columns([
                MealPlanWeek::Id,
                MealPlanWeek::OwnerId,
                MealPlanWeek::WeekStart,
                MealPlanWeek::Title,
                MealPlanWeek::Days,
                MealPlanWeek::Tags,
                MealPlanWeek::TotalCalories,
                MealPlanWeek::ShoppingListGenerated,
                MealPlanWeek::UpdatedAt,
            ])
            .from(MealPlanWeek::Table)
            .to_owned()
    }

    async fn fetch_one(&self, statement: SelectStatement) -> Result<Option<MealPlan>> {
        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_as_with::<_, WeekRow, _>(&sql, values)
            .fetch_optional(&self.read_db)
            .await?;

        row.map(MealPlan::try_from).transpose()
    }

    /// The owner's plan stored under `id`.
    pub async fn find(&self, id: &str, owner_id: &str) -> Result<Option<MealPlan>> {
        let statement = Self::select()
            .and_where(Expr::col(MealPlanWeek::Id).eq(id))
            .and_where(Expr::col(MealPlanWeek::OwnerId).eq(owner_id))
            .limit(1)
            .to_owned();

        self.fetch_one(statement).await
    }
}

#[async_trait]
impl PlanStore for SqliteStore {
    async fn find_week(&self, owner_id: &str, week: WeekKey) -> Result<Option<MealPlan>> {
        let statement = Self::select()
            .and_where(Expr::col(MealPlanWeek::OwnerId).eq(owner_id))
            .and_where(Expr::col(MealPlanWeek::WeekStart).eq(week.unix_timestamp()))
            .limit(1)
            .to_owned();

        self.fetch_one(statement).await
    }

    #[tracing::instrument(skip_all, fields(owner_id = %plan.owner_id, week = %plan.week_key()))]
    async fn create(&self, plan: &MealPlan) -> Result<String> {
        if plan.owner_id.is_empty() {
            mealsync_shared::invalid!("meal plan has no owner");
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let updated_at = if plan.updated_at > 0 { plan.updated_at } else { now };

        let statement = Query::insert()
            .into_table(MealPlanWeek::Table)
            .columns([
                MealPlanWeek::Id,
                MealPlanWeek::OwnerId,
                MealPlanWeek::WeekStart,
                MealPlanWeek::Title,
                MealPlanWeek::Days,
                MealPlanWeek::Tags,
                MealPlanWeek::TotalCalories,
                MealPlanWeek::ShoppingListGenerated,
                MealPlanWeek::CreatedAt,
                MealPlanWeek::UpdatedAt,
            ])
            .values_panic([
                Ulid::new().to_string().into(),
                plan.owner_id.to_owned().into(),
                plan.week_key().unix_timestamp().into(),
                plan.title.to_owned().into(),
                serde_json::to_string(&plan.days)?.into(),
                serde_json::to_string(&plan.tags)?.into(),
                plan.total_calories.into(),
                plan.shopping_list_generated.into(),
                now.into(),
                updated_at.into(),
            ])
            .on_conflict(
                OnConflict::columns([MealPlanWeek::OwnerId, MealPlanWeek::WeekStart])
                    .update_columns([
                        MealPlanWeek::Title,
                        MealPlanWeek::Days,
                        MealPlanWeek::Tags,
                        MealPlanWeek::TotalCalories,
                        MealPlanWeek::ShoppingListGenerated,
                        MealPlanWeek::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .returning_col(MealPlanWeek::Id)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let (id,) = sqlx::query_as_with::<_, (String,), _>(&sql, values)
            .fetch_one(&self.write_db)
            .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self, plan), fields(owner_id = %plan.owner_id))]
    async fn update(&self, id: &str, plan: &MealPlan) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let updated_at = if plan.updated_at > 0 { plan.updated_at } else { now };

        let statement = Query::update()
            .table(MealPlanWeek::Table)
            .values([
                (MealPlanWeek::Title, plan.title.to_owned().into()),
                (
                    MealPlanWeek::Days,
                    serde_json::to_string(&plan.days)?.into(),
                ),
                (
                    MealPlanWeek::Tags,
                    serde_json::to_string(&plan.tags)?.into(),
                ),
                (MealPlanWeek::TotalCalories, plan.total_calories.into()),
                (
                    MealPlanWeek::ShoppingListGenerated,
                    plan.shopping_list_generated.into(),
                ),
                (MealPlanWeek::UpdatedAt, updated_at.into()),
            ])
            .and_where(Expr::col(MealPlanWeek::Id).eq(id))
            .and_where(Expr::col(MealPlanWeek::OwnerId).eq(&plan.owner_id))
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values)
            .execute(&self.write_db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}
