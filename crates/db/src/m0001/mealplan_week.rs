use sea_query::{
    ColumnDef, Index, IndexCreateStatement, IndexDropStatement, Table, TableCreateStatement,
    TableDropStatement,
};

use crate::table::MealPlanWeek;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(MealPlanWeek::Table)
        .col(
            ColumnDef::new(MealPlanWeek::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(MealPlanWeek::OwnerId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(MealPlanWeek::WeekStart)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(MealPlanWeek::Title)
                .string()
                .not_null()
                .default(""),
        )
        .col(ColumnDef::new(MealPlanWeek::Days).text().not_null())
        .col(ColumnDef::new(MealPlanWeek::Tags).text().not_null())
        .col(
            ColumnDef::new(MealPlanWeek::TotalCalories)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(MealPlanWeek::ShoppingListGenerated)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(MealPlanWeek::CreatedAt)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(MealPlanWeek::UpdatedAt)
                .big_integer()
                .not_null(),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(MealPlanWeek::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateTable {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

/// One plan per owner and week.
pub struct CreateUk1;

fn create_uk_1() -> IndexCreateStatement {
    Index::create()
        .name("uk_meal_plan_week_owner_start")
        .table(MealPlanWeek::Table)
        .unique()
        .col(MealPlanWeek::OwnerId)
        .col(MealPlanWeek::WeekStart)
        .to_owned()
}

fn drop_uk_1() -> IndexDropStatement {
    Index::drop()
        .name("uk_meal_plan_week_owner_start")
        .table(MealPlanWeek::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateUk1 {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_uk_1().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_uk_1().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}
