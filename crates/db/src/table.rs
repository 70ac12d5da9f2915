use sea_query::Iden;

#[derive(Iden, Clone)]
pub enum MealPlanWeek {
    Table,
    Id,
    OwnerId,
    WeekStart,
    Title,
    Days,
    Tags,
    TotalCalories,
    ShoppingListGenerated,
    CreatedAt,
    UpdatedAt,
}
