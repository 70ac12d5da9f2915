//! JSON endpoints backing [`mealsync_mealplan::HttpStore`].

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use mealsync_mealplan::PlanStore;
use mealsync_shared::{
    WeekKey,
    mealplan::{MealPlan, MealPlanChanges, PlanId},
};
use serde::Deserialize;

use crate::{auth::Owner, error::ApiError, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "weekStart")]
    pub week_start: Option<String>,
}

/// GET /meal-plans?weekStart=YYYY-MM-DD
///
/// Zero or one plan, any date of the week is accepted.
#[tracing::instrument(skip_all)]
pub async fn list(
    Owner(owner): Owner,
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<MealPlan>>, ApiError> {
    let Query(query) = query.map_err(|err| ApiError::BadRequest(err.body_text()))?;

    let Some(week_start) = query.week_start else {
        return Err(ApiError::BadRequest(
            "weekStart query parameter is required".to_string(),
        ));
    };

    let week = WeekKey::parse(&week_start)?;
    let plan = state.store.find_week(&owner, week).await?;

    Ok(Json(plan.into_iter().collect()))
}

/// POST /meal-plans
///
/// Creates the week's plan, or overwrites the one the owner already has.
#[tracing::instrument(skip_all)]
pub async fn create(
    Owner(owner): Owner,
    State(state): State<AppState>,
    body: Result<Json<MealPlan>, JsonRejection>,
) -> Result<(StatusCode, Json<PlanId>), ApiError> {
    let Json(mut plan) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;

    if !plan.owner_id.is_empty() && plan.owner_id != owner {
        return Err(ApiError::Forbidden);
    }

    plan.id = None;
    plan.owner_id = owner;
    plan.normalize()?;
    plan.recompute_totals();
    if plan.updated_at == 0 {
        plan.touch();
    }

    let id = state.store.create(&plan).await?;
    tracing::info!(
        id = %id,
        owner_id = %plan.owner_id,
        week = %plan.week_key(),
        "meal plan created"
    );

    Ok((StatusCode::CREATED, Json(PlanId { id })))
}

/// PUT /meal-plans/{id}
#[tracing::instrument(skip_all)]
pub async fn update(
    Owner(owner): Owner,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MealPlanChanges>, JsonRejection>,
) -> Result<Json<PlanId>, ApiError> {
    let Json(changes) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;

    let Some(mut plan) = state.store.find(&id, &owner).await? else {
        return Err(ApiError::NotFound);
    };

    plan.title = changes.title;
    plan.days = changes.days;
    plan.tags = changes.tags;
    plan.shopping_list_generated = changes.shopping_list_generated;
    plan.normalize()?;
    plan.recompute_totals();
    plan.touch();

    state.store.update(&id, &plan).await?;

    Ok(Json(PlanId { id }))
}
