use axum::{
    Router,
    routing::{get, put},
};
use mealsync_mealplan::SqliteStore;
use sqlx::SqlitePool;

mod health;
mod meal_plans;

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub store: SqliteStore,
    pub pool: SqlitePool,
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        // Health check endpoints (no auth required)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .with_state(app_state.pool.clone())
        .route(
            "/meal-plans",
            get(meal_plans::list).post(meal_plans::create),
        )
        .route("/meal-plans/{id}", put(meal_plans::update))
        .with_state(app_state)
}
