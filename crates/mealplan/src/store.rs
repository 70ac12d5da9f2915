use async_trait::async_trait;
use mealsync_shared::{Error, Result, WeekKey, mealplan::MealPlan};

/// Persistent backing store for meal plans, scoped by owner.
#[async_trait]
pub trait PlanStore: Send + Sync + 'static {
    /// The owner's plan for `week`, if one was persisted.
    async fn find_week(&self, owner_id: &str, week: WeekKey) -> Result<Option<MealPlan>>;

    /// Persists a plan without an id and returns the id the store assigned.
    ///
    /// When the owner already has a plan for the week that record is
    /// updated instead and its id returned.
    async fn create(&self, plan: &MealPlan) -> Result<String>;

    /// Overwrites the mutable fields of the plan stored under `id`.
    async fn update(&self, id: &str, plan: &MealPlan) -> Result<()>;
}

/// Whether a failed store call is worth retrying.
pub fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Server(_) | Error::Unknown(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&Error::Server("503".to_owned())));
        assert!(is_transient(&Error::Unknown(anyhow::anyhow!("io"))));
        assert!(!is_transient(&Error::Validate("bad".to_owned())));
        assert!(!is_transient(&Error::NotFound));
        assert!(!is_transient(&Error::Forbidden));
    }
}
