use std::sync::Arc;

use mealsync_shared::{Error, Result, mealplan::MealPlan};

use crate::{PlanCache, PlanStore, RetryPolicy, SyncSignal, queue::WriteQueue};

/// Single choke point for plan mutations.
///
/// The cache is updated before `save` returns, persistence happens on the
/// session's write queue and never blocks or rolls back the caller.
#[derive(Clone)]
pub struct PlanMutator {
    cache: PlanCache,
    queue: WriteQueue,
}

impl PlanMutator {
    pub fn new(
        cache: PlanCache,
        store: Arc<dyn PlanStore>,
        signal: SyncSignal,
        retry: RetryPolicy,
    ) -> Self {
        let queue = WriteQueue::spawn(cache.clone(), store, signal, retry);

        Self { cache, queue }
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Normalizes `plan`, caches it and queues it for persistence.
    ///
    /// Returns the plan as cached.
    #[tracing::instrument(skip_all, fields(week = %plan.week_start_date))]
    pub async fn save(&self, mut plan: MealPlan) -> Result<MealPlan> {
        plan.normalize()?;

        if plan.owner_id.is_empty() {
            plan.owner_id = self.cache.owner_id().to_owned();
        } else if plan.owner_id != self.cache.owner_id() {
            return Err(Error::Forbidden);
        }

        plan.recompute_totals();
        plan.touch();

        let week = plan.week_key();
        let plan = self.cache.stage(plan).await;

        if let Err(err) = self.queue.push(plan.clone()) {
            tracing::error!("{err}");
            self.cache.finish_write(week, 0, Err(err.to_string())).await;
        }

        Ok(plan)
    }

    /// Waits until every write saved so far has been processed.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }
}
