use std::{sync::Arc, time::Duration};

use mealsync_shared::{
    Result, WeekKey,
    mealplan::{MealEntry, MealPlan, MealPosition, MealSlot, move_meal_between},
};
use serde::Deserialize;
use time::Date;
use tokio::task::JoinHandle;

use crate::{
    PlanCache, PlanMutator, PlanStore, RetryPolicy, SyncSignal, SyncStatus, ViewMode,
    ViewSynchronizer, queue::millis,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Delay between the last view change and its reconciliation.
    #[serde(with = "millis")]
    pub debounce: Duration,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }
}

/// Everything one user session needs to view and edit its weekly plans.
pub struct PlanSession {
    cache: PlanCache,
    mutator: PlanMutator,
    sync: ViewSynchronizer,
    listener: JoinHandle<()>,
}

impl PlanSession {
    pub fn new(
        owner_id: impl Into<String>,
        store: Arc<dyn PlanStore>,
        signal: &SyncSignal,
        focus: Date,
        options: SyncOptions,
    ) -> Self {
        let cache = PlanCache::new(owner_id);
        let mutator = PlanMutator::new(
            cache.clone(),
            store.clone(),
            signal.clone(),
            options.retry,
        );
        let sync = ViewSynchronizer::new(cache.clone(), Some(store), focus, options.debounce);
        let listener = sync.listen(signal);

        Self {
            cache,
            mutator,
            sync,
            listener,
        }
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    pub fn mutator(&self) -> &PlanMutator {
        &self.mutator
    }

    pub fn synchronizer(&self) -> &ViewSynchronizer {
        &self.sync
    }

    pub fn active(&self) -> Option<MealPlan> {
        self.sync.active()
    }

    pub async fn navigate(&self, date: Date) {
        self.sync.navigate(date).await;
    }

    pub async fn set_mode(&self, mode: ViewMode) {
        self.sync.set_mode(mode).await;
    }

    pub async fn settle_now(&self) -> MealPlan {
        self.sync.settle_now().await
    }

    pub async fn status(&self, date: Date) -> SyncStatus {
        self.cache.status(WeekKey::new(date)).await
    }

    pub async fn save(&self, plan: MealPlan) -> Result<MealPlan> {
        let plan = self.mutator.save(plan).await?;
        self.sync.adopt(&plan);

        Ok(plan)
    }

    // The edit helpers below start from the stored plan and fail without
    // saving when the store cannot be reached to confirm it.

    pub async fn add_meal(&self, date: Date, slot: MealSlot, entry: MealEntry) -> Result<MealPlan> {
        let mut plan = self.sync.plan_for(date).await?;
        plan.add_meal(date, slot, entry)?;

        self.save(plan).await
    }

    pub async fn remove_meal(&self, position: MealPosition) -> Result<MealEntry> {
        let mut plan = self.sync.plan_for(position.date).await?;
        let entry = plan.remove_meal(position)?;
        self.save(plan).await?;

        Ok(entry)
    }

    pub async fn replace_meal(&self, position: MealPosition, entry: MealEntry) -> Result<MealPlan> {
        let mut plan = self.sync.plan_for(position.date).await?;
        plan.replace_meal(position, entry)?;

        self.save(plan).await
    }

    /// Moves an entry, saving both plans when it crosses a week boundary.
    pub async fn move_meal(&self, from: MealPosition, to: MealPosition) -> Result<()> {
        let mut source = self.sync.plan_for(from.date).await?;

        if source.week_key().contains(to.date) {
            source.move_meal(from, to)?;
            self.save(source).await?;

            return Ok(());
        }

        let mut target = self.sync.plan_for(to.date).await?;
        move_meal_between(&mut source, from, &mut target, to)?;
        self.save(source).await?;
        self.save(target).await?;

        Ok(())
    }

    pub async fn flush(&self) {
        self.mutator.flush().await;
    }
}

impl Drop for PlanSession {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
