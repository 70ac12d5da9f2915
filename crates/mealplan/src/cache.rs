use std::{collections::HashMap, sync::Arc};

use mealsync_shared::{WeekKey, mealplan::MealPlan};
use time::Date;
use tokio::sync::RwLock;

/// Persistence state of a week as seen by this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Pending,
    Failed(String),
}

/// What the cache knows about a week's presence in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Never fetched and never created locally.
    Unknown,
    Loading,
    /// The store confirmed it holds no plan for the week.
    Missing,
    Present,
}

#[derive(Debug)]
enum Entry {
    Loading,
    Missing,
    Present(MealPlan),
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<WeekKey, Entry>,
    status: HashMap<WeekKey, SyncStatus>,
    pending: HashMap<WeekKey, usize>,
    generations: HashMap<WeekKey, u64>,
}

/// Session-scoped map from week key to meal plan.
///
/// Cloning yields another handle on the same map. The cache never talks to
/// the store, the mutator and the synchronizer do.
#[derive(Clone, Debug)]
pub struct PlanCache {
    owner_id: Arc<str>,
    inner: Arc<RwLock<Inner>>,
}

impl PlanCache {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Arc::from(owner_id.into()),
            inner: Arc::default(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub async fn get(&self, week: WeekKey) -> Option<MealPlan> {
        match self.inner.read().await.entries.get(&week) {
            Some(Entry::Present(plan)) => Some(plan.clone()),
            _ => None,
        }
    }

    /// Cached plan for the week of `date`, else `active` when it covers that
    /// week, else a fresh empty plan. Whatever is returned ends up cached.
    pub async fn get_or_create(&self, date: Date, active: Option<&MealPlan>) -> MealPlan {
        let week = WeekKey::new(date);
        let mut inner = self.inner.write().await;

        if let Some(Entry::Present(plan)) = inner.entries.get(&week) {
            return plan.clone();
        }

        let plan = match active {
            Some(active) if active.week_key() == week => {
                tracing::debug!(week = %week, "adopting active plan into cache");
                active.clone()
            }
            _ => {
                tracing::debug!(week = %week, "creating empty plan");
                MealPlan::empty(self.owner_id.as_ref(), week)
            }
        };

        inner.entries.insert(week, Entry::Present(plan.clone()));

        plan
    }

    /// Last write wins, no merge.
    pub async fn put(&self, plan: MealPlan) {
        let week = plan.week_key();
        self.inner
            .write()
            .await
            .entries
            .insert(week, Entry::Present(plan));
    }

    /// Installs a plan fetched from the store unless a local plan landed
    /// meanwhile. Returns whichever plan is cached afterwards.
    pub async fn put_fetched(&self, plan: MealPlan) -> MealPlan {
        let week = plan.week_key();
        let mut inner = self.inner.write().await;

        if let Some(Entry::Present(local)) = inner.entries.get(&week) {
            return local.clone();
        }

        inner.entries.insert(week, Entry::Present(plan.clone()));

        plan
    }

    /// Replaces the cached plan with a re-fetched one when no local write for
    /// the week was staged since `generation` and none is still in flight.
    pub async fn replace_if_clean(&self, plan: MealPlan, generation: u64) -> bool {
        let week = plan.week_key();
        let mut inner = self.inner.write().await;

        if inner.pending.get(&week).copied().unwrap_or_default() > 0
            || inner.generations.get(&week).copied().unwrap_or_default() != generation
        {
            return false;
        }

        if let Some(Entry::Present(current)) = inner.entries.get(&week)
            && current == &plan
        {
            return false;
        }

        inner.entries.insert(week, Entry::Present(plan));

        true
    }

    /// Number of writes staged for the week so far.
    pub async fn generation(&self, week: WeekKey) -> u64 {
        self.inner
            .read()
            .await
            .generations
            .get(&week)
            .copied()
            .unwrap_or_default()
    }

    /// Records the store id on the cached plan. A plan that already carries
    /// an id is left untouched.
    pub async fn assign_id(&self, week: WeekKey, id: impl Into<String>) -> bool {
        let mut inner = self.inner.write().await;

        match inner.entries.get_mut(&week) {
            Some(Entry::Present(plan)) if plan.id.is_none() => {
                plan.id = Some(id.into());
                true
            }
            _ => false,
        }
    }

    pub async fn fetch_state(&self, week: WeekKey) -> FetchState {
        match self.inner.read().await.entries.get(&week) {
            None => FetchState::Unknown,
            Some(Entry::Loading) => FetchState::Loading,
            Some(Entry::Missing) => FetchState::Missing,
            Some(Entry::Present(_)) => FetchState::Present,
        }
    }

    /// Claims the week for fetching. Returns false when it is not `Unknown`.
    pub async fn mark_loading(&self, week: WeekKey) -> bool {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&week) {
            return false;
        }

        inner.entries.insert(week, Entry::Loading);

        true
    }

    pub async fn mark_missing(&self, week: WeekKey) {
        let mut inner = self.inner.write().await;
        if let Some(Entry::Present(_)) = inner.entries.get(&week) {
            return;
        }

        inner.entries.insert(week, Entry::Missing);
    }

    /// Drops a `Loading` or `Missing` marker so the week is fetched again.
    pub async fn forget_fetch(&self, week: WeekKey) {
        let mut inner = self.inner.write().await;
        if matches!(
            inner.entries.get(&week),
            Some(Entry::Loading | Entry::Missing)
        ) {
            inner.entries.remove(&week);
        }
    }

    /// Drops a cached plan so the week resolves afresh. Refused while writes
    /// for the week are in flight.
    pub async fn evict(&self, week: WeekKey) -> bool {
        let mut inner = self.inner.write().await;
        if inner.pending.get(&week).copied().unwrap_or_default() > 0
            || !matches!(inner.entries.get(&week), Some(Entry::Present(_)))
        {
            return false;
        }

        inner.entries.remove(&week);
        inner.status.remove(&week);

        true
    }

    pub async fn weeks(&self) -> Vec<WeekKey> {
        let inner = self.inner.read().await;
        let mut weeks: Vec<_> = inner
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Present(_)))
            .map(|(week, _)| *week)
            .collect();
        weeks.sort();

        weeks
    }

    pub async fn status(&self, week: WeekKey) -> SyncStatus {
        self.inner
            .read()
            .await
            .status
            .get(&week)
            .cloned()
            .unwrap_or(SyncStatus::Synced)
    }

    pub async fn has_pending(&self, week: WeekKey) -> bool {
        self.inner
            .read()
            .await
            .pending
            .get(&week)
            .copied()
            .unwrap_or_default()
            > 0
    }

    /// Caches a mutated plan and marks its week pending in one step.
    ///
    /// A plan without an id inherits the id already known for its week.
    pub(crate) async fn stage(&self, mut plan: MealPlan) -> MealPlan {
        let week = plan.week_key();
        let mut inner = self.inner.write().await;

        if plan.id.is_none()
            && let Some(Entry::Present(current)) = inner.entries.get(&week)
        {
            plan.id = current.id.to_owned();
        }

        inner.entries.insert(week, Entry::Present(plan.clone()));
        *inner.pending.entry(week).or_default() += 1;
        *inner.generations.entry(week).or_default() += 1;
        inner.status.insert(week, SyncStatus::Pending);

        plan
    }

    /// Settles one processed write plus the `superseded` writes it replaced.
    pub(crate) async fn finish_write(
        &self,
        week: WeekKey,
        superseded: usize,
        outcome: Result<(), String>,
    ) {
        let mut inner = self.inner.write().await;
        let pending = inner.pending.entry(week).or_default();
        *pending = pending.saturating_sub(1 + superseded);
        let remaining = *pending;

        match outcome {
            Err(reason) => {
                inner.status.insert(week, SyncStatus::Failed(reason));
            }
            Ok(()) if remaining == 0 => {
                inner.status.insert(week, SyncStatus::Synced);
            }
            Ok(()) => {}
        }
    }
}
