use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use mealsync_shared::{WeekKey, mealplan::MealPlan, weeks_in_month};
use strum::{AsRefStr, Display, EnumString, VariantArray};
use time::Date;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};

use crate::{FetchState, PlanCache, PlanStore, SyncSignal};

#[derive(
    EnumString, VariantArray, Display, AsRefStr, Default, Clone, Copy, Debug, PartialEq, Eq,
)]
#[strum(serialize_all = "lowercase")]
pub enum ViewMode {
    Day,
    #[default]
    Week,
    Month,
}

struct ViewState {
    mode: ViewMode,
    focus: Date,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

struct Inner {
    cache: PlanCache,
    store: Option<Arc<dyn PlanStore>>,
    debounce: Duration,
    state: Mutex<ViewState>,
    active: watch::Sender<Option<MealPlan>>,
    /// Set while the active plan is a placeholder for a week the store
    /// could not be asked about.
    unconfirmed: AtomicBool,
    reconciliations: AtomicU64,
}

/// Keeps the displayed plan consistent with the cache while the user switches
/// views and navigates dates.
#[derive(Clone)]
pub struct ViewSynchronizer(Arc<Inner>);

impl ViewSynchronizer {
    pub fn new(
        cache: PlanCache,
        store: Option<Arc<dyn PlanStore>>,
        focus: Date,
        debounce: Duration,
    ) -> Self {
        let (active, _) = watch::channel(None);

        Self(Arc::new(Inner {
            cache,
            store,
            debounce,
            state: Mutex::new(ViewState {
                mode: ViewMode::default(),
                focus,
                generation: 0,
                pending: None,
            }),
            active,
            unconfirmed: AtomicBool::new(false),
            reconciliations: AtomicU64::new(0),
        }))
    }

    pub fn cache(&self) -> &PlanCache {
        &self.0.cache
    }

    pub async fn mode(&self) -> ViewMode {
        self.0.state.lock().await.mode
    }

    pub async fn focus(&self) -> Date {
        self.0.state.lock().await.focus
    }

    /// The plan currently on display.
    pub fn active(&self) -> Option<MealPlan> {
        self.0.active.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<MealPlan>> {
        self.0.active.subscribe()
    }

    /// Number of reconciliations that published a plan.
    pub fn reconciliations(&self) -> u64 {
        self.0.reconciliations.load(Ordering::Relaxed)
    }

    pub async fn navigate(&self, date: Date) {
        let mut state = self.0.state.lock().await;
        state.focus = date;
        self.schedule(&mut state);
    }

    pub async fn set_mode(&self, mode: ViewMode) {
        let mut state = self.0.state.lock().await;
        if state.mode == mode {
            return;
        }

        state.mode = mode;
        self.schedule(&mut state);
    }

    /// Cancels the pending reconciliation and starts a new debounce window.
    fn schedule(&self, state: &mut ViewState) {
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }

        state.generation += 1;

        let generation = state.generation;
        let debounce = self.0.debounce;
        let synchronizer = self.clone();

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            // once started, a reconciliation runs to completion
            let task = tokio::spawn(async move {
                let (mode, focus) = {
                    let state = synchronizer.0.state.lock().await;
                    (state.mode, state.focus)
                };

                synchronizer.reconcile(mode, focus, generation).await;
            });

            if let Err(err) = task.await {
                tracing::error!("reconciliation task failed: {err}");
            }
        }));
    }

    /// Reconciles the current view immediately, skipping the debounce.
    pub async fn settle_now(&self) -> MealPlan {
        let (mode, focus, generation) = {
            let mut state = self.0.state.lock().await;
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }

            state.generation += 1;
            (state.mode, state.focus, state.generation)
        };

        self.reconcile(mode, focus, generation).await
    }

    #[tracing::instrument(skip(self))]
    async fn reconcile(&self, mode: ViewMode, focus: Date, generation: u64) -> MealPlan {
        let focus_week = WeekKey::new(focus);

        if mode == ViewMode::Month {
            match weeks_in_month(focus) {
                Ok(weeks) => {
                    let prefetch = weeks
                        .into_iter()
                        .filter(|week| *week != focus_week)
                        .map(|week| self.plan_for(week.start()));

                    for result in futures::future::join_all(prefetch).await {
                        if let Err(err) = result {
                            tracing::warn!("failed to prefetch meal plan: {err}");
                        }
                    }
                }
                Err(err) => tracing::warn!("failed to list weeks of month: {err}"),
            }
        }

        let resolved = match self.plan_for(focus).await {
            Ok(plan) => Some(plan),
            Err(err) => {
                tracing::warn!(week = %focus_week, "showing an unsaved placeholder: {err}");
                None
            }
        };

        let state = self.0.state.lock().await;
        if state.generation != generation {
            tracing::debug!("stale reconciliation dropped");
            return resolved.unwrap_or_else(|| MealPlan::empty(self.0.cache.owner_id(), focus_week));
        }

        // a save may have landed while the plan was resolving
        let (plan, confirmed) = match (self.0.cache.get(focus_week).await, resolved) {
            (Some(cached), _) => (cached, true),
            (None, Some(plan)) => (plan, true),
            (None, None) => (MealPlan::empty(self.0.cache.owner_id(), focus_week), false),
        };

        // the flag never lags behind a placeholder on display
        if confirmed {
            self.0.active.send_replace(Some(plan.clone()));
            self.0.unconfirmed.store(false, Ordering::Release);
        } else {
            self.0.unconfirmed.store(true, Ordering::Release);
            self.0.active.send_replace(Some(plan.clone()));
        }
        self.0.reconciliations.fetch_add(1, Ordering::Relaxed);
        drop(state);

        plan
    }

    /// Resolves the plan for the week of `date`, first match wins:
    /// the cached plan, the active plan when it covers that week, the plan
    /// fetched from the store, a new empty plan.
    ///
    /// A failed fetch leaves the week unknown and returns the error, nothing
    /// is cached for it.
    pub async fn plan_for(&self, date: Date) -> mealsync_shared::Result<MealPlan> {
        let cache = &self.0.cache;
        let week = WeekKey::new(date);

        if let Some(plan) = cache.get(week).await {
            return Ok(plan);
        }

        let active = self.active();
        if let Some(active) = active.as_ref().filter(|plan| plan.week_key() == week)
            && !self.0.unconfirmed.load(Ordering::Acquire)
        {
            return Ok(cache.get_or_create(date, Some(active)).await);
        }

        if let Some(store) = self.0.store.as_ref()
            && matches!(
                cache.fetch_state(week).await,
                FetchState::Unknown | FetchState::Loading
            )
        {
            cache.mark_loading(week).await;

            match store.find_week(cache.owner_id(), week).await {
                Ok(Some(plan)) => {
                    tracing::debug!(week = %week, "meal plan fetched");
                    return Ok(cache.put_fetched(plan).await);
                }
                Ok(None) => cache.mark_missing(week).await,
                Err(err) => {
                    tracing::warn!(week = %week, "failed to fetch meal plan: {err}");
                    cache.forget_fetch(week).await;

                    return Err(err);
                }
            }
        }

        Ok(cache.get_or_create(date, None).await)
    }

    /// Shows `plan` when it belongs to the week on display.
    pub fn adopt(&self, plan: &MealPlan) {
        self.0.active.send_if_modified(|current| match current {
            Some(current) if current.week_key() == plan.week_key() => {
                self.0.unconfirmed.store(false, Ordering::Release);
                if current == plan {
                    return false;
                }

                *current = plan.clone();
                true
            }
            _ => false,
        });
    }

    /// Re-fetches the displayed week and installs it unless local writes for
    /// it are still pending.
    pub async fn refresh(&self) -> mealsync_shared::Result<bool> {
        let (Some(store), Some(active)) = (self.0.store.as_ref(), self.active()) else {
            return Ok(false);
        };

        let week = active.week_key();
        let generation = self.0.cache.generation(week).await;
        let Some(plan) = store.find_week(self.0.cache.owner_id(), week).await? else {
            return Ok(false);
        };

        if !self.0.cache.replace_if_clean(plan.clone(), generation).await {
            return Ok(false);
        }

        tracing::debug!(week = %week, "meal plan refreshed");
        self.adopt(&plan);

        Ok(true)
    }

    /// Refreshes the displayed week every time `signal` fires.
    pub fn listen(&self, signal: &SyncSignal) -> JoinHandle<()> {
        let mut rx = signal.subscribe();
        let synchronizer = self.clone();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if let Err(err) = synchronizer.refresh().await {
                    tracing::warn!("failed to refresh meal plan: {err}");
                }
            }
        })
    }
}
