#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    str::FromStr,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use mealsync_db::{Migrate, Plan};
use mealsync_mealplan::{PlanStore, RetryPolicy, SqliteStore, SyncOptions};
use mealsync_shared::{Error, Result, WeekKey, mealplan::MealPlan};
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

pub async fn setup_test_store(path: PathBuf) -> anyhow::Result<SqliteStore> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.to_str().unwrap()))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    let mut conn = pool.acquire().await?;
    mealsync_db::migrator()?
        .run(&mut conn, &Plan::apply_all())
        .await?;

    Ok(SqliteStore::new(pool.clone(), pool))
}

pub fn fast_options() -> SyncOptions {
    SyncOptions {
        debounce: Duration::from_millis(50),
        retry: RetryPolicy {
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_times: 2,
        },
    }
}

/// In-memory store counting calls, optionally failing the next reads or writes.
#[derive(Default)]
pub struct MemoryStore {
    plans: Mutex<HashMap<String, MealPlan>>,
    failures: AtomicUsize,
    find_failures: AtomicUsize,
    next_id: AtomicUsize,
    pub finds: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
}

impl MemoryStore {
    /// Makes the next `count` writes fail with a transient error.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` lookups fail with a transient error.
    pub fn fail_next_find(&self, count: usize) {
        self.find_failures.store(count, Ordering::SeqCst);
    }

    pub fn insert(&self, mut plan: MealPlan) -> String {
        let id = format!("plan-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        plan.id = Some(id.to_owned());
        self.plans.lock().unwrap().insert(id.to_owned(), plan);

        id
    }

    pub fn len(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<MealPlan> {
        self.plans.lock().unwrap().get(id).cloned()
    }

    fn take_failure(&self) -> Result<()> {
        Self::take(&self.failures)
    }

    fn take(failures: &AtomicUsize) -> Result<()> {
        let failed = failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if failed {
            return Err(Error::Server("store unavailable".to_owned()));
        }

        Ok(())
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn find_week(&self, owner_id: &str, week: WeekKey) -> Result<Option<MealPlan>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        Self::take(&self.find_failures)?;

        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|plan| plan.owner_id == owner_id && plan.week_key() == week)
            .cloned())
    }

    async fn create(&self, plan: &MealPlan) -> Result<String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let mut plans = self.plans.lock().unwrap();
        let existing = plans
            .iter()
            .find(|(_, p)| p.owner_id == plan.owner_id && p.week_key() == plan.week_key())
            .map(|(id, _)| id.to_owned());

        let id = existing.unwrap_or_else(|| {
            format!("plan-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
        });

        let mut stored = plan.clone();
        stored.id = Some(id.to_owned());
        plans.insert(id.to_owned(), stored);

        Ok(id)
    }

    async fn update(&self, id: &str, plan: &MealPlan) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let mut plans = self.plans.lock().unwrap();
        let Some(stored) = plans.get_mut(id) else {
            return Err(Error::NotFound);
        };

        let mut plan = plan.clone();
        plan.id = Some(id.to_owned());
        *stored = plan;

        Ok(())
    }
}
