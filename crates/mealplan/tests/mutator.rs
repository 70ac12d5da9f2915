use std::sync::{Arc, atomic::Ordering};

use mealsync_mealplan::{
    PlanCache, PlanMutator, PlanSession, PlanStore, RetryPolicy, SyncSignal, SyncStatus,
};
use mealsync_shared::{
    Error, WeekKey,
    mealplan::{MealEntry, MealPlan, MealPosition, MealSlot},
};
use temp_dir::TempDir;
use time::macros::date;

use crate::helpers::MemoryStore;

mod helpers;

fn entry(id: &str, name: &str, calories: u32) -> MealEntry {
    let mut entry = MealEntry::new(id, name);
    entry.calories = Some(calories);
    entry
}

#[tokio::test]
async fn test_save_assigns_store_id_to_cache() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(helpers::setup_test_store(dir.child("db.sqlite3")).await?);
    let cache = PlanCache::new("john");
    let mutator = PlanMutator::new(
        cache.clone(),
        store.clone(),
        SyncSignal::new(),
        RetryPolicy::none(),
    );

    let week = WeekKey::new(date!(2024 - 03 - 11));
    let mut plan = MealPlan::empty("john", week);
    plan.add_meal(date!(2024 - 03 - 12), MealSlot::Lunch, entry("r1", "Salad", 300))?;

    let saved = mutator.save(plan).await?;
    assert_eq!(saved.total_calories, 300);
    assert!(saved.updated_at > 0);
    assert_eq!(cache.status(week).await, SyncStatus::Pending);

    mutator.flush().await;

    let cached = cache.get(week).await.unwrap();
    let stored = store.find_week("john", week).await?.unwrap();
    assert_eq!(cached.id, stored.id);
    assert!(cached.id.is_some());
    assert_eq!(stored.days[1].lunch[0].recipe_name, "Salad");
    assert_eq!(cache.status(week).await, SyncStatus::Synced);

    Ok(())
}

#[tokio::test]
async fn test_rapid_saves_create_one_record() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(helpers::setup_test_store(dir.child("db.sqlite3")).await?);
    let cache = PlanCache::new("john");
    let mutator = PlanMutator::new(
        cache.clone(),
        store.clone(),
        SyncSignal::new(),
        RetryPolicy::none(),
    );

    let week = WeekKey::new(date!(2024 - 03 - 14));
    let mut first = MealPlan::empty("john", week);
    first.add_meal(date!(2024 - 03 - 11), MealSlot::Breakfast, entry("r1", "Oats", 350))?;
    let mut second = MealPlan::empty("john", week);
    second.add_meal(date!(2024 - 03 - 15), MealSlot::Dinner, entry("r2", "Curry", 700))?;

    mutator.save(first).await?;
    mutator.save(second.clone()).await?;

    // the cache reflects the second plan, not a merge
    let cached = cache.get(week).await.unwrap();
    assert!(cached.days[0].breakfast.is_empty());
    assert_eq!(cached.days[4].dinner[0].recipe_name, "Curry");

    mutator.flush().await;

    let stored = store.find_week("john", week).await?.unwrap();
    assert_eq!(stored.days[4].dinner[0].recipe_name, "Curry");
    assert!(stored.days[0].breakfast.is_empty());
    assert_eq!(stored.total_calories, 700);
    assert_eq!(cache.get(week).await.unwrap().id, stored.id);

    Ok(())
}

#[tokio::test]
async fn test_saves_after_create_reuse_the_id() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::default());
    let cache = PlanCache::new("john");
    let mutator = PlanMutator::new(
        cache.clone(),
        store.clone(),
        SyncSignal::new(),
        RetryPolicy::none(),
    );

    let week = WeekKey::new(date!(2024 - 03 - 11));
    mutator.save(MealPlan::empty("john", week)).await?;
    mutator.flush().await;

    // a plan captured before the id arrived
    let mut stale = MealPlan::empty("john", week);
    stale.title = "Busy week".to_owned();
    mutator.save(stale).await?;
    mutator.flush().await;

    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    assert_eq!(store.len(), 1);

    let id = cache.get(week).await.unwrap().id.unwrap();
    assert_eq!(store.get(&id).unwrap().title, "Busy week");

    Ok(())
}

#[tokio::test]
async fn test_failed_persist_keeps_cache_and_marks_week() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::default());
    store.fail_next(10);

    let cache = PlanCache::new("john");
    let mutator = PlanMutator::new(
        cache.clone(),
        store.clone(),
        SyncSignal::new(),
        helpers::fast_options().retry,
    );

    let week = WeekKey::new(date!(2024 - 03 - 11));
    let mut plan = MealPlan::empty("john", week);
    plan.add_meal(date!(2024 - 03 - 13), MealSlot::Snacks, entry("r1", "Nuts", 200))?;

    mutator.save(plan).await?;
    mutator.flush().await;

    // first attempt plus two retries
    assert_eq!(store.creates.load(Ordering::SeqCst), 3);
    assert_eq!(store.len(), 0);
    assert!(matches!(cache.status(week).await, SyncStatus::Failed(_)));

    let cached = cache.get(week).await.unwrap();
    assert_eq!(cached.days[2].snacks[0].recipe_name, "Nuts");
    assert!(cached.id.is_none());

    Ok(())
}

#[tokio::test]
async fn test_transient_failure_is_retried() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::default());
    store.fail_next(1);

    let signal = SyncSignal::new();
    let cache = PlanCache::new("john");
    let mutator = PlanMutator::new(
        cache.clone(),
        store.clone(),
        signal.clone(),
        helpers::fast_options().retry,
    );

    let week = WeekKey::new(date!(2024 - 03 - 11));
    mutator.save(MealPlan::empty("john", week)).await?;
    mutator.flush().await;

    assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    assert_eq!(store.len(), 1);
    assert_eq!(cache.status(week).await, SyncStatus::Synced);
    assert_eq!(signal.version(), 1);

    Ok(())
}

#[tokio::test]
async fn test_save_rejects_foreign_or_malformed_plans() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::default());
    let cache = PlanCache::new("john");
    let mutator = PlanMutator::new(cache.clone(), store, SyncSignal::new(), RetryPolicy::none());

    let week = WeekKey::new(date!(2024 - 03 - 11));
    let foreign = MealPlan::empty("albert", week);
    assert!(matches!(mutator.save(foreign).await, Err(Error::Forbidden)));

    let mut short = MealPlan::empty("john", week);
    short.days.truncate(5);
    assert!(matches!(mutator.save(short).await, Err(Error::Validate(_))));

    assert_eq!(cache.get(week).await, None);

    let mut anonymous = MealPlan::empty("", week);
    anonymous.week_start_date = date!(2024 - 03 - 14);
    let saved = mutator.save(anonymous).await?;
    assert_eq!(saved.owner_id, "john");
    assert_eq!(saved.week_start_date, date!(2024 - 03 - 11));

    Ok(())
}

#[tokio::test]
async fn test_session_edits_persist_through_sqlite() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(helpers::setup_test_store(dir.child("db.sqlite3")).await?);
    let signal = SyncSignal::new();
    let session = PlanSession::new(
        "john",
        store.clone(),
        &signal,
        date!(2024 - 03 - 14),
        helpers::fast_options(),
    );

    session.settle_now().await;
    session
        .add_meal(date!(2024 - 03 - 14), MealSlot::Dinner, entry("r1", "Pasta", 650))
        .await?;
    session
        .add_meal(date!(2024 - 03 - 14), MealSlot::Dinner, entry("r2", "Salad", 150))
        .await?;
    session
        .move_meal(
            MealPosition::new(date!(2024 - 03 - 14), MealSlot::Dinner, 1),
            MealPosition::new(date!(2024 - 03 - 19), MealSlot::Lunch, 0),
        )
        .await?;
    session.flush().await;

    let this_week = store
        .find_week("john", WeekKey::new(date!(2024 - 03 - 11)))
        .await?
        .unwrap();
    let next_week = store
        .find_week("john", WeekKey::new(date!(2024 - 03 - 18)))
        .await?
        .unwrap();

    assert_eq!(this_week.days[3].dinner.len(), 1);
    assert_eq!(this_week.total_calories, 650);
    assert_eq!(next_week.days[1].lunch[0].recipe_name, "Salad");
    assert_eq!(next_week.total_calories, 150);
    assert_eq!(session.status(date!(2024 - 03 - 19)).await, SyncStatus::Synced);

    let active = session.active().unwrap();
    assert_eq!(active.week_start_date, date!(2024 - 03 - 11));
    assert_eq!(active.days[3].dinner.len(), 1);

    let removed = session
        .remove_meal(MealPosition::new(date!(2024 - 03 - 14), MealSlot::Dinner, 0))
        .await?;
    assert_eq!(removed.recipe_name, "Pasta");
    session.flush().await;

    let this_week = store
        .find_week("john", WeekKey::new(date!(2024 - 03 - 11)))
        .await?
        .unwrap();
    assert_eq!(this_week.entry_count(), 0);
    assert_eq!(this_week.total_calories, 0);

    Ok(())
}
