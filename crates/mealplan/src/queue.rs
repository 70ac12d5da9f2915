use std::{collections::HashMap, sync::Arc, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use mealsync_shared::{WeekKey, mealplan::MealPlan};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::{PlanCache, PlanStore, SyncSignal, is_transient};

/// Exponential backoff applied to transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(with = "millis")]
    pub min_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub max_times: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_times: 5,
        }
    }
}

impl RetryPolicy {
    /// Fail on the first error.
    pub fn none() -> Self {
        Self {
            max_times: 0,
            ..Default::default()
        }
    }

    pub(crate) fn builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_times)
            .with_jitter()
    }
}

pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

enum Job {
    Write(MealPlan),
    Flush(oneshot::Sender<()>),
}

/// A write waiting in the current batch, with the number of older writes for
/// the same week it replaced.
struct Pending {
    plan: MealPlan,
    superseded: usize,
}

/// Sequential persistence worker, one per session.
#[derive(Clone)]
pub(crate) struct WriteQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl WriteQueue {
    pub fn spawn(
        cache: PlanCache,
        store: Arc<dyn PlanStore>,
        signal: SyncSignal,
        retry: RetryPolicy,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            cache,
            store,
            signal,
            retry,
        };

        tokio::spawn(worker.run(rx));

        Self { tx }
    }

    pub fn push(&self, plan: MealPlan) -> mealsync_shared::Result<()> {
        if self.tx.send(Job::Write(plan)).is_err() {
            mealsync_shared::bail!("write queue closed");
        }

        Ok(())
    }

    /// Resolves once every write pushed before the call has been processed.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Job::Flush(tx)).is_err() {
            return;
        }

        let _ = rx.await;
    }
}

struct Worker {
    cache: PlanCache,
    store: Arc<dyn PlanStore>,
    signal: SyncSignal,
    retry: RetryPolicy,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            let mut jobs = vec![job];
            while let Ok(job) = rx.try_recv() {
                jobs.push(job);
            }

            let mut batch: Vec<Pending> = vec![];
            let mut positions: HashMap<WeekKey, usize> = HashMap::new();

            for job in jobs {
                match job {
                    Job::Write(plan) => match positions.get(&plan.week_key()) {
                        Some(position) => {
                            let pending = &mut batch[*position];
                            pending.plan = plan;
                            pending.superseded += 1;
                        }
                        None => {
                            positions.insert(plan.week_key(), batch.len());
                            batch.push(Pending {
                                plan,
                                superseded: 0,
                            });
                        }
                    },
                    Job::Flush(done) => {
                        positions.clear();
                        for pending in batch.drain(..) {
                            self.process(pending).await;
                        }

                        let _ = done.send(());
                    }
                }
            }

            for pending in batch {
                self.process(pending).await;
            }
        }

        tracing::debug!("write queue closed");
    }

    async fn process(&self, pending: Pending) {
        let week = pending.plan.week_key();
        if pending.superseded > 0 {
            tracing::debug!(week = %week, superseded = pending.superseded, "coalesced writes");
        }

        match self.persist(pending.plan).await {
            Ok(()) => {
                self.cache
                    .finish_write(week, pending.superseded, Ok(()))
                    .await;
                self.signal.bump();
            }
            Err(err) => {
                tracing::error!(week = %week, "failed to persist meal plan: {err}");
                self.cache
                    .finish_write(week, pending.superseded, Err(err.to_string()))
                    .await;
            }
        }
    }

    async fn persist(&self, mut plan: MealPlan) -> mealsync_shared::Result<()> {
        let week = plan.week_key();

        // an earlier create may have finished after this plan was captured
        if plan.id.is_none()
            && let Some(cached) = self.cache.get(week).await
        {
            plan.id = cached.id;
        }

        let store = self.store.as_ref();

        match plan.id.to_owned() {
            Some(id) => {
                (|| async { store.update(&id, &plan).await })
                    .retry(self.retry.builder())
                    .when(is_transient)
                    .notify(|err, dur| {
                        tracing::warn!(
                            "meal plan update failed, retrying after {:.2}s: {}",
                            dur.as_secs_f64(),
                            err
                        )
                    })
                    .await?;

                tracing::debug!(week = %week, id = %id, "meal plan updated");
            }
            None => {
                let id = (|| async { store.create(&plan).await })
                    .retry(self.retry.builder())
                    .when(is_transient)
                    .notify(|err, dur| {
                        tracing::warn!(
                            "meal plan create failed, retrying after {:.2}s: {}",
                            dur.as_secs_f64(),
                            err
                        )
                    })
                    .await?;

                tracing::info!(week = %week, id = %id, "meal plan created");
                self.cache.assign_id(week, id).await;
            }
        }

        Ok(())
    }
}
