use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{interval, Duration as TokioDuration};

use crate::channels::Notifier;
use crate::config::Config;
use crate::db::Database;
use crate::fulfillment::{FulfillmentExecutor, FulfillmentOutcome};
use crate::messages;
use crate::models::{LikeRequest, ProcessOutcome};
use crate::rate_limiter::{self, RateDecision};

/// Lease row guarding the single active reconciler
pub const RECONCILER_LEASE: &str = "reconciler";

/// Reconciler configuration
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Seconds between polling cycles
    pub poll_interval_secs: u64,
    /// Requesters handled in parallel within one cycle
    pub max_concurrent: usize,
    /// Lease lifetime; must exceed one fulfillment call
    pub lease_ttl_secs: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            poll_interval_secs: 5,
            max_concurrent: 4,
            lease_ttl_secs: 60,
        }
    }
}

impl From<&Config> for ReconcilerConfig {
    fn from(config: &Config) -> Self {
        ReconcilerConfig {
            poll_interval_secs: config.poll_interval_secs,
            max_concurrent: config.max_concurrent_fulfillments,
            lease_ttl_secs: config.worker_lease_secs,
        }
    }
}

/// Tally of one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub lease_held: bool,
    pub fulfilled: usize,
    pub no_effect: usize,
    pub failed: usize,
    pub rate_limited: usize,
    /// Left for a later cycle or handled by someone else
    pub skipped: usize,
}

impl CycleReport {
    pub fn handled(&self) -> usize {
        self.fulfilled + self.no_effect + self.failed + self.rate_limited
    }

    fn record(&mut self, result: Option<ProcessOutcome>) {
        match result {
            Some(ProcessOutcome::Fulfilled) => self.fulfilled += 1,
            Some(ProcessOutcome::NoEffect) => self.no_effect += 1,
            Some(ProcessOutcome::Failed) => self.failed += 1,
            Some(ProcessOutcome::RateLimited) => self.rate_limited += 1,
            None => self.skipped += 1,
        }
    }
}

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Drives verified requests to a terminal outcome: rate check, fulfillment,
/// `mark_processed`, then one notification.
pub struct Reconciler {
    db: Arc<Database>,
    executor: Arc<dyn FulfillmentExecutor>,
    notifier: Arc<dyn Notifier>,
    config: ReconcilerConfig,
    worker_id: String,
    clock: Clock,
    last_tick_at: Mutex<Option<DateTime<Utc>>>,
}

impl Reconciler {
    pub fn new(
        db: Arc<Database>,
        executor: Arc<dyn FulfillmentExecutor>,
        notifier: Arc<dyn Notifier>,
        config: ReconcilerConfig,
    ) -> Self {
        Reconciler {
            db,
            executor,
            notifier,
            config,
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            clock: Arc::new(Utc::now),
            last_tick_at: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub async fn last_tick_at(&self) -> Option<DateTime<Utc>> {
        *self.last_tick_at.lock().await
    }

    fn lease_ttl(&self) -> Duration {
        Duration::seconds(self.config.lease_ttl_secs)
    }

    /// Start the polling loop
    pub async fn start(self: Arc<Self>, mut shutdown_rx: oneshot::Receiver<()>) {
        log::info!(
            "Reconciler {} started (poll: {}s, concurrency: {}, lease: {}s)",
            self.worker_id,
            self.config.poll_interval_secs,
            self.config.max_concurrent,
            self.config.lease_ttl_secs
        );

        let mut poll_interval = interval(TokioDuration::from_secs(self.config.poll_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    log::info!("Reconciler received shutdown signal");
                    break;
                }
                _ = poll_interval.tick() => {
                    self.tick().await;
                }
            }
        }

        match self.db.release_lease(RECONCILER_LEASE, &self.worker_id) {
            Ok(true) => log::info!("Reconciler {} released its lease", self.worker_id),
            Ok(false) => {}
            Err(e) => log::error!("Failed to release reconciler lease: {}", e),
        }
        log::info!("Reconciler stopped");
    }

    async fn tick(&self) {
        let now = (self.clock)();
        *self.last_tick_at.lock().await = Some(now);

        match self.run_cycle(now).await {
            Ok(report) if report.handled() > 0 || report.skipped > 0 => {
                log::info!(
                    "Reconciler cycle: {} fulfilled, {} no effect, {} failed, {} rate limited, {} skipped",
                    report.fulfilled,
                    report.no_effect,
                    report.failed,
                    report.rate_limited,
                    report.skipped
                );
            }
            Ok(_) => {}
            Err(e) => log::error!("Reconciler cycle failed: {}", e),
        }
    }

    /// One polling cycle. Requests from the same requester run in order so a
    /// fulfillment early in the batch is seen by the cooldown check of the next.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, String> {
        let leader = self
            .db
            .acquire_lease(RECONCILER_LEASE, &self.worker_id, now, self.lease_ttl())
            .map_err(|e| format!("Failed to acquire lease: {}", e))?;
        if !leader {
            log::debug!("Reconciler {} is standing by, lease held elsewhere", self.worker_id);
            return Ok(CycleReport::default());
        }

        let pending = self
            .db
            .list_verified_unprocessed()
            .map_err(|e| format!("Failed to list verified requests: {}", e))?;

        let mut by_requester: BTreeMap<i64, Vec<LikeRequest>> = BTreeMap::new();
        for request in pending {
            by_requester.entry(request.requester_id).or_default().push(request);
        }

        let results: Vec<Vec<Option<ProcessOutcome>>> = stream::iter(by_requester.into_values())
            .map(|requests| async move {
                let mut results = Vec::with_capacity(requests.len());
                for request in requests {
                    results.push(self.process_request(&request, now).await);
                }
                results
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut report = CycleReport {
            lease_held: true,
            ..Default::default()
        };
        for result in results.into_iter().flatten() {
            report.record(result);
        }
        Ok(report)
    }

    /// Returns the terminal outcome, or None when the request was left alone.
    async fn process_request(&self, request: &LikeRequest, now: DateTime<Utc>) -> Option<ProcessOutcome> {
        let profile = match self.db.get_profile(request.requester_id) {
            Ok(p) => p,
            Err(e) => {
                log::error!("Failed to load profile {}: {}", request.requester_id, e);
                return None;
            }
        };

        if let RateDecision::Deny { remaining } = rate_limiter::evaluate(&profile, now) {
            log::info!(
                "[LIKE] Request {} rate limited, {} remaining",
                request.id,
                rate_limiter::format_remaining(remaining)
            );
            return self
                .finish(request, ProcessOutcome::RateLimited, messages::rate_limited(remaining), now)
                .await;
        }

        // The lease may have lapsed during a slow cycle; never call out without it
        match self
            .db
            .acquire_lease(RECONCILER_LEASE, &self.worker_id, (self.clock)(), self.lease_ttl())
        {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Reconciler {} lost its lease, leaving request {}", self.worker_id, request.id);
                return None;
            }
            Err(e) => {
                log::error!("Failed to renew lease: {}", e);
                return None;
            }
        }

        let outcome = self.executor.execute(&request.target_account_id).await;
        let completed_at = (self.clock)();
        match outcome {
            FulfillmentOutcome::Success {
                before,
                after,
                added,
                display_name,
            } => {
                if let Err(e) = self.db.record_fulfillment(request.requester_id, completed_at) {
                    log::error!("Failed to record fulfillment for {}: {}", request.requester_id, e);
                }
                log::info!("[LIKE] Request {} fulfilled: +{} ({} -> {})", request.id, added, before, after);
                let text = messages::fulfilled(
                    &display_name,
                    &request.target_account_id,
                    before,
                    added,
                    after,
                    completed_at,
                );
                self.finish(request, ProcessOutcome::Fulfilled, text, completed_at).await
            }
            FulfillmentOutcome::NoEffect => {
                log::info!("[LIKE] Request {} had no effect", request.id);
                self.finish(request, ProcessOutcome::NoEffect, messages::NO_EFFECT.to_string(), completed_at)
                    .await
            }
            FulfillmentOutcome::Failure { reason } => {
                log::warn!("[LIKE] Request {} failed: {}", request.id, reason);
                let text = messages::failed(&request.target_account_id, &reason);
                self.finish(request, ProcessOutcome::Failed, text, completed_at).await
            }
        }
    }

    /// Mark processed, and notify only if this call won the check-and-set.
    async fn finish(
        &self,
        request: &LikeRequest,
        outcome: ProcessOutcome,
        text: String,
        now: DateTime<Utc>,
    ) -> Option<ProcessOutcome> {
        match self.db.mark_processed(request.id, outcome, now) {
            Ok(true) => {}
            Ok(false) => {
                let previous = match self.db.get_like_request(request.id) {
                    Ok(Some(stored)) => stored.outcome.map(|o| o.as_str()).unwrap_or("none"),
                    Ok(None) => "missing",
                    Err(e) => {
                        log::error!("Failed to reload request {}: {}", request.id, e);
                        "unknown"
                    }
                };
                log::info!(
                    "Request {} was already processed ({}), not notifying",
                    request.id,
                    previous
                );
                return None;
            }
            Err(e) => {
                log::error!("Failed to mark request {} processed: {}", request.id, e);
                return None;
            }
        }

        if let Err(e) = self
            .notifier
            .notify(request.conversation_id, request.anchor_message_id, &text)
            .await
        {
            log::error!("Failed to notify for request {}: {}", request.id, e);
        }
        Some(outcome)
    }
}
