//! Notification dispatcher — one serialized delivery pass over the queue.
//!
//! A pass acquires the dispatch lease, loads the candidate set, runs each
//! candidate through the retry policy, performs due deliveries, persists
//! outcomes, and releases the lease on every exit path. The pass is
//! single-threaded and run-to-completion; per-record failures are logged
//! and never abort the rest of the pass.
//!
//! Delivery is at-least-once: a crash between a successful delivery and its
//! outcome write re-delivers on the next pass. The delivery call carries no
//! dispatcher-imposed timeout — a hung channel stalls the pass until the
//! lease TTL expires.

use chrono::Utc;

use herald_common::error::AppError;
use herald_feed::link::episode_url;
use herald_notifier::Deliver;

use crate::lock::DispatchLock;
use crate::policy::RetryPolicy;
use crate::store::NotificationStore;

/// What one dispatch pass did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Pass was skipped because the lease was held elsewhere.
    pub skipped_lock: bool,
    /// Size of the loaded candidate set.
    pub candidates: usize,
    /// Delivery attempts actually made.
    pub attempted: usize,
    /// Outcomes successfully persisted.
    pub recorded: usize,
    /// Records skipped because the policy raised an invariant violation.
    pub policy_errors: usize,
    /// Attempts that failed at the transport level (record left untouched).
    pub delivery_errors: usize,
    /// Outcome writes that failed (delivery happened, may re-deliver).
    pub store_errors: usize,
}

impl PassSummary {
    fn skipped() -> Self {
        Self {
            skipped_lock: true,
            ..Self::default()
        }
    }
}

/// Orchestrates dispatch passes over the notification queue.
pub struct Dispatcher<S, D, L> {
    store: S,
    notifier: D,
    policy: RetryPolicy,
    lock: L,
}

impl<S, D, L> Dispatcher<S, D, L>
where
    S: NotificationStore,
    D: Deliver,
    L: DispatchLock,
{
    pub fn new(store: S, notifier: D, policy: RetryPolicy, lock: L) -> Self {
        Self {
            store,
            notifier,
            policy,
            lock,
        }
    }

    /// Run one dispatch pass.
    ///
    /// Returns `Err` only for pass-level failures (lease backend, candidate
    /// load); per-record failures are counted in the summary. The lease is
    /// released exactly once whether the pass body succeeds or not.
    pub async fn run_pass(&mut self) -> Result<PassSummary, AppError> {
        let Some(token) = self.lock.try_acquire().await? else {
            tracing::warn!("Dispatch lease held elsewhere, skipping pass");
            return Ok(PassSummary::skipped());
        };

        let result = self.dispatch_candidates().await;

        if let Err(err) = self.lock.release(token).await {
            tracing::error!(error = %err, "Failed to release dispatch lease");
        }

        match &result {
            Ok(summary) => tracing::info!(
                candidates = summary.candidates,
                attempted = summary.attempted,
                recorded = summary.recorded,
                "Dispatch pass finished"
            ),
            Err(err) => tracing::error!(error = %err, "Dispatch pass failed"),
        }
        result
    }

    async fn dispatch_candidates(&mut self) -> Result<PassSummary, AppError> {
        let candidates = self.store.load_candidates(self.policy.max_retry()).await?;

        let mut summary = PassSummary {
            candidates: candidates.len(),
            ..PassSummary::default()
        };

        for record in candidates {
            let due = match self.policy.is_due(
                record.response_code,
                record.retry_count,
                record.last_attempt_at,
                Utc::now(),
            ) {
                Ok(due) => due,
                Err(err) => {
                    tracing::error!(
                        record_id = %record.id,
                        subscriber_id = record.subscriber_id,
                        response_code = ?record.response_code,
                        retry_count = record.retry_count,
                        error = %err,
                        "Corrupt queue record, skipping"
                    );
                    summary.policy_errors += 1;
                    continue;
                }
            };
            if !due {
                continue;
            }

            // Coordinates are validated at insertion; a negative value in a
            // hand-edited row must not wrap into a huge number.
            let url = episode_url(
                &record.show_alias,
                u32::try_from(record.season_number).unwrap_or(0),
                u32::try_from(record.episode_number).unwrap_or(0),
            );
            let payload = record.payload(url);

            summary.attempted += 1;
            let outcome = match self.notifier.attempt(record.subscriber_id, &payload).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    // No structured status was obtained. The record stays in
                    // its pre-attempt state and is reconsidered next pass;
                    // the retry count does not advance.
                    tracing::error!(
                        record_id = %record.id,
                        subscriber_id = record.subscriber_id,
                        error = %err,
                        "Delivery attempt failed at the transport level"
                    );
                    summary.delivery_errors += 1;
                    continue;
                }
            };

            if let Err(err) = self
                .store
                .record_outcome(record.id, outcome.status_code, outcome.attempted_at)
                .await
            {
                tracing::error!(
                    record_id = %record.id,
                    status = outcome.status_code,
                    error = %err,
                    "Failed to persist delivery outcome"
                );
                summary.store_errors += 1;
                continue;
            }
            summary.recorded += 1;
        }

        Ok(summary)
    }
}
