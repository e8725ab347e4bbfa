//! # Batch Audit
//!
//! Audits every unaudited payment of a client over a period in fixed-size
//! batches. Items inside a batch run concurrently on a [`JoinSet`], capped
//! by a [`Semaphore`]; batch N+1 is dispatched only after every task of
//! batch N has settled.
//!
//! A failing item (resolution error, persistence error, panic) is recorded
//! against its payment id and never stops the rest of the batch or later
//! batches. The final report is built from a fresh read of the store, so
//! payments whose audit failed still count toward the totals.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use wht_core::{
    AuditError, AuditPeriod, AuditRecord, AuditReport, BatchConfig, ClientId, FailedAudit,
    PaymentFilter, PaymentId, PaymentStatus,
};
use wht_store::AuditStore;

use crate::auditor::PaymentAuditor;
use crate::retention::MemoizedRetentions;

/// Callbacks around each batch. Both default to no-ops.
pub trait BatchObserver: Send + Sync {
    fn batch_started(&self, _index: usize, _ids: &[PaymentId]) {}

    fn batch_settled(&self, _index: usize) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

type ItemOutcome = Result<AuditRecord, FailedAudit>;

pub struct BatchAuditOrchestrator {
    store: Arc<dyn AuditStore>,
    auditor: Arc<PaymentAuditor>,
    config: BatchConfig,
    observer: Arc<dyn BatchObserver>,
}

impl BatchAuditOrchestrator {
    pub fn new(store: Arc<dyn AuditStore>, auditor: Arc<PaymentAuditor>, config: BatchConfig) -> Self {
        Self {
            store,
            auditor,
            config,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Audit the client's unaudited payments due within `period`.
    ///
    /// Only a failure to list or re-read payments fails the whole call;
    /// per-payment failures land in [`AuditReport::failed`].
    pub async fn audit_client_period(
        &self,
        client_id: ClientId,
        period: AuditPeriod,
    ) -> Result<AuditReport, AuditError> {
        let filter = PaymentFilter::for_client_period(client_id, &period);
        filter.validate()?;

        let pending: Vec<PaymentId> = self
            .store
            .find_payments(&filter)
            .await?
            .into_iter()
            .filter(|p| p.status != PaymentStatus::Audited)
            .map(|p| p.id)
            .collect();

        let batch_size = self.config.batch_size.max(1);
        tracing::info!(
            %client_id,
            %period,
            pending = pending.len(),
            batch_size,
            "starting batch audit"
        );

        let memo = Arc::new(MemoizedRetentions::new(self.auditor.calculator().clone()));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut outcomes: HashMap<PaymentId, ItemOutcome> = HashMap::with_capacity(pending.len());

        for (index, chunk) in pending.chunks(batch_size).enumerate() {
            self.observer.batch_started(index, chunk);
            let settled = self.run_batch(chunk, &memo, &semaphore).await;
            outcomes.extend(settled);
            self.observer.batch_settled(index);
            tracing::debug!(%client_id, batch = index, size = chunk.len(), "batch settled");
        }

        let payments = self.store.find_payments(&filter).await?;
        let mut report = AuditReport::from_payments(client_id, period, &payments);
        for id in &pending {
            match outcomes.remove(id) {
                Some(Ok(record)) if record.classification.is_correct() => report.succeeded.push(*id),
                Some(Ok(_)) => report.discrepant.push(*id),
                Some(Err(failure)) => report.failed.push(failure),
                None => report
                    .failed
                    .push(failure(*id, "TASK_LOST", "audit task did not complete")),
            }
        }

        tracing::info!(
            %client_id,
            %period,
            succeeded = report.succeeded.len(),
            discrepant = report.discrepant.len(),
            failed = report.failed.len(),
            "batch audit complete"
        );
        Ok(report)
    }

    /// Totals and breakdowns for the client over `period`, without auditing.
    /// Outcome lists reflect the audit records already stored.
    pub async fn report_client_period(
        &self,
        client_id: ClientId,
        period: AuditPeriod,
    ) -> Result<AuditReport, AuditError> {
        let filter = PaymentFilter::for_client_period(client_id, &period);
        filter.validate()?;
        let payments = self.store.find_payments(&filter).await?;

        let mut report = AuditReport::from_payments(client_id, period, &payments);
        for payment in payments.iter().filter(|p| p.status == PaymentStatus::Audited) {
            match self.store.get_audit_record(payment.id).await? {
                Some(record) if record.classification.is_correct() => report.succeeded.push(payment.id),
                Some(_) => report.discrepant.push(payment.id),
                None => {}
            }
        }
        Ok(report)
    }

    async fn run_batch(
        &self,
        ids: &[PaymentId],
        memo: &Arc<MemoizedRetentions>,
        semaphore: &Arc<Semaphore>,
    ) -> HashMap<PaymentId, ItemOutcome> {
        let mut set = JoinSet::new();
        for &id in ids {
            let auditor = Arc::clone(&self.auditor);
            let memo = Arc::clone(memo);
            let semaphore = Arc::clone(semaphore);
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (id, Err(failure(id, "SEMAPHORE_CLOSED", "concurrency limiter closed")));
                    }
                };
                // Inner task so a panic is caught and attributed to `id`.
                let handle =
                    tokio::spawn(async move { auditor.audit_with(id, Some(memo.as_ref())).await });
                let outcome = match handle.await {
                    Ok(Ok(record)) => Ok(record),
                    Ok(Err(e)) => {
                        tracing::warn!(payment_id = %id, error = %e, "payment audit failed");
                        Err(FailedAudit::from_error(id, &e))
                    }
                    Err(e) => {
                        tracing::error!(payment_id = %id, error = %e, "payment audit task panicked");
                        Err(failure(id, "TASK_PANICKED", &e.to_string()))
                    }
                };
                (id, outcome)
            });
        }

        let mut settled = HashMap::with_capacity(ids.len());
        let mut seen = HashSet::with_capacity(ids.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    seen.insert(id);
                    settled.insert(id, outcome);
                }
                Err(e) => tracing::error!(error = %e, "batch task failed"),
            }
        }
        for id in ids.iter().filter(|id| !seen.contains(id)) {
            settled.insert(*id, Err(failure(*id, "TASK_LOST", "audit task did not complete")));
        }
        settled
    }
}

fn failure(payment_id: PaymentId, code: &str, message: &str) -> FailedAudit {
    FailedAudit {
        payment_id,
        code: code.to_string(),
        message: message.to_string(),
    }
}
