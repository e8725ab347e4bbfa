//! # Single-Payment Audit
//!
//! `audit_payment` loads the payment, resolves the supplier, recomputes the
//! retention set from scratch and classifies it against what was recorded.
//! The audited payment (retentions replaced wholesale, status `audited`) and
//! its [`AuditRecord`] are written together through
//! [`AuditStore::commit_audit`]; if that write fails, neither is visible.
//!
//! Because the recorded set is replaced rather than appended to, a second
//! pass over an unchanged payment classifies as `correct` with the same
//! computed values.

use std::sync::Arc;

use wht_core::{AuditError, AuditRecord, Clock, Payment, PaymentId};
use wht_store::AuditStore;

use crate::resolver::FiscalProfileResolver;
use crate::retention::{MemoizedRetentions, RetentionCalculator};

pub struct PaymentAuditor {
    store: Arc<dyn AuditStore>,
    resolver: Arc<FiscalProfileResolver>,
    calculator: RetentionCalculator,
    clock: Arc<dyn Clock>,
}

impl PaymentAuditor {
    pub fn new(
        store: Arc<dyn AuditStore>,
        resolver: Arc<FiscalProfileResolver>,
        calculator: RetentionCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            resolver,
            calculator,
            clock,
        }
    }

    pub fn calculator(&self) -> &RetentionCalculator {
        &self.calculator
    }

    /// Audit one payment and persist the outcome.
    ///
    /// # Errors
    ///
    /// - [`AuditError::NotFound`] if the payment does not exist
    /// - [`AuditError::Resolution`] if the supplier profile cannot be resolved
    /// - [`AuditError::Persistence`] if the commit fails; the payment keeps
    ///   its previous state
    pub async fn audit_payment(&self, id: PaymentId) -> Result<AuditRecord, AuditError> {
        self.audit_with(id, None).await
    }

    /// Audit using a batch-scoped retention memo.
    pub(crate) async fn audit_with(
        &self,
        id: PaymentId,
        memo: Option<&MemoizedRetentions>,
    ) -> Result<AuditRecord, AuditError> {
        let payment = self.load(id).await?;
        let profile = self.resolver.resolve(&payment.supplier_id).await?;

        let computed = match memo {
            Some(memo) => memo.compute(payment.gross, &profile),
            None => self.calculator.compute_retentions(payment.gross, &profile),
        };

        let now = self.clock.now();
        let record = AuditRecord::build(&payment, computed.clone(), now);
        let audited = payment.with_audit(computed, now);

        if let Err(e) = self.store.commit_audit(&audited, &record).await {
            tracing::warn!(payment_id = %id, error = %e, "audit commit failed");
            return Err(AuditError::Persistence(e.to_string()));
        }

        tracing::info!(
            payment_id = %id,
            supplier_id = %payment.supplier_id,
            computed = %record.computed_total(),
            recorded = %record.recorded_total,
            correct = record.classification.is_correct(),
            "payment audited"
        );
        Ok(record)
    }

    /// Record only the primary-activity ISS retention and mark the payment
    /// `processed`.
    ///
    /// # Errors
    ///
    /// [`AuditError::Validation`] if the payment is already audited.
    pub async fn process_payment(&self, id: PaymentId) -> Result<Payment, AuditError> {
        let payment = self.load(id).await?;
        let profile = self.resolver.resolve(&payment.supplier_id).await?;
        let base = self
            .calculator
            .base_retention(payment.gross, &profile)
            .into_iter()
            .collect();

        let processed = payment.with_processed(base, self.clock.now())?;
        self.store.upsert_payment(&processed).await?;
        tracing::info!(
            payment_id = %id,
            retained = %processed.total_retained(),
            "payment processed"
        );
        Ok(processed)
    }

    async fn load(&self, id: PaymentId) -> Result<Payment, AuditError> {
        self.store
            .get_payment(id)
            .await?
            .ok_or_else(|| AuditError::not_found("payment", id))
    }
}
