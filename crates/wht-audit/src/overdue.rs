//! Overdue assessment: late fees and corrected value for a client's unpaid
//! payments that are past due beyond the grace period. Read-only.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wht_core::{AuditError, ClientId, Money, PaymentFilter, PaymentId, SupplierId};
use wht_store::AuditStore;

use crate::correction::MonetaryCorrectionEngine;
use crate::late_fee::{LateFeeBreakdown, LateFeeCalculator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueAssessment {
    pub payment_id: PaymentId,
    pub supplier_id: SupplierId,
    pub due_date: NaiveDate,
    pub days_late: i64,
    pub net: Money,
    /// Late fees on the net amount.
    pub fees: LateFeeBreakdown,
    /// Net amount corrected by the benchmark rate from due date to `as_of`.
    pub corrected_net: Money,
}

pub struct OverdueAssessor {
    store: Arc<dyn AuditStore>,
    late_fees: LateFeeCalculator,
    correction: Arc<MonetaryCorrectionEngine>,
}

impl OverdueAssessor {
    pub fn new(
        store: Arc<dyn AuditStore>,
        late_fees: LateFeeCalculator,
        correction: Arc<MonetaryCorrectionEngine>,
    ) -> Self {
        Self {
            store,
            late_fees,
            correction,
        }
    }

    /// Every unpaid payment of `client_id` overdue as of `as_of`, oldest due
    /// date first.
    pub async fn assess_overdue(
        &self,
        client_id: ClientId,
        as_of: NaiveDate,
    ) -> Result<Vec<OverdueAssessment>, AuditError> {
        let filter = PaymentFilter::new().client(client_id);
        let payments = self.store.find_payments(&filter).await?;

        let mut assessments = Vec::new();
        for payment in payments
            .into_iter()
            .filter(|p| !p.is_paid() && self.late_fees.is_overdue(p.due_date, as_of))
        {
            let net = payment.net();
            let fees = self.late_fees.breakdown(net, payment.due_date, as_of);
            let corrected_net = self
                .correction
                .correct_amount(net, payment.due_date, Some(as_of))
                .await?;
            assessments.push(OverdueAssessment {
                payment_id: payment.id,
                supplier_id: payment.supplier_id,
                due_date: payment.due_date,
                days_late: fees.days_late,
                net,
                fees,
                corrected_net,
            });
        }
        assessments.sort_by_key(|a| (a.due_date, a.payment_id));

        tracing::info!(%client_id, %as_of, overdue = assessments.len(), "overdue assessment complete");
        Ok(assessments)
    }
}
