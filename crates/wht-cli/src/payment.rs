//! # Payment Subcommand
//!
//! Payment intake and inspection against the store snapshot.
//!
//! - `add` records a pending payment
//! - `show` prints one payment with its audit record, if any
//! - `list` filters by client, supplier, status and due-date range

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use wht_core::{
    AuditRecord, ClientId, Clock, Money, Payment, PaymentFilter, PaymentId, PaymentStatus,
    SupplierId, SystemClock,
};
use wht_store::AuditStore;

use crate::session::{emit, CliContext, Session};

#[derive(Args, Debug)]
pub struct PaymentArgs {
    #[command(subcommand)]
    pub command: PaymentCommand,
}

#[derive(Subcommand, Debug)]
pub enum PaymentCommand {
    /// Record a new pending payment.
    Add {
        /// Supplier CNPJ (digits or formatted).
        #[arg(long)]
        supplier: SupplierId,
        /// Paying client id.
        #[arg(long)]
        client: ClientId,
        /// Gross amount, e.g. 1500.00.
        #[arg(long)]
        gross: Money,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: NaiveDate,
        #[arg(long, default_value = "")]
        description: String,
        /// Settlement date, if already paid.
        #[arg(long)]
        paid: Option<NaiveDate>,
    },

    /// Show a payment and its latest audit record.
    Show {
        id: PaymentId,
    },

    /// List payments.
    List {
        #[arg(long)]
        client: Option<ClientId>,
        #[arg(long)]
        supplier: Option<SupplierId>,
        /// pending, processed or audited.
        #[arg(long)]
        status: Option<PaymentStatus>,
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
}

#[derive(Serialize)]
struct PaymentView<'a> {
    payment: &'a Payment,
    net: Money,
    audit: Option<&'a AuditRecord>,
}

pub async fn run_payment(args: &PaymentArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    match &args.command {
        PaymentCommand::Add {
            supplier,
            client,
            gross,
            due,
            description,
            paid,
        } => {
            let mut payment = Payment::new(
                supplier.clone(),
                *client,
                *gross,
                *due,
                description.as_str(),
                SystemClock.now(),
            )?;
            payment.paid_date = *paid;
            session.store.upsert_payment(&payment).await?;
            tracing::info!(payment_id = %payment.id, "payment recorded");
            emit(ctx.json, &payment, || payment.id.to_string())?;
        }

        PaymentCommand::Show { id } => {
            let payment = session
                .store
                .get_payment(*id)
                .await?
                .with_context(|| format!("payment {id} not found"))?;
            let record = session.store.get_audit_record(*id).await?;
            let view = PaymentView {
                payment: &payment,
                net: payment.net(),
                audit: record.as_ref(),
            };
            emit(ctx.json, &view, || render_payment(&payment, record.as_ref()))?;
        }

        PaymentCommand::List {
            client,
            supplier,
            status,
            from,
            to,
        } => {
            let filter = PaymentFilter {
                client_id: *client,
                supplier_id: supplier.clone(),
                status: *status,
                due_from: *from,
                due_to: *to,
            };
            filter.validate()?;
            let payments = session.store.find_payments(&filter).await?;
            emit(ctx.json, &payments, || {
                payments
                    .iter()
                    .map(|p| {
                        format!(
                            "{}  {}  {}  gross {:>12}  net {:>12}  {}",
                            p.id,
                            p.due_date,
                            p.supplier_id.formatted(),
                            p.gross.to_string(),
                            p.net().to_string(),
                            p.status
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
    }
    session.close()?;
    Ok(0)
}

fn render_payment(payment: &Payment, record: Option<&AuditRecord>) -> String {
    let mut out = format!(
        "payment   {}\nsupplier  {}\nclient    {}\ndue       {}\nstatus    {}\ngross     {}\n",
        payment.id,
        payment.supplier_id.formatted(),
        payment.client_id,
        payment.due_date,
        payment.status,
        payment.gross
    );
    for r in &payment.retentions {
        out.push_str(&format!(
            "  {:<14} {:>6}%  {:>12}\n",
            r.tax.tag(),
            r.rate.to_string(),
            r.amount.to_string()
        ));
    }
    out.push_str(&format!("net       {}", payment.net()));
    if let Some(record) = record {
        out.push_str(&format!(
            "\naudited   {} ({:?})",
            record.audited_at, record.classification
        ));
    }
    out
}
