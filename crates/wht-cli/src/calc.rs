//! # Calculator Subcommands
//!
//! Single-shot computations: retentions for an amount and supplier, late
//! fees, monetary correction, and the overdue view of a client. Late fees
//! need no store or network; the others open a session.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use wht_audit::{LateFeeBreakdown, LateFeeCalculator, OverdueAssessment};
use wht_core::{ClientId, Clock, Money, RetentionEntry, SupplierId, SystemClock};

use crate::session::{emit, CliContext, Session};

#[derive(Args, Debug)]
pub struct RetentionsArgs {
    /// Supplier CNPJ.
    #[arg(long)]
    pub supplier: SupplierId,
    /// Base amount.
    #[arg(long)]
    pub amount: Money,
}

#[derive(Args, Debug)]
pub struct LateFeeArgs {
    /// Amount owed.
    #[arg(long)]
    pub amount: Money,
    /// Original due date (YYYY-MM-DD).
    #[arg(long)]
    pub due: NaiveDate,
    /// Evaluation date; defaults to today.
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct CorrectArgs {
    #[arg(long)]
    pub amount: Money,
    #[arg(long)]
    pub from: NaiveDate,
    /// Defaults to today.
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct OverdueArgs {
    #[arg(long)]
    pub client: ClientId,
    /// Defaults to today.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Serialize)]
struct RetentionsView {
    supplier: SupplierId,
    amount: Money,
    retentions: Vec<RetentionEntry>,
    total: Money,
    net: Money,
}

#[derive(Serialize)]
struct LateFeeView {
    overdue: bool,
    #[serde(flatten)]
    breakdown: LateFeeBreakdown,
}

pub async fn run_retentions(args: &RetentionsArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    let profile = session.engine.resolve_fiscal_profile(&args.supplier).await?;
    let retentions = session.engine.compute_retentions(args.amount, &profile);
    let total: Money = retentions.iter().map(|r| r.amount).sum();
    let view = RetentionsView {
        supplier: args.supplier.clone(),
        amount: args.amount,
        total,
        net: args.amount - total,
        retentions,
    };
    emit(ctx.json, &view, || {
        let mut out = format!("{} ({})\n", profile.legal_name, args.supplier.formatted());
        for r in &view.retentions {
            out.push_str(&format!(
                "  {:<14} {:>6}%  {:>12}\n",
                r.tax.tag(),
                r.rate.to_string(),
                r.amount.to_string()
            ));
        }
        out.push_str(&format!("retained  {}\nnet       {}", view.total, view.net));
        out
    })?;
    session.close()?;
    Ok(0)
}

pub fn run_late_fee(args: &LateFeeArgs, ctx: &CliContext) -> Result<u8> {
    let calculator = LateFeeCalculator::new(ctx.config()?.late_fee);
    let today = args.today.unwrap_or_else(|| SystemClock.today());
    let view = LateFeeView {
        overdue: calculator.is_overdue(args.due, today),
        breakdown: calculator.breakdown(args.amount, args.due, today),
    };
    emit(ctx.json, &view, || {
        let b = &view.breakdown;
        format!(
            "days late {}{}\nprincipal {}\ninterest  {}\npenalty   {}\ntotal     {}",
            b.days_late,
            if view.overdue { "" } else { " (within grace)" },
            b.principal,
            b.interest,
            b.penalty,
            b.total
        )
    })?;
    Ok(0)
}

pub async fn run_correct(args: &CorrectArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    let corrected = session
        .engine
        .correct_amount(args.amount, args.from, args.to)
        .await?;
    emit(ctx.json, &corrected, || corrected.to_string())?;
    session.close()?;
    Ok(0)
}

pub async fn run_overdue(args: &OverdueArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    let as_of = args.as_of.unwrap_or_else(|| SystemClock.today());
    let assessments: Vec<OverdueAssessment> =
        session.engine.assess_overdue(args.client, as_of).await?;
    emit(ctx.json, &assessments, || {
        if assessments.is_empty() {
            return format!("nothing overdue as of {as_of}");
        }
        assessments
            .iter()
            .map(|a| {
                format!(
                    "{}  due {}  {} days  net {}  fees {}  corrected {}",
                    a.payment_id,
                    a.due_date,
                    a.days_late,
                    a.net,
                    a.fees.total,
                    a.corrected_net
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    session.close()?;
    Ok(0)
}
