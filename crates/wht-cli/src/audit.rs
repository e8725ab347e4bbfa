//! # Audit Subcommand
//!
//! - `payment <ID>` audits one payment
//! - `process <ID>` records the base ISS retention on a pending payment
//! - `period --client <ID> --month YYYY-MM` runs the batch audit
//! - `report --client <ID> --month YYYY-MM` prints totals without auditing
//!
//! `period` exits with status 2 when any payment failed to audit.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use wht_core::{AuditPeriod, AuditRecord, AuditReport, ClientId, PaymentId};

use crate::session::{emit, CliContext, Session};

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Audit one payment and replace its retentions with the computed set.
    Payment { id: PaymentId },

    /// Record only the primary-activity ISS retention (pending -> processed).
    Process { id: PaymentId },

    /// Batch-audit every unaudited payment of a client in a period.
    Period {
        #[arg(long)]
        client: ClientId,
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Totals and breakdowns for a client in a period, without auditing.
    Report {
        #[arg(long)]
        client: ClientId,
        #[command(flatten)]
        period: PeriodArgs,
    },
}

/// A calendar month or an explicit inclusive range.
#[derive(Args, Debug, Clone)]
pub struct PeriodArgs {
    /// Calendar month, YYYY-MM.
    #[arg(long, conflicts_with_all = ["from", "to"], required_unless_present = "from")]
    pub month: Option<String>,
    /// First due date (YYYY-MM-DD).
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,
    /// Last due date (YYYY-MM-DD).
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
}

impl PeriodArgs {
    pub fn resolve(&self) -> Result<AuditPeriod> {
        match (&self.month, self.from, self.to) {
            (Some(month), _, _) => parse_month(month),
            (None, Some(from), Some(to)) => Ok(AuditPeriod::new(from, to)?),
            _ => bail!("either --month or both --from and --to are required"),
        }
    }
}

/// Parse `YYYY-MM` into the month's period.
pub fn parse_month(raw: &str) -> Result<AuditPeriod> {
    let Some((year, month)) = raw.trim().split_once('-') else {
        bail!("invalid month \"{raw}\", expected YYYY-MM");
    };
    let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) else {
        bail!("invalid month \"{raw}\", expected YYYY-MM");
    };
    Ok(AuditPeriod::month(year, month)?)
}

pub async fn run_audit(args: &AuditArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    let mut code = 0;

    match &args.command {
        AuditCommand::Payment { id } => {
            let record = session.engine.audit_payment(*id).await?;
            emit(ctx.json, &record, || render_record(&record))?;
        }

        AuditCommand::Process { id } => {
            let payment = session.engine.process_payment(*id).await?;
            emit(ctx.json, &payment, || {
                format!(
                    "{} processed: retained {}, net {}",
                    payment.id,
                    payment.total_retained(),
                    payment.net()
                )
            })?;
        }

        AuditCommand::Period { client, period } => {
            let report = session
                .engine
                .audit_client_period(*client, period.resolve()?)
                .await?;
            if !report.failed.is_empty() {
                code = 2;
            }
            emit(ctx.json, &report, || render_report(&report))?;
        }

        AuditCommand::Report { client, period } => {
            let report = session
                .engine
                .report_client_period(*client, period.resolve()?)
                .await?;
            emit(ctx.json, &report, || render_report(&report))?;
        }
    }

    session.close()?;
    Ok(code)
}

fn render_record(record: &AuditRecord) -> String {
    let mut out = format!("payment   {}\n", record.payment_id);
    for entry in &record.computed_retentions {
        out.push_str(&format!(
            "  {:<14} {:>6}%  {:>12}\n",
            entry.tax.tag(),
            entry.rate.to_string(),
            entry.amount.to_string()
        ));
    }
    out.push_str(&format!(
        "computed  {}\nrecorded  {}\nnet       {}\nresult    {:?}",
        record.computed_total(),
        record.recorded_total,
        record.computed_net,
        record.classification
    ));
    out
}

fn render_report(report: &AuditReport) -> String {
    let mut out = format!(
        "client {}  period {}\npayments {}  gross {}  retained {}  net {}\n",
        report.client_id,
        report.period,
        report.payment_count,
        report.total_gross,
        report.total_retained,
        report.total_net
    );
    for (tax, amount) in &report.retained_by_type {
        out.push_str(&format!("  {:<14} {:>12}\n", tax.tag(), amount.to_string()));
    }
    for (status, count) in &report.payments_by_status {
        out.push_str(&format!("  {status}: {count}\n"));
    }
    out.push_str(&format!(
        "correct {}  discrepant {}  failed {}",
        report.succeeded.len(),
        report.discrepant.len(),
        report.failed.len()
    ));
    for failure in &report.failed {
        out.push_str(&format!(
            "\n  {} {} {}",
            failure.payment_id, failure.code, failure.message
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_to_full_calendar_month() {
        let period = parse_month("2024-02").unwrap();
        assert_eq!(period.start(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(period.end(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn bad_months_are_rejected() {
        assert!(parse_month("2024").is_err());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("abcd-01").is_err());
    }

    #[test]
    fn explicit_range_must_be_ordered() {
        let args = PeriodArgs {
            month: None,
            from: NaiveDate::from_ymd_opt(2024, 2, 1),
            to: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        assert!(args.resolve().is_err());
    }
}
