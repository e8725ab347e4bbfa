//! # Rates and Profile Subcommands
//!
//! Benchmark-rate series maintenance (`rates update`, `rates backfill`,
//! `rates current`) and supplier profile lookups (`profile`). Periodic
//! scheduling of `rates update` is left to cron or an equivalent trigger.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use wht_audit::RateSeriesUpdate;
use wht_core::SupplierId;

use crate::session::{emit, CliContext, Session};

#[derive(Args, Debug)]
pub struct RatesArgs {
    #[command(subcommand)]
    pub command: RatesCommand,
}

#[derive(Subcommand, Debug)]
pub enum RatesCommand {
    /// Pull the latest published sample into the stored series.
    Update,
    /// Import historical samples; dates already stored are kept.
    Backfill {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Print the current rate (cached for the configured TTL).
    Current {
        /// Drop the cached rate first.
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Supplier CNPJ.
    pub supplier: SupplierId,
    /// Bypass the stored profile and query the registry.
    #[arg(long)]
    pub refresh: bool,
}

pub async fn run_rates(args: &RatesArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    let correction = session.engine.correction();

    match &args.command {
        RatesCommand::Update => {
            let outcome = correction.update_rate_series().await?;
            emit(ctx.json, &outcome, || match outcome {
                RateSeriesUpdate::Appended { sample } => {
                    format!("appended {} {}%", sample.date, sample.rate_percent)
                }
                RateSeriesUpdate::Conflict { stored, published } => format!(
                    "kept {} {}%, source now publishes {}%",
                    stored.date, stored.rate_percent, published.rate_percent
                ),
                RateSeriesUpdate::Unchanged { latest } => {
                    format!("unchanged, latest {} {}%", latest.date, latest.rate_percent)
                }
            })?;
        }

        RatesCommand::Backfill { from, to } => {
            let added = correction.backfill(*from, *to).await?;
            emit(ctx.json, &added, || format!("{added} samples added"))?;
        }

        RatesCommand::Current { refresh } => {
            if *refresh {
                correction.invalidate_rate_cache().await?;
            }
            let sample = correction.current_rate().await?;
            emit(ctx.json, &sample, || {
                format!("{} {}%", sample.date, sample.rate_percent)
            })?;
        }
    }

    session.close()?;
    Ok(0)
}

pub async fn run_profile(args: &ProfileArgs, ctx: &CliContext) -> Result<u8> {
    let session = Session::open(ctx)?;
    let resolver = session.engine.resolver();
    let profile = if args.refresh {
        resolver.refresh(&args.supplier).await?
    } else {
        resolver.resolve(&args.supplier).await?
    };

    emit(ctx.json, &profile, || {
        let mut out = format!(
            "{} ({})\nstatus    {}\nprimary   {} {}%  {}\n",
            profile.legal_name,
            profile.supplier_id.formatted(),
            profile.registration_status,
            profile.primary_activity.code,
            profile.primary_activity.rate,
            profile.primary_activity.description
        );
        for a in &profile.secondary_activities {
            out.push_str(&format!("secondary {} {}%  {}\n", a.code, a.rate, a.description));
        }
        out.trim_end().to_string()
    })?;
    session.close()?;
    Ok(0)
}
