//! # wht CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wht_cli::audit::{run_audit, AuditArgs};
use wht_cli::calc::{
    run_correct, run_late_fee, run_overdue, run_retentions, CorrectArgs, LateFeeArgs,
    OverdueArgs, RetentionsArgs,
};
use wht_cli::payment::{run_payment, PaymentArgs};
use wht_cli::rates::{run_profile, run_rates, ProfileArgs, RatesArgs};
use wht_cli::session::{CliContext, DEFAULT_STORE_PATH};

/// Withholding audit engine.
///
/// Audits the taxes withheld on supplier payments, computes late fees and
/// benchmark-rate corrections, and maintains the rate series.
#[derive(Parser, Debug)]
#[command(name = "wht", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the YAML engine configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the JSON store snapshot.
    #[arg(long, global = true, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record, show and list payments.
    Payment(PaymentArgs),

    /// Audit payments, one at a time or per client and period.
    Audit(AuditArgs),

    /// Retentions owed on an amount paid to a supplier.
    Retentions(RetentionsArgs),

    /// Late-fee breakdown for an overdue amount.
    LateFee(LateFeeArgs),

    /// Correct an amount by the benchmark rate series.
    Correct(CorrectArgs),

    /// Unpaid payments past due, with fees and corrected value.
    Overdue(OverdueArgs),

    /// Benchmark rate series maintenance.
    Rates(RatesArgs),

    /// Resolve a supplier's fiscal profile.
    Profile(ProfileArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let ctx = CliContext {
        store_path: cli.store,
        config_path: cli.config,
        json: cli.json,
    };
    tracing::debug!(store = %ctx.store_path.display(), "wht starting");

    let result = match &cli.command {
        Commands::Payment(args) => run_payment(args, &ctx).await,
        Commands::Audit(args) => run_audit(args, &ctx).await,
        Commands::Retentions(args) => run_retentions(args, &ctx).await,
        Commands::LateFee(args) => run_late_fee(args, &ctx),
        Commands::Correct(args) => run_correct(args, &ctx).await,
        Commands::Overdue(args) => run_overdue(args, &ctx).await,
        Commands::Rates(args) => run_rates(args, &ctx).await,
        Commands::Profile(args) => run_profile(args, &ctx).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wht_cli::audit::AuditCommand;
    use wht_cli::payment::PaymentCommand;
    use wht_cli::rates::RatesCommand;

    const CLIENT: &str = "6f1c2a34-5b6d-4e7f-8a9b-0c1d2e3f4a5b";

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wht", "rates", "update", "-vv", "--json", "--store", "/tmp/s.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.store, PathBuf::from("/tmp/s.json"));
        assert!(matches!(
            cli.command,
            Commands::Rates(RatesArgs {
                command: RatesCommand::Update
            })
        ));
    }

    #[test]
    fn store_defaults() {
        let cli = Cli::try_parse_from(["wht", "rates", "current"]).unwrap();
        assert_eq!(cli.store, PathBuf::from(DEFAULT_STORE_PATH));
        assert!(cli.config.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn payment_add_parses_typed_values() {
        let cli = Cli::try_parse_from([
            "wht",
            "payment",
            "add",
            "--supplier",
            "11.222.333/0001-81",
            "--client",
            CLIENT,
            "--gross",
            "1500.00",
            "--due",
            "2024-01-15",
        ])
        .unwrap();
        let Commands::Payment(PaymentArgs {
            command: PaymentCommand::Add {
                supplier, gross, paid, ..
            },
        }) = cli.command
        else {
            panic!("expected payment add");
        };
        assert_eq!(supplier.as_str(), "11222333000181");
        assert_eq!(gross.to_string(), "1500.00");
        assert!(paid.is_none());
    }

    #[test]
    fn invalid_cnpj_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from([
            "wht",
            "retentions",
            "--supplier",
            "11222333000180",
            "--amount",
            "800",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn audit_period_takes_month_or_range() {
        let cli =
            Cli::try_parse_from(["wht", "audit", "period", "--client", CLIENT, "--month", "2024-01"])
                .unwrap();
        let Commands::Audit(AuditArgs {
            command: AuditCommand::Period { period, .. },
        }) = cli.command
        else {
            panic!("expected audit period");
        };
        assert_eq!(period.resolve().unwrap().to_string(), "2024-01-01..=2024-01-31");

        assert!(Cli::try_parse_from([
            "wht", "audit", "period", "--client", CLIENT, "--from", "2024-01-01", "--to",
            "2024-03-31",
        ])
        .is_ok());
        assert!(Cli::try_parse_from([
            "wht", "audit", "period", "--client", CLIENT, "--month", "2024-01", "--from",
            "2024-01-01", "--to", "2024-01-31",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["wht", "audit", "period", "--client", CLIENT]).is_err());
        assert!(Cli::try_parse_from([
            "wht", "audit", "period", "--client", CLIENT, "--from", "2024-01-01",
        ])
        .is_err());
    }

    #[test]
    fn late_fee_today_is_optional() {
        let cli = Cli::try_parse_from([
            "wht", "late-fee", "--amount", "1000", "--due", "2024-01-01",
        ])
        .unwrap();
        let Commands::LateFee(args) = cli.command else {
            panic!("expected late-fee");
        };
        assert!(args.today.is_none());
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["wht", "payment", "list", "--status", "paid"]).is_err());
        assert!(Cli::try_parse_from(["wht", "payment", "list", "--status", "audited"]).is_ok());
    }
}
