use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use barlist_engine::config::{ReconcileConfig, load_config_path};
use vault_ledger::registry::{FundRegistry, load_registry_path};
use vault_ledger::verify::{VerifyRequest, run_verification};
use vault_ledger::{db, history};

#[derive(Parser)]
#[command(version, about = "Vault Ledger CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Verify one fund's bar list against its metrics and history
    Verify {
        /// Fund id from the registry (e.g. "invesco")
        #[arg(long)]
        fund: String,

        /// Path to the already-fetched bar-list document text
        #[arg(long, value_name = "FILE")]
        document: PathBuf,

        /// Snapshot date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Directory with per-fund metrics JSON files
        #[arg(long, value_name = "DIR", default_value = "comex_data")]
        metrics_dir: PathBuf,

        /// SQLite ledger path (defaults to $VAULT_LEDGER_DB, then vault_ledger.db)
        #[arg(long)]
        db: Option<String>,

        /// Output directory for verification reports
        #[arg(long, value_name = "DIR", default_value = "reports")]
        out: PathBuf,

        /// Reconciler config TOML (defaults apply when omitted)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Fund registry TOML (built-in funds when omitted)
        #[arg(long, value_name = "FILE")]
        registry: Option<PathBuf>,
    },

    History(HistoryCmd),
}

/// Inspect or reset the bar-history ledger
#[derive(Args)]
struct HistoryCmd {
    #[command(subcommand)]
    sub: HistorySub,
}

#[derive(Subcommand)]
enum HistorySub {
    /// Delete a fund's ledger rows and start fresh
    Reset {
        /// Fund id to wipe
        #[arg(long)]
        fund: String,

        /// SQLite ledger path (defaults to $VAULT_LEDGER_DB, then vault_ledger.db)
        #[arg(long)]
        db: Option<String>,
    },
}

fn default_db_path() -> String {
    shared_utils::env::env_var_or("VAULT_LEDGER_DB", "vault_ledger.db")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Verify {
            fund,
            document,
            date,
            metrics_dir,
            db,
            out,
            config,
            registry,
        } => {
            let config = match config {
                Some(path) => load_config_path(&path)?,
                None => ReconcileConfig::default(),
            };
            let registry = match registry {
                Some(path) => load_registry_path(&path)?,
                None => FundRegistry::builtin(),
            };
            let db_path = db.unwrap_or_else(default_db_path);

            let outcome = run_verification(&VerifyRequest {
                fund: &fund,
                document: &document,
                date,
                metrics_dir: &metrics_dir,
                db_path: &db_path,
                out_dir: &out,
                config,
                registry: &registry,
            })?;

            println!(
                "{}: {:?} ({} bars, {} finding(s)) -> {}",
                fund,
                outcome.result.status,
                outcome.result.bar_count,
                outcome.result.discrepancies.len(),
                outcome.report_path.display(),
            );
            if let Some(summary) = &outcome.summary {
                for ((vault, brand), agg) in &summary.by_group {
                    println!("  {vault} / {brand}: {} bar(s), {} oz", agg.bar_count, agg.total_weight_oz);
                }
            }
            if let Some(delta) = outcome.delta {
                println!("{delta}");
            }
        }

        Cmd::History(HistoryCmd {
            sub: HistorySub::Reset { fund, db },
        }) => {
            let db_path = db.unwrap_or_else(default_db_path);
            db::migrate::run_sqlite(&db_path)?;
            let mut conn = db::connection::connect_sqlite(&db_path)?;
            let removed = history::reset_fund(&mut conn, &fund)?;
            println!("{fund}: {removed} bar(s) forgotten");
        }
    }

    Ok(())
}
