// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
use party_checkin::ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use party_checkin::{
    default_seed, find_same_day_duplicates, init_tracing, load_names_csv, write_attendance_csv,
    CheckInError, Clock, Config, Name, Orchestrator, SqliteStore, SystemClock,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "checkin",
    version,
    about = "Party check-in kiosk and attendance tools",
    long_about = None,
)]
struct Cli {
    /// SQLite database file (overrides CHECKIN_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database and seed the default roster if empty.
    Init,

    /// List known names.
    Names {
        #[arg(long)]
        search: Option<String>,
        /// Only names not yet checked in today
        #[arg(long)]
        available: bool,
    },

    /// Add a name to the roster without checking in.
    Add { name: String },

    /// Check a name in for today.
    Register { name: String },

    /// Show whether a name has checked in today.
    Status { name: String },

    /// Most recent check-ins, newest first.
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Today's check-ins, oldest first.
    Today,

    /// Append names from a CSV file with a `name` column.
    ImportNames { csv: PathBuf },

    /// Write one day's check-ins to CSV.
    Export {
        csv: PathBuf,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Report names checked in more than once on the same day.
    Audit {
        /// YYYY-MM-DD, defaults to every day on record
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Run the interactive check-in kiosk (default).
    Kiosk {
        /// Line-oriented scan source, e.g. a FIFO fed by a QR decoder
        #[arg(long)]
        scan_input: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Kiosk { scan_input: None });

    // Logging would tear the kiosk screen; keep it quiet unless RUST_LOG asks
    let default_filter = if matches!(command, Commands::Kiosk { .. }) { "off" } else { "warn" };
    init_tracing(default_filter);

    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    let store = Arc::new(
        SqliteStore::open(&config.database_path, config.enforce_unique)
            .with_context(|| format!("failed to open {}", config.database_path.display()))?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut orchestrator = Orchestrator::new(store.clone(), clock.clone())
        .with_store_timeout(config.store_timeout);

    match command {
        Commands::Init => runtime.block_on(async {
            let seeded = orchestrator.bootstrap_if_empty(&default_seed()).await?;
            let (names, attendance) = store.counts().await?;
            println!("🗄️  Database ready: {}", config.database_path.display());
            println!("✓ Seeded {seeded} names");
            println!("✓ {names} names, {attendance} check-ins on record");
            anyhow::Ok(())
        }),

        Commands::Names { search, available } => runtime.block_on(async {
            let search = search.unwrap_or_default();
            let names = if available {
                orchestrator.available_names(&search).await?
            } else {
                orchestrator.search(&search).await?
            };
            for name in &names {
                println!("{name}");
            }
            anyhow::Ok(())
        }),

        Commands::Add { name } => runtime.block_on(async {
            let outcome = orchestrator.add_name(&name).await;
            report(orchestrator.status(), outcome.map(|_| ()))
        }),

        Commands::Register { name } => runtime.block_on(async {
            let outcome = orchestrator.submit(Some(&name)).await;
            report(orchestrator.status(), outcome.map(|_| ()))
        }),

        Commands::Status { name } => runtime.block_on(async {
            let name = Name::parse(&name)?;
            let present = orchestrator.has_checked_in_today(&name).await?;
            if present {
                println!("✅ {name} has checked in today");
            } else {
                println!("⏳ {name} has not checked in today");
            }
            anyhow::Ok(())
        }),

        Commands::Recent { limit } => runtime.block_on(async {
            let records = orchestrator
                .list_recent(limit.unwrap_or(config.recent_limit))
                .await?;
            for record in &records {
                println!("{}  {}", record.display_time(), record.name);
            }
            anyhow::Ok(())
        }),

        Commands::Today => runtime.block_on(async {
            let records = orchestrator.todays_attendance().await?;
            println!("📋 {} checked in today", records.len());
            for record in &records {
                println!("{}  {}", record.display_time(), record.name);
            }
            anyhow::Ok(())
        }),

        Commands::ImportNames { csv } => runtime.block_on(async {
            let names = load_names_csv(&csv)?;
            let mut added = 0;
            for name in &names {
                if !orchestrator.ensure_name(name.as_str()).await?.already_present {
                    added += 1;
                }
            }
            println!("📂 Read {} names from {}", names.len(), csv.display());
            println!("✓ Added {added}, {} already known", names.len() - added);
            anyhow::Ok(())
        }),

        Commands::Export { csv, date } => runtime.block_on(async {
            let day = date.unwrap_or_else(|| clock.now().date());
            let records = orchestrator.checked_in_on(day).await?;
            let written = write_attendance_csv(&csv, &records)?;
            println!("💾 Wrote {written} check-ins for {day} to {}", csv.display());
            anyhow::Ok(())
        }),

        Commands::Audit { date } => runtime.block_on(async {
            let records = match date {
                Some(day) => orchestrator.checked_in_on(day).await?,
                None => orchestrator.attendance_history().await?,
            };
            let duplicates = find_same_day_duplicates(&records);

            println!("🔍 Audited {} check-ins", records.len());
            if duplicates.is_empty() {
                println!("✓ No same-day duplicates");
            }
            for dup in &duplicates {
                println!(
                    "⚠️  {} on {}: {} records ({} extra)",
                    dup.name,
                    dup.day,
                    dup.record_ids.len(),
                    dup.extra_records()
                );
            }
            anyhow::Ok(())
        }),

        Commands::Kiosk { scan_input } => run_kiosk(&runtime, orchestrator, scan_input),
    }
}

/// Print the session status; map the outcome to the process result.
fn report(status: &str, outcome: Result<(), CheckInError>) -> Result<()> {
    match outcome {
        Ok(()) => {
            println!("✅ {status}");
            Ok(())
        }
        Err(CheckInError::StoreUnavailable(e)) => {
            eprintln!("❌ {status}");
            Err(e.into())
        }
        Err(_) => {
            eprintln!("⚠️  {status}");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "tui")]
fn run_kiosk(runtime: &Runtime, orchestrator: Orchestrator, scan_input: Option<PathBuf>) -> Result<()> {
    use party_checkin::{forward_lines, scan_channel};
    use tokio::io::BufReader;

    runtime.block_on(orchestrator.bootstrap_if_empty(&default_seed()))?;

    let (scans_tx, scans_rx) = scan_channel();
    if let Some(path) = scan_input {
        runtime.spawn(async move {
            match tokio::fs::File::open(&path).await {
                Ok(file) => match forward_lines(BufReader::new(file), scans_tx).await {
                    Ok(count) => tracing::info!(count, "scan input closed"),
                    Err(e) => tracing::warn!(error = %e, "scan input failed"),
                },
                Err(e) => tracing::warn!(error = %e, path = %path.display(), "cannot open scan input"),
            }
        });
    }

    let mut app = ui::App::new(orchestrator, scans_rx, runtime.handle().clone());
    ui::run_ui(&mut app)?;

    println!("\n✅ Kiosk closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_kiosk(_runtime: &Runtime, _orchestrator: Orchestrator, _scan_input: Option<PathBuf>) -> Result<()> {
    eprintln!("❌ Kiosk mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin checkin-server --features server");
    std::process::exit(1);
}
