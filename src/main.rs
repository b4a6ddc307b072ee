mod audit;
mod db;
mod decide;
mod error;
mod extract;
mod merge;
mod normalize;
mod record;
mod reconcile;
mod report;
mod settings;
mod similarity;
mod sources;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::decide::{DecisionProvider, Interactive, Policy, Scripted};
use crate::record::SourceKind;
use crate::reconcile::Reconciler;
use crate::settings::Settings;
use crate::sources::SourceBatch;
use crate::store::CanonicalStore;

#[derive(Parser)]
#[command(
    name = "biblio_recon",
    about = "Reconcile publication/news/media records into one canonical table"
)]
struct Cli {
    /// Publications CSV (anchor-encoded url column)
    #[arg(long, global = true)]
    publications: Option<PathBuf>,
    /// News CSV
    #[arg(long, global = true)]
    news: Option<PathBuf>,
    /// Media mentions CSV
    #[arg(long, global = true)]
    media: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract all sources into the union table without deduplication
    Combine {
        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Full reconciliation pass: dedup, resolve conflicts, emit the table
    Reconcile {
        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fuzzy-conflict threshold in [0,1]
        #[arg(short = 't', long)]
        threshold: Option<f64>,
        /// Unattended policy; conflicts prompt on the terminal when omitted
        #[arg(short, long)]
        policy: Option<PolicyArg>,
        /// Decision log database path
        #[arg(long)]
        log_db: Option<PathBuf>,
        /// Also dump the canonical set with provenance as JSON
        #[arg(long)]
        audit_json: Option<PathBuf>,
    },
    /// List groups of candidates sharing a normalized title (no changes)
    Report,
    /// Show logged decisions
    Log {
        /// Filter by run id (e.g. run-1721314159)
        #[arg(long)]
        run: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Decision log database path
        #[arg(long)]
        log_db: Option<PathBuf>,
    },
    /// Candidate counts per source
    Stats,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    /// Discard every conflicting incoming record
    Skip,
    /// Keep both sides of every conflict
    KeepBoth,
    /// Replace the existing record with the incoming one
    PreferNew,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Policy {
        match arg {
            PolicyArg::Skip => Policy::Skip,
            PolicyArg::KeepBoth => Policy::KeepBoth,
            PolicyArg::PreferNew => Policy::PreferNew,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = settings::load()?;

    let result = match &cli.command {
        Commands::Combine { output } => {
            let batches = load_sources(&cli, &settings);
            let out = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.output_file));
            let mut store = CanonicalStore::new();
            let mut total = 0usize;
            for batch in &batches {
                total += batch.candidates.len();
                for candidate in batch.candidates.iter().cloned() {
                    store.push(record::CanonicalRecord::accepted(candidate));
                }
            }
            sources::write_output(&out, &store)?;
            print_batch_counts(&batches);
            println!("Combined {} rows into {:?} (no deduplication).", total, out);
            Ok(())
        }
        Commands::Reconcile {
            output,
            threshold,
            policy,
            log_db,
            audit_json,
        } => {
            let batches = load_sources(&cli, &settings);
            let out = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.output_file));
            let db_path = log_db
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.decision_db));
            let threshold = threshold.unwrap_or(settings.threshold);

            let candidates: Vec<_> = batches
                .iter()
                .flat_map(|b| b.candidates.iter().cloned())
                .collect();
            if candidates.is_empty() {
                warn!("no candidates from any source; writing an empty result");
            }

            let mut provider: Box<dyn DecisionProvider> = match policy {
                Some(p) => Box::new(Scripted::new((*p).into())),
                None => Box::new(Interactive::stdio()),
            };

            let pb = policy.is_some().then(|| {
                let pb = ProgressBar::new(candidates.len() as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                pb
            });

            let mut engine = Reconciler::new(threshold);
            let mut log = audit::AuditLog::new(audit::new_run_id());
            let mut pass_error = None;
            for candidate in candidates {
                match engine.offer(candidate, provider.as_mut(), &mut log) {
                    Ok(_) => {}
                    Err(e) => {
                        pass_error = Some(e);
                        break;
                    }
                }
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            }
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            // Decisions made so far are logged even when the pass aborts.
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            log.persist(&conn)?;

            if let Some(e) = pass_error {
                return Err(e).with_context(|| {
                    format!(
                        "pass aborted; nothing written to {:?}, decisions so far logged as {}",
                        out,
                        log.run_id()
                    )
                });
            }

            sources::write_output(&out, engine.store())?;
            if let Some(json_path) = audit_json {
                let file = std::fs::File::create(json_path)
                    .with_context(|| format!("Failed to create {:?}", json_path))?;
                serde_json::to_writer_pretty(file, engine.store().records())?;
            }

            engine.stats().print();
            println!(
                "Wrote {} canonical records to {:?}; {} decision(s) logged as {}.",
                engine.store().len(),
                out,
                log.entries().len(),
                log.run_id()
            );
            Ok(())
        }
        Commands::Report => {
            let batches = load_sources(&cli, &settings);
            let candidates: Vec<_> = batches
                .iter()
                .flat_map(|b| b.candidates.iter().cloned())
                .collect();
            report::print_report(&candidates);
            Ok(())
        }
        Commands::Log { run, limit, log_db } => {
            let db_path = log_db
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.decision_db));
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_decisions(&conn, run.as_deref(), *limit)?;
            if rows.is_empty() {
                println!("No decisions logged.");
                return Ok(());
            }
            println!(
                "{:<16} | {:>3} | {:<11} | {:>5} | {:<16} | {:<30} | {:<30}",
                "Run", "#", "Kind", "Score", "Decision", "Incoming", "Existing"
            );
            println!("{}", "-".repeat(128));
            for row in &rows {
                println!(
                    "{:<16} | {:>3} | {:<11} | {:>5.2} | {:<16} | {:<30} | {:<30}",
                    truncate(&row.run_id, 16),
                    row.seq,
                    row.kind,
                    row.score,
                    row.decision,
                    truncate(&row.incoming_title, 30),
                    truncate(&row.existing_title, 30),
                );
            }
            println!("\n{} decision(s).", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let batches = load_sources(&cli, &settings);
            print_batch_counts(&batches);
            let total: usize = batches.iter().map(|b| b.candidates.len()).sum();
            println!("Total candidates: {}", total);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn source_path(cli: &Cli, settings: &Settings, kind: SourceKind) -> PathBuf {
    match kind {
        SourceKind::Publication => cli
            .publications
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.publications_file)),
        SourceKind::News => cli
            .news
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.news_file)),
        SourceKind::Media => cli
            .media
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.media_file)),
    }
}

/// Load every source in the original export order. An unavailable source
/// contributes nothing; only losing all of them earns a summary warning.
fn load_sources(cli: &Cli, settings: &Settings) -> Vec<SourceBatch> {
    let mut batches = Vec::new();
    let mut unavailable = 0usize;
    for kind in SourceKind::all() {
        let path = source_path(cli, settings, kind);
        match sources::load_candidates(kind, &path) {
            Ok(batch) => batches.push(batch),
            Err(e) => {
                unavailable += 1;
                warn!(source = kind.label(), error = %e, "source skipped");
            }
        }
    }
    if unavailable == SourceKind::all().len() {
        warn!("no input source could be read; the result will be empty");
    }
    batches
}

fn print_batch_counts(batches: &[SourceBatch]) {
    for batch in batches {
        println!(
            "  {:<14} {:>5} candidates ({} malformed skipped)",
            batch.kind.label(),
            batch.candidates.len(),
            batch.malformed
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
