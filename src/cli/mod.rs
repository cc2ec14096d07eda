//! # CLI Module
//!
//! Command-line interface for the fingerprint audit.
//!
//! ## Usage
//! ```bash
//! # Check that every renamed output traces back to a source file
//! fp-audit compare ~/Photos/originals ~/Photos/renamed
//!
//! # Perceptual fingerprints survive re-encoding
//! fp-audit compare originals renamed --mode perceptual --hash-size 16
//!
//! # Only the problems, machine readable
//! fp-audit compare originals renamed --output minimal --fail-on-issues
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use fingerprint_audit::core::comparator::{CompareRecord, CompareStatus};
use fingerprint_audit::core::fingerprint::{
    FingerprintConfig, FingerprintMode, DEFAULT_HASH_SIZE, MAX_HASH_SIZE,
};
use fingerprint_audit::core::pipeline::CompareWorker;
use fingerprint_audit::core::pool::{protocol, PoolLauncher, ProcessPoolLauncher, ThreadPoolLauncher};
use fingerprint_audit::core::report::CompareReport;
use fingerprint_audit::error::{AuditError, Result};
use fingerprint_audit::events::{Event, EventReceiver};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exit status of a run stopped with Ctrl+C
const EXIT_CANCELLED: u8 = 130;

/// Fingerprint Audit - prove renamed files came from your sources
#[derive(Parser, Debug)]
#[command(name = "fp-audit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a result directory against its source directory
    Compare {
        /// Directory holding the original files
        source: PathBuf,

        /// Directory holding the renamed or converted files
        result: PathBuf,

        /// Fingerprint mode
        #[arg(short, long, default_value = "exact")]
        mode: Mode,

        /// Number of parallel workers (clamped to the CPU count)
        #[arg(short, long)]
        workers: Option<usize>,

        /// dHash grid size for perceptual mode
        #[arg(long, default_value_t = DEFAULT_HASH_SIZE, value_parser = clap::value_parser!(u32).range(1..=MAX_HASH_SIZE as i64))]
        hash_size: u32,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Only print records with these statuses
        #[arg(short, long = "status")]
        statuses: Vec<CompareStatus>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Exit with status 1 when any record is not a MATCH
        #[arg(long)]
        fail_on_issues: bool,

        /// Fingerprint on threads instead of worker processes
        #[arg(long)]
        threads: bool,
    },

    /// Serve fingerprint requests on stdin (used by the process pool)
    #[command(hide = true)]
    Worker {
        #[arg(long, default_value = "exact")]
        mode: Mode,

        #[arg(long, default_value_t = DEFAULT_HASH_SIZE, value_parser = clap::value_parser!(u32).range(1..=MAX_HASH_SIZE as i64))]
        hash_size: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Byte-identical content only (default)
    Exact,
    /// Visually similar content, robust to re-encoding
    #[value(alias = "dhash")]
    Perceptual,
}

impl From<Mode> for FingerprintMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Exact => FingerprintMode::Exact,
            Mode::Perceptual => FingerprintMode::Perceptual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// The whole report as JSON
    Json,
    /// One line per issue: status and path
    Minimal,
}

struct CompareArgs {
    source: PathBuf,
    result: PathBuf,
    mode: FingerprintMode,
    workers: Option<usize>,
    hash_size: u32,
    output: OutputFormat,
    statuses: Vec<CompareStatus>,
    verbose: bool,
    fail_on_issues: bool,
    threads: bool,
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            source,
            result,
            mode,
            workers,
            hash_size,
            output,
            statuses,
            verbose,
            fail_on_issues,
            threads,
        } => run_compare(CompareArgs {
            source,
            result,
            mode: mode.into(),
            workers,
            hash_size,
            output,
            statuses,
            verbose,
            fail_on_issues,
            threads,
        }),
        Commands::Worker { mode, hash_size } => run_worker(mode.into(), hash_size),
    }
}

fn run_worker(mode: FingerprintMode, hash_size: u32) -> Result<ExitCode> {
    let config = FingerprintConfig::new(mode).hash_size(hash_size);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let served = protocol::serve(config, stdin.lock(), stdout.lock())
        .map_err(|e| AuditError::Output(format!("worker protocol failed: {}", e)))?;
    debug!(served, "Worker exiting");
    Ok(ExitCode::SUCCESS)
}

fn run_compare(args: CompareArgs) -> Result<ExitCode> {
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Fingerprint Audit").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "  {} {}",
            style("mode:").dim(),
            args.mode.description()
        ))
        .ok();
        term.write_line("").ok();
    }

    let launcher: Arc<dyn PoolLauncher> = if args.threads {
        Arc::new(ThreadPoolLauncher)
    } else {
        Arc::new(ProcessPoolLauncher::current_exe()?)
    };

    let mut builder = CompareWorker::builder()
        .source_dir(&args.source)
        .result_dir(&args.result)
        .mode(args.mode)
        .hash_size(args.hash_size)
        .launcher(launcher);
    if let Some(workers) = args.workers {
        builder = builder.workers(workers);
    }
    let worker = builder.build()?;

    let (handle, receiver) = worker.spawn()?;

    let stopper = handle.stopper();
    if let Err(e) = ctrlc::set_handler(move || stopper.request_stop()) {
        warn!(error = %e, "Could not install the Ctrl+C handler");
    }

    let progress = if pretty { Some(progress_bar()) } else { None };
    let outcome = drain_events(&receiver, progress.as_ref(), args.verbose);
    handle.join();

    match outcome {
        Event::Done(report) => {
            match args.output {
                OutputFormat::Pretty => print_pretty_results(&term, &report, &args),
                OutputFormat::Json => print_json_results(&report)?,
                OutputFormat::Minimal => print_minimal_results(&report, &args.statuses),
            }
            if args.fail_on_issues && !report.is_clean() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Event::Cancelled => {
            term.write_line(&format!("{} Cancelled", style("✗").yellow().bold()))
                .ok();
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Event::Error { message } => {
            term.write_line(&format!("{} {}", style("Error:").red().bold(), message))
                .ok();
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb
}

/// Feed events to the progress bar until the terminal one arrives
fn drain_events(receiver: &EventReceiver, progress: Option<&ProgressBar>, verbose: bool) -> Event {
    for event in receiver.iter() {
        match event {
            Event::Stage { ref text } => {
                if let Some(pb) = progress {
                    pb.set_position(0);
                    pb.set_message(text.clone());
                }
            }
            Event::ScanDone {
                source_total,
                result_total,
            } => {
                if let Some(pb) = progress {
                    if verbose {
                        pb.println(format!(
                            "  {} source files, {} result files",
                            source_total, result_total
                        ));
                    }
                }
            }
            Event::Progress(p) => {
                if let Some(pb) = progress {
                    pb.set_length(p.total as u64);
                    pb.set_position(p.done as u64);
                    pb.set_message(p.stage.to_string());
                }
            }
            terminal => {
                if let Some(pb) = progress {
                    pb.finish_and_clear();
                }
                return terminal;
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Event::Error {
        message: "comparison worker exited without a result".to_string(),
    }
}

fn selected<'a>(
    report: &'a CompareReport,
    statuses: &'a [CompareStatus],
) -> Box<dyn Iterator<Item = &'a CompareRecord> + 'a> {
    if statuses.is_empty() {
        Box::new(report.issues())
    } else {
        Box::new(report.with_status(statuses))
    }
}

fn print_pretty_results(term: &Term, report: &CompareReport, args: &CompareArgs) {
    let mark = if report.is_clean() {
        style("✓").green().bold()
    } else {
        style("!").yellow().bold()
    };
    term.write_line(&format!("{} Comparison Complete", mark)).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} source files, {} result files compared in {:.1}s",
        style(report.source_entries.len()).cyan(),
        style(report.result_entries.len()).cyan(),
        report.elapsed_secs
    ))
    .ok();
    term.write_line("").ok();

    for (status, count) in report.counts.iter() {
        let label = format!("{:<22}", status.as_str());
        let label = if status.is_issue() && count > 0 {
            style(label).yellow()
        } else {
            style(label).dim()
        };
        term.write_line(&format!("  {} {}", label, count)).ok();
    }
    term.write_line("").ok();

    let records: Vec<_> = selected(report, &args.statuses).collect();
    if records.is_empty() {
        if args.statuses.is_empty() {
            term.write_line(&format!(
                "  {} Every result file traces back to its source",
                style("✓").green()
            ))
            .ok();
        }
    } else {
        let heading = if args.statuses.is_empty() {
            "Issues:"
        } else {
            "Records:"
        };
        term.write_line(&format!("{}", style(heading).bold().underlined()))
            .ok();
        term.write_line("").ok();

        for record in records {
            term.write_line(&format!(
                "  {} {}",
                style(record.status).yellow(),
                display_path(&record.result_path)
            ))
            .ok();
            term.write_line(&format!("    {}", style(&record.details).dim()))
                .ok();
            if args.verbose {
                for candidate in &record.source_candidates {
                    term.write_line(&format!("    {} {}", style("←").dim(), display_path(candidate)))
                        .ok();
                }
            }
        }
        term.write_line("").ok();
    }

    if !report.source_duplicates.is_empty() {
        term.write_line(&format!(
            "{}",
            style("Source files sharing a fingerprint:").bold().underlined()
        ))
        .ok();
        term.write_line("").ok();
        for (i, (fingerprint, entries)) in report.source_duplicates.iter().enumerate() {
            term.write_line(&format!(
                "  {} {} ({} files)",
                style(format!("Group {}:", i + 1)).bold(),
                style(short_fingerprint(fingerprint)).dim(),
                entries.len()
            ))
            .ok();
            for entry in entries {
                term.write_line(&format!("    ○ {}", display_path(&entry.path)))
                    .ok();
            }
        }
        term.write_line("").ok();
    }

    if args.verbose {
        let unreferenced = report.unreferenced_sources();
        if !unreferenced.is_empty() {
            term.write_line(&format!(
                "  {} source files have no counterpart in the result directory",
                style(unreferenced.len()).cyan()
            ))
            .ok();
        }
    }
}

fn print_json_results(report: &CompareReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| AuditError::Output(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn print_minimal_results(report: &CompareReport, statuses: &[CompareStatus]) {
    for record in selected(report, statuses) {
        println!("{}\t{}", record.status, record.result_path.display());
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..16).unwrap_or(fingerprint)
}
