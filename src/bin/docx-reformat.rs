//! CLI binary for docx-reformat.
//!
//! A thin host over the library's `Session`: it maps flags to
//! `WorkflowConfig`, drives one submission, renders the preview, and saves
//! the returned document.

use anyhow::{bail, Context, Result};
use clap::Parser;
use docx_reformat::pipeline::preview;
use docx_reformat::{
    DocumentCandidate, DownloadOutcome, ErrorLog, ErrorRecord, ProcessingState, Session,
    StatusKind, StatusMessage, SubmitOutcome, UncaughtSubscription, WorkflowConfig,
    WorkflowObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Spinner shown while the request is in flight; status lines and recorded
/// errors are printed above it.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Ready");
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for CliObserver {
    fn on_state_change(&self, _from: ProcessingState, to: ProcessingState) {
        match to {
            ProcessingState::Submitting => {
                self.bar.reset_elapsed();
                self.bar.set_prefix("Processing");
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            ProcessingState::Succeeded | ProcessingState::Failed => {
                self.bar.finish_and_clear();
            }
            ProcessingState::Idle => {}
        }
    }

    fn on_status(&self, status: &StatusMessage) {
        self.bar.set_message(status.text.clone());
    }

    fn on_error_recorded(&self, record: &ErrorRecord) {
        self.bar
            .println(format!("  {} {}", red("✗"), dim(&format!("[{}] {}", record.origin, record.message))));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Remove every paragraph mentioning a phrase; saves contract_v1.docx here
  docx-reformat contract.docx -i "CONFIDENTIAL"

  # Save elsewhere and skip the preview
  docx-reformat contract.docx -i "draft" -o out/ --no-preview

  # Read a longer instruction from a file
  docx-reformat notes.docx --instruction-file edits.txt

  # Talk to a local formatter with a short timeout
  docx-reformat notes.docx -i "remove ____" --endpoint http://localhost:5000/process-document --timeout 30

  # Machine-readable summary
  docx-reformat notes.docx -i "remove ____" --json

ENVIRONMENT VARIABLES:
  DOCX_REFORMAT_ENDPOINT   Processing service URL
  DOCX_REFORMAT_TIMEOUT    Request timeout in seconds (0 = wait forever)
  DOCX_REFORMAT_OUTPUT     Directory the new document is saved into
  RUST_LOG                 Override log filtering (e.g. docx_reformat=debug)
"#;

/// Apply a plain-language edit to a Word document through the formatting service.
#[derive(Parser, Debug)]
#[command(
    name = "docx-reformat",
    version,
    about = "Apply a plain-language edit to a .docx through the formatting service",
    long_about = "Upload a Word document together with an instruction describing what to remove \
or change. The service returns a preview and a new version of the document, which is saved \
into the output directory as <name>_v1.docx.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the .docx document.
    input: PathBuf,

    /// What to remove or change, in plain language.
    #[arg(short, long, required_unless_present = "instruction_file", conflicts_with = "instruction_file")]
    instruction: Option<String>,

    /// Read the instruction from a text file.
    #[arg(long)]
    instruction_file: Option<PathBuf>,

    /// Directory the new document is saved into.
    #[arg(short, long, env = "DOCX_REFORMAT_OUTPUT", default_value = ".")]
    output_dir: PathBuf,

    /// Processing service URL.
    #[arg(long, env = "DOCX_REFORMAT_ENDPOINT", default_value = docx_reformat::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request timeout in seconds; 0 waits indefinitely.
    #[arg(long, env = "DOCX_REFORMAT_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Strip scripts and event handlers from the preview before showing it.
    #[arg(long)]
    sanitize_preview: bool,

    /// Do not print the preview.
    #[arg(long)]
    no_preview: bool,

    /// Do not save the returned document.
    #[arg(long)]
    no_download: bool,

    /// Print a JSON summary instead of human-readable output.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
struct Summary {
    state: ProcessingState,
    status: Option<StatusMessage>,
    input: String,
    saved_to: Option<PathBuf>,
    preview: Option<String>,
    service_message: Option<String>,
    errors: Vec<ErrorRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Uncaught-error subscription, held for the whole run ──────────────
    let log = ErrorLog::new();
    let _uncaught =
        UncaughtSubscription::install(log.clone()).context("Failed to install panic hook")?;

    // ── Build session ────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let mut session = Session::new(config)
        .context("Failed to create HTTP client")?
        .with_error_log(log);
    if show_progress {
        session = session.with_observer(CliObserver::new());
    }

    let instruction = match (&cli.instruction, &cli.instruction_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?,
        (None, None) => bail!("Provide --instruction or --instruction-file"),
    };

    // ── Select + submit ──────────────────────────────────────────────────
    let candidate = DocumentCandidate::from_path(&cli.input)
        .await
        .context("Failed to read input document")?;
    if session.select_document(candidate).is_err() {
        report_failure(&session);
        bail!("{}", session.status().map(|s| s.text).unwrap_or_default());
    }
    session.set_instruction(instruction);

    match session.submit().await {
        SubmitOutcome::Skipped { advisory } => {
            eprintln!("{} {}", yellow("!"), advisory);
            bail!("Nothing was submitted");
        }
        SubmitOutcome::Failed { .. } => {
            if cli.json {
                print_summary(&session, &cli, None)?;
            } else {
                report_failure(&session);
            }
            bail!("Processing failed");
        }
        SubmitOutcome::Succeeded => {}
    }

    // ── Preview + download ───────────────────────────────────────────────
    let saved_to = if cli.no_download {
        None
    } else {
        match session
            .trigger_download(&cli.output_dir)
            .await
            .context("Failed to save the processed document")?
        {
            DownloadOutcome::Saved(path) => Some(path),
            DownloadOutcome::Unavailable { advisory } => {
                eprintln!("{} {}", yellow("!"), advisory);
                None
            }
        }
    };

    if cli.json {
        return print_summary(&session, &cli, saved_to);
    }

    if !cli.no_preview {
        if let Some(markup) = session.preview() {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", preview::to_plain_text(&markup))
                .context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet {
        let service_message = session.result().and_then(|r| r.service_message);
        eprintln!(
            "{} {}",
            green("✔"),
            bold(&service_message.unwrap_or_else(|| "Document processed".to_string()))
        );
        if let Some(path) = saved_to {
            eprintln!("   →  {}", bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `WorkflowConfig`.
fn build_config(cli: &Cli) -> Result<WorkflowConfig> {
    let timeout = (cli.timeout > 0).then_some(cli.timeout);
    WorkflowConfig::builder()
        .endpoint(cli.endpoint.clone())
        .request_timeout_secs(timeout)
        .sanitize_preview(cli.sanitize_preview)
        .build()
        .context("Invalid configuration")
}

/// Print the status line and the full error log to stderr.
fn report_failure(session: &Session) {
    if let Some(status) = session.status() {
        let line = match status.kind {
            StatusKind::Error => red(&status.text),
            StatusKind::Advisory => yellow(&status.text),
            StatusKind::Info | StatusKind::Success => status.text.clone(),
        };
        eprintln!("{line}");
    }

    let errors = session.errors();
    if errors.is_empty() {
        return;
    }
    eprintln!("\n{}", bold("Error log:"));
    for (i, record) in errors.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, record.message);
        eprintln!("     {}", dim(&format!("origin: {}", record.origin)));
        if let Some(ref loc) = record.location {
            eprintln!("     {}", dim(&format!("at: {loc}")));
        }
        if let Some(ref trace) = record.stack_trace {
            for line in trace.lines() {
                eprintln!("     {}", dim(line));
            }
        }
    }
}

fn print_summary(session: &Session, cli: &Cli, saved_to: Option<PathBuf>) -> Result<()> {
    let result = session.result();
    let summary = Summary {
        state: session.state(),
        status: session.status(),
        input: cli.input.display().to_string(),
        saved_to,
        preview: session.preview(),
        service_message: result.and_then(|r| r.service_message),
        errors: session.errors(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
    );
    Ok(())
}
