//! CLI binary for finreport.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReportConfig` and prints where the reports went.

use anyhow::{Context, Result};
use clap::Parser;
use finreport::{
    analyse_and_report, analyse_and_report_with_progress, AnalysisMode, PipelineOutcome,
    PipelineProgressCallback, PipelineStats, PipelineWarning, ProgressCallback, ReportConfig, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner for the whole run, plus a log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving page images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.stage_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "Extracting",
        Stage::Aggregate => "Aggregating",
        Stage::Compose => "Composing",
        Stage::Render => "Rendering",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_pipeline_start(&self, pages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {pages} page image(s)…"))
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut t) = self.stage_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_prefix(stage_label(stage));
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, output_chars: usize) {
        self.bar.println(format!(
            "  {} {:<20}  {:<12}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{output_chars:>6} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
    }

    fn on_warning(&self, warning: &PipelineWarning) {
        self.bar
            .println(format!("  {} {}", yellow("⚠"), yellow(&warning.to_string())));
    }

    fn on_pipeline_complete(&self, stats: &PipelineStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} report ready  ({} request(s), {} image page(s) attached)",
            green("✔"),
            bold(&stats.model_requests.to_string()),
            stats.attached_images
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse page images already in ./input_images
  finreport

  # Rasterise a PDF first (clears ./input_images!)
  finreport --from-pdf-path source_docs/Q3_2024.pdf

  # Insights-only prompt, a cheaper model, reports in ./reports
  finreport --analysis-mode smart --model-name gemini-1.5-flash-8b --output-dir reports

  # Machine-readable outcome
  finreport --json > outcome.json

ANALYSIS MODES:
  full_context  report prompt gets the page records and the insights (default)
  smart         report prompt gets the insights only

OUTPUT FILES:
  report_<pdf stem>_<mode>_<model>.md   (report_<mode>_<model>.md without a PDF)
  report_<pdf stem>_<mode>_<model>.pdf  text pages, then one page per cited image

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY    Google Gemini API key (required)
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory), for --from-pdf-path
  RUST_LOG          Log filter, overrides -v / -q
  FINREPORT_*       Any flag, e.g. FINREPORT_MODEL_NAME=gemini-1.5-flash
"#;

/// Analyse financial document pages with Gemini and write a Markdown + PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "finreport",
    version,
    about = "Analyse financial document pages with Gemini and write a Markdown + PDF report",
    long_about = "Reads page images of a financial document (or rasterises a PDF into them), \
sends them to a Gemini vision model to extract content, aggregate key insights and compose an \
analyst report, then renders that report to PDF with the cited page images attached.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory holding page images (rasterisation target with --from-pdf-path).
    #[arg(
        long,
        alias = "input_images_dir",
        env = "FINREPORT_INPUT_IMAGES_DIR",
        default_value = finreport::config::DEFAULT_INPUT_IMAGES_DIR
    )]
    input_images_dir: PathBuf,

    /// Gemini model identifier.
    #[arg(
        long,
        alias = "model_name",
        env = "FINREPORT_MODEL_NAME",
        default_value = finreport::config::DEFAULT_MODEL_NAME
    )]
    model_name: String,

    /// Source PDF to rasterise into the image directory first.
    #[arg(
        long,
        alias = "from_pdf_path",
        env = "FINREPORT_FROM_PDF_PATH",
        long_help = "Source PDF. Every page is rasterised to page_<n>.png in the image directory.\n\
          WARNING: existing files in that directory are deleted first."
    )]
    from_pdf_path: Option<PathBuf>,

    /// What the report prompt sees: smart or full_context.
    #[arg(
        long,
        alias = "analysis_mode",
        env = "FINREPORT_ANALYSIS_MODE",
        value_enum,
        default_value = "full_context"
    )]
    analysis_mode: ModeArg,

    /// Directory the .md and .pdf reports are written to.
    #[arg(long, env = "FINREPORT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "FINREPORT_DPI", default_value_t = finreport::config::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Parallel PNG writers while rasterising.
    #[arg(long, env = "FINREPORT_RASTER_WORKERS", default_value_t = finreport::config::DEFAULT_RASTER_WORKERS)]
    raster_workers: usize,

    /// Path to a text file replacing the built-in system instruction.
    #[arg(long, env = "FINREPORT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max output tokens per model request.
    #[arg(long, env = "FINREPORT_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Print the full outcome (stage outputs, warnings, stats) as JSON on stdout.
    #[arg(long, env = "FINREPORT_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "FINREPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FINREPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FINREPORT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Smart,
    #[value(name = "full_context", alias = "full-context")]
    FullContext,
}

impl From<ModeArg> for AnalysisMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Smart => AnalysisMode::Smart,
            ModeArg::FullContext => AnalysisMode::FullContext,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // before parsing, so FINREPORT_* entries in .env reach clap
    let env_file = std::env::current_dir()
        .ok()
        .and_then(|dir| load_env_file(&dir));
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs.
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

    if let Some(path) = env_file {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = build_config(&cli).await?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let outcome = if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        analyse_and_report_with_progress(&config, cb).await
    } else {
        analyse_and_report(&config).await
    }
    .context("Report generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&outcome, show_progress);
    }

    Ok(())
}

/// Load the `.env` in `dir` or its nearest ancestor that has one.
/// Variables already set in the environment keep their values.
fn load_env_file(dir: &Path) -> Option<PathBuf> {
    let path = dir
        .ancestors()
        .map(|d| d.join(".env"))
        .find(|p| p.is_file())?;
    dotenvy::from_path(&path).ok()?;
    Some(path)
}

/// Map CLI args to `ReportConfig`.
async fn build_config(cli: &Cli) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder()
        .input_images_dir(&cli.input_images_dir)
        .model_name(&cli.model_name)
        .analysis_mode(cli.analysis_mode.into())
        .output_dir(&cli.output_dir)
        .dpi(cli.dpi)
        .raster_workers(cli.raster_workers);

    if let Some(ref pdf) = cli.from_pdf_path {
        builder = builder.from_pdf_path(pdf);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(outcome: &PipelineOutcome, show_progress: bool) {
    let stats = &outcome.stats;
    if !show_progress {
        // the spinner already listed these
        for w in &outcome.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
    }
    eprintln!("   Markdown  →  {}", bold(&outcome.report_path.display().to_string()));
    eprintln!("   PDF       →  {}", bold(&outcome.pdf_path.display().to_string()));
    eprintln!(
        "   {} page(s)  {} tokens in  /  {} tokens out  —  {}ms total",
        stats.pages,
        dim(&stats.total_input_tokens.to_string()),
        dim(&stats.total_output_tokens.to_string()),
        stats.total_duration_ms,
    );
    if stats.missing_images > 0 {
        eprintln!(
            "   {}",
            yellow(&format!("{} cited image(s) not found", stats.missing_images))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_file_in_parent_dir_fills_unset_vars() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "FINREPORT_MODEL_NAME=gemini-1.5-flash-8b\nFINREPORT_ENV_TEST_KEPT=from-file\n",
        )
        .unwrap();
        let nested = dir.path().join("source_docs");
        std::fs::create_dir(&nested).unwrap();
        std::env::set_var("FINREPORT_ENV_TEST_KEPT", "from-shell");

        let loaded = load_env_file(&nested);

        assert_eq!(loaded, Some(dir.path().join(".env")));
        assert_eq!(std::env::var("FINREPORT_ENV_TEST_KEPT").unwrap(), "from-shell");
        let cli = Cli::try_parse_from(["finreport"]).unwrap();
        assert_eq!(cli.model_name, "gemini-1.5-flash-8b");
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_env_file(dir.path()), None);
    }
}
