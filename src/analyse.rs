//! Pipeline entry points.
//!
//! A run is strictly sequential:
//!
//! ```text
//! ingest ─▶ extract ─▶ aggregate ─▶ compose ─▶ save .md ─▶ render .pdf
//! ```
//!
//! Each model stage is a single request. Whatever the extractor returns is
//! handed to the aggregator verbatim, and both texts reach the composer
//! verbatim (the extraction only in [`AnalysisMode::FullContext`]). A reply
//! that is not the expected JSON is recorded as a warning, never fatal.
//!
//! [`AnalysisMode::FullContext`]: crate::config::AnalysisMode::FullContext

use crate::config::ReportConfig;
use crate::document;
use crate::error::{PipelineWarning, ReportError};
use crate::output::{PipelineOutcome, PipelineStats, Stage};
use crate::pipeline::{compose, extract, input, insights};
use crate::pipeline::llm::{GeminiModel, GenerativeModel, StageRun};
use crate::progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
use std::time::Instant;
use tracing::info;

/// Analyse a document and write its Markdown and PDF reports.
///
/// Reads `GEMINI_API_KEY` and builds the Gemini model from
/// `config.model_name`.
///
/// # Errors
/// Any [`ReportError`]. Configuration problems are reported before a file is
/// touched. A model failure aborts at the failing stage before any report is
/// written; in PDF mode the image directory has already been refilled with
/// the rasterised pages by then.
pub async fn analyse_and_report(config: &ReportConfig) -> Result<PipelineOutcome, ReportError> {
    config.validate()?;
    let model = GeminiModel::connect(config)?;
    run(config, &model, &NoopProgressCallback).await
}

/// [`analyse_and_report`] with progress events.
pub async fn analyse_and_report_with_progress(
    config: &ReportConfig,
    progress: ProgressCallback,
) -> Result<PipelineOutcome, ReportError> {
    config.validate()?;
    let model = GeminiModel::connect(config)?;
    run(config, &model, progress.as_ref()).await
}

/// Run the pipeline against a caller-supplied model.
///
/// The configuration is validated first, so an unsupported model name fails
/// without `model` ever being called.
pub async fn analyse_with_model(
    config: &ReportConfig,
    model: &dyn GenerativeModel,
) -> Result<PipelineOutcome, ReportError> {
    analyse_with_model_and_progress(config, model, &NoopProgressCallback).await
}

/// [`analyse_with_model`] with progress events.
///
/// Events arrive in stage order on the calling task.
pub async fn analyse_with_model_and_progress(
    config: &ReportConfig,
    model: &dyn GenerativeModel,
    progress: &dyn PipelineProgressCallback,
) -> Result<PipelineOutcome, ReportError> {
    config.validate()?;
    run(config, model, progress).await
}

/// Blocking wrapper around [`analyse_and_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyse_and_report_sync(config: &ReportConfig) -> Result<PipelineOutcome, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyse_and_report(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Gathers warnings and token counts as stages finish.
struct RunLog<'a> {
    progress: &'a dyn PipelineProgressCallback,
    warnings: Vec<PipelineWarning>,
    stats: PipelineStats,
}

impl<'a> RunLog<'a> {
    fn warn(&mut self, warning: PipelineWarning) {
        self.progress.on_warning(&warning);
        self.warnings.push(warning);
    }

    fn finish_stage<T>(&mut self, stage: Stage, run: &StageRun<T>, output_chars: usize) {
        self.stats.model_requests += 1;
        self.stats.total_input_tokens += run.input_tokens as u64;
        self.stats.total_output_tokens += run.output_tokens as u64;
        match stage {
            Stage::Extract => self.stats.extract_duration_ms = run.duration_ms,
            Stage::Aggregate => self.stats.aggregate_duration_ms = run.duration_ms,
            Stage::Compose => self.stats.compose_duration_ms = run.duration_ms,
            Stage::Render => {}
        }
        if let Some(w) = run.warning.clone() {
            self.warn(w);
        }
        self.progress.on_stage_complete(stage, output_chars);
    }
}

async fn run(
    config: &ReportConfig,
    model: &dyn GenerativeModel,
    progress: &dyn PipelineProgressCallback,
) -> Result<PipelineOutcome, ReportError> {
    let total_start = Instant::now();
    info!(
        "Starting {} analysis with {}",
        config.analysis_mode,
        model.model_name()
    );

    let mut log = RunLog {
        progress,
        warnings: Vec::new(),
        stats: PipelineStats::default(),
    };

    // ── Step 1: Page images ──────────────────────────────────────────────
    let ingest_start = Instant::now();
    let resolved = input::resolve_pages(
        config.from_pdf_path.as_deref(),
        &config.input_images_dir,
        config.dpi,
        config.raster_workers,
    )
    .await?;
    log.stats.ingest_duration_ms = ingest_start.elapsed().as_millis() as u64;
    log.stats.pages = resolved.pages.len();
    for w in resolved.warnings {
        log.warn(w);
    }
    info!("Analysing {} page image(s)", resolved.pages.len());
    progress.on_pipeline_start(resolved.pages.len());

    // ── Step 2: Extraction ───────────────────────────────────────────────
    progress.on_stage_start(Stage::Extract);
    let extraction = extract::extract_content(&resolved.pages, model).await?;
    log.finish_stage(Stage::Extract, &extraction, extraction.output.raw.len());
    let extraction = extraction.output;

    // ── Step 3: Insights ─────────────────────────────────────────────────
    progress.on_stage_start(Stage::Aggregate);
    let insights = insights::aggregate_insights(extraction.text(), model).await?;
    log.finish_stage(Stage::Aggregate, &insights, insights.output.raw.len());
    let insights = insights.output;

    // ── Step 4: Report ───────────────────────────────────────────────────
    progress.on_stage_start(Stage::Compose);
    let report = compose::compose_report(
        config.analysis_mode,
        extraction.text(),
        insights.text(),
        model,
    )
    .await?;
    log.finish_stage(Stage::Compose, &report, report.output.len());
    let markdown = report.output;

    let report_path = config.report_path();
    compose::save_report(&report_path, &markdown)?;

    // ── Step 5: PDF ──────────────────────────────────────────────────────
    progress.on_stage_start(Stage::Render);
    let render_start = Instant::now();
    let rendered = {
        let report_path = report_path.clone();
        let image_dir = config.input_images_dir.clone();
        tokio::task::spawn_blocking(move || document::render_report(&report_path, &image_dir))
            .await
            .map_err(|e| ReportError::Internal(format!("Render task panicked: {}", e)))??
    };
    log.stats.render_duration_ms = render_start.elapsed().as_millis() as u64;
    log.stats.attached_images = rendered.attached.len();
    log.stats.missing_images = rendered.warnings.len();
    for w in rendered.warnings {
        log.warn(w);
    }
    progress.on_stage_complete(Stage::Render, markdown.len());

    log.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Analysis complete: {} request(s), {} warning(s), {}ms total",
        log.stats.model_requests,
        log.warnings.len(),
        log.stats.total_duration_ms
    );
    progress.on_pipeline_complete(&log.stats);

    Ok(PipelineOutcome {
        report_path,
        pdf_path: rendered.pdf_path,
        markdown,
        extraction,
        insights,
        warnings: log.warnings,
        stats: log.stats,
    })
}
