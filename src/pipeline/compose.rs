//! Stage 3: report composition and saving.

use crate::config::AnalysisMode;
use crate::error::ReportError;
use crate::output::Stage;
use crate::pipeline::llm::{timed_generate, GenerativeModel, ModelRequest, StageRun};
use crate::pipeline::postprocess::clean_report;
use crate::prompts::generate_report_prompt;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Ask the model for the Markdown report and clean it up.
///
/// `extraction` is only sent in [`AnalysisMode::FullContext`].
pub async fn compose_report(
    mode: AnalysisMode,
    extraction: &str,
    insights: &str,
    model: &dyn GenerativeModel,
) -> Result<StageRun<String>, ReportError> {
    info!("generating {} report...", mode);

    let request = ModelRequest {
        stage: Stage::Compose,
        prompt: generate_report_prompt(mode, extraction, insights),
        images: Vec::new(),
    };
    let (reply, duration_ms) = timed_generate(model, request).await?;
    let markdown = clean_report(&reply.text);

    Ok(StageRun {
        output: markdown,
        warning: None,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        duration_ms,
    })
}

/// Write the report atomically: a temp file in the same directory, then a
/// rename over the target. Creates the parent directory if needed.
pub fn save_report(path: &Path, markdown: &str) -> Result<(), ReportError> {
    let write_err = |source| ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(markdown.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("wrote {} bytes to {}", markdown.len(), path.display());
    info!("report saved to {}", path.display());
    Ok(())
}
