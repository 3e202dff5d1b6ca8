//! Stage 1: content extraction.
//!
//! All page images go to the model in a single request, followed by one
//! instruction asking for a JSON list with one record per image. Sending
//! the whole document at once lets the model relate a chart on page 4 to
//! the table on page 2 that it summarises.

use crate::error::ReportError;
use crate::output::{PageRecord, Stage, StageOutput};
use crate::pipeline::encode::encode_page;
use crate::pipeline::input::PageImage;
use crate::pipeline::llm::{timed_generate, GenerativeModel, ModelRequest, StageRun};
use crate::pipeline::parse::decode_stage_output;
use crate::prompts::extract_content_prompt;
use edgequake_llm::ImageData;
use tracing::info;

/// Run content extraction over `pages`, in order.
pub async fn extract_content(
    pages: &[PageImage],
    model: &dyn GenerativeModel,
) -> Result<StageRun<StageOutput<Vec<PageRecord>>>, ReportError> {
    info!("extracting content from {} page image(s)...", pages.len());

    let images = encode_pages(pages).await?;
    let names: Vec<&str> = pages.iter().map(|p| p.name.as_str()).collect();

    let request = ModelRequest {
        stage: Stage::Extract,
        prompt: extract_content_prompt(&names),
        images,
    };
    let (reply, duration_ms) = timed_generate(model, request).await?;

    let (output, warning) = decode_stage_output::<Vec<PageRecord>>(Stage::Extract, reply.text);
    if let Some(n) = output.parsed_len() {
        info!("extraction returned {} page record(s)", n);
    }

    Ok(StageRun {
        output,
        warning,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        duration_ms,
    })
}

/// Encode every page on the blocking pool; decoding 300 DPI scans is slow.
async fn encode_pages(pages: &[PageImage]) -> Result<Vec<ImageData>, ReportError> {
    let pages = pages.to_vec();
    tokio::task::spawn_blocking(move || pages.iter().map(encode_page).collect())
        .await
        .map_err(|e| ReportError::Internal(format!("Encode task panicked: {}", e)))?
}
