//! Stage 2: insight aggregation.
//!
//! A text-only request over the extraction reply, verbatim. The reply is
//! expected to be a JSON list of `{title, content, sources}` sections but is
//! forwarded raw to the compose stage whatever its shape.

use crate::error::ReportError;
use crate::output::{InsightSection, Stage, StageOutput};
use crate::pipeline::llm::{timed_generate, GenerativeModel, ModelRequest, StageRun};
use crate::pipeline::parse::decode_stage_output;
use crate::prompts::key_insights_prompt;
use tracing::info;

/// Turn the raw extraction text into insight sections.
pub async fn aggregate_insights(
    extraction: &str,
    model: &dyn GenerativeModel,
) -> Result<StageRun<StageOutput<Vec<InsightSection>>>, ReportError> {
    info!("identifying key insights...");

    let request = ModelRequest {
        stage: Stage::Aggregate,
        prompt: key_insights_prompt(extraction),
        images: Vec::new(),
    };
    let (reply, duration_ms) = timed_generate(model, request).await?;

    let (output, warning) =
        decode_stage_output::<Vec<InsightSection>>(Stage::Aggregate, reply.text);
    if let Some(n) = output.parsed_len() {
        info!("aggregated {} insight section(s)", n);
    }

    Ok(StageRun {
        output,
        warning,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        duration_ms,
    })
}
