//! Defensive decoding of stage replies.
//!
//! The extraction and insight prompts ask for a JSON list, but models wrap
//! it in fences, prepend a sentence, or return something else entirely.
//! Decoding never fails the run: the raw text is always kept and passed to
//! the next stage, and a [`PipelineWarning::MalformedStageOutput`] is
//! returned when no attempt produced the expected shape.

use crate::error::PipelineWarning;
use crate::output::{Stage, StageOutput};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Decode `raw` as `T`, keeping the raw text either way.
pub fn decode_stage_output<T: DeserializeOwned>(
    stage: Stage,
    raw: String,
) -> (StageOutput<T>, Option<PipelineWarning>) {
    match parse_as::<T>(&raw) {
        Ok(parsed) => (
            StageOutput {
                raw,
                parsed: Some(parsed),
            },
            None,
        ),
        Err(detail) => {
            warn!("{} reply is not the expected JSON: {}", stage, detail);
            (
                StageOutput { raw, parsed: None },
                Some(PipelineWarning::MalformedStageOutput { stage, detail }),
            )
        }
    }
}

/// Try, in order: the whole text, a fenced block, the first `[` or `{` up
/// to its last matching closer.
pub fn parse_as<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty reply".to_string());
    }

    let first_err = match serde_json::from_str::<T>(trimmed) {
        Ok(val) => return Ok(val),
        Err(e) => e.to_string(),
    };

    if let Some(block) = extract_fenced_block(trimmed) {
        if let Ok(val) = serde_json::from_str::<T>(block) {
            return Ok(val);
        }
    }

    let start = match (trimmed.find('['), trimmed.find('{')) {
        (Some(a), Some(o)) => Some(a.min(o)),
        (a, o) => a.or(o),
    };
    if let Some(idx) = start {
        let candidate = &trimmed[idx..];
        let close = if candidate.starts_with('[') { ']' } else { '}' };
        if let Some(end) = candidate.rfind(close) {
            if let Ok(val) = serde_json::from_str::<T>(&candidate[..=end]) {
                return Ok(val);
            }
        }
    }

    Err(first_err)
}

/// Body of the first ```` ``` ```` fence, with an optional `json` tag.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let tag = after[..body_start].trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}
