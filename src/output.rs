//! Values produced by a run: per-stage model output, typed records decoded
//! from it, and the final outcome returned to callers.

use crate::error::PipelineWarning;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Page images → per-page structured records.
    Extract,
    /// Records → titled insight sections.
    Aggregate,
    /// Insights (and maybe records) → Markdown report.
    Compose,
    /// Markdown report → merged PDF.
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "content extraction",
            Stage::Aggregate => "insight aggregation",
            Stage::Compose => "report generation",
            Stage::Render => "PDF rendering",
        })
    }
}

/// One page's structured content as described by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRecord {
    pub image_name: String,
    /// Verbatim page text.
    pub text_content: String,
    /// Tables in Markdown pipe format.
    pub tables: Vec<String>,
    /// One description per chart or graph.
    pub graphs: Vec<String>,
    pub metadata: String,
}

/// A titled analysis unit citing the pages it was drawn from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSection {
    pub title: String,
    pub content: String,
    /// Page image filenames, e.g. `page_3.png`.
    pub sources: Vec<String>,
}

/// A model reply as passed between stages.
///
/// `raw` always travels downstream verbatim. `parsed` is what a defensive
/// JSON decode made of it, or `None` when the reply was not the expected
/// shape (in which case a [`PipelineWarning::MalformedStageOutput`] was
/// recorded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput<T> {
    pub raw: String,
    pub parsed: Option<T>,
}

impl<T> StageOutput<T> {
    /// Raw reply text, exactly as the model returned it.
    pub fn text(&self) -> &str {
        &self.raw
    }
}

impl<I> StageOutput<Vec<I>> {
    /// Number of decoded items, when decoding succeeded.
    pub fn parsed_len(&self) -> Option<usize> {
        self.parsed.as_ref().map(Vec::len)
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Page images sent to the extractor.
    pub pages: usize,
    /// Model requests issued (3 for a successful run).
    pub model_requests: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub ingest_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub aggregate_duration_ms: u64,
    pub compose_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Referenced images that got a page in the final PDF.
    pub attached_images: usize,
    /// Referenced images that were not found on disk.
    pub missing_images: usize,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// The persisted Markdown report.
    pub report_path: PathBuf,
    /// The merged PDF (text pages, then one page per attached image).
    pub pdf_path: PathBuf,
    /// Report Markdown as written to `report_path`.
    pub markdown: String,
    pub extraction: StageOutput<Vec<PageRecord>>,
    pub insights: StageOutput<Vec<InsightSection>>,
    /// Non-fatal problems, in the order they were recorded.
    pub warnings: Vec<PipelineWarning>,
    pub stats: PipelineStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_record_tolerates_missing_fields() {
        let rec: PageRecord =
            serde_json::from_str(r#"{"image_name":"page_1.png","tables":["| a |"]}"#).unwrap();
        assert_eq!(rec.image_name, "page_1.png");
        assert_eq!(rec.tables.len(), 1);
        assert!(rec.graphs.is_empty());
        assert!(rec.text_content.is_empty());
    }

    #[test]
    fn stage_display_is_human_readable() {
        assert_eq!(Stage::Extract.to_string(), "content extraction");
        assert_eq!(Stage::Compose.to_string(), "report generation");
    }

    #[test]
    fn parsed_len_counts_items() {
        let out = StageOutput {
            raw: "[]".to_string(),
            parsed: Some(vec![InsightSection::default(), InsightSection::default()]),
        };
        assert_eq!(out.parsed_len(), Some(2));
        assert_eq!(out.text(), "[]");

        let failed: StageOutput<Vec<InsightSection>> = StageOutput {
            raw: "not json".to_string(),
            parsed: None,
        };
        assert_eq!(failed.parsed_len(), None);
    }
}
