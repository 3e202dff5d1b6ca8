//! Offline pipeline tests.
//!
//! A recording fake stands in for Gemini: it answers each stage with canned
//! text and keeps every request so the wiring between stages (request count,
//! images, prompt contents) can be asserted without network access.

use async_trait::async_trait;
use finreport::pipeline::{extract, input};
use finreport::{
    analyse_with_model, analyse_with_model_and_progress, AnalysisMode, ErrorKind,
    GenerativeModel, ModelReply, ModelRequest, PipelineProgressCallback, PipelineStats,
    PipelineWarning, ReportConfig, ReportError, Stage,
};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

const EXTRACTION: &str = r#"[
  {"image_name": "page_1.png", "text_content": "Net profit EUR 690m", "tables": [], "graphs": [], "metadata": "Q3 2024"},
  {"image_name": "page_2.png", "text_content": "CET1 ratio 13.7%", "tables": ["| Ratio | Q3 |\n|---|---|\n| CET1 | 13.7% |"], "graphs": [], "metadata": ""}
]"#;

const INSIGHTS: &str = r#"```json
[{"title": "Capital strength", "content": "CET1 stayed well above target.", "sources": ["page_2.png"]}]
```"#;

const REPORT: &str = "```markdown\n# Financial Report for Q3 2024\n\n## Executive Summary\nNet profit reached EUR 690m (page_1.png).\n\n| Metric | Q3 2024 |\n|---|---|\n| CET1 | 13.7% |\n\n## Images to Attach\n- page_1.png\n- page_2.png\n```";

struct RecordingModel {
    name: String,
    fail_at: Option<Stage>,
    extraction: String,
    requests: Mutex<Vec<ModelRequest>>,
}

impl RecordingModel {
    fn new() -> Self {
        Self {
            name: "gemini-1.5-flash".to_string(),
            fail_at: None,
            extraction: EXTRACTION.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for RecordingModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ReportError> {
        let stage = request.stage;
        self.requests.lock().unwrap().push(request);
        if self.fail_at == Some(stage) {
            return Err(ReportError::ModelCall {
                stage,
                message: "429 quota exceeded".into(),
            });
        }
        let text = match stage {
            Stage::Extract => self.extraction.as_str(),
            Stage::Aggregate => INSIGHTS,
            Stage::Compose | Stage::Render => REPORT,
        };
        Ok(ModelReply {
            text: text.to_string(),
            input_tokens: 100,
            output_tokens: 10,
        })
    }
}

/// Library logs in test output; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_pages(dir: &Path, count: usize) {
    std::fs::create_dir_all(dir).unwrap();
    for n in 1..=count {
        RgbImage::from_pixel(60, 80, Rgb([250, 250, 250]))
            .save(dir.join(format!("page_{n}.png")))
            .unwrap();
    }
}

fn config_in(root: &Path, mode: AnalysisMode) -> ReportConfig {
    ReportConfig::builder()
        .input_images_dir(root.join("input_images"))
        .output_dir(root.join("reports"))
        .model_name("gemini-1.5-flash")
        .analysis_mode(mode)
        .build()
        .unwrap()
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extractor_sends_every_image_in_one_request() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("input_images");
    write_pages(&images, 3);

    let pages = input::list_image_dir(&images).await.unwrap();
    let model = RecordingModel::new();
    let run = extract::extract_content(&pages, &model).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].stage, Stage::Extract);
    assert_eq!(requests[0].images.len(), 3);
    assert!(requests[0].images.iter().all(|i| i.mime_type == "image/png"));
    for page in &pages {
        assert!(requests[0].prompt.contains(&page.name));
    }
    assert_eq!(run.output.parsed_len(), Some(2));
    assert!(run.warning.is_none());
}

// ── Full runs ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn smart_run_makes_three_requests_and_writes_both_reports() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_pages(&dir.path().join("input_images"), 2);
    let config = config_in(dir.path(), AnalysisMode::Smart);
    let model = RecordingModel::new();

    let outcome = analyse_with_model(&config, &model).await.unwrap();

    let requests = model.requests();
    let stages: Vec<Stage> = requests.iter().map(|r| r.stage).collect();
    assert_eq!(stages, [Stage::Extract, Stage::Aggregate, Stage::Compose]);
    assert!(requests[1].images.is_empty() && requests[2].images.is_empty());

    // raw text flows between stages verbatim
    assert!(requests[1].prompt.contains(EXTRACTION));
    assert!(requests[2].prompt.contains(INSIGHTS));
    assert!(!requests[2].prompt.contains(EXTRACTION));

    let reports = dir.path().join("reports");
    assert_eq!(outcome.report_path, reports.join("report_smart_gemini-1.5-flash.md"));
    assert_eq!(outcome.pdf_path, reports.join("report_smart_gemini-1.5-flash.pdf"));
    assert!(outcome.pdf_path.is_file());

    let md = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert_eq!(md, outcome.markdown);
    assert!(md.starts_with("# Financial Report for Q3 2024"));
    assert!(md.ends_with('\n'));

    let mut entries: Vec<PathBuf> = std::fs::read_dir(&reports)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    assert_eq!(entries.len(), 2, "only the .md and the .pdf: {entries:?}");

    assert_eq!(outcome.stats.model_requests, 3);
    assert_eq!(outcome.stats.pages, 2);
    assert_eq!(outcome.stats.total_input_tokens, 300);
    assert_eq!(outcome.stats.attached_images, 2);
    assert_eq!(outcome.stats.missing_images, 0);
    assert!(outcome.warnings.is_empty());

    let doc = lopdf::Document::load(&outcome.pdf_path).unwrap();
    assert!(doc.get_pages().len() >= 3);
}

#[tokio::test]
async fn full_context_report_prompt_carries_both_texts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_pages(&dir.path().join("input_images"), 1);
    let config = config_in(dir.path(), AnalysisMode::FullContext);
    let model = RecordingModel::new();

    let outcome = analyse_with_model(&config, &model).await.unwrap();

    let compose = &model.requests()[2];
    assert!(compose.prompt.contains(EXTRACTION));
    assert!(compose.prompt.contains(INSIGHTS));
    assert!(outcome
        .report_path
        .ends_with("report_full_context_gemini-1.5-flash.md"));
    // page_2.png is cited but only page_1.png exists
    assert_eq!(outcome.stats.attached_images, 1);
    assert!(outcome.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::MissingImage { name, .. } if name == "page_2.png"
    )));
}

#[tokio::test]
async fn malformed_extraction_is_a_warning_not_a_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_pages(&dir.path().join("input_images"), 2);
    let config = config_in(dir.path(), AnalysisMode::Smart);
    let model = RecordingModel {
        extraction: "Page 1 shows net profit of EUR 690m.".to_string(),
        ..RecordingModel::new()
    };

    let outcome = analyse_with_model(&config, &model).await.unwrap();

    assert!(outcome.extraction.parsed.is_none());
    assert_eq!(outcome.extraction.raw, "Page 1 shows net profit of EUR 690m.");
    assert!(model.requests()[1].prompt.contains("Page 1 shows net profit"));
    assert!(matches!(
        outcome.warnings.first(),
        Some(PipelineWarning::MalformedStageOutput { stage: Stage::Extract, .. })
    ));
    assert_eq!(outcome.insights.parsed_len(), Some(1));
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_model_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    write_pages(&dir.path().join("input_images"), 1);
    let config = ReportConfig {
        model_name: "gpt-4o".into(),
        ..config_in(dir.path(), AnalysisMode::Smart)
    };
    let model = RecordingModel::new();

    let err = analyse_with_model(&config, &model).await.unwrap_err();

    assert!(matches!(err, ReportError::UnsupportedModel { .. }));
    assert!(model.requests().is_empty());
    assert!(!dir.path().join("reports").exists());
}

#[tokio::test]
async fn empty_image_dir_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("input_images")).unwrap();
    let config = config_in(dir.path(), AnalysisMode::FullContext);
    let model = RecordingModel::new();

    let err = analyse_with_model(&config, &model).await.unwrap_err();

    assert!(matches!(err, ReportError::NoImages { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn model_failure_stops_the_run_without_writing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_pages(&dir.path().join("input_images"), 2);
    let config = config_in(dir.path(), AnalysisMode::Smart);
    let model = RecordingModel {
        fail_at: Some(Stage::Aggregate),
        ..RecordingModel::new()
    };

    let err = analyse_with_model(&config, &model).await.unwrap_err();

    assert!(matches!(err, ReportError::ModelCall { stage: Stage::Aggregate, .. }));
    assert_eq!(model.requests().len(), 2, "no retry, no compose");
    assert!(!config.report_path().exists());
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl PipelineProgressCallback for EventLog {
    fn on_pipeline_start(&self, pages: usize) {
        self.0.lock().unwrap().push(format!("start:{pages}"));
    }
    fn on_stage_start(&self, stage: Stage) {
        self.0.lock().unwrap().push(format!("begin:{stage:?}"));
    }
    fn on_stage_complete(&self, stage: Stage, _output_chars: usize) {
        self.0.lock().unwrap().push(format!("end:{stage:?}"));
    }
    fn on_warning(&self, _warning: &PipelineWarning) {
        self.0.lock().unwrap().push("warning".to_string());
    }
    fn on_pipeline_complete(&self, stats: &PipelineStats) {
        self.0
            .lock()
            .unwrap()
            .push(format!("done:{}", stats.model_requests));
    }
}

#[tokio::test]
async fn progress_events_follow_stage_order() {
    let dir = tempfile::tempdir().unwrap();
    write_pages(&dir.path().join("input_images"), 2);
    let config = config_in(dir.path(), AnalysisMode::Smart);
    let model = RecordingModel::new();
    let log = EventLog::default();

    analyse_with_model_and_progress(&config, &model, &log)
        .await
        .unwrap();

    let events = log.0.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "start:2",
            "begin:Extract",
            "end:Extract",
            "begin:Aggregate",
            "end:Aggregate",
            "begin:Compose",
            "end:Compose",
            "begin:Render",
            "end:Render",
            "done:3",
        ]
    );
}
