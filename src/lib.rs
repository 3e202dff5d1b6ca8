//! # finreport
//!
//! Turn the pages of a financial document into an analytical report, using a
//! multimodal Gemini model.
//!
//! ## Why this crate?
//!
//! Earnings releases and annual reports carry most of their meaning in
//! tables and charts that text extraction flattens or drops. Here each page
//! is kept as an image and read by a vision model, which first transcribes
//! every page into structured records, then distils cross-page insights,
//! then writes a Markdown report. The report is rendered to PDF with the
//! page images it cites attached at the end.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF or image directory
//!  │
//!  ├─ 1. Ingest     rasterise via pdfium into page_<n>.png, or list the dir
//!  ├─ 2. Extract    one request: every page image → JSON page records
//!  ├─ 3. Aggregate  one request: records → JSON insight sections
//!  ├─ 4. Compose    one request: insights (+ records) → Markdown report
//!  ├─ 5. Save       report_<pdf>_<mode>_<model>.md
//!  └─ 6. Render     Markdown → text pages + cited images → merged .pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use finreport::{analyse_and_report, AnalysisMode, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // needs GEMINI_API_KEY
//!     let config = ReportConfig::builder()
//!         .from_pdf_path("source_docs/Q3_2024.pdf")
//!         .analysis_mode(AnalysisMode::Smart)
//!         .build()?;
//!     let outcome = analyse_and_report(&config).await?;
//!     println!("{}", outcome.pdf_path.display());
//!     for w in &outcome.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `finreport` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! finreport = { version = "0.1", default-features = false }
//! ```
//!
//! ## Analysis Modes
//!
//! | Mode | Report prompt sees | Use when |
//! |------|--------------------|----------|
//! | `full_context` | page records + insights | exact figures matter |
//! | `smart` | insights only | long documents, smaller prompts |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyse;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyse::{
    analyse_and_report, analyse_and_report_sync, analyse_and_report_with_progress,
    analyse_with_model, analyse_with_model_and_progress,
};
pub use config::{AnalysisMode, ReportConfig, ReportConfigBuilder};
pub use document::{render_report, RenderOutcome};
pub use error::{ErrorKind, PipelineWarning, ReportError};
pub use output::{InsightSection, PageRecord, PipelineOutcome, PipelineStats, Stage, StageOutput};
pub use pipeline::llm::{GeminiModel, GenerativeModel, ModelReply, ModelRequest};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
