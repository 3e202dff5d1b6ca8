//! Configuration for a document-to-report run.
//!
//! Every input the pipeline needs is enumerated in [`ReportConfig`] and passed
//! by value into [`crate::analyse::analyse_and_report`]. Nothing is read from
//! process-wide state except the API key, which is fetched once when the model
//! client is built.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on the
//! documented defaults for the rest. [`ReportConfigBuilder::build`] rejects
//! unsupported model names up front, before any file is touched or any
//! request is sent.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directory page images are read from (and rasterised into).
pub const DEFAULT_INPUT_IMAGES_DIR: &str = "input_images";

/// Default model: a long-context Gemini model able to take a whole report.
pub const DEFAULT_MODEL_NAME: &str = "gemini-1.5-pro";

/// Substring every accepted model identifier must contain (case-insensitive).
pub const REQUIRED_MODEL_FAMILY: &str = "gemini";

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Rasterisation resolution for PDF pages.
pub const DEFAULT_DPI: u32 = 300;

/// Concurrent PNG encode/write tasks during rasterisation.
pub const DEFAULT_RASTER_WORKERS: usize = 4;

/// Configuration for one run.
///
/// Built via [`ReportConfig::builder()`] or [`ReportConfig::default()`].
///
/// # Example
/// ```rust
/// use finreport::{AnalysisMode, ReportConfig};
///
/// let config = ReportConfig::builder()
///     .model_name("gemini-1.5-flash-8b")
///     .from_pdf_path("source_docs/Q3_2024.pdf")
///     .analysis_mode(AnalysisMode::Smart)
///     .build()
///     .unwrap();
/// assert_eq!(config.report_file_stem(), "report_Q3_2024_smart_gemini-1.5-flash-8b");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Where page images live. Default: `input_images`.
    ///
    /// When [`from_pdf_path`](Self::from_pdf_path) is set this directory is
    /// **cleared** and refilled with `page_<n>.png` files. It is also where the
    /// renderer looks for images referenced by the report.
    pub input_images_dir: PathBuf,

    /// Gemini model identifier. Default: [`DEFAULT_MODEL_NAME`].
    pub model_name: String,

    /// Source PDF. `None` analyses whatever is already in `input_images_dir`.
    pub from_pdf_path: Option<PathBuf>,

    /// Which prior artefacts the report prompt sees. Default: full context.
    pub analysis_mode: AnalysisMode,

    /// Directory the `.md` and `.pdf` reports are written to. Default: `.`.
    pub output_dir: PathBuf,

    /// Rasterisation DPI. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Parallel PNG writers while rasterising. Default: 4.
    pub raster_workers: usize,

    /// Replaces the built-in financial-analyst system instruction.
    pub system_prompt: Option<String>,

    /// Output token cap per request. `None` leaves it to the provider.
    pub max_tokens: Option<usize>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_images_dir: PathBuf::from(DEFAULT_INPUT_IMAGES_DIR),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            from_pdf_path: None,
            analysis_mode: AnalysisMode::default(),
            output_dir: PathBuf::from("."),
            dpi: DEFAULT_DPI,
            raster_workers: DEFAULT_RASTER_WORKERS,
            system_prompt: None,
            max_tokens: None,
        }
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Fail fast on settings no request could succeed with.
    pub fn validate(&self) -> Result<(), ReportError> {
        check_model_name(&self.model_name)?;
        if self.dpi < 72 || self.dpi > 600 {
            return Err(ReportError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                self.dpi
            )));
        }
        if self.raster_workers == 0 {
            return Err(ReportError::InvalidConfig("raster_workers must be ≥ 1".into()));
        }
        Ok(())
    }

    /// File name (without extension) shared by the `.md` and `.pdf` reports.
    ///
    /// `report_<pdf stem>_<mode>_<model>` when a source PDF was given,
    /// `report_<mode>_<model>` otherwise.
    pub fn report_file_stem(&self) -> String {
        let model = self.model_name.replace(['/', '\\'], "_");
        match self.from_pdf_path.as_deref().and_then(pdf_stem) {
            Some(stem) => format!("report_{}_{}_{}", stem, self.analysis_mode, model),
            None => format!("report_{}_{}", self.analysis_mode, model),
        }
    }

    /// Full path of the Markdown report.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.md", self.report_file_stem()))
    }
}

fn pdf_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

/// Reject any model identifier outside the supported family.
pub fn check_model_name(model: &str) -> Result<(), ReportError> {
    if model.is_empty() || !model.to_lowercase().contains(REQUIRED_MODEL_FAMILY) {
        return Err(ReportError::UnsupportedModel {
            model: model.to_string(),
            family: REQUIRED_MODEL_FAMILY,
        });
    }
    Ok(())
}

/// Builder for [`ReportConfig`].
#[derive(Debug)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn input_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_images_dir = dir.into();
        self
    }

    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        self.config.model_name = model.into();
        self
    }

    pub fn from_pdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.from_pdf_path = Some(path.into());
        self
    }

    pub fn analysis_mode(mut self, mode: AnalysisMode) -> Self {
        self.config.analysis_mode = mode;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn raster_workers(mut self, n: usize) -> Self {
        self.config.raster_workers = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Analysis mode ────────────────────────────────────────────────────────

/// Selects which prior artefacts the report-generation prompt includes.
///
/// | Mode | Extraction text | Insight text |
/// |------|-----------------|--------------|
/// | `Smart` | — | ✓ |
/// | `FullContext` (default) | ✓ | ✓ |
///
/// `Smart` keeps the prompt small: only the synthesised insights go in.
/// `FullContext` also hands the model every page's raw extraction so the
/// report can quote exact figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Smart,
    #[default]
    FullContext,
}

impl AnalysisMode {
    /// Whether the raw extraction text is part of the report prompt.
    pub fn includes_extraction(self) -> bool {
        matches!(self, AnalysisMode::FullContext)
    }

    /// The identifier used on the command line and in report file names.
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::Smart => "smart",
            AnalysisMode::FullContext => "full_context",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "smart" => Ok(AnalysisMode::Smart),
            "full_context" => Ok(AnalysisMode::FullContext),
            other => Err(ReportError::InvalidConfig(format!(
                "unknown analysis mode '{other}' (expected 'smart' or 'full_context')"
            ))),
        }
    }
}
