//! Error types for the finreport library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`ReportError`] is **fatal**: the run cannot produce a report (unsupported
//!   model, no page images, a model call failed, the PDF could not be written).
//!   Returned as `Err(ReportError)` from the `analyse*` entry points.
//!
//! * [`PipelineWarning`] is **non-fatal**: something was off but the run can
//!   still finish (a stage reply that is not valid JSON, an image the report
//!   mentions but the directory does not hold). Collected in
//!   [`crate::output::PipelineOutcome::warnings`].
//!
//! There is no retry layer anywhere: every model call and every rendering
//! step either succeeds or aborts the run.

use crate::output::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`ReportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unsupported or missing model name, missing API key, bad option.
    Configuration,
    /// The generation endpoint could not be constructed.
    ModelInitialization,
    /// The source document or the page images are unusable.
    Input,
    /// A model request failed.
    Model,
    /// Markdown layout, PDF writing or merging failed.
    Render,
    /// The report could not be written to disk.
    Output,
    /// Anything else.
    Internal,
}

/// All fatal errors returned by the finreport library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The model identifier does not name a supported model family.
    #[error("Unsupported model '{model}'. Only Google's Gemini models are supported (the name must contain \"{family}\").")]
    UnsupportedModel { model: String, family: &'static str },

    /// The API key variable is unset or empty.
    #[error("Environment variable {var} is not set.\nExport your Gemini API key: export {var}=...")]
    MissingApiKey { var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The provider could not be created for this model.
    #[error("Failed to initialize Gemini model '{model}'. Ensure the model name is valid and the API key is correctly set.\nCause: {detail}")]
    ModelInitialization { model: String, detail: String },

    /// A generation request failed. Not retried.
    #[error("Model call failed during {stage}: {message}")]
    ModelCall { stage: Stage, message: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not open the document.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rasterising a PDF needs the pdfium shared library. You can:\n\
  • Install libpdfium system-wide (e.g. from bblanchon/pdfium-binaries).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Skip rasterisation: drop --from-pdf-path and point --input-images-dir at page images.\n"
    )]
    PdfiumBindingFailed(String),

    /// pdfium failed on a specific page, or the PNG could not be written.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The page-image directory could not be created, listed or cleared.
    #[error("Cannot use image directory '{path}': {source}")]
    ImageDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file in the image directory is not a decodable image.
    #[error("Cannot decode page image '{path}': {detail}")]
    UnreadableImage { path: PathBuf, detail: String },

    /// No page images to analyse.
    #[error("No images found in the specified directory: {}", .dir.display())]
    NoImages { dir: PathBuf },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Markdown layout, PDF writing or merging failed.
    #[error("Report rendering failed while {step}: {detail}")]
    RenderFailed { step: &'static str, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Which family of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::UnsupportedModel { .. }
            | ReportError::MissingApiKey { .. }
            | ReportError::InvalidConfig(_) => ErrorKind::Configuration,
            ReportError::ModelInitialization { .. } => ErrorKind::ModelInitialization,
            ReportError::ModelCall { .. } => ErrorKind::Model,
            ReportError::FileNotFound { .. }
            | ReportError::PermissionDenied { .. }
            | ReportError::NotAPdf { .. }
            | ReportError::CorruptPdf { .. }
            | ReportError::PdfiumBindingFailed(_)
            | ReportError::RasterisationFailed { .. }
            | ReportError::ImageDirUnreadable { .. }
            | ReportError::UnreadableImage { .. }
            | ReportError::NoImages { .. } => ErrorKind::Input,
            ReportError::RenderFailed { .. } => ErrorKind::Render,
            ReportError::OutputWriteFailed { .. } => ErrorKind::Output,
            ReportError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn render(step: &'static str, detail: impl ToString) -> Self {
        ReportError::RenderFailed {
            step,
            detail: detail.to_string(),
        }
    }
}

/// A non-fatal problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// A stage reply could not be decoded as the expected JSON shape.
    /// The raw text was passed downstream unchanged.
    #[error("{stage} output is not the expected JSON ({detail}); passing raw text through")]
    MalformedStageOutput { stage: Stage, detail: String },

    /// The report references an image the directory does not contain.
    #[error("Image not found: {}", .path.display())]
    MissingImage { name: String, path: PathBuf },

    /// Existing files were deleted before rasterising into the directory.
    #[error("Cleared {removed} existing file(s) from {}", .dir.display())]
    ImageDirCleared { dir: PathBuf, removed: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_model_display() {
        let e = ReportError::UnsupportedModel {
            model: "gpt-4o".into(),
            family: "gemini",
        };
        let msg = e.to_string();
        assert!(msg.contains("gpt-4o"), "got: {msg}");
        assert!(msg.contains("Gemini"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn no_images_is_input_error() {
        let e = ReportError::NoImages {
            dir: PathBuf::from("input_images"),
        };
        assert!(e.to_string().contains("input_images"));
        assert_eq!(e.kind(), ErrorKind::Input);
    }

    #[test]
    fn model_call_names_the_stage() {
        let e = ReportError::ModelCall {
            stage: Stage::Aggregate,
            message: "503 Service Unavailable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("insight aggregation"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Model);
    }

    #[test]
    fn render_helper_builds_render_kind() {
        let e = ReportError::render("merging PDFs", "bad xref");
        assert_eq!(e.kind(), ErrorKind::Render);
        assert!(e.to_string().contains("merging PDFs"));
    }

    #[test]
    fn missing_image_warning_serialises_with_kind_tag() {
        let w = PipelineWarning::MissingImage {
            name: "page_9.png".into(),
            path: PathBuf::from("input_images/page_9.png"),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "missing_image");
        assert_eq!(json["name"], "page_9.png");
        assert!(w.to_string().contains("page_9.png"));
    }
}
