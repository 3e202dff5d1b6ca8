//! Report rendering: Markdown report → merged PDF.
//!
//! ```text
//! report.md ──▶ markdown ──▶ typeset ──▶ text PDF ──┐
//!     │                                             ├──▶ merge ──▶ report.pdf
//!     └──▶ page_<n>.png references ──▶ images PDF ──┘
//! ```
//!
//! The images PDF holds one captioned page per page image the report
//! mentions. Mentions are found textually (`page_<n>.png` anywhere in the
//! Markdown), not by reading an "Images to Attach" section, so a reference
//! inside a sentence counts as much as one in a list. Names that do not
//! exist in the image directory are skipped with a warning.
//!
//! Both intermediate PDFs live in a temporary directory that is removed
//! when rendering returns, whether it succeeded or not.

pub mod markdown;
pub mod pdf;
pub mod typeset;

use crate::error::{PipelineWarning, ReportError};
use crate::pipeline::input::{page_number, PageImage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static RE_PAGE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"page_\d+\.png").unwrap());

/// What the renderer produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub pdf_path: PathBuf,
    /// Image names that got a page, in page order.
    pub attached: Vec<String>,
    pub text_pages: usize,
    pub warnings: Vec<PipelineWarning>,
}

/// Distinct `page_<n>.png` names mentioned in `markdown`, by page number.
pub fn referenced_images(markdown: &str) -> Vec<String> {
    let unique: BTreeSet<&str> = RE_PAGE_REF.find_iter(markdown).map(|m| m.as_str()).collect();
    let mut names: Vec<String> = unique.into_iter().map(str::to_string).collect();
    names.sort_by_key(|n| page_number(n));
    names
}

/// The PDF path for a report: same location, `.pdf` extension.
pub fn pdf_path_for(report_path: &Path) -> PathBuf {
    report_path.with_extension("pdf")
}

/// Render the Markdown report at `report_path` to a PDF next to it,
/// attaching referenced page images found in `image_dir`.
pub fn render_report(report_path: &Path, image_dir: &Path) -> Result<RenderOutcome, ReportError> {
    let markdown = std::fs::read_to_string(report_path)
        .map_err(|e| ReportError::render("reading the Markdown report", e))?;
    render_markdown(&markdown, image_dir, &pdf_path_for(report_path))
}

/// Render `markdown` to `pdf_path`.
pub fn render_markdown(
    markdown: &str,
    image_dir: &Path,
    pdf_path: &Path,
) -> Result<RenderOutcome, ReportError> {
    let workspace = tempfile::Builder::new()
        .prefix("finreport-render-")
        .tempdir()
        .map_err(|e| ReportError::render("creating a temporary directory", e))?;

    let blocks = markdown::parse_blocks(markdown);
    let text_pdf = workspace.path().join("text.pdf");
    let text_pages = pdf::write_text_pdf(typeset::typeset(&blocks), &text_pdf)?;
    info!("typeset report: {} page(s)", text_pages);

    let mut warnings = Vec::new();
    let mut present = Vec::new();
    for name in referenced_images(markdown) {
        let path = image_dir.join(&name);
        if path.is_file() {
            present.push(PageImage { name, path });
        } else {
            warn!("Image not found: {}", path.display());
            warnings.push(PipelineWarning::MissingImage { name, path });
        }
    }

    if let Some(parent) = pdf_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::OutputWriteFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if present.is_empty() {
        pdf::merge_pdfs(&[&text_pdf], pdf_path)?;
    } else {
        let images_pdf = workspace.path().join("images.pdf");
        pdf::write_images_pdf(&present, &images_pdf)?;
        pdf::merge_pdfs(&[&text_pdf, &images_pdf], pdf_path)?;
    }

    let attached: Vec<String> = present.into_iter().map(|p| p.name).collect();
    info!(
        "PDF report saved to {} ({} image page(s) attached, {} missing)",
        pdf_path.display(),
        attached.len(),
        warnings.len()
    );

    Ok(RenderOutcome {
        pdf_path: pdf_path.to_path_buf(),
        attached,
        text_pages,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn references_are_distinct_and_numeric() {
        let md = "Revenue (page_10.png), margins (page_2.png).\n\n## Images to Attach\n- page_2.png\n- page_10.png\n- page_1.png";
        assert_eq!(referenced_images(md), ["page_1.png", "page_2.png", "page_10.png"]);
    }

    #[test]
    fn only_exact_pattern_counts() {
        assert!(referenced_images("chart.png, page_.png, page_a.png, Page_1.png").is_empty());
    }

    #[test]
    fn pdf_path_swaps_extension() {
        assert_eq!(
            pdf_path_for(Path::new("out/report_smart_gemini-1.5-pro.md")),
            PathBuf::from("out/report_smart_gemini-1.5-pro.pdf")
        );
    }

    #[test]
    fn missing_images_warn_and_present_ones_attach() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("input_images");
        std::fs::create_dir(&images).unwrap();
        RgbImage::from_pixel(40, 52, Rgb([240, 240, 240]))
            .save(images.join("page_1.png"))
            .unwrap();

        let report = dir.path().join("report_smart_gemini-pro.md");
        std::fs::write(
            &report,
            "# 📈 Financial Report\n\nSee page_1.png and page_3.png.\n\n## Images to Attach\n- page_1.png\n- page_3.png\n",
        )
        .unwrap();

        let outcome = render_report(&report, &images).unwrap();
        assert_eq!(outcome.attached, ["page_1.png"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            PipelineWarning::MissingImage { name, .. } if name == "page_3.png"
        ));

        let doc = lopdf::Document::load(&outcome.pdf_path).unwrap();
        assert_eq!(doc.get_pages().len(), outcome.text_pages + 1);
    }

    #[test]
    fn report_without_references_is_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("report.pdf");
        let outcome = render_markdown("# Summary\n\nNo figures.", dir.path(), &pdf).unwrap();
        assert!(outcome.attached.is_empty());
        assert!(outcome.warnings.is_empty());
        assert_eq!(lopdf::Document::load(&pdf).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn unreadable_report_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_report(&dir.path().join("absent.md"), dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::RenderFailed { .. }));
    }
}
