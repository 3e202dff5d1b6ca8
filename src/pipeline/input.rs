//! Page source resolution: turn a PDF path or an image directory into an
//! ordered list of page images.
//!
//! ## Rasterisation mode is destructive
//!
//! With a source PDF, every regular file already in the image directory is
//! deleted before the pages are written. Re-running on the same document
//! always yields `page_1.png … page_N.png` and nothing else, so stale pages
//! from a longer document can never leak into the next report. Callers are
//! told through a [`PipelineWarning::ImageDirCleared`] and a `warn!` line.
//!
//! Nothing is deleted until the source has passed the `%PDF` check and
//! pdfium has bound and opened it.
//!
//! ## Directory mode keeps listing order
//!
//! Without a PDF, files are returned in the order the OS lists them. That
//! order is not numeric and not even guaranteed stable across filesystems;
//! name pages `page_<n>.png` if order matters to the report.

use crate::error::{PipelineWarning, ReportError};
use crate::pipeline::rasterize;
use image::DynamicImage;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One page image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// File name as the model is told and the report refers to it.
    pub name: String,
    pub path: PathBuf,
}

impl PageImage {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }

    /// Decode the bitmap.
    pub fn decode(&self) -> Result<DynamicImage, ReportError> {
        image::open(&self.path).map_err(|e| ReportError::UnreadableImage {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }
}

/// File name for a 1-indexed page: `page_<n>.png`.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num}.png")
}

/// `page_12.png` → 12. Anything else sorts last.
pub fn page_number(name: &str) -> usize {
    name.strip_prefix("page_")
        .and_then(|rest| rest.strip_suffix(".png"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX)
}

/// The pages to analyse plus anything worth telling the caller about.
#[derive(Debug)]
pub struct ResolvedPages {
    pub pages: Vec<PageImage>,
    pub warnings: Vec<PipelineWarning>,
}

/// Produce the ordered page images for a run.
///
/// * `source = Some(pdf)`: validate the PDF, clear `image_dir`, rasterise
///   every page at `dpi` into it.
/// * `source = None`: list the files already in `image_dir`.
///
/// # Errors
/// [`ReportError::NoImages`] when the result is empty; input errors for a
/// missing, unreadable or non-PDF source.
pub async fn resolve_pages(
    source: Option<&Path>,
    image_dir: &Path,
    dpi: u32,
    workers: usize,
) -> Result<ResolvedPages, ReportError> {
    let mut warnings = Vec::new();

    let pages = match source {
        Some(pdf) => {
            info!("source document: {}", pdf.display());
            let pdf = validate_pdf(pdf)?;
            let rasterised = rasterize::rasterize_pdf(&pdf, image_dir, dpi, workers).await?;
            let removed = rasterised.cleared;
            if removed > 0 {
                warn!(
                    "removed {} existing file(s) from {} before rasterising",
                    removed,
                    image_dir.display()
                );
                warnings.push(PipelineWarning::ImageDirCleared {
                    dir: image_dir.to_path_buf(),
                    removed,
                });
            }
            rasterised.pages
        }
        None => {
            info!("loading images from {}...", image_dir.display());
            list_image_dir(image_dir).await?
        }
    };

    if pages.is_empty() {
        return Err(ReportError::NoImages {
            dir: image_dir.to_path_buf(),
        });
    }

    debug!(
        "resolved {} page(s): {:?}",
        pages.len(),
        pages.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );
    Ok(ResolvedPages { pages, warnings })
}

/// Check the source exists, is readable and starts with the `%PDF` magic.
pub fn validate_pdf(path: &Path) -> Result<PathBuf, ReportError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ReportError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(4);
            f.take(4)
                .read_to_end(&mut head)
                .map_err(|e| ReportError::CorruptPdf {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
            if head != b"%PDF" {
                // shorter than the magic counts as not a PDF too
                let mut magic = [0u8; 4];
                magic[..head.len()].copy_from_slice(&head);
                return Err(ReportError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ReportError::PermissionDenied { path });
        }
        Err(_) => return Err(ReportError::FileNotFound { path }),
    }

    debug!("validated source PDF: {}", path.display());
    Ok(path)
}

/// Create `dir` if needed and delete every regular file in it.
///
/// Subdirectories are left alone. Returns how many files were removed.
/// Blocking; the rasteriser calls it once pdfium has opened the source.
pub fn clear_image_dir(dir: &Path) -> Result<usize, ReportError> {
    let dir_err = |source| ReportError::ImageDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(dir_err)?;

    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        if entry.file_type().map_err(dir_err)?.is_file() {
            std::fs::remove_file(entry.path()).map_err(dir_err)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Every regular file in `dir`, in directory-listing order.
pub async fn list_image_dir(dir: &Path) -> Result<Vec<PageImage>, ReportError> {
    let dir_err = |source| ReportError::ImageDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(dir_err)? {
        if entry.file_type().await.map_err(dir_err)?.is_file() {
            pages.push(PageImage::from_path(entry.path()));
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn page_names_are_one_indexed() {
        assert_eq!(page_file_name(1), "page_1.png");
        assert_eq!(page_file_name(12), "page_12.png");
    }

    #[test]
    fn page_number_parses_generated_names() {
        assert_eq!(page_number("page_1.png"), 1);
        assert_eq!(page_number("page_10.png"), 10);
        assert_eq!(page_number("cover.png"), usize::MAX);
        assert_eq!(page_number("page_x.png"), usize::MAX);

        let mut names = vec!["page_10.png", "page_2.png", "page_1.png"];
        names.sort_by_key(|n| page_number(n));
        assert_eq!(names, ["page_1.png", "page_2.png", "page_10.png"]);
    }

    #[test]
    fn page_image_name_comes_from_file_name() {
        let p = PageImage::from_path(PathBuf::from("input_images/page_3.png"));
        assert_eq!(p.name, "page_3.png");
    }

    #[test]
    fn validate_rejects_missing_file() {
        let err = validate_pdf(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn validate_rejects_non_pdf_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04zip").unwrap();
        let err = validate_pdf(&path).unwrap_err();
        match err {
            ReportError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        assert_eq!(validate_pdf(&path).unwrap(), path);
    }

    #[test]
    fn validate_rejects_file_shorter_than_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.pdf");
        std::fs::write(&path, b"hi").unwrap();
        match validate_pdf(&path).unwrap_err() {
            ReportError::NotAPdf { magic, .. } => assert_eq!(&magic, b"hi\0\0"),
            other => panic!("unexpected: {other:?}"),
        }

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(validate_pdf(&path), Err(ReportError::NotAPdf { .. })));
    }

    #[tokio::test]
    async fn clear_removes_files_but_keeps_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page_1.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"y").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        let removed = clear_image_dir(dir.path()).unwrap();
        assert_eq!(removed, 2);
        assert!(list_image_dir(dir.path()).await.unwrap().is_empty());
        assert!(dir.path().join("keep").is_dir());
    }

    #[test]
    fn clear_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/input_images");
        assert_eq!(clear_image_dir(&target).unwrap(), 0);
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn empty_directory_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_pages(None, dir.path(), 300, 4).await.unwrap_err();
        assert!(matches!(err, ReportError::NoImages { .. }));
    }

    #[tokio::test]
    async fn directory_mode_lists_every_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page_2.png", "page_1.png", "cover.jpg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let resolved = resolve_pages(None, dir.path(), 300, 4).await.unwrap();
        let mut names: Vec<_> = resolved.pages.iter().map(|p| p.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["cover.jpg", "page_1.png", "page_2.png"]);
        assert!(resolved.warnings.is_empty());
    }

    #[tokio::test]
    async fn pdf_mode_validates_before_touching_directory() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("page_1.png");
        std::fs::write(&keep, b"x").unwrap();

        let err = resolve_pages(Some(Path::new("/no/such.pdf")), dir.path(), 300, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound { .. }));
        assert!(keep.exists(), "a bad source must not clear the directory");
    }

    #[tokio::test]
    async fn truncated_pdf_leaves_directory_intact() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("input_images");
        std::fs::create_dir(&images).unwrap();
        let keep = images.join("page_1.png");
        std::fs::write(&keep, b"x").unwrap();
        let bogus = dir.path().join("bogus.pdf");
        std::fs::write(&bogus, b"hi").unwrap();

        let err = resolve_pages(Some(&bogus), &images, 72, 1).await.unwrap_err();
        assert!(matches!(err, ReportError::NotAPdf { .. }));
        assert!(keep.exists());
        assert_eq!(std::fs::read_dir(&images).unwrap().count(), 1);
    }
}
