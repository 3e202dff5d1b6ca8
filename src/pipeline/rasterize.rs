//! PDF rasterisation: render every page to `page_<n>.png` via pdfium.
//!
//! ## Why a producer thread and a writer pool?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state and must stay on one thread, so rendering runs inside
//! `tokio::task::spawn_blocking`. PNG-encoding a 300 DPI page is the slow
//! part and parallelises well, so rendered bitmaps are handed over a bounded
//! channel to up to `workers` blocking writer tasks. The channel bound keeps
//! at most `workers` uncompressed pages in memory at once.

use crate::error::ReportError;
use crate::pipeline::input::{clear_image_dir, page_file_name, page_number, PageImage};
use futures::stream::StreamExt;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Pages written by [`rasterize_pdf`].
#[derive(Debug)]
pub struct Rasterised {
    /// In page order.
    pub pages: Vec<PageImage>,
    /// Files removed from the output directory before rendering.
    pub cleared: usize,
}

/// Rasterise every page of `pdf_path` into `out_dir`.
///
/// `out_dir` is cleared only after pdfium has bound and opened the
/// document, so a source pdfium rejects leaves the directory as it was.
pub async fn rasterize_pdf(
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
    workers: usize,
) -> Result<Rasterised, ReportError> {
    let workers = workers.max(1);
    let (tx, rx) = mpsc::channel::<(usize, DynamicImage)>(workers);

    let path = pdf_path.to_path_buf();
    let dir = out_dir.to_path_buf();
    let producer =
        tokio::task::spawn_blocking(move || render_pages_blocking(&path, &dir, dpi, tx));

    let out_dir = out_dir.to_path_buf();
    let written: Vec<Result<PageImage, ReportError>> = ReceiverStream::new(rx)
        .map(|(page_num, image)| write_page(out_dir.join(page_file_name(page_num)), page_num, image))
        .buffer_unordered(workers)
        .collect()
        .await;

    let (total, cleared) = producer
        .await
        .map_err(|e| ReportError::Internal(format!("Render task panicked: {}", e)))??;

    let mut pages = written.into_iter().collect::<Result<Vec<_>, _>>()?;
    pages.sort_by_key(|p| page_number(&p.name));

    info!("rasterised {}/{} page(s) at {} DPI", pages.len(), total, dpi);
    Ok(Rasterised { pages, cleared })
}

/// Encode and save one page on the blocking pool.
async fn write_page(
    path: PathBuf,
    page_num: usize,
    image: DynamicImage,
) -> Result<PageImage, ReportError> {
    tokio::task::spawn_blocking(move || {
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| ReportError::RasterisationFailed {
                page: page_num,
                detail: format!("writing {}: {}", path.display(), e),
            })?;
        debug!("wrote {}", path.display());
        Ok(PageImage::from_path(path))
    })
    .await
    .map_err(|e| ReportError::Internal(format!("PNG writer panicked: {}", e)))?
}

/// Open the document, clear `out_dir`, then render each page and push it
/// down the channel. Returns the page count and the number of files cleared.
fn render_pages_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
    tx: mpsc::Sender<(usize, DynamicImage)>,
) -> Result<(usize, usize), ReportError> {
    let pdfium = bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| ReportError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let cleared = clear_image_dir(out_dir)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ReportError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        // The receiver only goes away when a writer already failed; that
        // error is reported by the caller.
        if tx.blocking_send((idx + 1, image)).is_err() {
            break;
        }
    }

    Ok((total_pages, cleared))
}

/// Bind to `PDFIUM_LIB_PATH` (file or directory) or the system library.
fn bind_pdfium() -> Result<Pdfium, ReportError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(configured) => {
            let configured = PathBuf::from(configured);
            if configured.is_dir() {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&configured))
            } else {
                Pdfium::bind_to_library(&configured)
            }
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ReportError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_page_saves_png_and_names_it() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 6, image::Rgb([9, 9, 9])));
        let page = write_page(dir.path().join(page_file_name(3)), 3, img)
            .await
            .unwrap();
        assert_eq!(page.name, "page_3.png");
        assert_eq!(image::image_dimensions(&page.path).unwrap(), (4, 6));
    }

    #[tokio::test]
    async fn binding_failure_leaves_directory_intact() {
        // no other unit test binds pdfium
        std::env::set_var("PDFIUM_LIB_PATH", "/nonexistent/libpdfium.so");

        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("report.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n").unwrap();
        let images = dir.path().join("input_images");
        std::fs::create_dir(&images).unwrap();
        let keep = images.join("page_1.png");
        std::fs::write(&keep, b"x").unwrap();

        let err = rasterize_pdf(&pdf, &images, 72, 1).await.unwrap_err();
        assert!(matches!(err, ReportError::PdfiumBindingFailed(_)), "got: {err:?}");
        assert!(keep.exists());
    }
}
