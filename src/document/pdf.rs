//! lopdf writers: the text PDF, the images PDF, and the merge.
//!
//! Every page carries its own `/Resources` and `/MediaBox` rather than
//! inheriting them from `/Pages`, so pages can be moved between documents
//! by the merge without losing fonts or geometry.

use crate::document::markdown::Font;
use crate::document::typeset::{encode_win_ansi, PAGE_HEIGHT, PAGE_WIDTH};
use crate::error::ReportError;
use crate::pipeline::input::PageImage;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::debug;

const PDF_VERSION: &str = "1.5";
const MM: f32 = 72.0 / 25.4;
const JPEG_QUALITY: u8 = 90;

/// Image page geometry, in millimetres from the top-left corner.
const IMAGE_X_MM: f32 = 10.0;
const IMAGE_Y_MM: f32 = 25.0;
const IMAGE_W_MM: f32 = 190.0;
const IMAGE_BOTTOM_MM: f32 = 10.0;
const CAPTION_BASELINE_MM: f32 = 17.0;
const CAPTION_SIZE: f32 = 12.0;

/// Accumulates pages, then writes the catalog and page tree.
struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    resources_fonts: Dictionary,
}

impl PdfWriter {
    fn new() -> Self {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), id);
        }

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            resources_fonts: fonts,
        }
    }

    fn add_page(
        &mut self,
        operations: Vec<Operation>,
        xobjects: Dictionary,
    ) -> Result<(), ReportError> {
        let content = Content { operations }
            .encode()
            .map_err(|e| ReportError::render("encoding page content", e))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));

        let mut resources = dictionary! {
            "Font" => self.resources_fonts.clone(),
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => media_box(),
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn add_image_page(&mut self, name: &str, image: &DynamicImage) -> Result<(), ReportError> {
        let (px_w, px_h) = (image.width().max(1), image.height().max(1));
        let jpeg = encode_jpeg(image)?;

        let image_id = self.doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => px_w as i64,
                    "Height" => px_h as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg,
            )
            .with_compression(false),
        );

        let (x, y, w, h) = image_placement(px_w, px_h);
        let caption = encode_win_ansi(&format!("Image: {name}"));
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Td",
                vec![(IMAGE_X_MM * MM).into(), (PAGE_HEIGHT - CAPTION_BASELINE_MM * MM).into()],
            ),
            Operation::new(
                "Tf",
                vec![Font::Regular.resource_name().into(), CAPTION_SIZE.into()],
            ),
            Operation::new("Tj", vec![Object::string_literal(caption)]),
            Operation::new("ET", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ];

        self.add_page(operations, dictionary! { "Im1" => image_id })
    }

    fn save(mut self, path: &Path) -> Result<usize, ReportError> {
        let count = self.page_ids.len();
        finish_tree(&mut self.doc, self.pages_id, &self.page_ids);
        self.doc.compress();
        self.doc
            .save(path)
            .map_err(|e| ReportError::render("writing PDF", e))?;
        debug!("wrote {} page(s) to {}", count, path.display());
        Ok(count)
    }
}

fn media_box() -> Vec<Object> {
    vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()]
}

/// Install `/Pages` at `pages_id` listing `page_ids`, plus a catalog.
fn finish_tree(doc: &mut Document, pages_id: ObjectId, page_ids: &[ObjectId]) {
    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}

/// Where the image goes: `(x, y, width, height)` in points, PDF origin.
///
/// Width is 190 mm with the aspect ratio kept; when that would run past the
/// bottom margin the image is scaled down to fit the remaining height.
fn image_placement(px_w: u32, px_h: u32) -> (f32, f32, f32, f32) {
    let aspect = px_h as f32 / px_w as f32;
    let mut w = IMAGE_W_MM * MM;
    let mut h = w * aspect;

    let max_h = PAGE_HEIGHT - (IMAGE_Y_MM + IMAGE_BOTTOM_MM) * MM;
    if h > max_h {
        h = max_h;
        w = h / aspect;
    }

    let x = IMAGE_X_MM * MM;
    let y = PAGE_HEIGHT - IMAGE_Y_MM * MM - h;
    (x, y, w, h)
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, ReportError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))
        .map_err(|e| ReportError::render("encoding image", e))?;
    Ok(buf)
}

/// Write laid-out text pages to `path`.
pub fn write_text_pdf(pages: Vec<Vec<Operation>>, path: &Path) -> Result<usize, ReportError> {
    let mut writer = PdfWriter::new();
    for operations in pages {
        writer.add_page(operations, Dictionary::new())?;
    }
    writer.save(path)
}

/// Write one captioned page per image to `path`. Images are decoded one
/// at a time.
pub fn write_images_pdf(images: &[PageImage], path: &Path) -> Result<usize, ReportError> {
    let mut writer = PdfWriter::new();
    for page in images {
        let image = page.decode()?;
        writer.add_image_page(&page.name, &image)?;
    }
    writer.save(path)
}

/// Concatenate the pages of `inputs`, in order, into `output`.
pub fn merge_pdfs(inputs: &[&Path], output: &Path) -> Result<usize, ReportError> {
    let mut merged = Document::with_version(PDF_VERSION);
    let mut max_id = 1;
    let mut page_ids = Vec::new();

    for path in inputs {
        let mut doc = Document::load(path).map_err(|e| ReportError::render("merging PDFs", e))?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());

        for (id, object) in doc.objects {
            let is_tree_node = matches!(
                object.as_dict().and_then(|d| d.get(b"Type")).and_then(Object::as_name),
                Ok(b"Catalog") | Ok(b"Pages")
            );
            if !is_tree_node {
                merged.objects.insert(id, object);
            }
        }
    }

    merged.max_id = max_id;
    let pages_id = merged.new_object_id();
    for &id in &page_ids {
        if let Ok(page) = merged.get_object_mut(id).and_then(Object::as_dict_mut) {
            page.set("Parent", pages_id);
        }
    }
    finish_tree(&mut merged, pages_id, &page_ids);
    merged.compress();
    merged
        .save(output)
        .map_err(|e| ReportError::render("saving merged PDF", e))?;

    debug!("merged {} page(s) into {}", page_ids.len(), output.display());
    Ok(page_ids.len())
}
