//! Pipeline stages for document-to-report analysis.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and keeps the model-facing code (prompt
//! assembly, reply decoding) apart from file handling.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ encode ──▶ extract ──▶ insights ──▶ compose ──▶ document
//! (pages)   (pdfium)      (base64)   (model)     (model)      (model)     (PDF)
//! ```
//!
//! 1. [`input`]: validate the source PDF, clear or list the image directory
//! 2. [`rasterize`]: render PDF pages to `page_<n>.png` at 300 DPI
//! 3. [`encode`]: PNG-encode and base64-wrap page images for the request body
//! 4. [`extract`]: one multimodal request with every page image and one instruction
//! 5. [`insights`]: one text request over the whole extraction reply
//! 6. [`compose`]: one text request producing the Markdown report
//!
//! [`llm`] holds the model seam shared by stages 4–6, [`parse`] the
//! parse-with-fallback decoding of their replies, and [`postprocess`] the
//! cleanup applied to the report before it is saved. Rendering the report to
//! PDF lives in [`crate::document`].

pub mod compose;
pub mod encode;
pub mod extract;
pub mod input;
pub mod insights;
pub mod llm;
pub mod parse;
pub mod postprocess;
pub mod rasterize;
