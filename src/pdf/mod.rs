//! PDF manipulation module

pub mod compose;
pub mod crop;
pub mod metadata;

// Re-export commonly used items
pub use compose::{add_margins, compose_document, read_page_boxes, save_document};
pub use crop::{crop_and_interleave, Cropper, PdfCropMargins};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
