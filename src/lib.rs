//! PDF Margins Library
//!
//! A cross-platform library for adding margins to PDF pages.
//! This library provides functionality to:
//! - Resolve absolute and relative margins against a page
//! - Enlarge every page and place its original content at an offset
//! - Insert a blank page after each original page
//! - Process whole directories, skipping outputs that already exist
//!
//! # Example
//!
//! ```no_run
//! use pdf_margins::batch::{process_file, target_path, MarginOptions};
//! use pdf_margins::layout::MarginSpec;
//! use std::path::Path;
//!
//! let options = MarginOptions {
//!     margins: MarginSpec::absolute(150.0, 150.0, 0.0, 0.0),
//!     ..Default::default()
//! };
//!
//! let input = Path::new("report.pdf");
//! process_file(input, &target_path(input), &options).expect("Failed to add margins");
//! ```

pub mod batch;
pub mod error;
pub mod layout;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Result};
