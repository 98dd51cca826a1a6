//! Margin growth through the external `pdf-crop-margins` utility
//!
//! The utility grows every page by a fixed set of point offsets. Blank
//! pages are interleaved afterwards with lopdf.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use log::{debug, info};
use crate::error::{Error, Result};
use crate::layout::{MarginMode, MarginSpec, ResolvedMargins};
use super::compose::add_margins;

/// Something that can grow the pages of a PDF file by fixed margins
pub trait Cropper {
    /// Write a copy of `input` to `output` with every page enlarged by `margins`
    fn crop(&self, input: &Path, output: &Path, margins: &ResolvedMargins) -> Result<()>;
}

/// Runs the `pdf-crop-margins` command line tool
#[derive(Debug, Clone)]
pub struct PdfCropMargins {
    /// Program to invoke
    pub program: PathBuf,
}

impl Default for PdfCropMargins {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdf-crop-margins"),
        }
    }
}

impl PdfCropMargins {
    /// Arguments for one invocation
    ///
    /// `-p 100` keeps all of the detected content box and `-a4` then moves
    /// each edge by an absolute amount (left, bottom, right, top). Negative
    /// amounts grow the page.
    pub fn arguments(input: &Path, output: &Path, margins: &ResolvedMargins) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-o".into(),
            output.as_os_str().to_owned(),
            "-p".into(),
            "100".into(),
            "-a4".into(),
        ];
        for value in [margins.left, margins.bottom, margins.right, margins.top] {
            args.push(grow_offset(value).into());
        }
        args.push(input.as_os_str().to_owned());
        args
    }
}

impl Cropper for PdfCropMargins {
    fn crop(&self, input: &Path, output: &Path, margins: &ResolvedMargins) -> Result<()> {
        let args = Self::arguments(input, output, margins);
        debug!("Running {} {:?}", self.program.display(), args);

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| {
                Error::CropTool(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !result.status.success() {
            return Err(Error::CropTool(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        if !output.exists() {
            return Err(Error::CropTool(format!(
                "{} did not produce {}",
                self.program.display(),
                output.display()
            )));
        }

        Ok(())
    }
}

/// Grow pages with `cropper`, then optionally insert a blank page after each one
///
/// The cropper's intermediate file lives in a temporary directory that is
/// removed when this function returns.
pub fn crop_and_interleave(
    cropper: &dyn Cropper,
    input_path: &Path,
    output_path: &Path,
    margins: &MarginSpec,
    insert_blank_pages: bool,
) -> Result<()> {
    if !input_path.exists() {
        return Err(Error::MissingInput(input_path.to_path_buf()));
    }

    let resolved = absolute_margins(margins)?;

    let scratch = tempfile::Builder::new().prefix("pdf-margins-").tempdir()?;
    let cropped = scratch.path().join("cropped.pdf");

    info!("Cropping {}", input_path.display());
    cropper.crop(input_path, &cropped, &resolved)?;

    add_margins(&cropped, output_path, &MarginSpec::zero(), insert_blank_pages)
}

/// The external tool applies one offset set to every page, so fractions of
/// individual page sizes cannot be expressed
fn absolute_margins(margins: &MarginSpec) -> Result<ResolvedMargins> {
    if margins.has_relative() {
        return Err(Error::InvalidMargin(
            "relative margins are not supported by the pdf-crop-margins engine".to_string(),
        ));
    }

    let resolve = |side: &str, value: f64| {
        crate::layout::resolve_margin(value, 0.0, MarginMode::Absolute)
            .map_err(|_| {
                Error::InvalidMargin(format!(
                    "{} margin must be non-negative, got {}",
                    side, value
                ))
            })
    };

    Ok(ResolvedMargins {
        left: resolve("left", margins.left.value)?,
        right: resolve("right", margins.right.value)?,
        top: resolve("top", margins.top.value)?,
        bottom: resolve("bottom", margins.bottom.value)?,
    })
}

fn grow_offset(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", -value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Margin;

    struct FailingCropper;

    impl Cropper for FailingCropper {
        fn crop(&self, _input: &Path, _output: &Path, _margins: &ResolvedMargins) -> Result<()> {
            Err(Error::CropTool("boom".to_string()))
        }
    }

    #[test]
    fn test_arguments_grow_each_edge() {
        let margins = ResolvedMargins {
            left: 150.0,
            right: 150.0,
            top: 0.0,
            bottom: 12.5,
        };
        let args = PdfCropMargins::arguments(Path::new("in.pdf"), Path::new("out.pdf"), &margins);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec!["-o", "out.pdf", "-p", "100", "-a4", "-150", "-12.5", "-150", "0", "in.pdf"]
        );
    }

    #[test]
    fn test_relative_margins_rejected() {
        let mut spec = MarginSpec::default();
        spec.top = Margin::relative(0.1);

        let result = absolute_margins(&spec);
        assert!(matches!(result, Err(Error::InvalidMargin(_))));
    }

    #[test]
    fn test_negative_margins_rejected() {
        let spec = MarginSpec::absolute(0.0, -1.0, 0.0, 0.0);
        assert!(matches!(absolute_margins(&spec), Err(Error::InvalidMargin(_))));
    }

    #[test]
    fn test_missing_program_reports_crop_error() {
        let cropper = PdfCropMargins {
            program: PathBuf::from("definitely-not-a-real-pdf-crop-margins"),
        };
        let margins = ResolvedMargins::default();
        let result = cropper.crop(Path::new("in.pdf"), Path::new("out.pdf"), &margins);
        assert!(matches!(result, Err(Error::CropTool(_))));
    }

    #[test]
    fn test_cropper_failure_propagates() {
        // Any existing file works as input; the cropper fails before it is read
        let input = tempfile::NamedTempFile::new().unwrap();
        let result = crop_and_interleave(
            &FailingCropper,
            input.path(),
            Path::new("never-written.pdf"),
            &MarginSpec::default(),
            true,
        );
        assert!(matches!(result, Err(Error::CropTool(_))));
        assert!(!Path::new("never-written.pdf").exists());
    }
}
