//! File-level processing: output naming, directory scanning and skip rules

use std::path::{Path, PathBuf};
use glob::{glob_with, MatchOptions, Pattern};
use log::{error, info, warn};
use crate::error::{Error, Result};
use crate::layout::MarginSpec;
use crate::pdf::{add_margins, crop_and_interleave, PdfCropMargins};

/// Marker inserted into generated file names
pub const OUTPUT_SUFFIX: &str = "_margins";

/// How margins are applied to a document
#[derive(Debug, Clone, Default)]
pub enum Engine {
    /// Compose pages directly with lopdf
    #[default]
    Native,
    /// Grow pages with the external `pdf-crop-margins` tool first
    CropTool(PdfCropMargins),
}

/// Options for processing one or more files
#[derive(Debug, Clone)]
pub struct MarginOptions {
    /// Margins to add to every page
    pub margins: MarginSpec,
    /// Insert a blank page after every page
    pub insert_blank_pages: bool,
    /// Overwrite outputs that already exist
    pub force: bool,
    /// Backend that grows the pages
    pub engine: Engine,
}

impl Default for MarginOptions {
    fn default() -> Self {
        Self {
            margins: MarginSpec::default(),
            insert_blank_pages: true,
            force: false,
            engine: Engine::Native,
        }
    }
}

/// What happened to a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output written to this path
    Written(PathBuf),
    /// Output already existed and `force` was off
    Skipped(PathBuf),
}

/// Result of processing many files
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len()
    }
}

/// Default output path: `report.pdf` becomes `report_margins.pdf`
pub fn target_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    input.with_file_name(name)
}

/// True for files this tool produced
pub fn is_generated(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().contains(OUTPUT_SUFFIX))
        .unwrap_or(false)
}

/// Find every PDF below `dir`, skipping generated outputs
///
/// Results are sorted so runs are reproducible.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }

    let pattern = format!("{}/**/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut paths = Vec::new();
    for entry in glob_with(&pattern, options)? {
        match entry {
            Ok(path) if path.is_file() && !is_generated(&path) => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!("Cannot read {}: {}", e.path().display(), e.error()),
        }
    }

    paths.sort();
    Ok(paths)
}

/// Add margins to one file, unless its output already exists
pub fn process_file(input: &Path, target: &Path, options: &MarginOptions) -> Result<Outcome> {
    if !input.exists() {
        return Err(Error::MissingInput(input.to_path_buf()));
    }

    if target.exists() && !options.force {
        info!("Skipping {}: {} already exists", input.display(), target.display());
        return Ok(Outcome::Skipped(target.to_path_buf()));
    }

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match &options.engine {
        Engine::Native => add_margins(input, target, &options.margins, options.insert_blank_pages)?,
        Engine::CropTool(cropper) => crop_and_interleave(
            cropper,
            input,
            target,
            &options.margins,
            options.insert_blank_pages,
        )?,
    }

    Ok(Outcome::Written(target.to_path_buf()))
}

/// Process each file into its default target
///
/// Files are independent: a failure is recorded and the rest still run.
/// `on_file` is called after every file, e.g. to advance a progress bar.
pub fn process_batch<F>(inputs: &[PathBuf], options: &MarginOptions, mut on_file: F) -> BatchReport
where
    F: FnMut(&Path, &Result<Outcome>),
{
    let mut report = BatchReport::default();

    for input in inputs {
        let result = process_file(input, &target_path(input), options);
        on_file(input, &result);

        match result {
            Ok(Outcome::Written(path)) => report.written.push(path),
            Ok(Outcome::Skipped(path)) => report.skipped.push(path),
            Err(e) => {
                error!("Failed to process {}: {}", input.display(), e);
                report.failed.push((input.clone(), e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_target_path_inserts_suffix() {
        assert_eq!(target_path(Path::new("report.pdf")), PathBuf::from("report_margins.pdf"));
        assert_eq!(
            target_path(Path::new("docs/a.b.pdf")),
            PathBuf::from("docs/a.b_margins.pdf")
        );
        assert_eq!(target_path(Path::new("notes")), PathBuf::from("notes_margins"));
    }

    #[test]
    fn test_is_generated() {
        assert!(is_generated(Path::new("report_margins.pdf")));
        assert!(is_generated(Path::new("dir/x_margins_old.pdf")));
        assert!(!is_generated(Path::new("report.pdf")));
        assert!(!is_generated(Path::new("_margins/report.pdf")));
    }

    #[test]
    fn test_collect_inputs_skips_generated_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        for name in ["b.pdf", "a_margins.pdf", "nested/c.PDF", "notes.txt"] {
            fs::write(root.join(name), b"").unwrap();
        }

        let inputs = collect_inputs(root).unwrap();
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(names, vec!["b.pdf", "nested/c.PDF"]);
    }

    #[test]
    fn test_collect_inputs_missing_directory() {
        let result = collect_inputs(Path::new("no/such/directory"));
        assert!(matches!(result, Err(Error::MissingInput(_))));
    }

    #[test]
    fn test_existing_target_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input = temp_dir.path().join("in.pdf");
        let target = temp_dir.path().join("in_margins.pdf");
        fs::write(&input, b"not really a pdf").unwrap();
        fs::write(&target, b"previous output").unwrap();

        let outcome = process_file(&input, &target, &MarginOptions::default()).unwrap();

        assert_eq!(outcome, Outcome::Skipped(target.clone()));
        assert_eq!(fs::read(&target).unwrap(), b"previous output");
    }

    #[test]
    fn test_missing_input_fails_before_skip_check() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("gone_margins.pdf");
        fs::write(&target, b"previous output").unwrap();

        let input = temp_dir.path().join("gone.pdf");
        let result = process_file(&input, &target, &MarginOptions::default());
        assert!(matches!(result, Err(Error::MissingInput(_))));
    }

    #[test]
    fn test_batch_records_failures_and_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let broken = temp_dir.path().join("broken.pdf");
        let done = temp_dir.path().join("done.pdf");
        fs::write(&broken, b"garbage").unwrap();
        fs::write(&done, b"garbage").unwrap();
        fs::write(target_path(&done), b"already there").unwrap();

        let mut seen = Vec::new();
        let inputs = [broken.clone(), done.clone()];
        let report = process_batch(&inputs, &MarginOptions::default(), |path, _| {
            seen.push(path.to_path_buf())
        });

        assert_eq!(seen, vec![broken.clone(), done.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken);
        assert_eq!(report.skipped, vec![target_path(&done)]);
        assert!(!report.is_success());
        assert_eq!(report.total(), 2);
    }
}
