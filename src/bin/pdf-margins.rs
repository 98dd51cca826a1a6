//! PDF Margins CLI tool
//!
//! A command-line tool for adding margins and blank pages to PDFs.

use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use pdf_margins::batch::{
    collect_inputs, process_batch, process_file, target_path, Engine, MarginOptions, Outcome,
};
use pdf_margins::layout::{Margin, MarginSpec};
use pdf_margins::pdf::{extract_metadata, PdfCropMargins};

/// PDF Margins - Add page margins and interleaved blank pages
#[derive(Parser)]
#[command(name = "pdf-margins")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Add 150pt left and right margins and a blank page after every page
    pdf-margins apply lecture.pdf

    # Leave 400pt of note space at the bottom, no blank pages
    pdf-margins apply lecture.pdf --left 0 --right 0 --bottom 400 --no-blank-pages

    # Margins as a fraction of the page: 30% of the width on the right
    pdf-margins apply lecture.pdf --left 0 --right 30%

    # Every PDF below a directory, regenerating existing outputs
    pdf-margins apply ./slides --force")]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add margins to a PDF file or to every PDF below a directory
    Apply {
        /// PDF file or directory to scan recursively
        input: PathBuf,

        /// Output file (single input only; default: <name>_margins.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Left margin in points, or a percentage of the page width (e.g. 25%)
        #[arg(long, default_value = "150", allow_negative_numbers = true)]
        left: MarginArg,

        /// Right margin in points, or a percentage of the page width
        #[arg(long, default_value = "150", allow_negative_numbers = true)]
        right: MarginArg,

        /// Top margin in points, or a percentage of the page height
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        top: MarginArg,

        /// Bottom margin in points, or a percentage of the page height
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        bottom: MarginArg,

        /// Treat plain margin numbers as fractions of the page (0.3 = 30%)
        #[arg(long)]
        relative: bool,

        /// Do not insert a blank page after each page
        #[arg(long)]
        no_blank_pages: bool,

        /// Overwrite existing output files
        #[arg(long)]
        force: bool,

        /// How pages are enlarged
        #[arg(long, value_enum, default_value = "native")]
        engine: EngineArg,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    /// Compose pages directly
    Native,
    /// Use the external pdf-crop-margins tool (absolute margins only)
    PdfCropMargins,
}

/// A margin as typed on the command line: `150` or `30%`
#[derive(Debug, Clone, Copy)]
struct MarginArg {
    value: f64,
    percent: bool,
}

impl MarginArg {
    fn to_margin(self, relative: bool) -> Margin {
        if self.percent {
            Margin::relative(self.value / 100.0)
        } else if relative {
            Margin::relative(self.value)
        } else {
            Margin::points(self.value)
        }
    }
}

impl FromStr for MarginArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, percent) = match s.strip_suffix('%') {
            Some(number) => (number.trim(), true),
            None => (s, false),
        };
        let value = number
            .parse::<f64>()
            .map_err(|_| format!("expected a number or a percentage, got '{}'", s))?;
        Ok(Self { value, percent })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Apply {
            input,
            output,
            left,
            right,
            top,
            bottom,
            relative,
            no_blank_pages,
            force,
            engine,
        } => {
            let margins = MarginSpec {
                left: left.to_margin(relative),
                right: right.to_margin(relative),
                top: top.to_margin(relative),
                bottom: bottom.to_margin(relative),
            };
            let engine = match engine {
                EngineArg::Native => Engine::Native,
                EngineArg::PdfCropMargins => Engine::CropTool(PdfCropMargins::default()),
            };
            let options = MarginOptions {
                margins,
                insert_blank_pages: !no_blank_pages,
                force,
                engine,
            };
            cmd_apply(&input, output, &options)
        }
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Add margins to a file or a directory of files
fn cmd_apply(input: &Path, output: Option<PathBuf>, options: &MarginOptions) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    if input.is_file() {
        let target = output.unwrap_or_else(|| target_path(input));
        let outcome = process_file(input, &target, options)
            .with_context(|| format!("Failed to process {}", input.display()))?;

        match outcome {
            Outcome::Written(path) => eprintln!("Output: {}", path.display()),
            Outcome::Skipped(path) => {
                eprintln!("Skipped: {} exists (use --force to overwrite)", path.display())
            }
        }
        return Ok(());
    }

    if output.is_some() {
        bail!("--output can only be used with a single input file");
    }

    let inputs = collect_inputs(input)
        .with_context(|| format!("Failed to scan {}", input.display()))?;
    if inputs.is_empty() {
        eprintln!("No PDF files found in {}", input.display());
        return Ok(());
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = process_batch(&inputs, options, |path, result| {
        if let Err(e) = result {
            pb.println(format!("Failed: {}: {}", path.display(), e));
        }
        pb.set_message(path.file_name().unwrap_or_default().to_string_lossy().into_owned());
        pb.inc(1);
    });
    pb.finish_and_clear();

    eprintln!(
        "Processed {} files: {} written, {} skipped, {} failed",
        report.total(),
        report.written.len(),
        report.skipped.len(),
        report.failed.len()
    );

    if !report.is_success() {
        bail!("{} of {} files failed", report.failed.len(), report.total());
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> anyhow::Result<()> {
    let metadata = extract_metadata(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    for (i, size) in metadata.page_sizes.iter().enumerate() {
        println!("  Page {}: {} x {} pt", i + 1, size.width, size.height);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_margin_arguments() {
        let points: MarginArg = "150".parse().unwrap();
        assert_eq!(points.to_margin(false), Margin::points(150.0));
        assert_eq!(points.to_margin(true), Margin::relative(150.0));

        let percent: MarginArg = "30%".parse().unwrap();
        assert_eq!(percent.to_margin(false), Margin::relative(0.3));

        let fraction: MarginArg = "0.3".parse().unwrap();
        assert_eq!(fraction.to_margin(true), Margin::relative(0.3));

        assert!("wide".parse::<MarginArg>().is_err());
    }

    #[test]
    fn test_percentage_resolves_to_exact_points() {
        let seven: MarginArg = "7%".parse().unwrap();
        assert_eq!(seven.to_margin(false).resolve(600.0).unwrap(), 42.0);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_margin_reaches_validation() {
        let cli = Cli::try_parse_from(["pdf-margins", "apply", "in.pdf", "--left", "-10"]).unwrap();
        match cli.command {
            Commands::Apply { left, .. } => assert_eq!(left.value, -10.0),
            Commands::Info { .. } => panic!("expected apply"),
        }
    }
}
