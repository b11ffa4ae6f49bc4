//! Command-line companion: inspect frame folders and validate exported
//! annotation files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use storm_label::{DownloadRecord, FileMask, FolderFrameSource, FrameSource, DEFAULT_FILE_MASK};

#[derive(Parser)]
#[command(name = "storm-label", about = "Satellite annotation session tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scan an image folder and list the frames it contains.
    Frames {
        /// Directory with product image files.
        dir: PathBuf,

        /// File-name mask with {projection}, {resolution}, {product} and
        /// {datetime:...} fields.
        #[arg(long, default_value = DEFAULT_FILE_MASK)]
        mask: String,
    },

    /// Validate an exported annotations JSON file.
    Validate {
        /// Path to an annotations.json produced by the download action.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = storm_label::core::init_with_level(level) {
        eprintln!("failed to install logger: {err}");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Frames { dir, mask } => {
            let mask = FileMask::parse(&mask)?;
            let source = FolderFrameSource::scan(&dir, &mask)?;
            if source.is_empty() {
                println!("no frames matched the mask in {}", dir.display());
                return Ok(());
            }
            for i in 0..source.len() {
                let timestamp = source.timestamp(i).unwrap_or_default();
                let products = source.products(i).unwrap_or_default();
                println!("{timestamp}  [{}]", products.join(", "));
            }
            println!("{} frames", source.len());
        }
        Command::Validate { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let export: BTreeMap<String, Vec<DownloadRecord>> = serde_json::from_str(&raw)?;
            let total: usize = export.values().map(Vec::len).sum();
            for (timestamp, records) in &export {
                println!("{timestamp}: {} annotations", records.len());
            }
            println!("{} frames, {total} annotations: OK", export.len());
        }
    }
    Ok(())
}
