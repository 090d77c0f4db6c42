//! One-shot dataset translator: read a JSON array of captioned records,
//! translate every English caption to French in fixed-size batches, write
//! the augmented array to a new file.
//!
//! Deliberately fail-fast: any error (missing field, model failure, I/O)
//! aborts the run with a nonzero exit and no output file.

mod dataset;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use legende_core::models::marian::MarianTranslator;
use legende_core::translate::translate_all;
use legende_core::utils::select_device;

#[derive(Parser, Debug)]
#[command(
    name = "legende-batch",
    about = "Batch-translate a caption dataset from English to French"
)]
struct Args {
    /// Input JSON file: an array of records with a "caption" field
    input: PathBuf,

    /// Output path (defaults to the input name with an `_fr` suffix)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Captions per translation batch
    #[arg(long, default_value_t = 8)]
    batch_size: usize,

    /// Use CPU even if a GPU is available
    #[arg(long)]
    cpu: bool,
}

/// `captions.json` → `captions_fr.json`, next to the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "captions".to_string());
    input.with_file_name(format!("{}_fr.json", stem))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));

    let records = dataset::load_records(&args.input)?;
    let captions = dataset::captions_of(&records)?;
    info!(
        "Loaded {} captions from {}",
        captions.len(),
        args.input.display()
    );

    let device = select_device(args.cpu)?;
    let mut translator = MarianTranslator::from_pretrained(&device)?;

    let translations = translate_all(&mut translator, &captions, args.batch_size)?;

    let augmented = dataset::augment_records(records, translations);
    dataset::write_records(&output, &augmented)?;

    info!("Translated captions saved to {}", output.display());
    Ok(())
}
