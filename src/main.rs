// Deed field extraction from scanned documents.

use clap::Parser;
use deedscan::{
    models::PageResult,
    ner::ModelChoice,
    run_batch, BatchConfig, DeedError, ExportFormat,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "deedscan", version, about = "Extract buyer, seller, property and sale fields from scanned deeds")]
struct Cli {
    /// Input files (.pdf, .tif, .tiff, .jpg, .png)
    files: Vec<PathBuf>,

    /// Export format
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Directory for results and converted TIFFs
    #[arg(short, long, env = "DEEDSCAN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Entity model for field mapping (see --list-models)
    #[arg(short, long, env = "DEEDSCAN_MODEL")]
    model: Option<String>,

    /// Entity model used to find grant clause parties
    #[arg(long)]
    person_model: Option<String>,

    /// Directory holding ONNX model folders
    #[arg(long, env = "DEEDSCAN_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// OCR confidence threshold in [0, 1]
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Rasterization resolution for PDFs
    #[arg(long)]
    dpi: Option<u32>,

    /// Tesseract language code
    #[arg(long)]
    lang: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read TIFFs directly instead of converting them to searchable PDFs
    #[arg(long)]
    no_tiff_conversion: bool,

    /// Skip the property ID and registrar office lookup
    #[arg(long)]
    no_identifiers: bool,

    /// List available entity models and exit
    #[arg(long)]
    list_models: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn batch_config(&self) -> Result<BatchConfig, DeedError> {
        let mut config = match &self.config {
            Some(path) => BatchConfig::load(path)?,
            None => BatchConfig::default(),
        };
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(model) = &self.person_model {
            config.person_model = model.clone();
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(lang) = &self.lang {
            config.ocr_language = lang.clone();
        }
        if self.no_tiff_conversion {
            config.convert_tiff = false;
        }
        if self.no_identifiers {
            config.extract_identifiers = false;
        }
        Ok(config)
    }
}

fn print_page_summary(result: &PageResult) {
    println!(
        "\n{} page {} (avg confidence {:.4}, {} of 8 fields)",
        result.source_file,
        result.page,
        result.confidence_avg,
        result.fields.filled_count()
    );
    for (key, value) in result.fields.entries() {
        if !value.is_empty() {
            println!("  {}: {}", key, value);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.list_models {
        for choice in ModelChoice::ALL {
            println!("{:<14} {}", choice.key(), choice.description());
        }
        return;
    }

    if cli.files.is_empty() {
        println!("{}", DeedError::EmptyInput);
        return;
    }

    let config = match cli.batch_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(2);
        }
    };

    match run_batch(&cli.files, &config) {
        Ok(outcome) => {
            for result in &outcome.results {
                print_page_summary(result);
            }
            println!(
                "\nExtracted {} pages. Results written to {}",
                outcome.results.len(),
                outcome.output_path.display()
            );
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
