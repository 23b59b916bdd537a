pub mod config;
pub mod deed_extractor;
pub mod export;
pub mod models;
pub mod ner;
pub mod processing;
pub mod utils;

pub use config::BatchConfig;
pub use deed_extractor::{run_batch, BatchOutcome, DeedExtractor};
pub use export::ExportFormat;
pub use utils::{DeedError, Result};
