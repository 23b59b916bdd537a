pub mod command;
pub mod error;
pub mod text;

pub use error::{DeedError, PipelineStage, Result};
