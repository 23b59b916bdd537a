use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stage of the per-page pipeline a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    TransientImage,
    Recognition,
    PersonExtraction,
    GrantResolution,
    EntityExtraction,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PipelineStage::TransientImage => "transient image",
            PipelineStage::Recognition => "text recognition",
            PipelineStage::PersonExtraction => "person extraction",
            PipelineStage::GrantResolution => "grant clause resolution",
            PipelineStage::EntityExtraction => "entity extraction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum DeedError {
    #[error("No files uploaded.")]
    EmptyInput,

    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("TIFF to PDF conversion failed for {}: {message}", path.display())]
    Conversion { path: PathBuf, message: String },

    #[error("Failed to load NER model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Unsupported NER model selection: {0}")]
    UnsupportedModel(String),

    #[error("Person entity '{0}' has no character offsets; cannot resolve grantor/grantee")]
    UnresolvedOffsets(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Text recognition error: {0}")]
    Recognition(String),

    #[error("Rasterization error: {0}")]
    Rasterization(String),

    #[error("Entity extraction error: {0}")]
    Extraction(String),

    #[error("{source_file} page {page} failed during {stage}: {source}")]
    Page {
        source_file: String,
        page: usize,
        stage: PipelineStage,
        #[source]
        source: Box<DeedError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeedError {
    /// Attach page context to a collaborator failure.
    pub fn at_page(self, source_file: &str, page: usize, stage: PipelineStage) -> Self {
        DeedError::Page {
            source_file: source_file.to_string(),
            page,
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeedError>;
