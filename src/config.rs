use crate::export::ExportFormat;
use crate::ner::ModelChoice;
use crate::utils::{DeedError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;
pub const DEFAULT_DPI: u32 = 300;

/// Settings for one extraction batch.
///
/// Loaded from TOML where every key is optional; command-line flags are
/// applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// OCR lines at or below this confidence are left out of the page text.
    pub confidence_threshold: f64,
    pub dpi: u32,
    /// Entity model used for field mapping.
    pub model: String,
    /// Entity model used to find persons for the grant clause.
    pub person_model: String,
    pub ocr_language: String,
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    pub model_dir: PathBuf,
    pub convert_tiff: bool,
    pub extract_identifiers: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            dpi: DEFAULT_DPI,
            model: ModelChoice::RulesLarge.key().to_string(),
            person_model: ModelChoice::RulesLarge.key().to_string(),
            ocr_language: "eng".to_string(),
            output_dir: PathBuf::from("output"),
            format: ExportFormat::Json,
            model_dir: PathBuf::from("models"),
            convert_tiff: true,
            extract_identifiers: true,
        }
    }
}

impl BatchConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| DeedError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| DeedError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn model_choice(&self) -> Result<ModelChoice> {
        self.model.parse()
    }

    pub fn person_model_choice(&self) -> Result<ModelChoice> {
        self.person_model.parse()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DeedError::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.dpi == 0 {
            return Err(DeedError::Config("dpi must be positive".to_string()));
        }
        if self.ocr_language.trim().is_empty() {
            return Err(DeedError::Config("ocr_language must not be empty".to_string()));
        }
        self.model_choice()?;
        self.person_model_choice()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.dpi, 300);
        assert_eq!(config.model, "rules-large");
        assert_eq!(config.format, ExportFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BatchConfig::from_toml_str(
            r#"
            confidence_threshold = 0.75
            model = "rules-legal"
            format = "csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.model, "rules-legal");
        assert_eq!(config.format, ExportFormat::Csv);
        assert_eq!(config.dpi, 300);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deedscan.toml");
        fs::write(&path, "dpi = 200\nconvert_tiff = false\n").unwrap();
        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.dpi, 200);
        assert!(!config.convert_tiff);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(BatchConfig::from_toml_str("dpi = \"high\""), Err(DeedError::Config(_))));
        assert!(matches!(BatchConfig::load(Path::new("/nonexistent.toml")), Err(DeedError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = BatchConfig {
            confidence_threshold: 1.5,
            ..BatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(DeedError::Config(_))));

        config.confidence_threshold = 0.0;
        config.dpi = 0;
        assert!(matches!(config.validate(), Err(DeedError::Config(_))));

        config.dpi = 150;
        config.person_model = "spacy-xl".to_string();
        assert!(matches!(config.validate(), Err(DeedError::UnsupportedModel(_))));
    }
}
