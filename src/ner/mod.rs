//! Named-entity extraction backends and the model registry.

pub mod patterns;

#[cfg(feature = "onnx")]
pub mod onnx;

use crate::models::RecognizedSpan;
use crate::utils::{DeedError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use patterns::{PatternExtractor, PatternProfile};

/// Labels that name people across the supported backends.
pub const PERSON_LABELS: &[&str] = &["PERSON", "PER", "NAME"];

/// A loaded entity recognizer. Implementations are reused across pages.
pub trait EntityExtractor {
    fn name(&self) -> &str;

    /// Spans in document order, with character offsets into `text`.
    fn extract(&self, text: &str) -> Result<Vec<RecognizedSpan>>;
}

pub fn is_person_label(label: &str) -> bool {
    let label = label.trim().to_uppercase();
    PERSON_LABELS.contains(&label.as_str())
}

/// Keep only the person spans of an extractor's output.
pub fn person_entities(spans: Vec<RecognizedSpan>) -> Vec<RecognizedSpan> {
    spans.into_iter().filter(|s| is_person_label(&s.label)).collect()
}

/// The fixed set of selectable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    RulesSmall,
    RulesLarge,
    RulesLegal,
    BertGeneral,
    BertLegal,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 5] = [
        ModelChoice::RulesSmall,
        ModelChoice::RulesLarge,
        ModelChoice::RulesLegal,
        ModelChoice::BertGeneral,
        ModelChoice::BertLegal,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ModelChoice::RulesSmall => "rules-small",
            ModelChoice::RulesLarge => "rules-large",
            ModelChoice::RulesLegal => "rules-legal",
            ModelChoice::BertGeneral => "bert-general",
            ModelChoice::BertLegal => "bert-legal",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelChoice::RulesSmall => "Pattern rules: persons, dates, money",
            ModelChoice::RulesLarge => "Pattern rules: adds places, street addresses, long-form dates",
            ModelChoice::RulesLegal => "Pattern rules tuned for deeds: role-tagged parties, witnesses, registration",
            ModelChoice::BertGeneral => "BERT token classifier, general NER (ONNX)",
            ModelChoice::BertLegal => "BERT token classifier fine-tuned on legal text (ONNX)",
        }
    }

    /// Subdirectory of the model directory holding ONNX artifacts.
    pub fn artifact_dir(&self) -> Option<&'static str> {
        match self {
            ModelChoice::BertGeneral => Some("bert-general"),
            ModelChoice::BertLegal => Some("bert-legal"),
            _ => None,
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelChoice {
    type Err = DeedError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        ModelChoice::ALL
            .iter()
            .copied()
            .find(|choice| choice.key() == key)
            .ok_or_else(|| DeedError::UnsupportedModel(s.to_string()))
    }
}

/// Load the extractor for `choice`. ONNX models are read from
/// `model_dir/<variant>/`.
pub fn load_extractor(choice: ModelChoice, model_dir: &Path) -> Result<Box<dyn EntityExtractor>> {
    let extractor: Box<dyn EntityExtractor> = match choice {
        ModelChoice::RulesSmall => Box::new(PatternExtractor::new(choice.key(), PatternProfile::Small)),
        ModelChoice::RulesLarge => Box::new(PatternExtractor::new(choice.key(), PatternProfile::Large)),
        ModelChoice::RulesLegal => Box::new(PatternExtractor::new(choice.key(), PatternProfile::Legal)),
        ModelChoice::BertGeneral | ModelChoice::BertLegal => load_onnx(choice, model_dir)?,
    };
    log::info!("Loaded entity model {}", choice);
    Ok(extractor)
}

#[cfg(feature = "onnx")]
fn load_onnx(choice: ModelChoice, model_dir: &Path) -> Result<Box<dyn EntityExtractor>> {
    let dir = model_dir.join(choice.artifact_dir().unwrap_or_default());
    Ok(Box::new(onnx::OnnxNerExtractor::load(choice.key(), &dir)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(choice: ModelChoice, _model_dir: &Path) -> Result<Box<dyn EntityExtractor>> {
    Err(DeedError::ModelLoad {
        model: choice.key().to_string(),
        reason: "built without the `onnx` feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_keys_round_trip() {
        for choice in ModelChoice::ALL {
            assert_eq!(choice.key().parse::<ModelChoice>().unwrap(), choice);
        }
        assert_eq!(" Rules-Legal ".parse::<ModelChoice>().unwrap(), ModelChoice::RulesLegal);
    }

    #[test]
    fn test_unknown_model_rejected() {
        let err = "spacy-xl".parse::<ModelChoice>().unwrap_err();
        assert!(matches!(err, DeedError::UnsupportedModel(ref k) if k == "spacy-xl"));
    }

    #[test]
    fn test_rule_models_load() {
        let dir = TempDir::new().unwrap();
        for choice in [ModelChoice::RulesSmall, ModelChoice::RulesLarge, ModelChoice::RulesLegal] {
            let extractor = load_extractor(choice, dir.path()).unwrap();
            assert_eq!(extractor.name(), choice.key());
        }
    }

    #[test]
    fn test_onnx_model_without_artifacts_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let result = load_extractor(ModelChoice::BertGeneral, dir.path());
        assert!(matches!(result, Err(DeedError::ModelLoad { .. })));
    }

    #[test]
    fn test_person_filter() {
        let spans = vec![
            RecognizedSpan::new("Alice", "PERSON"),
            RecognizedSpan::new("Acme", "ORG"),
            RecognizedSpan::new("Bob", "per"),
            RecognizedSpan::new("JOHN SMITH, Grantor", "NAME"),
        ];
        let people: Vec<_> = person_entities(spans).into_iter().map(|s| s.text).collect();
        assert_eq!(people, vec!["Alice", "Bob", "JOHN SMITH, Grantor"]);
    }
}
