//! BERT-style token classification through ONNX Runtime.
//!
//! A model directory holds `model.onnx`, `tokenizer.json` and a
//! `config.json` carrying the `id2label` table. Token predictions are
//! grouped into entity spans with the "simple" strategy: consecutive tokens
//! of one entity type form a span scored by their mean probability.

use super::EntityExtractor;
use crate::models::RecognizedSpan;
use crate::utils::{DeedError, Result};
use log::debug;
use ort::{
    inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::tokenizer::Tokenizer;

// Keeps each window well under BERT's 512 token limit.
const MAX_WINDOW_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

/// One classified token: char offsets into the window, tag and probability.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPrediction {
    pub start: usize,
    pub end: usize,
    pub tag: String,
    pub score: f32,
}

pub struct OnnxNerExtractor {
    name: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    uses_token_types: bool,
}

impl OnnxNerExtractor {
    pub fn load(name: &str, dir: &Path) -> Result<Self> {
        let load_err = |reason: String| DeedError::ModelLoad {
            model: name.to_string(),
            reason,
        };

        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");
        let config_path = dir.join("config.json");
        for path in [&model_path, &tokenizer_path, &config_path] {
            if !path.exists() {
                return Err(load_err(format!("missing {}", path.display())));
            }
        }

        let config: ModelConfig = serde_json::from_str(&fs::read_to_string(&config_path)?)
            .map_err(|e| load_err(format!("bad config.json: {}", e)))?;
        let labels = label_table(&config.id2label).map_err(load_err)?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err(format!("bad tokenizer.json: {}", e)))?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(&model_path))
            .map_err(|e| load_err(e.to_string()))?;
        let uses_token_types = session.inputs.iter().any(|i| i.name == "token_type_ids");

        debug!("Loaded ONNX model {} with {} labels from {:?}", name, labels.len(), dir);
        Ok(OnnxNerExtractor {
            name: name.to_string(),
            session: Mutex::new(session),
            tokenizer,
            labels,
            uses_token_types,
        })
    }

    fn classify_window(&self, window: &str) -> Result<Vec<TokenPrediction>> {
        let encoding = self
            .tokenizer
            .encode_char_offsets(window, true)
            .map_err(|e| DeedError::Extraction(format!("tokenization failed: {}", e)))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
        let n = ids.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let onnx_err = |e: ort::Error| DeedError::Extraction(format!("{} inference failed: {}", self.name, e));
        let ids_tensor = Value::from_array(([1_usize, n], ids.into_boxed_slice())).map_err(onnx_err)?;
        let mask_tensor = Value::from_array(([1_usize, n], mask.into_boxed_slice())).map_err(onnx_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DeedError::Extraction(format!("{} session poisoned", self.name)))?;
        let outputs = if self.uses_token_types {
            let types = vec![0_i64; n];
            let types_tensor = Value::from_array(([1_usize, n], types.into_boxed_slice())).map_err(onnx_err)?;
            session.run(inputs![ids_tensor, mask_tensor, types_tensor])
        } else {
            session.run(inputs![ids_tensor, mask_tensor])
        }
        .map_err(onnx_err)?;

        let (shape, logits) = outputs[0].try_extract_tensor::<f32>().map_err(onnx_err)?;
        let num_labels = shape.last().copied().unwrap_or(0) as usize;
        if num_labels != self.labels.len() {
            return Err(DeedError::Extraction(format!(
                "{} produced {} labels, config lists {}",
                self.name,
                num_labels,
                self.labels.len()
            )));
        }

        let specials = encoding.get_special_tokens_mask();
        let offsets = encoding.get_offsets();
        let mut predictions = Vec::with_capacity(n);
        for (i, row) in logits.chunks(num_labels).take(n).enumerate() {
            if specials.get(i).copied().unwrap_or(0) == 1 {
                continue;
            }
            let (best, score) = softmax_argmax(row);
            let (start, end) = offsets[i];
            predictions.push(TokenPrediction {
                start,
                end,
                tag: self.labels[best].clone(),
                score,
            });
        }
        Ok(predictions)
    }
}

impl EntityExtractor for OnnxNerExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, text: &str) -> Result<Vec<RecognizedSpan>> {
        let mut spans = Vec::new();
        for (base, window) in windows(text, MAX_WINDOW_CHARS) {
            let predictions = self.classify_window(&window)?;
            for span in aggregate_simple(&window, &predictions) {
                let start = span.start_offset.map(|s| s + base);
                let end = span.end_offset.map(|e| e + base);
                spans.push(RecognizedSpan {
                    start_offset: start,
                    end_offset: end,
                    ..span
                });
            }
        }
        Ok(spans)
    }
}

fn label_table(id2label: &HashMap<String, String>) -> std::result::Result<Vec<String>, String> {
    let mut labels = vec![String::new(); id2label.len()];
    for (id, label) in id2label {
        let index: usize = id.parse().map_err(|_| format!("non-numeric label id {:?}", id))?;
        let slot = labels
            .get_mut(index)
            .ok_or_else(|| format!("label id {} out of range", index))?;
        *slot = label.clone();
    }
    Ok(labels)
}

fn softmax_argmax(logits: &[f32]) -> (usize, f32) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter()
        .enumerate()
        .fold((0, 0.0), |best, (i, &e)| if e / sum > best.1 { (i, e / sum) } else { best })
}

/// Split text into line-aligned windows, yielding each with its char offset.
pub fn windows(text: &str, max_chars: usize) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut base = 0;

    for line in text.split_inclusive('\n') {
        let len = line.chars().count();
        if current_len > 0 && current_len + len > max_chars {
            out.push((base, std::mem::take(&mut current)));
            base += current_len;
            current_len = 0;
        }
        current.push_str(line);
        current_len += len;
    }
    if current_len > 0 {
        out.push((base, current));
    }
    out
}

fn entity_type(tag: &str) -> Option<(bool, &str)> {
    if tag == "O" || tag.is_empty() {
        return None;
    }
    match tag.split_once('-') {
        Some(("B", kind)) => Some((true, kind)),
        Some(("I", kind)) => Some((false, kind)),
        _ => Some((false, tag)),
    }
}

/// Group token predictions into spans. A `B-` tag or a change of entity
/// type starts a new span; `O` closes the open one.
pub fn aggregate_simple(text: &str, predictions: &[TokenPrediction]) -> Vec<RecognizedSpan> {
    struct Open<'a> {
        kind: &'a str,
        start: usize,
        end: usize,
        scores: Vec<f32>,
    }

    fn close(text: &str, open: Open<'_>, out: &mut Vec<RecognizedSpan>) {
        let span: String = text.chars().skip(open.start).take(open.end - open.start).collect();
        let mean = open.scores.iter().sum::<f32>() / open.scores.len() as f32;
        out.push(
            RecognizedSpan::new(span.trim(), open.kind)
                .with_offsets(open.start, open.end)
                .with_score(mean as f64),
        );
    }

    let mut out = Vec::new();
    let mut open: Option<Open<'_>> = None;

    for prediction in predictions {
        let (begins, kind) = match entity_type(&prediction.tag) {
            Some(found) => found,
            None => {
                if let Some(o) = open.take() {
                    close(text, o, &mut out);
                }
                continue;
            }
        };
        match open.as_mut() {
            Some(o) if !begins && o.kind == kind => {
                o.end = prediction.end;
                o.scores.push(prediction.score);
            }
            _ => {
                if let Some(o) = open.take() {
                    close(text, o, &mut out);
                }
                open = Some(Open {
                    kind,
                    start: prediction.start,
                    end: prediction.end,
                    scores: vec![prediction.score],
                });
            }
        }
    }
    if let Some(o) = open {
        close(text, o, &mut out);
    }
    out
}
