use serde::{Deserialize, Serialize};

/// Axis-aligned box of a recognized text line, in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = (self.left + self.width).max(other.left + other.width);
        let bottom = (self.top + self.height).max(other.top + other.height);
        BoundingBox {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }
}

/// One line of recognizer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub bbox: BoundingBox,
    pub text: String,
    /// Recognizer confidence in [0, 1].
    pub confidence: f64,
}

/// A tagged text span produced by an entity extractor.
///
/// Offsets are character (not byte) positions into the text the extractor
/// was run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedSpan {
    #[serde(default, alias = "word")]
    pub text: String,
    #[serde(default, alias = "entity_group", alias = "entity")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(
        default,
        rename = "start",
        alias = "start_offset",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_offset: Option<usize>,
    #[serde(
        default,
        rename = "end",
        alias = "end_offset",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_offset: Option<usize>,
}

impl RecognizedSpan {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        RecognizedSpan {
            text: text.into(),
            label: label.into(),
            score: None,
            start_offset: None,
            end_offset: None,
        }
    }

    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.start_offset = Some(start);
        self.end_offset = Some(end);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// The fixed set of fields extracted from a deed page.
///
/// Every key is always serialized; unresolved fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(rename = "Buyer Name")]
    pub buyer_name: String,
    #[serde(rename = "Seller Name")]
    pub seller_name: String,
    #[serde(rename = "Property Address")]
    pub property_address: String,
    #[serde(rename = "Date of Agreement")]
    pub date_of_agreement: String,
    #[serde(rename = "Sale Consideration")]
    pub sale_consideration: String,
    #[serde(rename = "Property ID / Survey Number")]
    pub property_id: String,
    #[serde(rename = "Registrar Office")]
    pub registrar_office: String,
    #[serde(rename = "Witness Names")]
    pub witness_names: String,
}

impl FieldRecord {
    /// Output keys in their fixed order.
    pub const KEYS: [&'static str; 8] = [
        "Buyer Name",
        "Seller Name",
        "Property Address",
        "Date of Agreement",
        "Sale Consideration",
        "Property ID / Survey Number",
        "Registrar Office",
        "Witness Names",
    ];

    /// Values paired with their keys, in `KEYS` order.
    pub fn entries(&self) -> [(&'static str, &str); 8] {
        [
            (Self::KEYS[0], self.buyer_name.as_str()),
            (Self::KEYS[1], self.seller_name.as_str()),
            (Self::KEYS[2], self.property_address.as_str()),
            (Self::KEYS[3], self.date_of_agreement.as_str()),
            (Self::KEYS[4], self.sale_consideration.as_str()),
            (Self::KEYS[5], self.property_id.as_str()),
            (Self::KEYS[6], self.registrar_office.as_str()),
            (Self::KEYS[7], self.witness_names.as_str()),
        ]
    }

    pub fn filled_count(&self) -> usize {
        self.entries().iter().filter(|(_, v)| !v.is_empty()).count()
    }
}

/// Extraction result for a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub fields: FieldRecord,
    pub confidence_avg: f64,
    /// 1-based page number within the source file.
    pub page: usize,
    pub source_file: String,
    pub confidence_threshold: f64,
}

/// All pages of a batch, in file upload order then page order.
pub type DocumentResult = Vec<PageResult>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_serializes_every_key() {
        let value = serde_json::to_value(FieldRecord::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 8);
        for key in FieldRecord::KEYS {
            assert_eq!(obj.get(key).and_then(|v| v.as_str()), Some(""));
        }
    }

    #[test]
    fn test_record_key_order_matches_keys() {
        let json = serde_json::to_string(&FieldRecord::default()).unwrap();
        let mut last = 0;
        for key in FieldRecord::KEYS {
            let pos = json.find(key).unwrap();
            assert!(pos >= last, "{} out of order", key);
            last = pos;
        }
    }

    #[test]
    fn test_span_accepts_pipeline_aliases() {
        let span: RecognizedSpan = serde_json::from_str(
            r#"{"word": "Paula M. Byrens", "entity_group": "PER", "score": 0.99, "start": 4, "end": 19}"#,
        )
        .unwrap();
        assert_eq!(span.text, "Paula M. Byrens");
        assert_eq!(span.label, "PER");
        assert_eq!(span.start_offset, Some(4));
        assert_eq!(span.end_offset, Some(19));
    }

    #[test]
    fn test_span_missing_fields_default_empty() {
        let span: RecognizedSpan = serde_json::from_str(r#"{"label": "DATE"}"#).unwrap();
        assert!(span.text.is_empty());
        assert!(span.start_offset.is_none());
    }

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox { left: 10, top: 20, width: 30, height: 10 };
        let b = BoundingBox { left: 50, top: 18, width: 20, height: 15 };
        let u = a.union(&b);
        assert_eq!(u, BoundingBox { left: 10, top: 18, width: 60, height: 15 });
    }
}
