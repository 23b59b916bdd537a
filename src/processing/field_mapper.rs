//! Rule-based mapping of recognized entities onto the fixed deed schema.

use super::normalize::normalize;
use crate::models::rules::{classify, Bucket, MAX_ADDRESS_PARTS};
use crate::models::{FieldRecord, RecognizedSpan};
use log::debug;

#[derive(Debug, Default)]
struct Candidates {
    buyers: Vec<String>,
    sellers: Vec<String>,
    address_parts: Vec<String>,
    money_vals: Vec<String>,
    dates: Vec<String>,
    witnesses: Vec<String>,
    others: Vec<String>,
}

impl Candidates {
    fn push(&mut self, bucket: Bucket, text: String) {
        let list = match bucket {
            Bucket::Buyer => &mut self.buyers,
            Bucket::Seller => &mut self.sellers,
            Bucket::Address => &mut self.address_parts,
            Bucket::Money => &mut self.money_vals,
            Bucket::Date => &mut self.dates,
            Bucket::Witness => &mut self.witnesses,
            Bucket::Other => &mut self.others,
        };
        list.push(text);
    }
}

/// Map entities to deed fields.
///
/// Total over any input: entities with an empty label or text are skipped
/// and unresolved fields stay empty. `Property ID / Survey Number` and
/// `Registrar Office` are never set here.
pub fn map_fields(entities: &[RecognizedSpan]) -> FieldRecord {
    let mut candidates = Candidates::default();

    for entity in entities {
        let label = entity.label.trim().to_uppercase();
        let text = normalize(&entity.text);
        if label.is_empty() || text.is_empty() {
            continue;
        }
        let bucket = classify(&text.to_lowercase(), &label);
        candidates.push(bucket, text);
    }

    debug!(
        "Mapped candidates: {} buyer, {} seller, {} address, {} money, {} date, {} witness, {} other",
        candidates.buyers.len(),
        candidates.sellers.len(),
        candidates.address_parts.len(),
        candidates.money_vals.len(),
        candidates.dates.len(),
        candidates.witnesses.len(),
        candidates.others.len()
    );

    assign(&candidates)
}

fn assign(c: &Candidates) -> FieldRecord {
    let mut fields = FieldRecord::default();

    // Both person fallbacks index the same pool without consuming it.
    fields.buyer_name = if !c.buyers.is_empty() {
        c.buyers.join(", ")
    } else {
        c.others.first().cloned().unwrap_or_default()
    };
    fields.seller_name = if !c.sellers.is_empty() {
        c.sellers.join(", ")
    } else {
        c.others.get(1).cloned().unwrap_or_default()
    };

    let address_len = c.address_parts.len().min(MAX_ADDRESS_PARTS);
    fields.property_address = c.address_parts[..address_len].join(", ");
    fields.date_of_agreement = c.dates.first().cloned().unwrap_or_default();
    fields.sale_consideration = c.money_vals.first().cloned().unwrap_or_default();
    fields.witness_names = c.witnesses.join(", ");

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, label: &str) -> RecognizedSpan {
        RecognizedSpan::new(text, label)
    }

    #[test]
    fn test_empty_input_yields_all_keys_empty() {
        let fields = map_fields(&[]);
        assert_eq!(fields, FieldRecord::default());
        assert!(fields.entries().iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_keyword_precedence_over_person_label() {
        let fields = map_fields(&[span("The Buyer", "PERSON")]);
        assert_eq!(fields.buyer_name, "The Buyer");
        assert_eq!(fields.seller_name, "");
    }

    #[test]
    fn test_person_fallback_uses_first_two_others() {
        let fields = map_fields(&[span("Alice", "PERSON"), span("Bob", "PERSON")]);
        assert_eq!(fields.buyer_name, "Alice");
        assert_eq!(fields.seller_name, "Bob");
    }

    #[test]
    fn test_single_other_fills_only_buyer() {
        let fields = map_fields(&[span("Alice", "PERSON")]);
        assert_eq!(fields.buyer_name, "Alice");
        assert_eq!(fields.seller_name, "");
    }

    #[test]
    fn test_seller_fallback_ignores_buyer_keyword_hit() {
        // Buyer came from a keyword, yet the seller fallback still reads
        // others[1], not others[0].
        let fields = map_fields(&[
            span("Purchaser Jane Doe", "PERSON"),
            span("Alice", "PERSON"),
            span("Bob", "ORG"),
        ]);
        assert_eq!(fields.buyer_name, "Purchaser Jane Doe");
        assert_eq!(fields.seller_name, "Bob");
    }

    #[test]
    fn test_keyword_candidates_joined() {
        let fields = map_fields(&[
            span("Grantor John Smith", "PERSON"),
            span("Vendor Acme LLC", "ORG"),
            span("Grantee Jane Doe", "PERSON"),
        ]);
        assert_eq!(fields.seller_name, "Grantor John Smith, Vendor Acme LLC");
        assert_eq!(fields.buyer_name, "Grantee Jane Doe");
    }

    #[test]
    fn test_first_money_and_date_win() {
        let fields = map_fields(&[
            span("$1,000", "MONEY"),
            span("$250,000.00", "MONEY"),
            span("May 1, 2020", "DATE"),
            span("June 2, 2021", "REG_DATE"),
        ]);
        assert_eq!(fields.sale_consideration, "1,000");
        assert_eq!(fields.date_of_agreement, "May 1, 2020");
    }

    #[test]
    fn test_address_capped_at_three_parts() {
        let fields = map_fields(&[
            span("12 Oak Lane", "FAC"),
            span("Walnut Creek", "GPE"),
            span("Contra Costa County", "LOC"),
            span("California", "GPE"),
        ]);
        assert_eq!(fields.property_address, "12 Oak Lane, Walnut Creek, Contra Costa County");
    }

    #[test]
    fn test_witnesses_joined() {
        let fields = map_fields(&[
            span("Witness: Mary Poe", "WITNESS"),
            span("WITNESS Tom Hale", "MISC"),
        ]);
        assert_eq!(fields.witness_names, "Witness Mary Poe, WITNESS Tom Hale");
    }

    #[test]
    fn test_skips_empty_label_or_text() {
        let fields = map_fields(&[
            span("Alice", ""),
            span("   ", "PERSON"),
            span("@@", "PERSON"),
            span("Bob", " person "),
        ]);
        assert_eq!(fields.buyer_name, "Bob");
        assert_eq!(fields.seller_name, "");
    }

    #[test]
    fn test_label_case_insensitive_and_text_normalized() {
        let fields = map_fields(&[span("##Walnut Creek!", "gpe")]);
        assert_eq!(fields.property_address, "Walnut Creek");
    }

    #[test]
    fn test_identifier_fields_never_set() {
        let fields = map_fields(&[
            span("Survey No. 14/2", "PROPERTY_ID"),
            span("Sub-Registrar Office", "ORG"),
        ]);
        assert_eq!(fields.property_id, "");
        assert_eq!(fields.registrar_office, "");
    }

    #[test]
    fn test_mapping_is_repeatable() {
        let entities = vec![
            span("Alice", "PERSON"),
            span("$5", "MONEY"),
            span("Seller Bob", "PERSON"),
        ];
        assert_eq!(map_fields(&entities), map_fields(&entities));
    }
}
