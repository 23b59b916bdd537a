// Rule tables for mapping recognized entities onto deed fields.
// Keyword rules are matched against lower-cased normalized text, label rules
// against upper-cased trimmed labels.

pub const BUYER_KEYWORDS: &[&str] = &["grantee", "buyer", "purchaser", "vendee"];
pub const SELLER_KEYWORDS: &[&str] = &["grantor", "seller", "vendor"];
pub const PERSON_LABELS: &[&str] = &["PERSON", "NAME"];
pub const ADDRESS_LABELS: &[&str] = &["GPE", "LOC", "FAC", "ADDRESS"];
pub const MONEY_LABELS: &[&str] = &["MONEY", "AMOUNT"];
pub const DATE_LABELS: &[&str] = &["DATE", "REG_DATE"];
pub const WITNESS_KEYWORD: &str = "witness";

/// Maximum number of address parts joined into `Property Address`.
pub const MAX_ADDRESS_PARTS: usize = 3;

/// Accumulator an entity is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Buyer,
    Seller,
    Address,
    Money,
    Date,
    Witness,
    /// Fallback pool; also receives person-labelled entities.
    Other,
}

#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    TextContainsAny(&'static [&'static str]),
    LabelIn(&'static [&'static str]),
}

impl Matcher {
    pub fn matches(&self, text_lower: &str, label: &str) -> bool {
        match self {
            Matcher::TextContainsAny(keywords) => keywords.iter().any(|k| text_lower.contains(k)),
            Matcher::LabelIn(labels) => labels.contains(&label),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MappingRule {
    pub matcher: Matcher,
    pub bucket: Bucket,
}

/// Checked in order; the first match wins. Entities matching none go to
/// `Bucket::Other`.
pub const MAPPING_RULES: [MappingRule; 7] = [
    MappingRule { matcher: Matcher::TextContainsAny(BUYER_KEYWORDS), bucket: Bucket::Buyer },
    MappingRule { matcher: Matcher::TextContainsAny(SELLER_KEYWORDS), bucket: Bucket::Seller },
    MappingRule { matcher: Matcher::LabelIn(PERSON_LABELS), bucket: Bucket::Other },
    MappingRule { matcher: Matcher::LabelIn(ADDRESS_LABELS), bucket: Bucket::Address },
    MappingRule { matcher: Matcher::LabelIn(MONEY_LABELS), bucket: Bucket::Money },
    MappingRule { matcher: Matcher::LabelIn(DATE_LABELS), bucket: Bucket::Date },
    MappingRule { matcher: Matcher::TextContainsAny(&[WITNESS_KEYWORD]), bucket: Bucket::Witness },
];

/// Route an entity by the first matching rule.
pub fn classify(text_lower: &str, label: &str) -> Bucket {
    MAPPING_RULES
        .iter()
        .find(|rule| rule.matcher.matches(text_lower, label))
        .map(|rule| rule.bucket)
        .unwrap_or(Bucket::Other)
}
