//! Pattern-based entity extraction for deeds and property records.
//!
//! Each profile is a list of regex patterns tagged with a label and a
//! priority. Overlapping matches are resolved by earliest start, then
//! priority, then length.

use super::EntityExtractor;
use crate::models::RecognizedSpan;
use crate::utils::text::CharIndex;
use crate::utils::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;

const MONTHS: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sept?(?:ember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";
const ROLES: &str = r"(?i:grantors?|grantees?|buyers?|sellers?|purchasers?|vendors?|vendees?)";
const NAME: &str = r"\p{Lu}[\p{L}'.\-]*(?:[ \t]+\p{Lu}[\p{L}'.\-]*){1,3}";
const AMOUNT: &str = r"(?:\$|Rs\.?|INR)?[ \t]?(?:\d{1,3}(?:,\d{2,3})+|\d+)(?:\.\d{2})?(?:/-)?(?:[ \t]+(?i:dollars))?";

/// Which pattern families an extractor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternProfile {
    /// Persons, dates and money.
    Small,
    /// `Small` plus places, street addresses and long-form dates.
    Large,
    /// `Large` plus deed vocabulary: role-tagged parties, registration
    /// dates, consideration, property descriptions and witnesses.
    Legal,
}

struct EntityPattern {
    label: &'static str,
    regex: Regex,
    /// Lower wins when two matches start at the same position.
    priority: u8,
    /// Capture group holding the span; the whole match when `None`.
    group: Option<&'static str>,
    check: Option<fn(&str) -> bool>,
}

impl EntityPattern {
    fn new(label: &'static str, priority: u8, pattern: &str) -> Self {
        EntityPattern {
            label,
            regex: Regex::new(pattern).unwrap(),
            priority,
            group: None,
            check: None,
        }
    }

    fn span_group(mut self, name: &'static str) -> Self {
        self.group = Some(name);
        self
    }

    fn checked(mut self, check: fn(&str) -> bool) -> Self {
        self.check = Some(check);
        self
    }
}

lazy_static! {
    // Capitalized words that start person-shaped runs in deeds but are never
    // part of a name.
    static ref NOT_NAME_WORDS: HashSet<&'static str> = [
        "A", "ALL", "AND", "APN", "AVENUE", "BANK", "BETWEEN", "BLOCK", "BOOK", "BUYER",
        "BY", "CALIFORNIA", "CITY", "CLERK", "COMPANY", "CORPORATION", "COUNTY", "COURT",
        "DATED", "DEED", "DOLLARS", "DOCUMENT", "ESCROW", "EXHIBIT", "FOR", "GRANT",
        "GRANTEE", "GRANTEES", "GRANTOR", "GRANTORS", "HEREBY", "IN", "INC", "KNOW", "LAND",
        "LLC", "LOT", "MAIL", "MEN", "NO", "NOTARY", "OF", "OFFICE", "ORDER", "PAGE",
        "PARCEL", "PLOT", "PRESENTS", "PROPERTY", "PUBLIC", "PURCHASER", "QUITCLAIM",
        "RANGE", "RECORDED", "RECORDER", "RECORDING", "REGISTRAR", "REQUESTED", "ROAD",
        "SAID", "SECTION", "SELLER", "STATE", "STATEMENTS", "STREET", "SUB", "SURVEY",
        "TAX", "THAT", "THE", "THESE", "THIS", "TO", "TOWNSHIP", "TRUST", "TRUSTEE",
        "VENDEE", "VENDOR", "WARRANTY", "WHEN", "WHEREAS", "WITNESS", "WITNESSETH",
        "JANUARY", "FEBRUARY", "MARCH", "APRIL", "MAY", "JUNE", "JULY", "AUGUST",
        "SEPTEMBER", "OCTOBER", "NOVEMBER", "DECEMBER",
    ]
    .into_iter()
    .collect();

    static ref SMALL_PATTERNS: Vec<EntityPattern> = small_patterns();
    static ref LARGE_PATTERNS: Vec<EntityPattern> = large_patterns();
    static ref LEGAL_PATTERNS: Vec<EntityPattern> = legal_patterns();
}

fn plausible_person(text: &str) -> bool {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == '.' || c == ',').to_uppercase())
        .collect();
    // Initials ("A.", "M.") are neither counted nor checked as words.
    let words: Vec<&String> = tokens.iter().filter(|t| t.chars().count() > 1).collect();
    words.len() >= 2 && !words.iter().any(|t| NOT_NAME_WORDS.contains(t.as_str()))
}

fn small_patterns() -> Vec<EntityPattern> {
    vec![
        EntityPattern::new(
            "DATE",
            2,
            &format!(r"(?i)\b{}\.?[ \t]+\d{{1,2}}(?:st|nd|rd|th)?,?[ \t]+\d{{4}}\b", MONTHS),
        ),
        EntityPattern::new("DATE", 2, r"\b\d{1,2}[/-]\d{1,2}[/-](?:\d{4}|\d{2})\b"),
        EntityPattern::new(
            "MONEY",
            2,
            r"\$[ \t]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?|(?:Rs\.?|INR|₹)[ \t]?(?:\d{1,3}(?:,\d{2,3})+|\d+)(?:\.\d{2})?(?:/-)?",
        ),
        EntityPattern::new(
            "MONEY",
            3,
            r"(?i)\b(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?[ \t]+dollars\b",
        ),
        EntityPattern::new(
            "PERSON",
            4,
            r"\b\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\.)?(?:[ \t]+\p{Lu}\p{Ll}+(?:-\p{Lu}\p{Ll}+)?){1,2}\b",
        )
        .checked(plausible_person),
        EntityPattern::new(
            "PERSON",
            4,
            r"\b\p{Lu}{2,}(?:[ \t]+\p{Lu}\.)?(?:[ \t]+\p{Lu}{2,}(?:-\p{Lu}{2,})?){1,2}\b",
        )
        .checked(plausible_person),
    ]
}

fn large_patterns() -> Vec<EntityPattern> {
    let mut patterns = small_patterns();
    patterns.extend([
        EntityPattern::new(
            "DATE",
            1,
            &format!(
                r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?[ \t]+day[ \t]+of[ \t]+{},?[ \t]+(?:A\.?D\.?[ \t]+)?\d{{4}}\b",
                MONTHS
            ),
        ),
        EntityPattern::new(
            "DATE",
            2,
            &format!(r"(?i)\b\d{{1,2}}[ \t]+{}\.?,?[ \t]+\d{{4}}\b", MONTHS),
        ),
        EntityPattern::new(
            "GPE",
            3,
            r"\b(?i:city|county|state|town|village|parish)[ \t]+(?i:of)[ \t]+[A-Z][A-Za-z]+(?:[ \t]+[A-Z][A-Za-z]+){0,2}",
        ),
        EntityPattern::new("GPE", 3, r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)?[ \t]+County\b"),
        EntityPattern::new(
            "FAC",
            1,
            r"\b\d{1,6}[ \t]+(?:[NSEW]\.?[ \t]+)?(?:[A-Z][A-Za-z]+[ \t]+){1,3}(?i:street|st|avenue|ave|road|rd|lane|ln|drive|dr|boulevard|blvd|court|ct|way|place|pl|circle|cir|highway|hwy|terrace|parkway|pkwy)\b\.?",
        ),
    ]);
    patterns
}

fn legal_patterns() -> Vec<EntityPattern> {
    let mut patterns = large_patterns();
    patterns.extend([
        EntityPattern::new(
            "NAME",
            0,
            &format!(
                r"\b{name}(?:[ \t]+(?i:and)[ \t]+{name})?,?[ \t]+(?:(?i:as)[ \t]+)?(?:(?i:the)[ \t]+)?{roles}\b",
                name = NAME,
                roles = ROLES
            ),
        ),
        EntityPattern::new(
            "NAME",
            0,
            &format!(r"\b{roles}[ \t]*[:\-][ \t]*{name}", roles = ROLES, name = NAME),
        ),
        EntityPattern::new(
            "REG_DATE",
            0,
            &format!(
                r"(?i:recorded|registered|filed)(?:[ \t]+(?i:on|this))?[ \t]+(?P<span>{}\.?[ \t]+\d{{1,2}}(?:st|nd|rd|th)?,?[ \t]+\d{{4}}|\d{{1,2}}[/-]\d{{1,2}}[/-]\d{{2,4}})",
                MONTHS
            ),
        )
        .span_group("span"),
        EntityPattern::new(
            "AMOUNT",
            0,
            &format!(r"(?i:consideration|sum)[ \t]+(?i:of)[ \t]+(?P<span>{})", AMOUNT),
        )
        .span_group("span"),
        EntityPattern::new(
            "ADDRESS",
            0,
            r"(?i:commonly[ \t]+known[ \t]+as|situated[ \t]+at|located[ \t]+at|property[ \t]+address)[ \t]*:?[ \t]*(?P<span>[0-9A-Za-z][^\n;]{4,119})",
        )
        .span_group("span"),
        EntityPattern::new(
            "WITNESS",
            0,
            &format!(r"\b(?i:witness(?:es)?)[ \t]*\d*[ \t]*:[ \t]*{}", NAME),
        ),
    ]);
    patterns
}

struct Candidate<'a> {
    start: usize,
    end: usize,
    priority: u8,
    label: &'static str,
    text: &'a str,
}

fn find_candidates<'a>(patterns: &[EntityPattern], text: &'a str) -> Vec<Candidate<'a>> {
    let mut candidates = Vec::new();
    for pattern in patterns {
        for caps in pattern.regex.captures_iter(text) {
            let m = match pattern.group {
                Some(name) => caps.name(name),
                None => caps.get(0),
            };
            let m = match m {
                Some(m) => m,
                None => continue,
            };
            // Abbreviation dots ("Ave.", "A.D.") stay on these labels.
            let keep_dots = matches!(pattern.label, "PERSON" | "FAC" | "DATE");
            let trimmed = m
                .as_str()
                .trim_end_matches(|c: char| c == ',' || c.is_whitespace() || (c == '.' && !keep_dots));
            if trimmed.is_empty() {
                continue;
            }
            if let Some(check) = pattern.check {
                if !check(trimmed) {
                    continue;
                }
            }
            candidates.push(Candidate {
                start: m.start(),
                end: m.start() + trimmed.len(),
                priority: pattern.priority,
                label: pattern.label,
                text: trimmed,
            });
        }
    }
    candidates
}

/// Keep a non-overlapping subset: earliest start, then priority, then longest.
fn resolve_overlaps(mut candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    candidates.sort_by_key(|c| (c.start, c.priority, Reverse(c.end - c.start)));
    let mut kept: Vec<Candidate<'_>> = Vec::new();
    let mut covered_until = 0;
    for candidate in candidates {
        if candidate.start < covered_until {
            continue;
        }
        covered_until = candidate.end;
        kept.push(candidate);
    }
    kept
}

/// Rule-driven extractor over one `PatternProfile`.
pub struct PatternExtractor {
    name: String,
    profile: PatternProfile,
}

impl PatternExtractor {
    pub fn new(name: &str, profile: PatternProfile) -> Self {
        PatternExtractor {
            name: name.to_string(),
            profile,
        }
    }

    fn patterns(&self) -> &'static [EntityPattern] {
        match self.profile {
            PatternProfile::Small => &SMALL_PATTERNS,
            PatternProfile::Large => &LARGE_PATTERNS,
            PatternProfile::Legal => &LEGAL_PATTERNS,
        }
    }
}

impl EntityExtractor for PatternExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, text: &str) -> Result<Vec<RecognizedSpan>> {
        let index = CharIndex::new(text);
        let spans = resolve_overlaps(find_candidates(self.patterns(), text))
            .into_iter()
            .map(|c| {
                RecognizedSpan::new(c.text, c.label)
                    .with_offsets(index.char_offset(c.start), index.char_offset(c.end))
            })
            .collect();
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(profile: PatternProfile, text: &str) -> Vec<(String, String)> {
        PatternExtractor::new("test", profile)
            .extract(text)
            .unwrap()
            .into_iter()
            .map(|s| (s.text, s.label))
            .collect()
    }

    fn has(spans: &[(String, String)], text: &str, label: &str) -> bool {
        spans.iter().any(|(t, l)| t == text && l == label)
    }

    #[test]
    fn test_small_profile_basics() {
        let spans = extract(
            PatternProfile::Small,
            "On March 27, 2003 Paula M. Byrens paid $698.50 to Robert Lee.",
        );
        assert!(has(&spans, "March 27, 2003", "DATE"));
        assert!(has(&spans, "Paula M. Byrens", "PERSON"));
        assert!(has(&spans, "$698.50", "MONEY"));
        assert!(has(&spans, "Robert Lee", "PERSON"));
    }

    #[test]
    fn test_small_profile_has_no_places() {
        let spans = extract(PatternProfile::Small, "1234 Oak Lane in the County of Contra Costa");
        assert!(spans.iter().all(|(_, l)| l != "FAC" && l != "GPE"));
    }

    #[test]
    fn test_person_stopwords_filtered() {
        let spans = extract(PatternProfile::Small, "WARRANTY DEED\nKnow All Men By These Presents");
        assert!(spans.is_empty(), "{:?}", spans);
    }

    #[test]
    fn test_uppercase_names() {
        let spans = extract(PatternProfile::Small, "JOHN A. SMITH and MARY SMITH");
        assert!(has(&spans, "JOHN A. SMITH", "PERSON"));
        assert!(has(&spans, "MARY SMITH", "PERSON"));
    }

    #[test]
    fn test_middle_initial_a_is_kept() {
        let spans = extract(
            PatternProfile::Large,
            "Paula A. Byrens hereby GRANT(S) to Robert B. Lee",
        );
        assert!(has(&spans, "Paula A. Byrens", "PERSON"), "{:?}", spans);
        assert!(has(&spans, "Robert B. Lee", "PERSON"), "{:?}", spans);
    }

    #[test]
    fn test_plausible_person_ignores_initials() {
        assert!(plausible_person("JOHN A. SMITH"));
        assert!(!plausible_person("A. SMITH"));
        assert!(!plausible_person("A Deed Poll"));
    }

    #[test]
    fn test_large_profile_places() {
        let spans = extract(
            PatternProfile::Large,
            "real property at 1234 Oak Lane, City of Walnut Creek, Contra Costa County",
        );
        assert!(has(&spans, "1234 Oak Lane", "FAC"));
        assert!(has(&spans, "City of Walnut Creek", "GPE"));
        assert!(has(&spans, "Contra Costa County", "GPE"));
    }

    #[test]
    fn test_large_profile_long_dates() {
        let spans = extract(PatternProfile::Large, "Dated this 4th day of July, A.D. 1998 and 12 May 2001");
        assert!(has(&spans, "4th day of July, A.D. 1998", "DATE"));
        assert!(has(&spans, "12 May 2001", "DATE"));
    }

    #[test]
    fn test_legal_role_phrases() {
        let spans = extract(
            PatternProfile::Legal,
            "JOHN SMITH, Grantor, and Grantee: Jane Doe\nWitness 1: Mary Poe",
        );
        assert!(has(&spans, "JOHN SMITH, Grantor", "NAME"), "{:?}", spans);
        assert!(has(&spans, "Grantee: Jane Doe", "NAME"), "{:?}", spans);
        assert!(has(&spans, "Witness 1: Mary Poe", "WITNESS"), "{:?}", spans);
        assert!(!has(&spans, "Jane Doe", "PERSON"));
    }

    #[test]
    fn test_legal_amount_and_registration() {
        let spans = extract(
            PatternProfile::Legal,
            "for a consideration of Rs. 25,00,000/- registered on June 5, 2019",
        );
        assert!(has(&spans, "Rs. 25,00,000/-", "AMOUNT"), "{:?}", spans);
        assert!(has(&spans, "June 5, 2019", "REG_DATE"), "{:?}", spans);
    }

    #[test]
    fn test_legal_address_description() {
        let spans = extract(
            PatternProfile::Legal,
            "commonly known as 12 Oak Lane, Walnut Creek, CA 94597.\nnext line",
        );
        assert!(has(&spans, "12 Oak Lane, Walnut Creek, CA 94597", "ADDRESS"), "{:?}", spans);
    }

    #[test]
    fn test_offsets_are_character_positions() {
        let text = "Señor José hereby paid $10 to Ana María Ruiz";
        let spans = PatternExtractor::new("test", PatternProfile::Small).extract(text).unwrap();
        let ana = spans.iter().find(|s| s.text == "Ana María Ruiz").unwrap();
        // Byte offset of "Ana" is 32; two accented letters precede it.
        assert_eq!(ana.start_offset, Some(30));
        assert_eq!(ana.end_offset, Some(44));
    }

    #[test]
    fn test_spans_do_not_overlap_and_are_ordered() {
        let text = "Grantor: Robert Lee conveys 1234 Oak Lane on March 3, 2001 for $5,000";
        let spans = PatternExtractor::new("test", PatternProfile::Legal).extract(text).unwrap();
        let mut last_end = 0;
        for span in &spans {
            let start = span.start_offset.unwrap();
            assert!(start >= last_end, "{:?}", spans);
            last_end = span.end_offset.unwrap();
        }
    }
}
