//! Property identifier and registrar office lookup over the page text.
//!
//! Entity extractors rarely tag these, so they are matched directly and
//! overlaid onto fields the mapper left empty.

use crate::models::FieldRecord;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PROPERTY_ID: Regex = Regex::new(
        r"(?x)
        \b(?i:survey\s+(?:no|number)|s\.\s*no|parcel\s+(?:id|no|number)|apn|property\s+id|plot\s+no)\b
        \.?\s*[:\#]?\s*
        ([0-9][0-9A-Za-z/\-]*|[A-Za-z]{1,3}[-\ ]?[0-9][0-9A-Za-z/\-]*)"
    )
    .unwrap();
    static ref REGISTRAR_OFFICE: Regex = Regex::new(
        r"(?x)
        (?:(?i:sub)[\ -]?)?(?i:registrar)(?:\s+(?i:of)\s+(?i:deeds|assurances))?(?:'s)?\s+(?i:office)
            (?:[\ \t]*(?:,|(?i:at))[\ \t]*[A-Z][A-Za-z]*(?:[\ \t]+[A-Z][A-Za-z]*)*)?
        | (?i:registrar\s+of\s+deeds)(?:[\ \t]*(?:,|(?i:for))[\ \t]*[A-Z][A-Za-z]*(?:[\ \t]+[A-Z][A-Za-z]*)*)?
        | (?:[A-Z][a-z]+[\ \t]+){0,2}(?i:county\s+recorder)(?:(?i:'s\s+office))?"
    )
    .unwrap();
}

pub fn find_property_id(text: &str) -> Option<String> {
    PROPERTY_ID
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(&['-', '/'][..]).to_string())
        .filter(|id| !id.is_empty())
}

pub fn find_registrar_office(text: &str) -> Option<String> {
    REGISTRAR_OFFICE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
}

/// Fill the identifier fields that are still empty. Other fields are untouched.
pub fn overlay_identifiers(fields: &mut FieldRecord, full_text: &str) {
    if fields.property_id.is_empty() {
        if let Some(id) = find_property_id(full_text) {
            fields.property_id = id;
        }
    }
    if fields.registrar_office.is_empty() {
        if let Some(office) = find_registrar_office(full_text) {
            fields.registrar_office = office;
        }
    }
}
