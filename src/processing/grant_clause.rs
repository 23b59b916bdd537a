//! Grantor/grantee resolution from the position of the granting clause.
//!
//! Deeds list the conveying parties before "hereby GRANT(S) to" and the
//! receiving parties after it, so person entities are split by whether they
//! start before or after that anchor.

use crate::models::RecognizedSpan;
use crate::utils::text::char_offset;
use crate::utils::{DeedError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXHIBIT_MARKER: Regex = Regex::new(r"(?i)EXHIBIT A").unwrap();
    static ref GRANT_CLAUSE: Regex =
        Regex::new(r"(?i)\bhereby\s+grant\(s\)\s+to\b").unwrap();
}

/// Parties found on either side of the granting clause, joined with ", ".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantParties {
    pub grantor: String,
    pub grantee: String,
}

impl GrantParties {
    pub fn is_empty(&self) -> bool {
        self.grantor.is_empty() && self.grantee.is_empty()
    }
}

/// Character offset where the granting clause begins, ignoring anything from
/// the first "EXHIBIT A" onward.
pub fn find_grant_clause(full_text: &str) -> Option<usize> {
    let searchable = match EXHIBIT_MARKER.find(full_text) {
        Some(exhibit) => &full_text[..exhibit.start()],
        None => full_text,
    };
    GRANT_CLAUSE
        .find(searchable)
        .map(|m| char_offset(full_text, m.start()))
}

/// Partition person entities into grantors and grantees.
///
/// Returns empty parties when the text has no granting clause. Entities must
/// carry start offsets in the coordinate space of `full_text`; an entity
/// without one fails with `UnresolvedOffsets`.
pub fn resolve(full_text: &str, person_entities: &[RecognizedSpan]) -> Result<GrantParties> {
    let anchor = match find_grant_clause(full_text) {
        Some(anchor) => anchor,
        None => return Ok(GrantParties::default()),
    };

    let mut grantors = Vec::new();
    let mut grantees = Vec::new();
    for entity in person_entities {
        let start = entity
            .start_offset
            .ok_or_else(|| DeedError::UnresolvedOffsets(entity.text.clone()))?;
        let name = entity.text.trim();
        if name.is_empty() {
            continue;
        }
        if start < anchor {
            grantors.push(name);
        } else {
            grantees.push(name);
        }
    }

    Ok(GrantParties {
        grantor: grantors.join(", "),
        grantee: grantees.join(", "),
    })
}
