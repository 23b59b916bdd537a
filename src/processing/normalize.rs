use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Word characters, whitespace and address punctuation survive.
    static ref DISALLOWED_CHARS: Regex = Regex::new(r"[^\w\s.,/-]").unwrap();
}

/// Sub-word continuation marker left by WordPiece-style tokenizers.
const CONTINUATION_MARKER: &str = "##";

/// Clean a recognized span before classification.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let unmarked = trimmed.strip_prefix(CONTINUATION_MARKER).unwrap_or(trimmed);
    DISALLOWED_CHARS.replace_all(unmarked, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_continuation_marker() {
        assert_eq!(normalize("##Smith"), "Smith");
        assert_eq!(normalize("  ##son "), "son");
    }

    #[test]
    fn test_only_one_marker_removed() {
        assert_eq!(normalize("####x"), "x");
        assert_eq!(normalize("#x"), "x");
    }

    #[test]
    fn test_keeps_name_punctuation() {
        assert_eq!(normalize(" John, Q. Public "), "John, Q. Public");
    }

    #[test]
    fn test_strips_symbols() {
        assert_eq!(normalize("J@hn!"), "Jhn");
        assert_eq!(normalize("$698.50"), "698.50");
    }

    #[test]
    fn test_keeps_address_punctuation() {
        assert_eq!(normalize("Survey No. 12/4-B, (Plot 7)"), "Survey No. 12/4-B, Plot 7");
    }

    #[test]
    fn test_trims_after_stripping() {
        assert_eq!(normalize("\"Walnut Creek\" "), "Walnut Creek");
        assert_eq!(normalize("*** "), "");
        assert_eq!(normalize(""), "");
    }
}
