//! Bill references cited in a statement.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// "The Finance Bill, 2025", "The Kenya Roads (Amendment) Bill 2024" or
/// "National Assembly Bill No. 12 of 2025".
///
/// Title words are ASCII: a repeated Unicode letter class compiles past the
/// default regex size limit.
#[allow(clippy::expect_used)]
static BILL_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:[Tt]he\s+)?
        (?:(?:[A-Z][A-Za-z'’\-]*|\([A-Za-z\ ]{2,40}\))\s+(?:(?:of|and|for|on|in|the|to)\s+)?){1,10}
        Bill,?\s*(?:19|20)\d{2}\b
        |
        (?:National\s+Assembly|Senate)\s+Bills?\s+No\.?\s*\d+\s+of\s+(?:19|20)\d{2}\b
        ",
    )
    .expect("bill reference regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static INTERNAL_THE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\sthe\s").expect("article regex is valid"));

/// Trims leading sentence words off a match: "Yesterday the Finance Bill,
/// 2025" becomes "The Finance Bill, 2025".
fn canonical(found: &str) -> String {
    let collapsed = found.split_whitespace().collect::<Vec<_>>().join(" ");
    let starts_with_article = collapsed
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("the "));

    let trimmed = if starts_with_article {
        collapsed.as_str()
    } else {
        INTERNAL_THE
            .find_iter(&collapsed)
            .last()
            .map_or(collapsed.as_str(), |m| &collapsed[m.start() + 1..])
    };

    match trimmed.strip_prefix("the ") {
        Some(tail) => format!("The {tail}"),
        None => trimmed.to_string(),
    }
}

/// Extracts bill references in order of first appearance, without
/// case-insensitive duplicates.
///
/// ```
/// use hansard_core::segment::extract_bill_references;
///
/// let refs = extract_bill_references(
///     "I beg to move that the Finance Bill, 2025 be now read. The Finance Bill, 2025 \
///      amends National Assembly Bill No. 12 of 2025.",
/// );
/// assert_eq!(refs, vec!["The Finance Bill, 2025", "National Assembly Bill No. 12 of 2025"]);
/// ```
#[must_use]
pub fn extract_bill_references(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    BILL_REFERENCE
        .find_iter(text)
        .map(|m| canonical(m.as_str()))
        .filter(|bill| seen.insert(bill.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_pattern_compiles_within_size_limit() {
        assert!(BILL_REFERENCE.is_match("the Finance Bill, 2025"));
    }

    #[test]
    fn test_non_ascii_text_does_not_panic() {
        assert!(extract_bill_references("Ülkü Öztürk’s motion — ñ … 2025").is_empty());
    }

    #[test]
    fn test_amendment_bill_with_parenthesised_qualifier() {
        assert_eq!(
            extract_bill_references("Debate on The Kenya Roads (Amendment) Bill, 2024 resumed."),
            vec!["The Kenya Roads (Amendment) Bill, 2024"]
        );
    }

    #[test]
    fn test_leading_sentence_words_are_dropped() {
        assert_eq!(
            extract_bill_references("Yesterday the Finance Bill, 2025 was passed."),
            vec!["The Finance Bill, 2025"]
        );
    }

    #[test]
    fn test_bill_without_year_is_ignored() {
        assert!(extract_bill_references("The Bill of Rights protects everyone.").is_empty());
        assert!(extract_bill_references("the bill").is_empty());
        assert!(extract_bill_references("").is_empty());
    }

    #[test]
    fn test_senate_numbered_bill() {
        assert_eq!(
            extract_bill_references("See Senate Bills No. 5 of 2024 and Senate Bills No. 5 of 2024."),
            vec!["Senate Bills No. 5 of 2024"]
        );
    }
}
