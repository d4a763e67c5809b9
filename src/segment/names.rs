//! Speaker name normalisation.

use std::sync::LazyLock;

use regex::Regex;

/// Titles stripped from the front of a name, in normalised form.
const TITLES: [&str; 17] = [
    "the", "hon", "honourable", "honorable", "sen", "senator", "dr", "mr", "mrs", "ms", "miss",
    "prof", "professor", "amb", "eng", "rt", "rtd",
];

/// Words naming a presiding role rather than a person.
const ROLE_WORDS: [&str; 7] = [
    "speaker",
    "deputy",
    "temporary",
    "chairperson",
    "chairman",
    "chair",
    "clerk",
];

/// Words that make a marker refer to a group of members.
const COLLECTIVE_WORDS: [&str; 6] = ["an", "some", "several", "members", "member", "all"];

#[allow(clippy::expect_used)]
static PARENTHESISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)?").expect("parenthesis regex is valid"));

#[allow(clippy::expect_used)]
static FIRST_PARENTHESISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("holder regex is valid"));

/// Normalises a name for matching.
///
/// Drops parenthesised text, strips leading titles, folds apostrophes,
/// treats hyphens and dots as separators, lowercases, and collapses
/// whitespace.
///
/// ```
/// use hansard_core::segment::normalize_name;
///
/// assert_eq!(normalize_name("Hon. (Dr.) Moses Wetang'ula (Bungoma, FORD-K)"), "moses wetangula");
/// assert_eq!(normalize_name("  Mr.  John   Mbadi-Ng'ongo "), "john mbadi ngongo");
/// ```
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let without_parens = PARENTHESISED.replace_all(raw, " ");
    let folded: String = without_parens
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}' | '`'))
        .map(|c| if c == '-' || c == '.' || c == ',' { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    let mut tokens: Vec<&str> = folded.split_whitespace().collect();
    let first_real = tokens
        .iter()
        .position(|t| !TITLES.contains(t))
        .unwrap_or(tokens.len());
    tokens.drain(..first_real);
    tokens.join(" ")
}

/// How a speaker marker should be attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerName {
    /// A named individual, normalised.
    Person(String),
    /// A group ("Hon. Members"); never attributed to one MP.
    Collective,
    /// A presiding role with no holder given ("The Speaker").
    Role,
}

/// Classifies a raw speaker marker and extracts the name to match.
///
/// For presiding officers the parenthesised holder is the person:
/// "The Speaker (Hon. Jane Doe)" matches as "jane doe".
#[must_use]
pub fn speaker_name(speaker_raw: &str) -> SpeakerName {
    let outside = PARENTHESISED.replace_all(speaker_raw, " ");
    let outside_tokens: Vec<String> = normalize_name(&outside)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let lead_tokens: Vec<String> = outside
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let is_role = !lead_tokens.is_empty()
        && lead_tokens
            .iter()
            .all(|t| ROLE_WORDS.contains(&t.as_str()) || TITLES.contains(&t.as_str()))
        && lead_tokens.iter().any(|t| ROLE_WORDS.contains(&t.as_str()));

    if is_role {
        return FIRST_PARENTHESISED
            .captures(speaker_raw)
            .map(|caps| normalize_name(&caps[1]))
            .filter(|name| !name.is_empty())
            .map_or(SpeakerName::Role, SpeakerName::Person);
    }

    if !outside_tokens.is_empty()
        && outside_tokens
            .iter()
            .all(|t| COLLECTIVE_WORDS.contains(&t.as_str()) || TITLES.contains(&t.as_str()))
        && outside_tokens
            .iter()
            .any(|t| t == "members" || t == "member")
    {
        return SpeakerName::Collective;
    }

    let name = normalize_name(speaker_raw);
    if name.is_empty() {
        SpeakerName::Role
    } else {
        SpeakerName::Person(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_repeated_titles() {
        assert_eq!(normalize_name("The Hon. Dr. Jane Doe"), "jane doe");
        assert_eq!(normalize_name("Sen. Prof. Amb. X Y"), "x y");
    }

    #[test]
    fn test_normalize_keeps_title_words_after_the_name_starts() {
        assert_eq!(normalize_name("Hon. Miss World Mr"), "world mr");
    }

    #[test]
    fn test_normalize_handles_empty_and_unbalanced_input() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("Hon. ("), "");
        assert_eq!(normalize_name("Hon. Jane (Nairobi"), "jane");
    }

    #[test]
    fn test_presiding_officer_uses_holder_name() {
        assert_eq!(
            speaker_name("The Speaker (Hon. Moses Wetang'ula)"),
            SpeakerName::Person("moses wetangula".to_string())
        );
        assert_eq!(
            speaker_name("The Temporary Deputy Speaker (Hon. Jane Doe)"),
            SpeakerName::Person("jane doe".to_string())
        );
        assert_eq!(speaker_name("The Speaker"), SpeakerName::Role);
    }

    #[test]
    fn test_collective_markers() {
        assert_eq!(speaker_name("Hon. Members"), SpeakerName::Collective);
        assert_eq!(speaker_name("An Hon. Member"), SpeakerName::Collective);
        assert_eq!(speaker_name("Some Hon. Members"), SpeakerName::Collective);
    }

    #[test]
    fn test_member_with_constituency() {
        assert_eq!(
            speaker_name("Hon. John Mbadi (Suba South, ODM)"),
            SpeakerName::Person("john mbadi".to_string())
        );
    }
}
