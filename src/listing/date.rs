//! Sitting date and period parsing from listing titles and file names.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::document::SessionPeriod;

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec";

/// "4th December 2025", "4 Dec, 2025", "Thursday 04 December 2025"
#[allow(clippy::expect_used)]
static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?(?:\s+of)?[\s,_-]+({MONTHS})\.?[\s,_-]+(\d{{4}})\b"
    ))
    .expect("day-month-year regex is valid") // Static pattern, safe to panic
});

/// "December 4, 2025", "Dec 4th 2025"
#[allow(clippy::expect_used)]
static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTHS})\.?[\s_-]+(\d{{1,2}})(?:st|nd|rd|th)?,?[\s_-]+(\d{{4}})\b"
    ))
    .expect("month-day-year regex is valid") // Static pattern, safe to panic
});

/// "2025-12-04", "2025_12_04"
#[allow(clippy::expect_used)]
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})[-_.](\d{2})[-_.](\d{2})\b").expect("ISO date regex is valid")
});

/// "04.12.2025", "04/12/2025", "4-12-2025" (day first)
#[allow(clippy::expect_used)]
static NUMERIC_DMY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b").expect("numeric date regex is valid")
});

/// Period keyword as a whole word.
#[allow(clippy::expect_used)]
static PERIOD_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(morning|afternoon|evening)\b").expect("period regex is valid")
});

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Parses the first recognisable date in `text`.
///
/// ```
/// use chrono::NaiveDate;
/// use hansard_core::listing::parse_date;
///
/// assert_eq!(
///     parse_date("Afternoon Session - 4th December 2025"),
///     NaiveDate::from_ymd_opt(2025, 12, 4)
/// );
/// assert_eq!(parse_date("Order Paper"), None);
/// ```
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DAY_MONTH_YEAR.captures(text)
        && let Some(date) = month_number(&caps[2]).and_then(|m| ymd(&caps[3], m, &caps[1]))
    {
        return Some(date);
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(text)
        && let Some(date) = month_number(&caps[1]).and_then(|m| ymd(&caps[3], m, &caps[2]))
    {
        return Some(date);
    }
    if let Some(caps) = ISO_DATE.captures(text)
        && let Some(date) = caps[2].parse().ok().and_then(|m| ymd(&caps[1], m, &caps[3]))
    {
        return Some(date);
    }
    NUMERIC_DMY
        .captures(text)
        .and_then(|caps| caps[2].parse().ok().and_then(|m| ymd(&caps[3], m, &caps[1])))
}

/// Parses the period-of-day keyword in `text`.
#[must_use]
pub fn parse_period(text: &str) -> SessionPeriod {
    match PERIOD_KEYWORD
        .captures(text)
        .map(|caps| caps[1].to_ascii_lowercase())
        .as_deref()
    {
        Some("morning") => SessionPeriod::Morning,
        Some("afternoon") => SessionPeriod::Afternoon,
        Some("evening") => SessionPeriod::Evening,
        _ => SessionPeriod::Unknown,
    }
}

/// Returns the URL-decoded last path segment of `url`, if any.
#[must_use]
pub fn decoded_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(segment).ok()?;
    Some(decoded.replace('+', " "))
}

/// Parses date and period from the title, falling back to the file name.
#[must_use]
pub fn parse_title_and_url(title: &str, url: &str) -> (Option<NaiveDate>, SessionPeriod) {
    // Underscores are word characters and would defeat `\b` anchors.
    let file_name = decoded_file_name(url).map(|name| name.replace('_', " "));

    let date = parse_date(title).or_else(|| file_name.as_deref().and_then(parse_date));

    let mut period = parse_period(title);
    if period == SessionPeriod::Unknown
        && let Some(name) = file_name.as_deref()
    {
        period = parse_period(name);
    }

    (date, period)
}
