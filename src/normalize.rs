//! Stateless value normalization: absent-token mapping, trimming, date/time
//! shape detection, and separator canonicalization.
//!
//! Canonicalization gives pattern detection a single shape to recognize:
//! date tokens use `-` between components, time tokens use `:`, and a
//! date-time value joins its halves with a single space. These helpers never
//! touch column state; the engine applies them only to values already typed
//! as Date, Time, or DateTime.

use std::sync::LazyLock;

use regex::Regex;

/// Tokens that map a raw string to an absent cell, compared case-insensitively
/// after trimming.
pub const DEFAULT_ABSENT_TOKENS: &[&str] = &["none", "null", ""];

static TIME_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-2]\d:[0-5]\d").expect("time shape regex"));
static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,4}[-/.]\d{2}[-/.]\d{2,4}").expect("date shape regex"));
static TIME_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}:[0-5]\d(?::[0-5]\d(?:\.\d+)?)?").expect("time token regex")
});
static MERIDIEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([ap]m)\b").expect("meridiem regex"));

/// Trims a raw string and maps sentinel tokens to `None`.
pub fn strip_text(value: &str, extra_absent_tokens: &[String]) -> Option<String> {
    let trimmed = value.trim();
    let absent = DEFAULT_ABSENT_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
        || extra_absent_tokens
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token));
    if absent { None } else { Some(trimmed.to_string()) }
}

/// True when the value contains an `HH:MM` time component.
pub fn has_time_shape(value: &str) -> bool {
    TIME_SHAPE.is_match(value)
}

/// True when the value contains a `\d{2,4} sep \d{2} sep \d{2,4}` date
/// component (separator `-`, `/`, or `.`).
pub fn has_date_shape(value: &str) -> bool {
    DATE_SHAPE.is_match(value)
}

/// Extracts the date-shaped token from a canonicalized value.
pub fn date_token(value: &str) -> Option<&str> {
    DATE_SHAPE.find(value).map(|m| m.as_str())
}

/// Extracts the time-shaped token (hour through optional fractional seconds)
/// and whether an AM/PM marker accompanies it.
pub fn time_token(value: &str) -> Option<(&str, bool)> {
    let token = TIME_TOKEN.find(value)?.as_str();
    Some((token, MERIDIEM.is_match(value)))
}

/// Unifies date separators: `/` and `.` both become `-`.
pub fn canonicalize_date(value: &str) -> String {
    value.replace(['/', '.'], "-")
}

/// Unifies time separators and the AM/PM marker case.
///
/// A `.` is treated as a field separator only when the time component carries
/// no `:` at all; a dot after an `HH:MM:SS` structure marks fractional
/// seconds and is preserved.
pub fn canonicalize_time(value: &str) -> String {
    let (head, rest) = match value.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, Some(rest)),
        None => (value, None),
    };
    let mut out = if head.contains(':') {
        head.to_string()
    } else {
        head.replace('.', ":")
    };
    if let Some(rest) = rest {
        out.push(' ');
        out.push_str(&uppercase_meridiem(rest.trim()));
    }
    out
}

/// Canonicalizes a combined date-time value: the `T` joiner becomes a space,
/// the date half gets date separators, the remainder gets time handling.
pub fn canonicalize_datetime(value: &str) -> String {
    let spaced = if !value.contains(' ') && value.contains('T') {
        value.replacen('T', " ", 1)
    } else {
        value.to_string()
    };
    match spaced.split_once(' ') {
        Some((date, time)) => format!(
            "{} {}",
            canonicalize_date(date),
            canonicalize_time(time.trim_start())
        ),
        None => canonicalize_date(&spaced),
    }
}

fn uppercase_meridiem(value: &str) -> String {
    MERIDIEM
        .replace_all(value, |caps: &regex::Captures<'_>| {
            caps[1].to_ascii_uppercase()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_text_maps_sentinels_to_absent() {
        assert_eq!(strip_text("  hello ", &[]), Some("hello".to_string()));
        assert_eq!(strip_text("None", &[]), None);
        assert_eq!(strip_text("NULL", &[]), None);
        assert_eq!(strip_text("   ", &[]), None);
        assert_eq!(strip_text("n/a", &["N/A".to_string()]), None);
    }

    #[test]
    fn shapes_match_like_the_source_data() {
        assert!(has_time_shape("14:30"));
        assert!(has_time_shape("2023-04-05 14:30:15"));
        assert!(!has_time_shape("14.30"));
        assert!(has_date_shape("2023-04-05"));
        assert!(has_date_shape("03/04/05"));
        assert!(!has_date_shape("14:30"));
    }

    #[test]
    fn date_separators_unify_to_dash() {
        assert_eq!(canonicalize_date("03/04/05"), "03-04-05");
        assert_eq!(canonicalize_date("03.04.2005"), "03-04-2005");
    }

    #[test]
    fn time_dots_become_colons_only_without_existing_colons() {
        assert_eq!(canonicalize_time("14.30"), "14:30");
        assert_eq!(canonicalize_time("14:30:15.250"), "14:30:15.250");
        assert_eq!(canonicalize_time("02:30 pm"), "02:30 PM");
    }

    #[test]
    fn datetime_joiner_and_halves_canonicalize() {
        assert_eq!(
            canonicalize_datetime("2023/04/05T14.30"),
            "2023-04-05 14:30"
        );
        assert_eq!(
            canonicalize_datetime("03/04/05 02:30 pm"),
            "03-04-05 02:30 PM"
        );
    }

    #[test]
    fn time_token_extracts_component_and_meridiem() {
        let (token, meridiem) = time_token("03-04-05 02:30:15.250 PM").unwrap();
        assert_eq!(token, "02:30:15.250");
        assert!(meridiem);

        let (token, meridiem) = time_token("14:30").unwrap();
        assert_eq!(token, "14:30");
        assert!(!meridiem);
    }
}
