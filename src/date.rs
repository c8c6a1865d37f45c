//! Release year extraction from free-text date strings
//!
//! The corpus does not come with machine-readable dates: the release date
//! column holds free text like "29th July 2022", "2019" or "unknown". The
//! only date information the pipeline needs is a plausible 4-digit year.

use crate::Year;

/// Most recent year that [`extract_year`] can produce
pub const MAX_EXTRACTABLE_YEAR: Year = 2099;

/// Extract a 4-digit release year from a free-text date string
///
/// Scans the input from left to right and returns the first standalone
/// "19xx" or "20xx" digit group, where standalone means not embedded in a
/// longer run of letters, digits or underscores (so "music2016" contains no
/// year, but "July 2022" does). When a date string contains several such
/// groups, the first one wins; this mirrors the upstream data preparation
/// and is a policy choice, not a claim that the first group is the release
/// year.
///
/// Returns None when the input is missing, empty or contains no candidate.
/// No upper bound is enforced: a song "released" in 2084 is accepted as-is,
/// and it is the caller's recency filter that decides what to keep.
pub fn extract_year(raw: Option<&str>) -> Option<Year> {
    let chars = raw?.chars().collect::<Vec<char>>();
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    for (idx, window) in chars.windows(4).enumerate() {
        if !window.iter().all(char::is_ascii_digit) {
            continue;
        }
        let century_ok = matches!((window[0], window[1]), ('1', '9') | ('2', '0'));
        if !century_ok {
            continue;
        }
        if idx > 0 && is_word_char(chars[idx - 1]) {
            continue;
        }
        if let Some(&next) = chars.get(idx + 4) {
            if is_word_char(next) {
                continue;
            }
        }
        let year = window.iter().fold(0, |year: Year, c| {
            year * 10 + c.to_digit(10).unwrap_or(0) as Year
        });
        return Some(year);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates() {
        assert_eq!(extract_year(Some("29th July 2022")), Some(2022));
        assert_eq!(extract_year(Some("2019")), Some(2019));
        assert_eq!(extract_year(Some("March 3, 1987")), Some(1987));
    }

    #[test]
    fn absent_inputs() {
        assert_eq!(extract_year(None), None);
        assert_eq!(extract_year(Some("")), None);
        assert_eq!(extract_year(Some("unknown")), None);
        assert_eq!(extract_year(Some("n/a")), None);
    }

    #[test]
    fn first_candidate_wins() {
        assert_eq!(extract_year(Some("1999 (remastered 2005)")), Some(1999));
        assert_eq!(extract_year(Some("Best of 2016, from 2012")), Some(2016));
    }

    #[test]
    fn rejects_embedded_digit_groups() {
        // Digit groups glued to other word characters are not years
        assert_eq!(extract_year(Some("music2016")), None);
        assert_eq!(extract_year(Some("20223")), None);
        assert_eq!(extract_year(Some("catalog_2017x")), None);
        // But ordinary punctuation does delimit a year
        assert_eq!(extract_year(Some("(2017)")), Some(2017));
    }

    #[test]
    fn rejects_implausible_centuries() {
        assert_eq!(extract_year(Some("1492")), None);
        assert_eq!(extract_year(Some("3019")), None);
    }

    #[test]
    fn no_future_validation() {
        assert_eq!(extract_year(Some("2084")), Some(2084));
    }
}
