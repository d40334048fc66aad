//! Lenient parsing of numbered title lists returned by the model.
//!
//! A line is a candidate iff, after trimming, it reads `<integer>. <text>`.
//! Everything else (preambles, blank lines, stray markdown) is dropped.

use std::sync::LazyLock;

use llmo_shared::{LlmoError, Result};
use regex::Regex;

/// Matches `12. Some title`, splitting on the first `". "`.
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\. (.+)$").expect("ordinal regex"));

/// Extract title candidates in line order. May be empty.
pub fn extract_titles(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let caps = ORDINAL_RE.captures(line.trim())?;
            let title = caps[1].trim();
            (!title.is_empty()).then(|| title.to_string())
        })
        .collect()
}

/// Like [`extract_titles`], but zero candidates is [`LlmoError::NoTitlesParsed`].
pub fn parse_titles(raw: &str) -> Result<Vec<String>> {
    let titles = extract_titles(raw);
    if titles.is_empty() {
        tracing::warn!(
            lines = raw.lines().count(),
            "no numbered titles in model response"
        );
        return Err(LlmoError::NoTitlesParsed);
    }
    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_list() {
        assert_eq!(parse_titles("1. A\n2. B\n3. C").unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn noise_lines_are_dropped() {
        let raw = "1. 浅草散策ガイド\n2. 渋谷の未来\nnoise line";
        assert_eq!(parse_titles(raw).unwrap(), vec!["浅草散策ガイド", "渋谷の未来"]);
    }

    #[test]
    fn no_markers_is_error() {
        assert!(extract_titles("just some prose\nanother line").is_empty());
        assert!(matches!(
            parse_titles("just some prose").unwrap_err(),
            LlmoError::NoTitlesParsed
        ));
        assert!(matches!(parse_titles("").unwrap_err(), LlmoError::NoTitlesParsed));
    }

    #[test]
    fn splits_on_first_marker_only() {
        assert_eq!(extract_titles("10. Vol. 2. Return"), vec!["Vol. 2. Return"]);
    }

    #[test]
    fn preamble_and_indentation_tolerated() {
        let raw = concat!(
            "以下がタイトル案です。\n\n",
            "  1. 東京の下町  \r\n",
            "2.no space\n- 3. bullet\n4. \n5. 最後",
        );
        assert_eq!(extract_titles(raw), vec!["東京の下町", "最後"]);
    }

    #[test]
    fn order_is_line_order_not_number_order() {
        assert_eq!(extract_titles("3. C\n1. A"), vec!["C", "A"]);
    }
}
