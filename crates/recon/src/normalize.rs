//! Value normalization and storage escaping.

use crate::model::CellValue;

/// Token that blank and not-applicable cells normalize to.
pub const NA: &str = "NA";

/// Canonical comparison form of a spreadsheet cell.
///
/// - empty, blank, or case-insensitive `NA` → `NA`
/// - integral numbers (`2.0`) → integer text (`2`)
/// - everything else → whitespace runs collapsed to one space, ends trimmed
pub fn normalize(value: &CellValue) -> String {
    match value {
        CellValue::Empty => NA.to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => normalize_str(s),
    }
}

/// [`normalize`] for raw text, as found in the dump.
pub fn normalize_str(s: &str) -> String {
    let collapsed = collapse_whitespace(s);
    if collapsed.is_empty() || collapsed.eq_ignore_ascii_case(NA) {
        return NA.to_string();
    }
    if let Some(int) = integral_text(&collapsed) {
        return int;
    }
    collapsed
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// `"2.0"` → `Some("2")`; anything that isn't a decimal with an all-zero
/// fraction → `None`. Integers without a point are already canonical.
fn integral_text(s: &str) -> Option<String> {
    let (int, frac) = s.split_once('.')?;
    let digits = int.strip_prefix('-').unwrap_or(int);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || frac.is_empty()
        || !frac.bytes().all(|b| b == b'0')
    {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    let digits = if trimmed.is_empty() { "0" } else { trimmed };
    if digits == "0" || !int.starts_with('-') {
        Some(digits.to_string())
    } else {
        Some(format!("-{digits}"))
    }
}

// ---------------------------------------------------------------------------
// Storage escaping
// ---------------------------------------------------------------------------

/// Characters the content store persists in escaped form.
pub const STORAGE_ESCAPES: &[(char, &str)] = &[
    ('\'', "\\'"),
    ('\u{00AE}', "&#xae;"),
    ('\u{2013}', "&#x2013;"),
    ('\u{2019}', "\\'"),
    ('\u{201C}', "&ldquo;"),
    ('\u{201D}', "&rdquo;"),
    ('\u{00A9}', "&#xa9;"),
    ('\u{2122}', "&#x2122;"),
];

/// Rewrite text the way it is stored in the content database.
///
/// An apostrophe that is already backslash-escaped is left alone, so
/// applying this twice gives the same result as applying it once.
pub fn escape_for_storage(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        if ch == '\'' && prev == Some('\\') {
            out.push(ch);
        } else if let Some((_, rep)) = STORAGE_ESCAPES.iter().find(|(c, _)| *c == ch) {
            out.push_str(rep);
        } else {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn na_like_values() {
        assert_eq!(normalize(&CellValue::Empty), "NA");
        assert_eq!(normalize(&CellValue::text("")), "NA");
        assert_eq!(normalize(&CellValue::text("   \n\t")), "NA");
        assert_eq!(normalize(&CellValue::text("na")), "NA");
        assert_eq!(normalize(&CellValue::text(" N/A ")), "N/A");
    }

    #[test]
    fn integral_numbers_drop_fraction() {
        assert_eq!(normalize(&CellValue::Number(1.0)), "1");
        assert_eq!(normalize(&CellValue::Number(-4.0)), "-4");
        assert_eq!(normalize(&CellValue::Number(2.5)), "2.5");
        assert_eq!(normalize(&CellValue::text("2.0")), "2");
        assert_eq!(normalize(&CellValue::text("007.00")), "7");
        assert_eq!(normalize(&CellValue::text("2.50")), "2.50");
        assert_eq!(normalize(&CellValue::text("v2.0")), "v2.0");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(
            normalize(&CellValue::text("  Modern\n\tReview   of  Things ")),
            "Modern Review of Things"
        );
    }

    #[test]
    fn escape_replaces_table_entries() {
        assert_eq!(escape_for_storage("Women's Health"), r"Women\'s Health");
        assert_eq!(escape_for_storage("Women\u{2019}s"), r"Women\'s");
        assert_eq!(escape_for_storage("Brand\u{00AE}"), "Brand&#xae;");
        assert_eq!(escape_for_storage("1990\u{2013}2000"), "1990&#x2013;2000");
        assert_eq!(
            escape_for_storage("\u{201C}Quoted\u{201D}"),
            "&ldquo;Quoted&rdquo;"
        );
        assert_eq!(escape_for_storage("\u{00A9} Acme\u{2122}"), "&#xa9; Acme&#x2122;");
    }

    #[test]
    fn escape_does_not_double_escape() {
        let once = escape_for_storage("Surgeon's \u{201C}Guide\u{201D} \u{00AE}");
        assert_eq!(escape_for_storage(&once), once);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize(&CellValue::text(s));
            let twice = normalize(&CellValue::text(once.clone()));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalize_number_is_idempotent(n in -1.0e9f64..1.0e9f64) {
            let once = normalize(&CellValue::Number(n));
            let twice = normalize(&CellValue::text(once.clone()));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn escape_is_idempotent(s in "[a-zA-Z '\u{2019}\u{00AE}\u{2013}\u{201C}\u{201D}\u{00A9}\u{2122}]{0,30}") {
            let once = escape_for_storage(&s);
            prop_assert_eq!(escape_for_storage(&once), once);
        }
    }
}
