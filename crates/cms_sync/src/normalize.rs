//! Header normalization
//!
//! Turns arbitrary CSV header cells ("ZIP Code", "Facility ID#", "measureName")
//! into snake_case field names ("zip_code", "facility_id", "measure_name").

/// Normalize one header cell into a snake_case field name.
///
/// Characters other than ASCII letters, ASCII digits, whitespace and `_` are
/// dropped. Whitespace and `_` runs become a single `_`, as does every
/// lowercase-to-uppercase transition. Leading and trailing separators are
/// trimmed and the result is lowercased.
///
/// The output contains only `[a-z0-9_]` with no doubled, leading, or trailing
/// `_`, so normalizing it again returns it unchanged.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    let mut prev_lower = false;

    for ch in raw.chars() {
        if ch.is_whitespace() || ch == '_' {
            pending_separator = true;
            prev_lower = false;
            continue;
        }
        // Dropped characters do not break a camelCase transition: "a-B" -> "a_b".
        if !ch.is_ascii_alphanumeric() {
            continue;
        }
        if prev_lower && ch.is_ascii_uppercase() {
            pending_separator = true;
        }
        if pending_separator && !out.is_empty() {
            out.push('_');
        }
        pending_separator = false;
        prev_lower = ch.is_ascii_lowercase();
        out.push(ch.to_ascii_lowercase());
    }

    out
}

/// Normalize every comma-separated cell of a header line.
///
/// Cells that normalize to nothing stay as empty cells so the column count
/// never changes.
pub fn normalize_header_line(line: &str) -> String {
    line.split(',').map(normalize).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_headers() {
        assert_eq!(normalize("Facility Name"), "facility_name");
        assert_eq!(normalize("ZIP Code"), "zip_code");
        assert_eq!(normalize("camelCaseWord"), "camel_case_word");
        assert_eq!(normalize("cID"), "c_id");
        assert_eq!(normalize("A"), "a");
    }

    #[test]
    fn test_strips_special_characters() {
        assert_eq!(normalize("Facility ID#"), "facility_id");
        assert_eq!(normalize("  Phone (Main)  "), "phone_main");
        assert_eq!(normalize("Measure-Start Date"), "measure_start_date");
        assert_eq!(normalize("rate%Value"), "rate_value");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(normalize("County\t /  Parish"), "county_parish");
        assert_eq!(normalize("Address   Line 2"), "address_line_2");
    }

    #[test]
    fn test_digits_do_not_trigger_camel_split() {
        assert_eq!(normalize("HCAHPS2Score"), "hcahps2score");
        assert_eq!(normalize("score2Value"), "score2value");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("#$%&"), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("__"), "");
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        assert_eq!(normalize("\u{feff}Provider ID"), "provider_id");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Facility Name",
            "ZIP Code",
            "camelCaseWord",
            "already_snake_case",
            "__leading and trailing__",
            "Mixed_Separators  here",
            "weird!!Chars??",
            "HTMLParser",
            "",
            "#",
            "a_B",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_output_alphabet() {
        let out = normalize("Émergency Dept. Visits (ED-2b) / 1000");
        assert!(out
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        assert!(!out.starts_with('_'));
        assert!(!out.ends_with('_'));
        assert!(!out.contains("__"));
    }

    #[test]
    fn test_header_line() {
        assert_eq!(normalize_header_line("A,B Name,cID"), "a,b_name,c_id");
        assert_eq!(normalize_header_line("x,,#"), "x,,");
        assert_eq!(normalize_header_line(""), "");
    }
}
