//! Address complement resolution.
//!
//! A complement is free text such as `"QU 26"` or `"LT 14"`: the first two
//! letters select a numeric code from [`COMPLEMENT_CODES`], the remainder is the
//! argument.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Code used when the text is missing, too short, or has an unknown prefix (LT, lote).
pub const DEFAULT_CODE: u8 = 60;

/// Argument used when the text carries nothing after its prefix.
pub const DEFAULT_ARGUMENT: &str = "1";

/// Complement prefixes and their codes.
///
/// `M` and `P` are single-letter keys; the two-character lookup never reaches them.
#[rustfmt::skip]
pub const COMPLEMENT_CODES: &[(&str, u8)] = &[
    ("AC", 1), ("AA", 2), ("AF", 3), ("AL", 4), ("AS", 5), ("AB", 6), ("AN", 7), ("AX", 8),
    ("AP", 9), ("AZ", 10), ("AT", 11), ("BS", 12), ("BA", 13), ("BR", 14), ("BC", 15),
    ("BL", 16), ("BX", 17), ("CS", 18), ("CM", 20), ("CP", 21), ("CA", 22), ("CE", 23),
    ("CT", 24), ("CB", 25), ("CL", 26), ("CD", 27), ("CJ", 28), ("CR", 29), ("CO", 30),
    ("DP", 31), ("DT", 32), ("DV", 34), ("ED", 35), ("EN", 36), ("ES", 37), ("EC", 38),
    ("ET", 39), ("EP", 40), ("FO", 42), ("FR", 43), ("FU", 44), ("GL", 45), ("GP", 46),
    ("GA", 47), ("GB", 48), ("GJ", 49), ("GR", 50), ("GH", 52), ("HG", 53), ("LD", 55),
    ("LM", 56), ("LH", 57), ("LE", 58), ("LJ", 59), ("LT", 60), ("LO", 61), ("M", 62),
    ("MT", 63), ("MC", 64), ("MZ", 65), ("MD", 66), ("NC", 67), ("OM", 68), ("OG", 69),
    ("PC", 70), ("PR", 71), ("PP", 72), ("PV", 73), ("PM", 74), ("PS", 75), ("PA", 76),
    ("PL", 77), ("P", 78), ("PO", 80), ("PT", 81), ("PD", 82), ("PE", 83), ("QU", 85),
    ("QT", 86), ("KM", 87), ("QN", 88), ("QQ", 89), ("RM", 90), ("RP", 91), ("RF", 92),
    ("RT", 93), ("RL", 95), ("SL", 96), ("SC", 97), ("SR", 98), ("SB", 100), ("SJ", 101),
    ("SD", 102), ("SU", 103), ("SS", 104), ("SQ", 105), ("TN", 106), ("TO", 107),
    ("TE", 109), ("TV", 110), ("TR", 111), ("VL", 112), ("VZ", 113), ("AD", 114),
    ("BI", 115), ("SA", 116), ("NA", 117), ("SK", 118), ("ND", 119), ("SE", 120),
    ("AM", 121), ("NR", 122), ("CH", 124),
];

static CODE_BY_PREFIX: LazyLock<HashMap<&'static str, u8>> =
    LazyLock::new(|| COMPLEMENT_CODES.iter().copied().collect());

/// One resolved complement slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complement {
    pub code: u8,
    pub argument: String,
}

impl Complement {
    /// Resolve code and argument from the raw cell text.
    pub fn resolve(text: Option<&str>) -> Self {
        Self {
            code: complement_code(text),
            argument: extract_argument(text),
        }
    }
}

impl Default for Complement {
    fn default() -> Self {
        Self {
            code: DEFAULT_CODE,
            argument: DEFAULT_ARGUMENT.to_string(),
        }
    }
}

/// Numeric complement code for `text`.
pub fn complement_code(text: Option<&str>) -> u8 {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return DEFAULT_CODE;
    };
    let normalized = text.trim().to_uppercase();
    if normalized.chars().count() < 2 {
        return DEFAULT_CODE;
    }
    let prefix: String = normalized.chars().take(2).collect();
    CODE_BY_PREFIX
        .get(prefix.as_str())
        .copied()
        .unwrap_or(DEFAULT_CODE)
}

/// Complement code as the text written to the XML.
pub fn resolve_complement_code(text: Option<&str>) -> String {
    complement_code(text).to_string()
}

/// Everything after the two-letter prefix, trimmed, or `"1"` when nothing is left.
pub fn extract_argument(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return DEFAULT_ARGUMENT.to_string();
    };
    let trimmed = text.trim();
    if trimmed.chars().count() < 2 {
        return DEFAULT_ARGUMENT.to_string();
    }
    let rest: String = trimmed.chars().skip(2).collect();
    let argument = rest.trim();
    if argument.is_empty() {
        DEFAULT_ARGUMENT.to_string()
    } else {
        argument.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_letter_codes() -> impl Iterator<Item = (&'static str, u8)> {
        COMPLEMENT_CODES
            .iter()
            .copied()
            .filter(|(prefix, _)| prefix.len() == 2)
    }

    #[test]
    fn test_table_has_unique_prefixes() {
        assert_eq!(CODE_BY_PREFIX.len(), COMPLEMENT_CODES.len());
        assert!(COMPLEMENT_CODES.len() > 100);
    }

    #[test]
    fn test_every_prefix_resolves_with_any_suffix() {
        for (prefix, code) in two_letter_codes() {
            for suffix in ["", " 1", "12", " 26 B", "  "] {
                let text = format!("{prefix}{suffix}");
                assert_eq!(complement_code(Some(&text)), code, "text {text:?}");
            }
        }
    }

    #[test]
    fn test_prefix_lookup_is_case_insensitive() {
        for (prefix, code) in two_letter_codes() {
            let text = format!("{} 3", prefix.to_lowercase());
            assert_eq!(resolve_complement_code(Some(&text)), code.to_string());
        }
    }

    #[test]
    fn test_codes_stay_in_range() {
        for (_, code) in COMPLEMENT_CODES {
            assert!((1..=124).contains(code));
        }
    }

    #[test]
    fn test_missing_or_short_text_uses_default_code() {
        assert_eq!(resolve_complement_code(None), "60");
        assert_eq!(resolve_complement_code(Some("")), "60");
        assert_eq!(resolve_complement_code(Some("Q")), "60");
        assert_eq!(resolve_complement_code(Some("  Q  ")), "60");
    }

    #[test]
    fn test_single_letter_keys_are_unreachable() {
        assert_eq!(complement_code(Some("M")), DEFAULT_CODE);
        assert_eq!(complement_code(Some("P")), DEFAULT_CODE);
        assert_eq!(complement_code(Some("M 4")), DEFAULT_CODE);
    }

    #[test]
    fn test_unknown_prefix_uses_default_code() {
        assert_eq!(resolve_complement_code(Some("XY 10")), "60");
        assert_eq!(resolve_complement_code(Some("12")), "60");
    }

    #[test]
    fn test_leading_whitespace_is_trimmed_before_prefix() {
        assert_eq!(complement_code(Some("   qu 26")), 85);
        assert_eq!(extract_argument(Some("   qu 26")), "26");
    }

    #[test]
    fn test_quadra_complement() {
        let complement = Complement::resolve(Some("QU 26"));
        assert_eq!(complement.code, 85);
        assert_eq!(complement.argument, "26");
    }

    #[test]
    fn test_argument_defaults() {
        assert_eq!(extract_argument(None), "1");
        assert_eq!(extract_argument(Some("")), "1");
        assert_eq!(extract_argument(Some("L")), "1");
        assert_eq!(extract_argument(Some("LT")), "1");
        assert_eq!(extract_argument(Some("LT    ")), "1");
    }

    #[test]
    fn test_argument_keeps_case_and_inner_whitespace() {
        assert_eq!(extract_argument(Some("ca Casa 2  fundos ")), "Casa 2  fundos");
        assert_eq!(extract_argument(Some("AP200")), "200");
    }

    #[test]
    fn test_argument_counts_characters_not_bytes() {
        assert_eq!(extract_argument(Some("ÁÉ 5")), "5");
        assert_eq!(complement_code(Some("ÁÉ 5")), DEFAULT_CODE);
    }

    #[test]
    fn test_default_complement() {
        assert_eq!(Complement::default(), Complement::resolve(None));
        assert_eq!(Complement::resolve(Some("")), Complement::default());
    }
}
