//! # Chapter Keys
//! Free-text chapter labels ("12", "10.5", "7 extra", "Oneshot") classified
//! into a closed set of variants with an explicit total order.
//!
//! Parse rules are tried in a fixed priority order:
//! `Numeric` → `Pair` → `PartialNumeric` → `Opaque`.
//!
//! Precedence across variants, lowest to highest:
//! `Opaque` < `Numeric` < `PartialNumeric` < `Pair`.
//! Cross-variant comparisons never look at magnitudes, so `Pair(1, 0)`
//! outranks `Numeric(500)`. See DESIGN.md before changing this table; it
//! decides which chapters get flagged "old" in the feed.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};

/// Label used by the source when a chapter has no number (oneshots etc.).
pub const NO_CHAPTER_LABEL: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChapterKey {
    /// Catch-all: carries the raw label.
    Opaque(String),
    /// Plain integer label.
    Numeric(u64),
    /// Integer immediately followed by non-numeric text, e.g. `"5x"`.
    PartialNumeric(u64, String),
    /// `"major.minor"` with both parts integers.
    Pair(u64, u64),
}

fn re_numeric() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").unwrap())
}

fn re_pair() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)\.([0-9]+)$").unwrap())
}

fn re_partial() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)([^0-9].*)$").unwrap())
}

impl ChapterKey {
    /// Classify a raw label. Total: anything unrecognised becomes `Opaque`.
    pub fn parse(raw: &str) -> Self {
        if re_numeric().is_match(raw) {
            if let Ok(n) = raw.parse::<u64>() {
                return ChapterKey::Numeric(n);
            }
        }

        if let Some(caps) = re_pair().captures(raw) {
            if let (Ok(major), Ok(minor)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
                return ChapterKey::Pair(major, minor);
            }
        }

        if let Some(caps) = re_partial().captures(raw) {
            if let Ok(n) = caps[1].parse::<u64>() {
                let suffix = caps[2].to_string();
                debug!(target: "chapter", label = raw, number = n, %suffix, "partially numeric chapter label");
                return ChapterKey::PartialNumeric(n, suffix);
            }
        }

        if raw.chars().any(|c| c.is_ascii_digit()) {
            warn!(target: "chapter", label = raw, "chapter label contains digits but no usable number; treating as opaque");
        }
        ChapterKey::Opaque(raw.to_string())
    }

    /// Sentinel for a series without any chapters. Sorts below every label
    /// the source can produce.
    pub fn none() -> Self {
        ChapterKey::Opaque(String::new())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ChapterKey::Opaque(s) if s.is_empty())
    }

    fn rank(&self) -> u8 {
        match self {
            ChapterKey::Opaque(_) => 0,
            ChapterKey::Numeric(_) => 1,
            ChapterKey::PartialNumeric(..) => 2,
            ChapterKey::Pair(..) => 3,
        }
    }
}

/// Three-way comparison; same as `Ord::cmp`.
pub fn compare(a: &ChapterKey, b: &ChapterKey) -> Ordering {
    a.cmp(b)
}

impl Ord for ChapterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        use ChapterKey::*;
        match (self, other) {
            (Opaque(a), Opaque(b)) => a.cmp(b),
            (Numeric(a), Numeric(b)) => a.cmp(b),
            (PartialNumeric(an, asuf), PartialNumeric(bn, bsuf)) => {
                an.cmp(bn).then_with(|| asuf.cmp(bsuf))
            }
            (Pair(amaj, amin), Pair(bmaj, bmin)) => amaj.cmp(bmaj).then_with(|| amin.cmp(bmin)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ChapterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterKey::Opaque(s) => f.write_str(s),
            ChapterKey::Numeric(n) => write!(f, "{n}"),
            ChapterKey::PartialNumeric(n, suffix) => write!(f, "{n}{suffix}"),
            ChapterKey::Pair(major, minor) => write!(f, "{major}.{minor}"),
        }
    }
}

impl From<&str> for ChapterKey {
    fn from(raw: &str) -> Self {
        ChapterKey::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_priority_order() {
        assert_eq!(ChapterKey::parse("12"), ChapterKey::Numeric(12));
        assert_eq!(ChapterKey::parse("10.5"), ChapterKey::Pair(10, 5));
        assert_eq!(
            ChapterKey::parse("5x"),
            ChapterKey::PartialNumeric(5, "x".into())
        );
        // Not a pair: trailing text after the minor part.
        assert_eq!(
            ChapterKey::parse("5.5a"),
            ChapterKey::PartialNumeric(5, ".5a".into())
        );
        assert_eq!(
            ChapterKey::parse("Oneshot"),
            ChapterKey::Opaque("Oneshot".into())
        );
        assert_eq!(
            ChapterKey::parse(NO_CHAPTER_LABEL),
            ChapterKey::Opaque("none".into())
        );
    }

    #[test]
    fn overflowing_numbers_fall_through_to_opaque() {
        let huge = "123456789012345678901234567890";
        assert_eq!(ChapterKey::parse(huge), ChapterKey::Opaque(huge.into()));
    }

    #[test]
    fn display_renders_canonical_label() {
        for raw in ["0", "12", "1.2", "10.15", "7 extra", "5x", "Oneshot"] {
            assert_eq!(ChapterKey::parse(raw).to_string(), raw);
        }
        // Leading zeros are not preserved.
        assert_eq!(ChapterKey::parse("007").to_string(), "7");
    }

    #[test]
    fn cross_variant_precedence_ignores_magnitude() {
        let opaque = ChapterKey::Opaque("zzz".into());
        let numeric = ChapterKey::Numeric(9_999);
        let partial = ChapterKey::PartialNumeric(1, "a".into());
        let pair = ChapterKey::Pair(0, 1);

        assert!(opaque < numeric);
        assert!(numeric < partial);
        assert!(partial < pair);
        assert!(numeric < pair);
        assert_eq!(compare(&pair, &numeric), Ordering::Greater);
    }

    #[test]
    fn same_variant_compares_fieldwise() {
        assert_eq!(
            compare(&ChapterKey::Pair(1, 2), &ChapterKey::Pair(1, 3)),
            Ordering::Less
        );
        assert!(ChapterKey::Pair(2, 0) > ChapterKey::Pair(1, 99));
        assert!(ChapterKey::Numeric(5) < ChapterKey::Numeric(12));
        assert!(
            ChapterKey::PartialNumeric(3, "a".into()) < ChapterKey::PartialNumeric(3, "b".into())
        );
        assert!(
            ChapterKey::PartialNumeric(2, "z".into()) < ChapterKey::PartialNumeric(3, "a".into())
        );
    }

    #[test]
    fn sentinel_sorts_below_everything() {
        let none = ChapterKey::none();
        assert!(none.is_none());
        for raw in ["0", "0.0", "0a", "A", NO_CHAPTER_LABEL] {
            assert!(none < ChapterKey::parse(raw), "sentinel not below {raw}");
        }
    }

    #[test]
    fn only_ascii_digits_count_as_numbers() {
        // Arabic-Indic three: a digit to Unicode, text to us.
        assert_eq!(
            ChapterKey::parse("5\u{663}x"),
            ChapterKey::PartialNumeric(5, "\u{663}x".into())
        );
        assert_eq!(
            ChapterKey::parse("\u{663}"),
            ChapterKey::Opaque("\u{663}".into())
        );
        assert_eq!(
            ChapterKey::parse("2.\u{663}"),
            ChapterKey::PartialNumeric(2, ".\u{663}".into())
        );
    }

    #[test]
    fn serde_shape_is_tagged() {
        let json = serde_json::to_string(&ChapterKey::Pair(3, 1)).unwrap();
        assert_eq!(json, r#"{"kind":"pair","value":[3,1]}"#);
        let back: ChapterKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ChapterKey::Pair(3, 1));
    }
}
