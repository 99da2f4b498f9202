//! City-name normalization rules.
//!
//! The registry import pipeline mangled Cyrillic city names twice over: an
//! early import dropped the leading `С` from names (`СОФИЯ` → `ОФИЯ`), and a
//! later "fix" prepended a `С` without checking whether one was already there
//! (`СОФИЯ` → `ССОФИЯ`, sometimes with a Latin `C` mixed in). Each rule here
//! recognizes *any* run of noise characters (including none) in front of a
//! known stem and rewrites the whole span to the canonical name, so clean,
//! truncated and double-prefixed variants all converge in one pass and
//! re-running the pass is a no-op.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Canonical city names the corruption history touched. The stem of each rule
/// is the name minus its leading `С`; the noise set is Cyrillic `С` plus the
/// look-alike Latin `C`.
const CANONICAL_CITIES: &[&str] = &[
    "СОФИЯ",
    "СТАРА ЗАГОРА",
    "СЛИВЕН",
    "СМОЛЯН",
    "СИЛИСТРА",
    "САНДАНСКИ",
    "СВИЛЕНГРАД",
    "СЕВЛИЕВО",
    "СВОГЕ",
    "СОПОТ",
    "СОЗОПОЛ",
    "САМОКОВ",
    "СВИЩОВ",
    "САПАРЕВА БАНЯ",
    "СЛАВЯНОВО",
    "СЪЕДИНЕНИЕ",
    "СЪРНИЦА",
];

/// One repair rule: optional noise run + stem, anchored at start-of-string or
/// after whitespace, replaced by the canonical name.
struct CityRule {
    canonical: &'static str,
    pattern: Regex,
}

impl CityRule {
    fn new(canonical: &'static str) -> Self {
        let stem = canonical
            .strip_prefix('С')
            .unwrap_or(canonical);
        // (^|\s) keeps a stem that merely occurs mid-word out of reach.
        let pattern = Regex::new(&format!(r"(^|\s)[СC]*{}", regex::escape(stem)))
            .expect("static rule pattern");
        CityRule { canonical, pattern }
    }
}

/// The full ordered rule table. Build once per run and share by reference.
pub struct CityRules {
    rules: Vec<CityRule>,
}

impl CityRules {
    /// Rule table for the Bulgarian city names the import history corrupted.
    pub fn bulgarian() -> Self {
        let mut rules: Vec<CityRule> =
            CANONICAL_CITIES.iter().map(|c| CityRule::new(c)).collect();
        // Longest stem first so a short stem never fires inside the span a
        // longer rule owns.
        rules.sort_by_key(|r| std::cmp::Reverse(r.canonical.chars().count()));
        CityRules { rules }
    }

    /// Apply every rule to `input` and report whether anything fired.
    ///
    /// Already-canonical names match their own rule (`С` is absorbed by the
    /// noise run) and are rewritten to themselves, so the changed flag stays
    /// false and the transform is idempotent by construction.
    pub fn apply(&self, input: &str) -> (String, bool) {
        if input.is_empty() {
            return (String::new(), false);
        }

        let mut text = input.to_string();
        for rule in &self.rules {
            text = rule
                .pattern
                .replace_all(&text, |caps: &Captures| {
                    format!("{}{}", &caps[1], rule.canonical)
                })
                .into_owned();
        }

        let changed = text != input;
        (text, changed)
    }
}

/// Collapse a facility name to the key the alignment sources are indexed by:
/// uppercased, with whitespace and common punctuation stripped.
pub fn name_key(name: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    let strip = STRIP.get_or_init(|| Regex::new(r#"[\s\-"'.,()]+"#).expect("static pattern"));
    strip.replace_all(name.trim(), "").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CityRules {
        CityRules::bulgarian()
    }

    #[test]
    fn truncated_name_is_restored() {
        let (out, changed) = rules().apply("ОФИЯ");
        assert_eq!(out, "СОФИЯ");
        assert!(changed);
    }

    #[test]
    fn double_prefix_collapses_in_one_pass() {
        let (out, changed) = rules().apply("ССОФИЯ");
        assert_eq!(out, "СОФИЯ");
        assert!(changed);
    }

    #[test]
    fn latin_lookalike_noise_is_absorbed() {
        let (out, changed) = rules().apply("CСОФИЯ");
        assert_eq!(out, "СОФИЯ");
        assert!(changed);
    }

    #[test]
    fn canonical_name_is_untouched() {
        let (out, changed) = rules().apply("СОФИЯ");
        assert_eq!(out, "СОФИЯ");
        assert!(!changed);
    }

    #[test]
    fn stem_inside_a_word_is_left_alone() {
        let (out, changed) = rules().apply("НОВОСОФИЯ");
        assert_eq!(out, "НОВОСОФИЯ");
        assert!(!changed);
    }

    #[test]
    fn unmatched_text_passes_through_byte_identical() {
        let input = "ПЛОВДИВ ЦЕНТЪР";
        let (out, changed) = rules().apply(input);
        assert_eq!(out, input);
        assert!(!changed);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let (out, changed) = rules().apply("");
        assert_eq!(out, "");
        assert!(!changed);
    }

    #[test]
    fn converges_from_every_corruption_depth() {
        let r = rules();
        for depth in 0..=3 {
            let corrupted = format!("{}ОФИЯ", "С".repeat(depth));
            let (out, _) = r.apply(&corrupted);
            assert_eq!(out, "СОФИЯ", "depth {depth}");
            // A second application must change nothing.
            let (again, changed) = r.apply(&out);
            assert_eq!(again, "СОФИЯ");
            assert!(!changed, "depth {depth} not idempotent");
        }
    }

    #[test]
    fn repairs_a_name_after_whitespace() {
        let (out, changed) = rules().apply("гр. ОФИЯ 02 рн КРАСНО СЕЛО");
        assert_eq!(out, "гр. СОФИЯ 02 рн КРАСНО СЕЛО");
        assert!(changed);
    }

    #[test]
    fn multiword_canonical_names_are_handled() {
        let (out, changed) = rules().apply("ТАРА ЗАГОРА");
        assert_eq!(out, "СТАРА ЗАГОРА");
        assert!(changed);

        let (out, changed) = rules().apply("ССАПАРЕВА БАНЯ");
        assert_eq!(out, "САПАРЕВА БАНЯ");
        assert!(changed);
    }

    #[test]
    fn distinct_stems_repair_independently_in_one_string() {
        let (out, changed) = rules().apply("ОФИЯ И ЛИВЕН");
        assert_eq!(out, "СОФИЯ И СЛИВЕН");
        assert!(changed);
    }

    #[test]
    fn name_key_strips_case_space_and_punctuation() {
        assert_eq!(name_key("  Д-р Иванов \"Дента\" ООД  "), "ДРИВАНОВДЕНТАООД");
        assert_eq!(name_key("ДРИВАНОВ ДЕНТА, ООД"), "ДРИВАНОВДЕНТАООД");
    }

    #[test]
    fn name_key_of_empty_is_empty() {
        assert_eq!(name_key(""), "");
    }
}
