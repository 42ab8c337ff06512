//! Text normalization ahead of XML escaping
//!
//! A single ordered table of `(pattern, replacement)` rules. Characters with
//! no rule pass through untouched.

use regex::{NoExpand, Regex};
use std::sync::OnceLock;

/// Applied top to bottom. Later rules see the output of earlier ones.
pub const RULES: &[(&str, &str)] = &[
    // Line endings
    (r"\r\n?", "\n"),
    // Typographic single quotes and primes
    (r"[\u{2018}\u{2019}\u{201A}\u{201B}\u{2032}]", "'"),
    // Typographic double quotes
    (r"[\u{201C}\u{201D}\u{201E}\u{201F}\u{2033}]", "\""),
    // Hyphens, dashes, minus sign
    (r"[\u{2010}-\u{2015}\u{2212}]", "-"),
    (r"\u{2026}", "..."),
    // Non-breaking and narrow spaces
    (r"[\u{00A0}\u{2007}\u{202F}]", " "),
    // Zero-width joiners, variation selectors, keycap combiner
    (r"[\u{200B}-\u{200D}\u{2060}\u{FE0E}\u{FE0F}\u{20E3}]", ""),
    // Doubled punctuation, some of which is also pictographic
    (r"\u{203C}", "!!"),
    (r"\u{2047}", "??"),
    (r"\u{2048}", "?!"),
    (r"\u{2049}", "!?"),
    // Pictographs, flags and skin-tone modifiers
    (r"\p{Extended_Pictographic}", ""),
    (r"[\u{1F1E6}-\u{1F1FF}\u{1F3FB}-\u{1F3FF}]", ""),
    // Bullets
    (r"[\u{2022}\u{2023}\u{2043}\u{25E6}]", ""),
    // Control characters other than newline and tab
    (r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\x9F]", ""),
    // Horizontal whitespace
    (r"[ \t]+", " "),
    (r" ?\n ?", "\n"),
];

fn compiled_rules() -> &'static [(Regex, &'static str)] {
    static RULESET: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULESET.get_or_init(|| {
        RULES
            .iter()
            .map(|(pattern, replacement)| {
                (
                    Regex::new(pattern).expect("normalization rule should compile"),
                    *replacement,
                )
            })
            .collect()
    })
}

pub fn normalize(text: &str) -> String {
    compiled_rules()
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, NoExpand(replacement)).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_compiles() {
        assert_eq!(compiled_rules().len(), RULES.len());
    }

    #[test]
    fn smart_punctuation_becomes_ascii() {
        assert_eq!(
            normalize("\u{201C}It\u{2019}s fine\u{201D} \u{2014} really\u{2026}"),
            "\"It's fine\" - really..."
        );
    }

    #[test]
    fn pictographs_are_removed() {
        assert_eq!(normalize("Sunny \u{2600}\u{FE0F} today \u{1F600}!"), "Sunny today !");
        assert_eq!(normalize("Go \u{1F1E8}\u{1F1E6} team"), "Go team");
    }

    #[test]
    fn doubled_punctuation_survives_pictograph_removal() {
        assert_eq!(
            normalize("Record high\u{203C}\u{FE0F} Really\u{2049} Why\u{2047} Huh\u{2048}"),
            "Record high!! Really!? Why?? Huh?!"
        );
    }

    #[test]
    fn unknown_characters_pass_through() {
        assert_eq!(normalize("Caf\u{E9} na\u{EF}ve \u{4E2D}\u{6587}"), "Caf\u{E9} na\u{EF}ve \u{4E2D}\u{6587}");
    }

    #[test]
    fn whitespace_and_control_characters() {
        assert_eq!(normalize("a\u{0007}b\r\nc \t d\u{00A0}e"), "ab\nc d e");
        assert_eq!(normalize("line one  \n   line two"), "line one\nline two");
    }

    #[test]
    fn blank_lines_survive() {
        assert_eq!(normalize("one\n\ntwo"), "one\n\ntwo");
        assert_eq!(normalize("one\n  \ntwo"), "one\n\ntwo");
    }
}
