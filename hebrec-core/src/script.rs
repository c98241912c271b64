//! C1 — script classification for a single word token.

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    Garbage,
    SectionMarker,
    Punctuation,
    Number,
    Hebrew,
    HebrewMixed,
    LatinOnly,
}

lazy_static! {
    static ref SECTION_MARKER_RE: Regex = Regex::new(r"^\(?[א-תa-zA-Z0-9]+[\).]?$").unwrap();
}

fn is_bidi_control(c: char) -> bool {
    matches!(c,
        '\u{200E}' | '\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2066}'..='\u{2069}'
    )
}

fn is_hebrew(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

struct Counts {
    hebrew: usize,
    latin: usize,
    digit: usize,
    /// Punctuation/symbol/"other" characters — spec's decision rules never
    /// distinguish symbol-punctuation from "other", so both collapse here.
    punct: usize,
}

fn count_buckets(stripped: &str) -> Counts {
    let mut c = Counts {
        hebrew: 0,
        latin: 0,
        digit: 0,
        punct: 0,
    };
    for ch in stripped.chars() {
        if is_hebrew(ch) {
            c.hebrew += 1;
        } else if ch.is_ascii_alphabetic() {
            c.latin += 1;
        } else if ch.is_ascii_digit() {
            c.digit += 1;
        } else {
            c.punct += 1;
        }
    }
    c
}

fn max_identical_run(s: &str) -> usize {
    let mut best = 0usize;
    let mut cur = 0usize;
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        if Some(ch) == prev {
            cur += 1;
        } else {
            cur = 1;
            prev = Some(ch);
        }
        best = best.max(cur);
    }
    best
}

/// Classify a word token per spec §4.1. BiDi control marks are stripped first.
pub fn classify(word: &str) -> ScriptClass {
    let stripped: String = word.chars().filter(|c| !is_bidi_control(*c)).collect();
    let len = stripped.chars().count();
    let counts = count_buckets(&stripped);

    // 1. Garbage
    let run = max_identical_run(&stripped);
    let garbage_by_run = len >= 4 && run >= 4 || (len > 5 && (run as f32) > 0.5 * len as f32);
    let only_punct_tiny = counts.hebrew == 0
        && counts.latin == 0
        && counts.digit == 0
        && counts.punct > 0
        && len <= 1;
    if garbage_by_run || only_punct_tiny {
        return ScriptClass::Garbage;
    }

    // 2. Section marker
    if len <= 5
        && (counts.hebrew > 0 || counts.digit > 0)
        && (counts.punct > 0 || len <= 2)
        && SECTION_MARKER_RE.is_match(&stripped)
    {
        return ScriptClass::SectionMarker;
    }

    // 3. Punctuation (no letters/digits at all)
    if counts.hebrew == 0 && counts.latin == 0 && counts.digit == 0 {
        return ScriptClass::Punctuation;
    }

    // 4. Number
    if counts.hebrew == 0 && counts.latin == 0 && counts.digit > 0 {
        return ScriptClass::Number;
    }

    // 5. Hebrew / HebrewMixed
    if counts.hebrew > 0 && counts.latin == 0 {
        return ScriptClass::Hebrew;
    }
    if counts.hebrew > 0 && counts.latin > 0 {
        return ScriptClass::HebrewMixed;
    }

    // 6. LatinOnly
    if counts.latin > 0 && counts.hebrew == 0 {
        return ScriptClass::LatinOnly;
    }

    // 7. Fallback
    ScriptClass::Punctuation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plain_hebrew() {
        assert_eq!(classify("שלום"), ScriptClass::Hebrew);
    }

    #[test]
    fn classifies_hebrew_mixed() {
        assert_eq!(classify("שלוםA"), ScriptClass::HebrewMixed);
    }

    #[test]
    fn classifies_latin_only() {
        assert_eq!(classify("Zeer"), ScriptClass::LatinOnly);
    }

    #[test]
    fn classifies_number() {
        assert_eq!(classify("123"), ScriptClass::Number);
    }

    #[test]
    fn classifies_punctuation() {
        assert_eq!(classify("--"), ScriptClass::Punctuation);
    }

    #[test]
    fn classifies_garbage_by_run() {
        assert_eq!(classify("aaaa"), ScriptClass::Garbage);
    }

    #[test]
    fn classifies_garbage_by_majority_run() {
        // len > 5, run of 4 'x's is > 50% of 7
        assert_eq!(classify("xxxxabc"), ScriptClass::Garbage);
    }

    #[test]
    fn section_marker_hebrew_letter_dot() {
        assert_eq!(classify("א."), ScriptClass::SectionMarker);
    }

    #[test]
    fn section_marker_parenthesized_hebrew() {
        assert_eq!(classify("(א)"), ScriptClass::SectionMarker);
    }

    #[test]
    fn section_marker_beats_plain_hebrew_short_word() {
        // single Hebrew letter with no punctuation, len <= 2: still section marker
        assert_eq!(classify("א"), ScriptClass::SectionMarker);
    }

    #[test]
    fn ordinary_hebrew_word_not_section_marker() {
        assert_eq!(classify("שלום"), ScriptClass::Hebrew);
    }

    #[test]
    fn single_punct_char_is_garbage() {
        assert_eq!(classify("-"), ScriptClass::Garbage);
    }
}
