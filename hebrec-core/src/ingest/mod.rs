//! C2 — OCR TSV ingest, script/confidence-aware filtering, reversed-parens fixups,
//! and duplicate-overlap suppression.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ReconstructConfig;
use crate::entities::{make_line_id, BBox, LineId, WordBox};
use crate::margin::flag_margins;
use crate::script::{classify, ScriptClass};

static NEXT_WORD_ID: AtomicU64 = AtomicU64::new(1);

fn next_word_id() -> u64 {
    NEXT_WORD_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
struct OcrRow {
    level: i32,
    line_id: LineId,
    word_num: u32,
    frame: BBox,
    confidence: f32,
    text: String,
}

/// Parse one tab-separated OCR row into its 12 columns. Returns `None` on any
/// malformed row (wrong arity or non-numeric fields) — Parse-skip, never fails
/// the page.
fn parse_row(line: &str) -> Option<OcrRow> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 12 {
        return None;
    }
    let level: i32 = cols[0].trim().parse().ok()?;
    if level != 5 {
        return None;
    }
    let block: i64 = cols[2].trim().parse().ok()?;
    let par: i64 = cols[3].trim().parse().ok()?;
    let line_no: i64 = cols[4].trim().parse().ok()?;
    let word_num: u32 = cols[5].trim().parse().ok()?;
    let left: f32 = cols[6].trim().parse().ok()?;
    let top: f32 = cols[7].trim().parse().ok()?;
    let width: f32 = cols[8].trim().parse().ok()?;
    let height: f32 = cols[9].trim().parse().ok()?;
    let confidence: f32 = cols[10].trim().parse().ok()?;
    let text = cols[11].trim().to_string();

    Some(OcrRow {
        level,
        line_id: make_line_id(block, par, line_no),
        word_num,
        frame: BBox::new(left, top, width, height),
        confidence,
        text,
    })
}

fn is_hebrew_or_digit(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c) || c.is_ascii_digit()
}

/// Reversed-parenthesis normalization (spec §4.2 step 1).
fn normalize_reversed_parens(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chars[0] != ')' {
        return text.to_string();
    }
    let last = *chars.last().unwrap();
    if last == '(' {
        if chars.len() < 3 {
            return text.to_string();
        }
        let inner: Vec<char> = chars[1..chars.len() - 1].to_vec();
        if !inner.is_empty() && inner.iter().all(|c| is_hebrew_or_digit(*c)) {
            let inner_s: String = inner.into_iter().collect();
            return format!("({})", inner_s);
        }
    } else {
        if chars.len() < 2 {
            return text.to_string();
        }
        let inner: Vec<char> = chars[1..].to_vec();
        if !inner.is_empty() && inner.iter().all(|c| is_hebrew_or_digit(*c)) {
            let inner_s: String = inner.into_iter().collect();
            return format!("({})", inner_s);
        }
    }
    text.to_string()
}

enum Action {
    Keep,
    Placeholder,
}

fn decide_action(class: ScriptClass, confidence: f32, cfg: &ReconstructConfig) -> Action {
    match class {
        ScriptClass::Hebrew | ScriptClass::HebrewMixed => {
            if confidence > cfg.hebrew_confidence_threshold {
                Action::Keep
            } else {
                Action::Placeholder
            }
        }
        ScriptClass::Number | ScriptClass::Punctuation | ScriptClass::SectionMarker => {
            if confidence > cfg.symbolic_confidence_threshold {
                Action::Keep
            } else {
                Action::Placeholder
            }
        }
        ScriptClass::LatinOnly => Action::Keep,
        ScriptClass::Garbage => Action::Placeholder,
    }
}

/// Ingest one page's OCR TSV rows (header row, if present, is skipped since it
/// fails numeric parsing) into a sequence of [`WordBox`]es, with margins
/// flagged by C3. Input order is preserved.
pub fn ingest_page(tsv_lines: impl Iterator<Item = impl AsRef<str>>) -> Vec<WordBox> {
    ingest_page_with_config(tsv_lines, &ReconstructConfig::default())
}

/// As [`ingest_page`], but with overridable thresholds.
pub fn ingest_page_with_config(
    tsv_lines: impl Iterator<Item = impl AsRef<str>>,
    cfg: &ReconstructConfig,
) -> Vec<WordBox> {
    let mut boxes: Vec<WordBox> = Vec::new();

    for raw_line in tsv_lines {
        let raw_line = raw_line.as_ref();
        let Some(row) = parse_row(raw_line) else {
            tracing::debug!("skipping malformed OCR row: {raw_line:?}");
            continue;
        };
        debug_assert_eq!(row.level, 5);

        let normalized = normalize_reversed_parens(row.text.trim());
        if normalized.is_empty() {
            continue;
        }

        let class = classify(&normalized);
        let action = decide_action(class, row.confidence, cfg);

        // Duplicate suppression: drop if it overlaps an already-accepted box
        // by more than `duplicate_overlap_fraction` of the smaller rectangle's area.
        let is_duplicate = boxes.iter().any(|b: &WordBox| {
            b.frame.overlap_fraction_of_smaller(&row.frame) > cfg.duplicate_overlap_fraction
        });
        if is_duplicate {
            continue;
        }

        let mut word = WordBox {
            id: next_word_id(),
            text: normalized,
            frame: row.frame,
            line_id: row.line_id,
            word_num: row.word_num,
            is_margin: false,
            is_placeholder: false,
        };
        if matches!(action, Action::Placeholder) {
            word.set_placeholder();
        }
        boxes.push(word);
    }

    flag_margins(&mut boxes, cfg);
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(level: i32, block: i32, par: i32, line: i32, word: i32, l: f32, t: f32, w: f32, h: f32, conf: f32, text: &str) -> String {
        format!("{level}\t1\t{block}\t{par}\t{line}\t{word}\t{l}\t{t}\t{w}\t{h}\t{conf}\t{text}")
    }

    #[test]
    fn reversed_parens_numeric() {
        assert_eq!(normalize_reversed_parens(")3("), "(3)");
    }

    #[test]
    fn reversed_parens_hebrew() {
        assert_eq!(normalize_reversed_parens(")א("), "(א)");
    }

    #[test]
    fn reversed_parens_no_trailing_paren() {
        assert_eq!(normalize_reversed_parens(")3"), "(3)");
    }

    #[test]
    fn already_correct_parens_untouched() {
        assert_eq!(normalize_reversed_parens("(3)"), "(3)");
    }

    #[test]
    fn lone_closing_paren_has_no_inner_and_is_untouched() {
        // len 1: no inner characters to normalize, regardless of the
        // no-trailing-`(` branch's length-2 floor.
        assert_eq!(normalize_reversed_parens(")"), ")");
    }

    #[test]
    fn malformed_row_is_skipped() {
        let lines = vec!["not\tenough\tcolumns".to_string()];
        let result = ingest_page(lines.into_iter());
        assert!(result.is_empty());
    }

    #[test]
    fn non_word_level_row_is_skipped() {
        let lines = vec![row(1, 1, 1, 1, 1, 0.0, 0.0, 10.0, 10.0, 90.0, "page")];
        assert!(ingest_page(lines.into_iter()).is_empty());
    }

    #[test]
    fn latin_always_kept_regardless_of_confidence() {
        let lines = vec![row(5, 1, 1, 1, 1, 0.0, 0.0, 10.0, 10.0, 0.0, "Zeer")];
        let result = ingest_page(lines.into_iter());
        assert_eq!(result.len(), 1);
        assert!(!result[0].is_placeholder);
        assert_eq!(result[0].text, "Zeer");
    }

    #[test]
    fn low_confidence_hebrew_becomes_placeholder() {
        let lines = vec![row(5, 1, 1, 1, 1, 0.0, 0.0, 10.0, 10.0, 2.0, "שלום")];
        let result = ingest_page(lines.into_iter());
        assert_eq!(result.len(), 1);
        assert!(result[0].is_placeholder);
        assert_eq!(result[0].text, "[...]");
    }

    #[test]
    fn duplicate_overlapping_box_dropped() {
        let lines = vec![
            row(5, 1, 1, 1, 1, 0.0, 0.0, 100.0, 30.0, 90.0, "שלום"),
            row(5, 1, 1, 1, 2, 5.0, 2.0, 90.0, 28.0, 90.0, "עולם"),
        ];
        let result = ingest_page(lines.into_iter());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "שלום");
    }

    #[test]
    fn placeholder_invariant_holds() {
        let lines = vec![row(5, 1, 1, 1, 1, 0.0, 0.0, 10.0, 10.0, 0.0, "xxxx")];
        let result = ingest_page(lines.into_iter());
        for w in &result {
            assert_eq!(w.is_placeholder, w.text == "[...]");
        }
    }
}
