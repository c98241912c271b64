//! C9 — interactive selection rendering: a pure function from a set of
//! selected box ids to the text they represent, grouped back into paragraphs.

use std::collections::{BTreeMap, HashSet};

use crate::entities::{LineId, WordBox, WordId};

const MIN_MARGIN_LETTERS: usize = 2;

fn is_hebrew_or_latin_letter(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c) || c.is_ascii_alphabetic()
}

fn letter_count(text: &str) -> usize {
    text.chars().filter(|&c| is_hebrew_or_latin_letter(c)).count()
}

/// `block*10^3 + par` — `lineId` with the `line` component dropped.
fn paragraph_id(line_id: LineId) -> i64 {
    line_id / 1_000
}

/// Groups `words` (already filtered to the boxes of interest) by line, then by
/// paragraph id, ordering paragraphs by their lowest member `lineId` and
/// joining each paragraph's words (across all its lines, in `lineId` order)
/// with spaces; paragraphs are joined by a blank line.
fn render_grouped(words: &[&WordBox]) -> String {
    let mut by_line: BTreeMap<LineId, Vec<&WordBox>> = BTreeMap::new();
    for w in words {
        by_line.entry(w.line_id).or_default().push(w);
    }
    for line_words in by_line.values_mut() {
        line_words.sort_by_key(|w| w.word_num);
    }

    let mut by_paragraph: BTreeMap<i64, Vec<LineId>> = BTreeMap::new();
    for &line_id in by_line.keys() {
        by_paragraph.entry(paragraph_id(line_id)).or_default().push(line_id);
    }

    let mut paragraph_order: Vec<(LineId, i64)> = by_paragraph
        .iter()
        .map(|(&pid, lines)| (*lines.iter().min().unwrap(), pid))
        .collect();
    paragraph_order.sort_by_key(|&(first_line, _)| first_line);

    paragraph_order
        .into_iter()
        .map(|(_, pid)| {
            let line_ids = &by_paragraph[&pid];
            let mut sorted_lines = line_ids.clone();
            sorted_lines.sort();
            sorted_lines
                .into_iter()
                .flat_map(|lid| by_line[&lid].iter().map(|w| w.text.as_str()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Renders the user-selected box set into text. Non-margin selections render
/// first, grouped into paragraphs; margin selections (if any) render after,
/// under a `[margin]` label, with words shorter than two Hebrew/Latin letters
/// suppressed.
pub fn to_selection_text(boxes: &[WordBox], selected: &HashSet<WordId>) -> String {
    let chosen: Vec<&WordBox> = boxes.iter().filter(|b| selected.contains(&b.id)).collect();
    let main: Vec<&WordBox> = chosen.iter().filter(|b| !b.is_margin).copied().collect();
    let margin: Vec<&WordBox> = chosen
        .iter()
        .filter(|b| b.is_margin && letter_count(&b.text) >= MIN_MARGIN_LETTERS)
        .copied()
        .collect();

    let main_text = render_grouped(&main);
    if margin.is_empty() {
        return main_text;
    }
    let margin_text = render_grouped(&margin);
    if main_text.is_empty() {
        format!("[margin]\n{margin_text}")
    } else {
        format!("{main_text}\n\n[margin]\n{margin_text}")
    }
}
