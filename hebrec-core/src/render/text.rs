//! C9 — plain-text rendering: one blank-line-separated block per paragraph,
//! header/footer paragraphs prefixed with a bracketed role label.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::entities::{LineId, ParagraphRole, PageStructure, WordBox, PLACEHOLDER_TEXT};

lazy_static! {
    static ref ADJACENT_PLACEHOLDERS: Regex =
        Regex::new(r"(?:\[\.\.\.\]\s+)+\[\.\.\.\]").unwrap();
}

fn words_by_line(boxes: &[WordBox]) -> HashMap<LineId, Vec<&WordBox>> {
    let mut by_line: HashMap<LineId, Vec<&WordBox>> = HashMap::new();
    for b in boxes {
        by_line.entry(b.line_id).or_default().push(b);
    }
    for words in by_line.values_mut() {
        words.sort_by_key(|w| w.word_num);
    }
    by_line
}

fn collapse_adjacent_placeholders(text: &str) -> String {
    ADJACENT_PLACEHOLDERS.replace_all(text, PLACEHOLDER_TEXT).into_owned()
}

/// Per-paragraph body text: each paragraph's lines concatenated in order,
/// words space-joined, no role prefix and no cross-paragraph placeholder
/// collapsing. One entry per `structure.paragraphs`, same order. This is the
/// building block both `to_plain_text` (which adds role prefixes and then
/// collapses placeholders across the whole assembled string) and callers
/// that need paragraph boundaries to survive collapsing (the DOCX emitter)
/// derive from.
pub fn paragraph_bodies(structure: &PageStructure, boxes: &[WordBox]) -> Vec<String> {
    let by_line = words_by_line(boxes);
    structure
        .paragraphs
        .iter()
        .map(|paragraph| {
            paragraph
                .line_ids
                .iter()
                .filter_map(|lid| by_line.get(lid))
                .flat_map(|words| words.iter().map(|w| w.text.as_str()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Renders a page's [`PageStructure`] into plain text: each paragraph becomes
/// one line of space-joined words (its lines concatenated in order), blank
/// lines between paragraphs, header/footer prefixed with `[header]`/`[footer]`.
pub fn to_plain_text(structure: &PageStructure, boxes: &[WordBox]) -> String {
    let bodies = paragraph_bodies(structure, boxes);

    let paragraph_blocks: Vec<String> = structure
        .paragraphs
        .iter()
        .zip(bodies.iter())
        .map(|(paragraph, body)| match paragraph.role {
            ParagraphRole::Header => format!("[header] {body}"),
            ParagraphRole::Footer => format!("[footer] {body}"),
            ParagraphRole::Body | ParagraphRole::SectionHeading => body.clone(),
        })
        .collect();

    let assembled = paragraph_blocks.join("\n\n");
    collapse_adjacent_placeholders(&assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{make_line_id, BBox, DetectedParagraph, WordBox};

    fn wb(id: u64, line: i64, word_num: u32, text: &str, placeholder: bool) -> WordBox {
        WordBox {
            id,
            text: text.to_string(),
            frame: BBox::new(0.0, 0.0, 10.0, 10.0),
            line_id: make_line_id(1, 1, line),
            word_num,
            is_margin: false,
            is_placeholder: placeholder,
        }
    }

    #[test]
    fn joins_words_and_separates_paragraphs() {
        let boxes = vec![
            wb(1, 1, 0, "שלום", false),
            wb(2, 1, 1, "עולם", false),
            wb(3, 2, 0, "גוף", false),
        ];
        let structure = PageStructure {
            paragraphs: vec![
                DetectedParagraph {
                    line_ids: vec![make_line_id(1, 1, 1)],
                    role: ParagraphRole::Body,
                    section_number: None,
                    is_centered: false,
                },
                DetectedParagraph {
                    line_ids: vec![make_line_id(1, 1, 2)],
                    role: ParagraphRole::Body,
                    section_number: None,
                    is_centered: false,
                },
            ],
            header_lines: Default::default(),
            footer_lines: Default::default(),
        };
        let text = to_plain_text(&structure, &boxes);
        assert_eq!(text, "שלום עולם\n\nגוף");
    }

    #[test]
    fn prefixes_header_and_footer() {
        let boxes = vec![wb(1, 1, 0, "כותרת", false)];
        let structure = PageStructure {
            paragraphs: vec![DetectedParagraph {
                line_ids: vec![make_line_id(1, 1, 1)],
                role: ParagraphRole::Header,
                section_number: None,
                is_centered: false,
            }],
            header_lines: [make_line_id(1, 1, 1)].into_iter().collect(),
            footer_lines: Default::default(),
        };
        let text = to_plain_text(&structure, &boxes);
        assert_eq!(text, "[header] כותרת");
    }

    #[test]
    fn collapses_adjacent_placeholders() {
        let boxes = vec![
            wb(1, 1, 0, "[...]", true),
            wb(2, 1, 1, "[...]", true),
            wb(3, 1, 2, "שלום", false),
        ];
        let structure = PageStructure {
            paragraphs: vec![DetectedParagraph {
                line_ids: vec![make_line_id(1, 1, 1)],
                role: ParagraphRole::Body,
                section_number: None,
                is_centered: false,
            }],
            header_lines: Default::default(),
            footer_lines: Default::default(),
        };
        let text = to_plain_text(&structure, &boxes);
        assert_eq!(text, "[...] שלום");
    }
}
