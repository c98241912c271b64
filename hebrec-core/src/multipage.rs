//! C8 — multi-page assembler: detects and removes repeating (watermark)
//! paragraphs across the pages of one export.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::ReconstructConfig;
use crate::entities::{DetectedParagraph, LineId, PageStructure, WordBox};
use crate::script::{classify, ScriptClass};

/// One page's boxes plus its analyzed structure, as produced by C2/C3/C6/C7.
/// Serializable so a caller can dump the intermediate result to JSON, the way
/// the teacher's `save_parsed_document` serializes its `ParsedDocument`.
#[derive(Serialize)]
pub struct PageContent {
    pub boxes: Vec<WordBox>,
    pub structure: PageStructure,
}

/// Serializes a reconstructed document's pages to pretty-printed JSON,
/// mirroring the teacher's `save_parsed_document` (`ferrules-core/src/lib.rs`),
/// which owns the actual `serde_json::to_string` call rather than leaving it
/// to the CLI.
pub fn to_json(pages: &[PageContent]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(pages)
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

/// Hebrew-only signature of a paragraph: words containing at least one Hebrew
/// character, joined by single spaces, in line/word order.
fn paragraph_signature(paragraph: &DetectedParagraph, by_line: &HashMap<LineId, Vec<&WordBox>>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for line_id in &paragraph.line_ids {
        let Some(line_words) = by_line.get(line_id) else {
            continue;
        };
        for w in line_words {
            if w.is_placeholder {
                continue;
            }
            if matches!(classify(&w.text), ScriptClass::Hebrew | ScriptClass::HebrewMixed) {
                words.push(&w.text);
            }
        }
    }
    words.join(" ")
}

fn hebrew_char_count(signature: &str) -> usize {
    signature
        .chars()
        .filter(|c| ('\u{0590}'..='\u{05FF}').contains(c))
        .count()
}

/// Removes watermark paragraphs (those whose Hebrew signature recurs on more
/// than half the pages, with at least `watermark_min_hebrew_chars` Hebrew
/// characters) from every page's structure, in place. Only runs when
/// `pages.len() >= cfg.watermark_min_pages`. Header/footer line-id sets are
/// left untouched — only the paragraph list is filtered.
pub fn remove_watermarks(pages: &mut [PageContent]) {
    remove_watermarks_with_config(pages, &ReconstructConfig::default())
}

/// As [`remove_watermarks`], but with overridable thresholds.
pub fn remove_watermarks_with_config(pages: &mut [PageContent], cfg: &ReconstructConfig) {
    if pages.len() < cfg.watermark_min_pages {
        return;
    }

    // Computing each page's paragraph signatures is embarrassingly parallel
    // (no cross-page state), so it fans out over rayon's pool; the
    // majority-of-pages count below is a genuine fold and stays sequential.
    let per_page_signatures: Vec<Vec<String>> = pages
        .par_iter()
        .map(|page| {
            let by_line = words_by_line(&page.boxes);
            page.structure
                .paragraphs
                .iter()
                .map(|paragraph| paragraph_signature(paragraph, &by_line))
                .collect()
        })
        .collect();

    let mut page_counts: HashMap<String, usize> = HashMap::new();
    for sigs in &per_page_signatures {
        let mut seen_this_page: HashSet<&String> = HashSet::new();
        for sig in sigs {
            if seen_this_page.insert(sig) {
                *page_counts.entry(sig.clone()).or_insert(0) += 1;
            }
        }
    }

    let half = pages.len() / 2;
    let watermarks: HashSet<String> = page_counts
        .into_iter()
        .filter(|(sig, count)| *count > half && hebrew_char_count(sig) >= cfg.watermark_min_hebrew_chars)
        .map(|(sig, _)| sig)
        .collect();

    if watermarks.is_empty() {
        return;
    }

    for (page, sigs) in pages.iter_mut().zip(per_page_signatures.into_iter()) {
        let mut kept = Vec::with_capacity(page.structure.paragraphs.len());
        for (paragraph, sig) in page.structure.paragraphs.drain(..).zip(sigs.into_iter()) {
            if !watermarks.contains(&sig) {
                kept.push(paragraph);
            }
        }
        page.structure.paragraphs = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{make_line_id, BBox, ParagraphRole, WordBox};

    fn wb(id: u64, line: i64, word_num: u32, text: &str) -> WordBox {
        WordBox {
            id,
            text: text.to_string(),
            frame: BBox::new(0.0, 0.0, 10.0, 10.0),
            line_id: make_line_id(1, 1, line),
            word_num,
            is_margin: false,
            is_placeholder: false,
        }
    }

    fn page_with_stamp(stamp_line: i64, unique_word: &str) -> PageContent {
        let boxes = vec![
            wb(1, stamp_line, 0, "מסמך"),
            wb(2, stamp_line, 1, "רשמי"),
            wb(3, stamp_line, 2, "מאומת"),
            wb(4, 99, 0, unique_word),
        ];
        let structure = PageStructure {
            paragraphs: vec![
                DetectedParagraph {
                    line_ids: vec![make_line_id(1, 1, stamp_line)],
                    role: ParagraphRole::Body,
                    section_number: None,
                    is_centered: false,
                },
                DetectedParagraph {
                    line_ids: vec![make_line_id(1, 1, 99)],
                    role: ParagraphRole::Body,
                    section_number: None,
                    is_centered: false,
                },
            ],
            header_lines: Default::default(),
            footer_lines: Default::default(),
        };
        PageContent { boxes, structure }
    }

    #[test]
    fn removes_paragraph_repeating_on_majority_of_pages() {
        let mut pages = vec![
            page_with_stamp(1, "אחד"),
            page_with_stamp(1, "שתיים"),
            page_with_stamp(1, "שלוש"),
        ];
        remove_watermarks(&mut pages);
        for page in &pages {
            assert_eq!(page.structure.paragraphs.len(), 1);
            assert_eq!(page.structure.paragraphs[0].line_ids[0], make_line_id(1, 1, 99));
        }
    }

    #[test]
    fn too_few_pages_skips_detection() {
        let mut pages = vec![page_with_stamp(1, "אחד"), page_with_stamp(1, "שתיים")];
        remove_watermarks(&mut pages);
        for page in &pages {
            assert_eq!(page.structure.paragraphs.len(), 2);
        }
    }

    #[test]
    fn idempotent_second_pass_is_no_op() {
        let mut pages = vec![
            page_with_stamp(1, "אחד"),
            page_with_stamp(1, "שתיים"),
            page_with_stamp(1, "שלוש"),
        ];
        remove_watermarks(&mut pages);
        let snapshot: Vec<usize> = pages.iter().map(|p| p.structure.paragraphs.len()).collect();
        remove_watermarks(&mut pages);
        let snapshot2: Vec<usize> = pages.iter().map(|p| p.structure.paragraphs.len()).collect();
        assert_eq!(snapshot, snapshot2);
    }
}
