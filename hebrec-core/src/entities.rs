use serde::{Deserialize, Serialize};

/// A word's bounding rectangle in OCR pixel space, origin top-left, Y growing downward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline(always)]
    pub fn x1(&self) -> f32 {
        self.x + self.width
    }

    #[inline(always)]
    pub fn y1(&self) -> f32 {
        self.y + self.height
    }

    #[inline(always)]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    #[inline(always)]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn overlap_x(&self, other: &Self) -> f32 {
        f32::max(0.0, f32::min(self.x1(), other.x1()) - f32::max(self.x, other.x))
    }

    fn overlap_y(&self, other: &Self) -> f32 {
        f32::max(
            0.0,
            f32::min(self.y1(), other.y1()) - f32::max(self.y, other.y),
        )
    }

    #[inline(always)]
    pub fn intersection(&self, other: &Self) -> f32 {
        self.overlap_x(other) * self.overlap_y(other)
    }

    /// Overlap area as a fraction of the smaller of the two rectangles' areas.
    pub fn overlap_fraction_of_smaller(&self, other: &Self) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection(other) / smaller
    }
}

pub type WordId = u64;

/// Composite integer encoding `(block, paragraph, line)` as `block*1e6 + par*1e3 + line`.
pub type LineId = i64;

pub fn make_line_id(block: i64, par: i64, line: i64) -> LineId {
    block * 1_000_000 + par * 1_000 + line
}

/// One recognized word, as produced by C2 and mutated in place by C3/C6.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WordBox {
    pub id: WordId,
    pub text: String,
    pub frame: BBox,
    pub line_id: LineId,
    pub word_num: u32,
    pub is_margin: bool,
    pub is_placeholder: bool,
}

pub const PLACEHOLDER_TEXT: &str = "[...]";

impl WordBox {
    pub fn set_placeholder(&mut self) {
        self.text = PLACEHOLDER_TEXT.to_string();
        self.is_placeholder = true;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.is_placeholder = false;
    }
}

/// Derived per-`lineId` geometry, recomputed on demand from a (filtered) box slice.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMetrics {
    pub line_id: LineId,
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub word_count: usize,
    pub first_word: Option<String>,
    pub second_word: Option<String>,
}

impl LineMetrics {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// `block*1e3 + par`, i.e. `lineId` with the `line` component dropped.
    pub fn paragraph_number(&self) -> i64 {
        self.line_id / 1_000
    }

    pub fn mid_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }
}

/// Compute per-line metrics from a slice of boxes, ignoring placeholders for
/// first/second-word purposes but including their geometry (word_count counts
/// every box on the line, placeholders included, matching spec's "word count").
pub fn line_metrics(boxes: &[WordBox]) -> Vec<LineMetrics> {
    use std::collections::BTreeMap;
    let mut by_line: BTreeMap<LineId, Vec<&WordBox>> = BTreeMap::new();
    for b in boxes {
        by_line.entry(b.line_id).or_default().push(b);
    }
    by_line
        .into_iter()
        .map(|(line_id, mut words)| {
            words.sort_by_key(|w| w.word_num);
            let min_x = words.iter().map(|w| w.frame.x).fold(f32::INFINITY, f32::min);
            let max_x = words
                .iter()
                .map(|w| w.frame.x1())
                .fold(f32::NEG_INFINITY, f32::max);
            let min_y = words.iter().map(|w| w.frame.y).fold(f32::INFINITY, f32::min);
            let max_y = words
                .iter()
                .map(|w| w.frame.y1())
                .fold(f32::NEG_INFINITY, f32::max);
            LineMetrics {
                line_id,
                min_x,
                max_x,
                min_y,
                max_y,
                word_count: words.len(),
                first_word: words.first().map(|w| w.text.clone()),
                second_word: words.get(1).map(|w| w.text.clone()),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ParagraphRole {
    Header,
    Footer,
    Body,
    SectionHeading,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectedParagraph {
    pub line_ids: Vec<LineId>,
    pub role: ParagraphRole,
    pub section_number: Option<String>,
    pub is_centered: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageStructure {
    pub paragraphs: Vec<DetectedParagraph>,
    pub header_lines: std::collections::BTreeSet<LineId>,
    pub footer_lines: std::collections::BTreeSet<LineId>,
}

/// Top-K `(token, probability)` pairs from one masked-LM evaluation.
#[derive(Debug, Clone)]
pub struct MaskPrediction {
    pub top_k: Vec<(String, f32)>,
    pub hebrew_probability: f32,
}

/// One page's logical export contract (§6): the rendered main text, the
/// rendered margin-column text (empty if the page has no margin), the
/// structure they were rendered from, and the per-paragraph body text (one
/// entry per `structure.paragraphs`, same order, role prefix stripped,
/// placeholders left uncollapsed). Serializers that need paragraph
/// boundaries intact (DOCX) must use `paragraph_texts`, not re-split
/// `main_text` — `main_text`'s placeholder collapse can merge adjacent
/// paragraphs whose boundary is only `[...]` tokens.
#[derive(Debug, Clone)]
pub struct LogicalPage {
    pub main_text: String,
    pub margin_text: String,
    pub structure: PageStructure,
    pub paragraph_texts: Vec<String>,
}

/// A whole export: a title plus its pages, in document order.
#[derive(Debug, Clone)]
pub struct LogicalDocument {
    pub title: String,
    pub pages: Vec<LogicalPage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_id_encodes_block_par_line() {
        assert_eq!(make_line_id(1, 2, 3), 1_002_003);
    }

    #[test]
    fn overlap_fraction_of_smaller_detects_duplicate() {
        let a = BBox::new(0.0, 0.0, 100.0, 30.0);
        let b = BBox::new(5.0, 2.0, 90.0, 28.0);
        // b's area is the smaller one; intersection should exceed 50% of it.
        assert!(a.overlap_fraction_of_smaller(&b) > 0.5);
    }

    #[test]
    fn no_overlap_is_zero() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(a.overlap_fraction_of_smaller(&b), 0.0);
    }
}
