//! C3 — margin column detector: finds the vertical gap separating the main
//! column from a left-side annotation column on right-to-left pages.

use crate::config::ReconstructConfig;
use crate::entities::WordBox;

/// Flags `isMargin` on boxes left of the detected margin boundary, if any.
/// Runs only when at least `cfg.margin_min_boxes` boxes exist on the page.
pub fn flag_margins(boxes: &mut [WordBox], cfg: &ReconstructConfig) {
    if boxes.len() < cfg.margin_min_boxes {
        return;
    }

    let max_x = boxes
        .iter()
        .map(|b| b.frame.x)
        .fold(f32::NEG_INFINITY, f32::max);
    let tsv_width = max_x * cfg.margin_width_fudge;
    let band_low = cfg.margin_band_low * tsv_width;
    let band_high = cfg.margin_band_high * tsv_width;

    let mut lefts: Vec<f32> = boxes.iter().map(|b| b.frame.x).collect();
    lefts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    lefts.dedup_by(|a, b| (*a - *b).abs() < f32::EPSILON);

    let mut best_gap = 0.0f32;
    let mut best_boundary: Option<f32> = None;
    for w in lefts.windows(2) {
        let (prev, next) = (w[0], w[1]);
        let mid = (prev + next) / 2.0;
        if mid < band_low || mid > band_high {
            continue;
        }
        let gap = next - prev;
        if gap > best_gap {
            best_gap = gap;
            best_boundary = Some(mid);
        }
    }

    let Some(boundary) = best_boundary else {
        return;
    };
    if best_gap <= cfg.margin_gap_threshold_fraction * tsv_width {
        return;
    }

    for b in boxes.iter_mut() {
        if b.frame.x < boundary {
            b.is_margin = true;
        }
    }
}
