//! C6 — four-phase LM-driven word correction over a page's boxes.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::config::ReconstructConfig;
use crate::entities::WordBox;
use crate::lm::MaskedLmService;
use crate::script::{classify, ScriptClass};

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut cur = vec![0usize; m + 1];
    for i in 1..=n {
        cur[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[m]
}

fn line_text(words: &[&WordBox]) -> String {
    words
        .iter()
        .sorted_by_key(|w| w.word_num)
        .map(|w| w.text.as_str())
        .join(" ")
}

fn group_by_line(boxes: &mut [WordBox]) -> BTreeMap<i64, Vec<usize>> {
    let mut by_line: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, b) in boxes.iter().enumerate() {
        by_line.entry(b.line_id).or_default().push(idx);
    }
    for idxs in by_line.values_mut() {
        idxs.sort_by_key(|&i| boxes[i].word_num);
    }
    by_line
}

fn hebrew_context_count(boxes: &[WordBox], idxs: &[usize], cfg: &ReconstructConfig) -> usize {
    let _ = cfg;
    idxs.iter()
        .filter(|&&i| !boxes[i].is_placeholder)
        .filter(|&&i| {
            matches!(
                classify(&boxes[i].text),
                ScriptClass::Hebrew | ScriptClass::HebrewMixed
            )
        })
        .count()
}

/// Runs all four phases over a page's boxes in place. Phases 1-3 are no-ops
/// if `lm` is `None` (LM-unavailable, §7); phase 4 always runs.
pub async fn post_process(boxes: &mut Vec<WordBox>, lm: Option<&MaskedLmService>) {
    post_process_with_config(boxes, lm, &ReconstructConfig::default()).await
}

/// As [`post_process`], but with overridable thresholds.
pub async fn post_process_with_config(
    boxes: &mut Vec<WordBox>,
    lm: Option<&MaskedLmService>,
    cfg: &ReconstructConfig,
) {
    let lm_ready = lm.map(|s| s.is_ready()).unwrap_or(false);

    if let Some(service) = lm.filter(|_| lm_ready) {
        phase1_latin_garbage_replacement(boxes, service, cfg).await;
        phase2_hebrew_near_miss(boxes, service, cfg).await;
        phase3_confusion_fallback(boxes, service);
    }
    phase4_rule_based_cleanup(boxes);
}

async fn phase1_latin_garbage_replacement(
    boxes: &mut Vec<WordBox>,
    lm: &MaskedLmService,
    cfg: &ReconstructConfig,
) {
    let by_line = group_by_line(boxes);
    for (_line_id, idxs) in by_line {
        if hebrew_context_count(boxes, &idxs, cfg) < cfg.hebrew_context_min_count {
            continue;
        }

        for &i in &idxs {
            if boxes[i].is_placeholder {
                continue;
            }
            if !matches!(classify(&boxes[i].text), ScriptClass::LatinOnly) {
                continue;
            }
            // Rebuilt per box, not hoisted above the loop: an earlier Latin
            // box on this line may already have been rewritten or
            // placeheld by this same phase, and the mask context must
            // reflect that, not the line's pre-Phase-1 text.
            let refs: Vec<&WordBox> = idxs.iter().map(|&j| &boxes[j]).collect();
            let text = line_text(&refs);
            drop(refs);
            let word_text = boxes[i].text.clone();
            let Some(pred) = lm.predict_masked(&text, &word_text).await else {
                continue;
            };
            let best = pred
                .top_k
                .iter()
                .find(|(tok, _)| !tok.starts_with("##") && crate::tokenizer::Vocab::is_hebrew_token(tok));
            match best {
                Some((tok, p)) if *p >= cfg.phase1_min_probability => {
                    boxes[i].set_text(tok.clone());
                }
                _ => boxes[i].set_placeholder(),
            }
        }
    }
}

async fn phase2_hebrew_near_miss(
    boxes: &mut Vec<WordBox>,
    lm: &MaskedLmService,
    cfg: &ReconstructConfig,
) {
    let by_line = group_by_line(boxes);
    for (_line_id, idxs) in by_line {
        if hebrew_context_count(boxes, &idxs, cfg) < cfg.hebrew_context_min_count {
            continue;
        }
        for &i in &idxs {
            if boxes[i].is_placeholder {
                continue;
            }
            if !matches!(classify(&boxes[i].text), ScriptClass::Hebrew) {
                continue;
            }
            if boxes[i].text.chars().count() < 3 {
                continue;
            }
            let refs: Vec<&WordBox> = idxs.iter().map(|&j| &boxes[j]).collect();
            let text = line_text(&refs);
            drop(refs);
            let word_text = boxes[i].text.clone();
            let Some(pred) = lm.predict_masked(&text, &word_text).await else {
                continue;
            };
            for (tok, p) in &pred.top_k {
                if *p < cfg.phase2_min_probability {
                    continue;
                }
                if tok.starts_with("##") || !crate::tokenizer::Vocab::is_hebrew_token(tok) {
                    continue;
                }
                if *tok == word_text {
                    continue;
                }
                if tok.chars().count() != word_text.chars().count() {
                    continue;
                }
                if levenshtein(tok, &word_text) != 1 {
                    continue;
                }
                boxes[i].set_text(tok.clone());
                break;
            }
        }
    }
}

fn phase3_confusion_fallback(boxes: &mut [WordBox], lm: &MaskedLmService) {
    for b in boxes.iter_mut() {
        if b.is_placeholder {
            continue;
        }
        if !matches!(classify(&b.text), ScriptClass::Hebrew) {
            continue;
        }
        if b.text.chars().count() < 3 {
            continue;
        }
        if let Some(correction) = lm.correct_by_confusion(&b.text) {
            b.set_text(correction);
        }
    }
}

fn phase4_rule_based_cleanup(boxes: &mut [WordBox]) {
    let by_line = group_by_line(boxes);
    for (_line_id, idxs) in by_line {
        let hebrew_count = idxs
            .iter()
            .filter(|&&i| !boxes[i].is_placeholder)
            .filter(|&&i| {
                matches!(
                    classify(&boxes[i].text),
                    ScriptClass::Hebrew | ScriptClass::HebrewMixed
                )
            })
            .count();
        let latin_count = idxs
            .iter()
            .filter(|&&i| !boxes[i].is_placeholder)
            .filter(|&&i| matches!(classify(&boxes[i].text), ScriptClass::LatinOnly))
            .count();
        if hebrew_count <= 1 && latin_count >= 3 {
            for &i in &idxs {
                if !boxes[i].is_placeholder && matches!(classify(&boxes[i].text), ScriptClass::LatinOnly) {
                    boxes[i].set_placeholder();
                }
            }
        }
    }
}
