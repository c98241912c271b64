//! C5 — masked-LM adapter: the interface this crate consumes from an external
//! masked language model, plus the actor that serializes access to it.

pub mod ort_adapter;

use std::sync::Arc;

use ndarray::Array3;
use tokio::sync::{mpsc, oneshot};

use crate::entities::MaskPrediction;
use crate::tokenizer::Vocab;

const MAX_LEN: usize = 128;
const TOP_K: usize = 20;

/// The interface this crate consumes from an external masked-LM runtime. The
/// runtime itself (tokenizer-to-tensor plumbing aside) is out of scope; this
/// crate only needs `infer` to return the `[1, maxLen, vocabSize]` logits row.
pub trait MaskedLanguageModel: Send + Sync {
    fn infer(
        &self,
        input_ids: &[u32],
        attention_mask: &[u32],
        token_type_ids: &[u32],
    ) -> anyhow::Result<Array3<f32>>;
}

struct InferRequest {
    input_ids: Vec<u32>,
    attention_mask: Vec<u32>,
    token_type_ids: Vec<u32>,
    respond_to: oneshot::Sender<anyhow::Result<Array3<f32>>>,
}

/// Serializes concurrent callers onto one logical model instance, mirroring
/// the teacher's layout-parser queue actor: an mpsc channel feeding a single
/// task that owns the model.
#[derive(Clone)]
pub struct MaskedLmQueue {
    queue: mpsc::Sender<InferRequest>,
}

impl MaskedLmQueue {
    pub fn new<M: MaskedLanguageModel + 'static>(model: Arc<M>) -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(Self::run(model, rx));
        Self { queue: tx }
    }

    async fn run<M: MaskedLanguageModel + 'static>(
        model: Arc<M>,
        mut rx: mpsc::Receiver<InferRequest>,
    ) {
        while let Some(req) = rx.recv().await {
            let result = model.infer(&req.input_ids, &req.attention_mask, &req.token_type_ids);
            let _ = req.respond_to.send(result);
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.queue.is_closed()
    }

    async fn infer(
        &self,
        input_ids: Vec<u32>,
        attention_mask: Vec<u32>,
        token_type_ids: Vec<u32>,
    ) -> anyhow::Result<Array3<f32>> {
        let (respond_to, rx) = oneshot::channel();
        self.queue
            .send(InferRequest {
                input_ids,
                attention_mask,
                token_type_ids,
                respond_to,
            })
            .await
            .map_err(|_| anyhow::anyhow!("masked-LM queue actor is gone"))?;
        rx.await
            .map_err(|_| anyhow::anyhow!("masked-LM actor dropped the response"))?
    }
}

/// Fixed confusion-pair set from spec §4.6 phase 3.
pub const CONFUSION_PAIRS: [(char, char); 6] = [
    ('ר', 'ד'),
    ('ב', 'כ'),
    ('ו', 'ז'),
    ('ה', 'ח'),
    ('ם', 'ס'),
    ('ן', 'ו'),
];

/// Owns the tokenizer and LM queue; exposes `predictMasked`/`correctByConfusion`.
pub struct MaskedLmService {
    vocab: Vocab,
    queue: MaskedLmQueue,
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl MaskedLmService {
    pub fn new(vocab: Vocab, queue: MaskedLmQueue) -> Self {
        Self { vocab, queue }
    }

    pub fn is_ready(&self) -> bool {
        self.queue.is_ready()
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Encode `line_text` masking the first occurrence of `word_to_mask`, run
    /// inference, softmax the first mask row, and return the top-K Hebrew
    /// probability summary. Returns `None` if no mask position resulted.
    pub async fn predict_masked(
        &self,
        line_text: &str,
        word_to_mask: &str,
    ) -> Option<MaskPrediction> {
        let enc = self.vocab.encode_with_mask(line_text, word_to_mask, MAX_LEN);
        let mask_pos = *enc.mask_positions.first()?;

        let logits = self
            .queue
            .infer(enc.input_ids, enc.attention_mask, enc.token_type_ids)
            .await
            .map_err(|e| tracing::warn!("masked-LM inference failed: {e:#}"))
            .ok()?;

        let vocab_size = logits.shape()[2];
        let row: Vec<f32> = (0..vocab_size).map(|v| logits[[0, mask_pos, v]]).collect();
        let probs = softmax(&row);

        let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let mut top_k = Vec::with_capacity(TOP_K);
        for (id, p) in ranked.into_iter().take(TOP_K) {
            if let Some(tok) = self.vocab.token_for_id(id as u32) {
                top_k.push((tok.to_string(), p));
            }
        }
        let hebrew_probability = top_k
            .iter()
            .filter(|(tok, _)| Vocab::is_hebrew_token(tok))
            .map(|(_, p)| p)
            .sum();

        Some(MaskPrediction {
            top_k,
            hebrew_probability,
        })
    }

    /// Single-character-substitution fallback over the fixed confusion pairs.
    /// Returns the sole in-vocabulary candidate, if exactly one was produced.
    pub fn correct_by_confusion(&self, word: &str) -> Option<String> {
        if self.vocab.is_in_vocab(word) {
            return None;
        }
        let chars: Vec<char> = word.chars().collect();
        let mut candidates = std::collections::HashSet::new();
        for (pos, &ch) in chars.iter().enumerate() {
            for &(a, b) in CONFUSION_PAIRS.iter() {
                let replacement = if ch == a {
                    Some(b)
                } else if ch == b {
                    Some(a)
                } else {
                    None
                };
                if let Some(repl) = replacement {
                    let mut candidate_chars = chars.clone();
                    candidate_chars[pos] = repl;
                    let candidate: String = candidate_chars.into_iter().collect();
                    if self.vocab.is_in_vocab(&candidate) {
                        candidates.insert(candidate);
                    }
                }
            }
        }
        if candidates.len() == 1 {
            candidates.into_iter().next()
        } else {
            None
        }
    }
}
