//! C4 — WordPiece tokenizer over a fixed vocabulary, with masking support.

use std::collections::HashMap;
use std::io::BufRead;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const MASK_TOKEN: &str = "[MASK]";

const MAX_WORD_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct Vocab {
    token_to_id: HashMap<String, u32>,
    id_to_token: Vec<String>,
    pub pad_id: u32,
    pub unk_id: u32,
    pub cls_id: u32,
    pub sep_id: u32,
    pub mask_id: u32,
}

fn default_id(map: &HashMap<String, u32>, token: &str, default: u32) -> u32 {
    map.get(token).copied().unwrap_or(default)
}

impl Vocab {
    /// One token per line, line number (0-based) is the token id. Empty lines skipped.
    pub fn from_reader(reader: impl BufRead) -> std::io::Result<Self> {
        let mut token_to_id = HashMap::new();
        let mut id_to_token = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let id = id_to_token.len() as u32;
            token_to_id.insert(line.clone(), id);
            id_to_token.push(line);
        }
        Ok(Self::build(token_to_id, id_to_token))
    }

    pub fn from_lines<I: IntoIterator<Item = S>, S: Into<String>>(lines: I) -> Self {
        let mut token_to_id = HashMap::new();
        let mut id_to_token = Vec::new();
        for line in lines {
            let line: String = line.into();
            if line.is_empty() {
                continue;
            }
            let id = id_to_token.len() as u32;
            token_to_id.insert(line.clone(), id);
            id_to_token.push(line);
        }
        Self::build(token_to_id, id_to_token)
    }

    fn build(token_to_id: HashMap<String, u32>, id_to_token: Vec<String>) -> Self {
        let pad_id = default_id(&token_to_id, PAD_TOKEN, 0);
        let unk_id = default_id(&token_to_id, UNK_TOKEN, 1);
        let cls_id = default_id(&token_to_id, CLS_TOKEN, 2);
        let sep_id = default_id(&token_to_id, SEP_TOKEN, 3);
        let mask_id = default_id(&token_to_id, MASK_TOKEN, 4);
        Self {
            token_to_id,
            id_to_token,
            pad_id,
            unk_id,
            cls_id,
            sep_id,
            mask_id,
        }
    }

    pub fn is_in_vocab(&self, word: &str) -> bool {
        self.token_to_id.contains_key(&word.to_lowercase())
    }

    pub fn token_for_id(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(id as usize).map(|s| s.as_str())
    }

    fn id_of(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// WordPiece-tokenize a single lowercased word into vocabulary ids.
    fn tokenize_word(&self, word: &str) -> Vec<u32> {
        if word.chars().count() > MAX_WORD_LEN {
            return vec![self.unk_id];
        }
        if let Some(id) = self.id_of(word) {
            return vec![id];
        }

        let chars: Vec<char> = word.chars().collect();
        let mut ids = Vec::new();
        let mut s = 0usize;
        while s < chars.len() {
            let mut matched: Option<(usize, u32)> = None;
            // Greedy longest-match from the left.
            let mut e = chars.len();
            while e > s {
                let piece: String = chars[s..e].iter().collect();
                let candidate = if s == 0 {
                    self.id_of(&piece)
                } else {
                    self.id_of(&format!("##{piece}"))
                };
                if let Some(id) = candidate {
                    matched = Some((e, id));
                    break;
                }
                e -= 1;
            }
            match matched {
                Some((e, id)) => {
                    ids.push(id);
                    s = e;
                }
                None => return vec![self.unk_id],
            }
        }
        ids
    }

    /// Whitespace-split into words; concatenate per-word ids.
    pub fn tokenize(&self, text: &str) -> Vec<u32> {
        text.split_whitespace()
            .flat_map(|w| self.tokenize_word(&w.to_lowercase()))
            .collect()
    }

    pub fn is_hebrew_token(token: &str) -> bool {
        token.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c))
    }

    /// `[CLS] + tokens(text)`, truncated so `len + [SEP] <= max_len`, padded to `max_len`.
    pub fn encode(&self, text: &str, max_len: usize) -> Encoding {
        self.encode_with_mask_impl(text, None, max_len)
    }

    /// Same as [`Vocab::encode`], but the first whitespace-split word equal to
    /// `word_to_mask` (case-insensitively) has all of its tokens replaced by
    /// `[MASK]`. Returns the positions of the mask tokens in the padded array.
    pub fn encode_with_mask(&self, text: &str, word_to_mask: &str, max_len: usize) -> Encoding {
        self.encode_with_mask_impl(text, Some(word_to_mask), max_len)
    }

    fn encode_with_mask_impl(
        &self,
        text: &str,
        word_to_mask: Option<&str>,
        max_len: usize,
    ) -> Encoding {
        let mut ids = vec![self.cls_id];
        let mut mask_positions = Vec::new();
        let mut already_masked = false;

        for word in text.split_whitespace() {
            let lower = word.to_lowercase();
            let should_mask = !already_masked
                && word_to_mask
                    .map(|w| w.to_lowercase() == lower)
                    .unwrap_or(false);
            let word_ids = self.tokenize_word(&lower);
            if should_mask {
                already_masked = true;
                for _ in &word_ids {
                    mask_positions.push(ids.len());
                    ids.push(self.mask_id);
                }
            } else {
                ids.extend(word_ids);
            }
        }

        // Truncate so the total including the final [SEP] fits in max_len.
        if ids.len() + 1 > max_len {
            ids.truncate(max_len - 1);
            mask_positions.retain(|&p| p < ids.len());
        }
        ids.push(self.sep_id);

        let mut attention_mask = vec![1u32; ids.len()];
        while ids.len() < max_len {
            ids.push(self.pad_id);
            attention_mask.push(0);
        }
        let token_type_ids = vec![0u32; max_len];

        Encoding {
            input_ids: ids,
            attention_mask,
            token_type_ids,
            mask_positions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Encoding {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub mask_positions: Vec<usize>,
}
