//! Tunable thresholds collected into one struct, following the teacher's
//! `ORTConfig` pattern of gathering CLI/constructor tunables instead of
//! scattering literals through the pipeline. `Default` reproduces exactly the
//! constants spec.md states; callers (tests, the CLI, library embedders) can
//! override individual fields without touching component code.

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructConfig {
    /// C2: confidence threshold above which Hebrew/HebrewMixed words are kept
    /// outright rather than placeheld.
    pub hebrew_confidence_threshold: f32,
    /// C2: confidence threshold for Number/Punctuation/SectionMarker words.
    pub symbolic_confidence_threshold: f32,
    /// C2: overlap fraction (of the smaller rectangle) above which a new box
    /// is treated as a duplicate of an already-accepted one.
    pub duplicate_overlap_fraction: f32,

    /// C3: minimum box count before margin detection runs at all.
    pub margin_min_boxes: usize,
    /// C3: search band (as fractions of `tsvWidth`) for the margin gap.
    pub margin_band_low: f32,
    pub margin_band_high: f32,
    /// C3: minimum gap (as a fraction of `tsvWidth`) to accept as a boundary.
    pub margin_gap_threshold_fraction: f32,
    pub margin_width_fudge: f32,

    /// C4/C5: fixed sequence length and top-K breadth for masked-LM calls.
    pub lm_max_len: usize,
    pub lm_top_k: usize,

    /// C6 phase 1: minimum Hebrew-token probability to accept a replacement
    /// for a Latin-garbage box.
    pub phase1_min_probability: f32,
    /// C6 phase 2: minimum probability to accept a same-length, edit-distance
    /// 1 Hebrew near-miss correction.
    pub phase2_min_probability: f32,
    /// C6: minimum Hebrew-ish word count on a line for it to be "Hebrew context".
    pub hebrew_context_min_count: usize,

    /// C7: header/footer gap-detection tunables.
    pub header_footer_gap_factor: f32,
    pub header_footer_line_cap: usize,
    pub footer_extension_line_cap: usize,
    pub short_line_factor: f32,
    pub paragraph_break_gap_factor: f32,
    pub center_distance_factor: f32,

    /// C8: only attempt watermark detection once a document has at least
    /// this many pages.
    pub watermark_min_pages: usize,
    /// C8: minimum Hebrew-character count in a signature to qualify as a
    /// watermark candidate.
    pub watermark_min_hebrew_chars: usize,

    /// §5: soft cap on concurrently processed pages during a multi-page export.
    pub max_concurrent_pages: usize,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            hebrew_confidence_threshold: 5.0,
            symbolic_confidence_threshold: 20.0,
            duplicate_overlap_fraction: 0.5,

            margin_min_boxes: 10,
            margin_band_low: 0.30,
            margin_band_high: 0.45,
            margin_gap_threshold_fraction: 0.03,
            margin_width_fudge: 1.1,

            lm_max_len: 128,
            lm_top_k: 20,

            phase1_min_probability: 0.05,
            phase2_min_probability: 0.15,
            hebrew_context_min_count: 2,

            header_footer_gap_factor: 3.0,
            header_footer_line_cap: 3,
            footer_extension_line_cap: 8,
            short_line_factor: 0.7,
            paragraph_break_gap_factor: 1.5,
            center_distance_factor: 0.08,

            watermark_min_pages: 3,
            watermark_min_hebrew_chars: 4,

            max_concurrent_pages: 4,
        }
    }
}
