//! Core library for reconstructing readable Hebrew documents from
//! word-level OCR output: ingest and clean raw OCR rows, detect margin
//! columns, correct garbage/near-miss tokens with a masked language model,
//! recover page structure (headers, footers, section headings), strip
//! cross-page watermarks, and render the result to plain text, a selection
//! view, HTML, or DOCX.

pub mod config;
pub mod correct;
pub mod entities;
pub mod error;
pub mod ingest;
pub mod lm;
pub mod margin;
pub mod multipage;
pub mod pipeline;
pub mod render;
pub mod script;
pub mod structure;
pub mod tokenizer;

pub use config::ReconstructConfig;
pub use entities::{
    make_line_id, BBox, DetectedParagraph, LineId, LineMetrics, LogicalDocument, LogicalPage,
    MaskPrediction, PageStructure, ParagraphRole, WordBox, WordId, PLACEHOLDER_TEXT,
};
pub use error::ExportError;
pub use ingest::{ingest_page, ingest_page_with_config};
pub use lm::{MaskedLanguageModel, MaskedLmQueue, MaskedLmService};
pub use multipage::{remove_watermarks, remove_watermarks_with_config, PageContent};
pub use pipeline::{reconstruct_document, reconstruct_page, reconstruct_page_cancellable};
pub use script::{classify, ScriptClass};
