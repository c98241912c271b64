//! C9 — structured emitter: renders a page into plain text, a selection-only
//! view, HTML, or a serialized document. Each renderer is a pure function
//! over `(&PageStructure, &[WordBox])` or `&LogicalDocument` — no shared
//! mutable visitor state, since `PageStructure`'s paragraph list is already
//! flat (unlike the teacher's recursive `Block` tree, which is why this
//! module skips the teacher's `Render`/`Renderer` trait split; see DESIGN.md).

pub mod docx;
pub mod html;
pub mod selection;
pub mod text;

pub use docx::to_docx;
pub use html::to_html;
pub use selection::to_selection_text;
pub use text::{paragraph_bodies, to_plain_text};
