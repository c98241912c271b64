//! C9 — HTML rendering, in the teacher's `Render`/`Renderer` idiom (see
//! `ferrules-core::render::html`): a small visitor building a `build_html`
//! tree, one paragraph at a time.

use std::collections::HashMap;

use build_html::{Html, HtmlContainer, HtmlElement, HtmlPage, HtmlTag};

use crate::entities::{LineId, ParagraphRole, PageStructure, WordBox};

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

fn paragraph_text(paragraph: &crate::entities::DetectedParagraph, by_line: &HashMap<LineId, Vec<&WordBox>>) -> String {
    paragraph
        .line_ids
        .iter()
        .filter_map(|lid| by_line.get(lid))
        .flat_map(|words| words.iter().map(|w| w.text.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders a page's [`PageStructure`] as a standalone right-to-left HTML
/// document: one `<header>`/`<footer>`/`<h2>`/`<p>` per paragraph depending on
/// role, each tagged `dir="rtl"`.
pub fn to_html(structure: &PageStructure, boxes: &[WordBox]) -> String {
    let by_line = words_by_line(boxes);
    let mut root = HtmlElement::new(HtmlTag::Div).with_attribute("dir", "rtl");

    for paragraph in &structure.paragraphs {
        let text = paragraph_text(paragraph, &by_line);
        let el = match paragraph.role {
            ParagraphRole::Header => HtmlElement::new(HtmlTag::Header)
                .with_attribute("dir", "rtl")
                .with_child(text.as_str().into()),
            ParagraphRole::Footer => HtmlElement::new(HtmlTag::Footer)
                .with_attribute("dir", "rtl")
                .with_child(text.as_str().into()),
            ParagraphRole::SectionHeading => HtmlElement::new(HtmlTag::Heading2)
                .with_attribute("dir", "rtl")
                .with_child(text.as_str().into()),
            ParagraphRole::Body => HtmlElement::new(HtmlTag::ParagraphText)
                .with_attribute("dir", "rtl")
                .with_child(text.as_str().into()),
        };
        root.add_child(el.into());
    }

    HtmlPage::new()
        .with_title("")
        .with_html(root)
        .to_html_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{make_line_id, BBox, DetectedParagraph, WordBox};

    #[test]
    fn renders_body_paragraph_as_p() {
        let boxes = vec![WordBox {
            id: 1,
            text: "שלום".into(),
            frame: BBox::new(0.0, 0.0, 10.0, 10.0),
            line_id: make_line_id(1, 1, 1),
            word_num: 0,
            is_margin: false,
            is_placeholder: false,
        }];
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
        let html = to_html(&structure, &boxes);
        assert!(html.contains("שלום"));
        assert!(html.contains("dir=\"rtl\""));
    }
}
