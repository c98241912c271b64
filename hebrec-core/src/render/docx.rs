//! C9 — Office Open XML (.docx) serialization. Hand-assembled per spec §6's
//! exact archive-entry and style-id contract; a generic docx builder would
//! fight the fixed shape rather than help with it (see DESIGN.md).

use std::io::Write;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::entities::{DetectedParagraph, LogicalDocument, ParagraphRole, PLACEHOLDER_TEXT};
use crate::error::ExportError;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:styleId="Normal" w:default="1">
<w:name w:val="Normal"/>
<w:pPr><w:bidi/></w:pPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Title">
<w:name w:val="Title"/>
<w:basedOn w:val="Normal"/>
<w:pPr><w:bidi/><w:jc w:val="center"/><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="4" w:color="auto"/></w:pBdr></w:pPr>
<w:rPr><w:b/><w:sz w:val="36"/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Heading1">
<w:name w:val="Heading 1"/>
<w:basedOn w:val="Normal"/>
<w:pPr><w:bidi/></w:pPr>
<w:rPr><w:b/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Header">
<w:name w:val="Header"/>
<w:basedOn w:val="Normal"/>
<w:pPr><w:bidi/><w:pBdr><w:bottom w:val="single" w:sz="4" w:space="4" w:color="auto"/></w:pBdr></w:pPr>
<w:rPr><w:color w:val="777777"/><w:sz w:val="16"/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Footer">
<w:name w:val="Footer"/>
<w:basedOn w:val="Normal"/>
<w:pPr><w:bidi/><w:pBdr><w:top w:val="single" w:sz="4" w:space="4" w:color="auto"/></w:pBdr></w:pPr>
<w:rPr><w:color w:val="777777"/><w:sz w:val="16"/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="MarginText">
<w:name w:val="MarginText"/>
<w:basedOn w:val="Normal"/>
<w:pPr><w:bidi/></w:pPr>
<w:rPr><w:i/><w:sz w:val="18"/></w:rPr>
</w:style>
</w:styles>"#;

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[allow(dead_code)]
fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;").replace('\'', "&apos;")
}

/// A contiguous run of words sharing placeholder-ness, to be emitted as one
/// `<w:r>` (placeholder runs render italic gray per spec §6).
struct Run {
    text: String,
    is_placeholder: bool,
}

fn split_runs(text: &str) -> Vec<Run> {
    let mut runs: Vec<(Vec<&str>, bool)> = Vec::new();
    for word in text.split_whitespace() {
        let is_ph = word == PLACEHOLDER_TEXT;
        match runs.last_mut() {
            Some((words, ph)) if *ph == is_ph => words.push(word),
            _ => runs.push((vec![word], is_ph)),
        }
    }
    runs.into_iter()
        .map(|(words, is_ph)| Run {
            text: words.join(" "),
            is_placeholder: is_ph,
        })
        .collect()
}

fn run_xml(run: &Run) -> String {
    let rpr = if run.is_placeholder {
        r#"<w:rPr><w:i/><w:color w:val="999999"/></w:rPr>"#
    } else {
        ""
    };
    format!(
        r#"<w:r>{rpr}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape_text(&run.text)
    )
}

/// Strips the leading word(s) that produced `paragraph.section_number`
/// (§4.7: either the bare first word, e.g. `"א."`, or the first two words
/// concatenated without a space to repair an OCR split, e.g. `"1"` + `"."`
/// -> `"1."`). `text` is the space-joined paragraph body, so the section
/// number's own tokens may not appear contiguously in it (`"1 . פתיחה"`);
/// matching on the joined string itself would fail for the split case. We
/// instead re-split `text` on whitespace and drop however many of its
/// leading words reconstruct `section_number` once concatenated.
fn strip_section_number_prefix(text: &str, section_number: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.first() == Some(&section_number) {
        return words[1..].join(" ");
    }
    if words.len() >= 2 && format!("{}{}", words[0], words[1]) == section_number {
        return words[2..].join(" ");
    }
    text.to_string()
}

fn paragraph_style_id(role: ParagraphRole) -> &'static str {
    match role {
        ParagraphRole::Header => "Header",
        ParagraphRole::Footer => "Footer",
        ParagraphRole::SectionHeading => "Heading1",
        ParagraphRole::Body => "Normal",
    }
}

fn paragraph_xml(paragraph: &DetectedParagraph, text: &str) -> String {
    let style = paragraph_style_id(paragraph.role);

    if let Some(section_number) = &paragraph.section_number {
        let rest = strip_section_number_prefix(text, section_number);
        let number_run = format!(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{} </w:t></w:r>"#,
            escape_text(section_number)
        );
        let rest_runs: String = split_runs(&rest).iter().map(run_xml).collect();
        let jc = if paragraph.is_centered {
            r#"<w:jc w:val="center"/>"#
        } else {
            ""
        };
        return format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{style}"/><w:bidi/>{jc}</w:pPr><w:r><w:rPr><w:b/></w:rPr></w:r>{number_run}{rest_runs}</w:p>"#
        );
    }

    let jc = if paragraph.is_centered {
        r#"<w:jc w:val="center"/>"#
    } else {
        r#"<w:jc w:val="both"/>"#
    };
    let runs: String = split_runs(text).iter().map(run_xml).collect();
    format!(r#"<w:p><w:pPr><w:pStyle w:val="{style}"/><w:bidi/>{jc}</w:pPr>{runs}</w:p>"#)
}

fn page_xml(page: &crate::entities::LogicalPage) -> String {
    // Paragraph text comes from `paragraph_texts`, not a re-split of
    // `main_text`: `main_text`'s placeholder collapse runs across the whole
    // assembled string and can swallow a `"\n\n"` paragraph boundary that
    // sits between two adjacent `[...]` tokens, which would silently merge
    // paragraphs here.
    let mut out = String::new();
    for (paragraph, text) in page.structure.paragraphs.iter().zip(page.paragraph_texts.iter()) {
        out.push_str(&paragraph_xml(paragraph, text));
    }
    if !page.margin_text.is_empty() {
        for block in page.margin_text.split("\n\n") {
            let runs: String = split_runs(block).iter().map(run_xml).collect();
            out.push_str(&format!(
                r#"<w:p><w:pPr><w:pStyle w:val="MarginText"/><w:bidi/></w:pPr>{runs}</w:p>"#
            ));
        }
    }
    out
}

fn title_xml(title: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:bidi/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_text(title)
    )
}

fn document_xml(doc: &LogicalDocument) -> String {
    let mut body = String::new();
    body.push_str(&title_xml(&doc.title));
    for page in &doc.pages {
        body.push_str(&page_xml(page));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>{body}<w:sectPr><w:bidi/></w:sectPr></w:body>
</w:document>"#
    )
}

/// Serializes a [`LogicalDocument`] into a ZIP-packaged Office Open XML
/// document (a right-to-left Word `.docx`). `doc.pages[i].paragraph_texts`
/// must line up 1:1 with `doc.pages[i].structure.paragraphs` (the same array
/// [`crate::render::text::paragraph_bodies`] produces) — unlike `main_text`,
/// whose placeholder collapse can merge adjacent paragraphs separated only by
/// `[...]` tokens, `paragraph_texts` keeps paragraph boundaries intact.
pub fn to_docx(doc: &LogicalDocument) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS_XML.as_bytes())?;

        zip.start_file("word/_rels/document.xml.rels", options)?;
        zip.write_all(DOCUMENT_RELS_XML.as_bytes())?;

        zip.start_file("word/styles.xml", options)?;
        zip.write_all(STYLES_XML.as_bytes())?;

        zip.start_file("word/document.xml", options)?;
        zip.write_all(document_xml(doc).as_bytes())?;

        zip.finish()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{make_line_id, LogicalPage, PageStructure};

    fn doc() -> LogicalDocument {
        LogicalDocument {
            title: "דו\"ח & בדיקה".to_string(),
            pages: vec![LogicalPage {
                main_text: "כותרת\n\nגוף הטקסט [...] כאן".to_string(),
                margin_text: String::new(),
                paragraph_texts: vec!["כותרת".to_string(), "גוף הטקסט [...] כאן".to_string()],
                structure: PageStructure {
                    paragraphs: vec![
                        DetectedParagraph {
                            line_ids: vec![make_line_id(1, 1, 1)],
                            role: ParagraphRole::Header,
                            section_number: None,
                            is_centered: false,
                        },
                        DetectedParagraph {
                            line_ids: vec![make_line_id(1, 1, 2)],
                            role: ParagraphRole::Body,
                            section_number: None,
                            is_centered: false,
                        },
                    ],
                    header_lines: Default::default(),
                    footer_lines: Default::default(),
                },
            }],
        }
    }

    #[test]
    fn escapes_ampersand_and_angle_brackets() {
        assert_eq!(escape_text("a & b < c > d"), "a &amp; b &lt; c &gt; d");
    }

    #[test]
    fn escapes_quotes_in_attributes() {
        assert_eq!(escape_attr("he said \"hi\""), "he said &quot;hi&quot;");
        assert_eq!(escape_attr("it's here"), "it&apos;s here");
    }

    #[test]
    fn produces_required_archive_entries() {
        let bytes = to_docx(&doc()).expect("docx serialization should succeed");
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        for required in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "word/document.xml",
        ] {
            assert!(names.contains(&required.to_string()), "missing {required}");
        }
    }

    #[test]
    fn placeholder_run_is_split_and_marked_italic() {
        let runs = split_runs("גוף הטקסט [...] כאן");
        assert!(runs.iter().any(|r| r.is_placeholder && r.text == "[...]"));
    }

    #[test]
    fn single_word_section_number_strips_cleanly() {
        assert_eq!(strip_section_number_prefix("א. פתיחה", "א."), "פתיחה");
    }

    #[test]
    fn ocr_split_section_number_does_not_duplicate() {
        // firstWord "1" + secondWord "." combine into section number "1.",
        // but the space-joined body still carries them as separate words.
        assert_eq!(strip_section_number_prefix("1 . פתיחה", "1."), "פתיחה");
    }

    #[test]
    fn paragraph_boundaries_survive_a_placeholder_only_seam() {
        // "א [...]" + "[...] ב" is exactly the shape whose `to_plain_text`
        // collapses the "\n\n" seam between them (ADJACENT_PLACEHOLDERS
        // matches across the blank-line separator), so `main_text` here
        // would re-split into a single block. `paragraph_texts` must still
        // carry both paragraphs separately.
        let d = LogicalDocument {
            title: "כותרת".to_string(),
            pages: vec![LogicalPage {
                main_text: "א [...] ב".to_string(),
                margin_text: String::new(),
                paragraph_texts: vec!["א [...]".to_string(), "[...] ב".to_string()],
                structure: PageStructure {
                    paragraphs: vec![
                        DetectedParagraph {
                            line_ids: vec![make_line_id(1, 1, 1)],
                            role: ParagraphRole::Body,
                            section_number: None,
                            is_centered: false,
                        },
                        DetectedParagraph {
                            line_ids: vec![make_line_id(1, 1, 2)],
                            role: ParagraphRole::Body,
                            section_number: None,
                            is_centered: false,
                        },
                    ],
                    header_lines: Default::default(),
                    footer_lines: Default::default(),
                },
            }],
        };

        let xml = document_xml(&d);
        // Title paragraph + two distinct body paragraphs, not merged into one.
        assert_eq!(xml.matches("<w:p>").count(), 3);
        assert!(xml.contains("א"));
        assert!(xml.contains("ב"));
    }
}
