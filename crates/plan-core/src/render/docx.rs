//! Minimal WordprocessingML package: one right-to-left section holding the
//! title paragraph and the plan table.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{DocumentFormat, DocumentRenderer, PlanDocument};
use crate::error::RenderError;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// A4 text width in twentieths of a point with 1440 twip margins.
const TEXT_WIDTH_TWIPS: usize = 9026;

#[derive(Debug, Clone)]
pub struct DocxRenderer {
    pub font: String,
    /// Half-points, as Word stores run sizes.
    pub font_size: u32,
    pub header_fill: String,
}

impl Default for DocxRenderer {
    fn default() -> Self {
        Self {
            font: "Simplified Arabic".to_string(),
            font_size: 24,
            header_fill: "CCCCCC".to_string(),
        }
    }
}

impl DocumentRenderer for DocxRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn render(&self, document: &PlanDocument) -> Result<Vec<u8>, RenderError> {
        let body = self.document_xml(document)?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(&body)?;
        let cursor = zip.finish()?;

        tracing::debug!(rows = document.body().len(), "rendered docx");
        Ok(cursor.into_inner())
    }
}

impl DocxRenderer {
    /// The `word/document.xml` part.
    pub fn document_xml(&self, document: &PlanDocument) -> Result<Vec<u8>, RenderError> {
        let header = document.header()?;
        let columns = header.len().max(1);

        let mut xml = XmlBuilder::new();
        xml.decl()?;
        xml.open("w:document", &[("xmlns:w", WORD_NS), ("xmlns:r", REL_NS)])?;
        xml.open("w:body", &[])?;

        xml.open("w:p", &[])?;
        xml.open("w:pPr", &[])?;
        xml.empty("w:bidi", &[])?;
        xml.empty("w:spacing", &[("w:after", "200")])?;
        xml.empty("w:jc", &[("w:val", "right")])?;
        xml.close("w:pPr")?;
        self.run(&mut xml, &document.title, true)?;
        xml.close("w:p")?;

        xml.open("w:tbl", &[])?;
        xml.open("w:tblPr", &[])?;
        xml.empty("w:bidiVisual", &[])?;
        xml.empty("w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
        xml.open("w:tblBorders", &[])?;
        for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            xml.empty(
                edge,
                &[
                    ("w:val", "single"),
                    ("w:sz", "4"),
                    ("w:space", "0"),
                    ("w:color", "000000"),
                ],
            )?;
        }
        xml.close("w:tblBorders")?;
        xml.close("w:tblPr")?;

        let column_width = (TEXT_WIDTH_TWIPS / columns).to_string();
        xml.open("w:tblGrid", &[])?;
        for _ in 0..columns {
            xml.empty("w:gridCol", &[("w:w", column_width.as_str())])?;
        }
        xml.close("w:tblGrid")?;

        for (row_idx, row) in document.table.iter().enumerate() {
            let is_header = row_idx == 0;
            xml.open("w:tr", &[])?;
            for cell in row {
                xml.open("w:tc", &[])?;
                if is_header {
                    xml.open("w:tcPr", &[])?;
                    xml.empty(
                        "w:shd",
                        &[
                            ("w:val", "clear"),
                            ("w:color", "auto"),
                            ("w:fill", self.header_fill.as_str()),
                        ],
                    )?;
                    xml.close("w:tcPr")?;
                }
                xml.open("w:p", &[])?;
                xml.open("w:pPr", &[])?;
                xml.empty("w:bidi", &[])?;
                xml.empty("w:jc", &[("w:val", "center")])?;
                xml.close("w:pPr")?;
                self.run(&mut xml, cell, is_header)?;
                xml.close("w:p")?;
                xml.close("w:tc")?;
            }
            xml.close("w:tr")?;
        }
        xml.close("w:tbl")?;

        xml.open("w:sectPr", &[])?;
        xml.empty("w:bidi", &[])?;
        xml.empty("w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
        xml.empty(
            "w:pgMar",
            &[
                ("w:top", "1440"),
                ("w:right", "1440"),
                ("w:bottom", "1440"),
                ("w:left", "1440"),
            ],
        )?;
        xml.close("w:sectPr")?;

        xml.close("w:body")?;
        xml.close("w:document")?;
        Ok(xml.into_inner())
    }

    fn run(&self, xml: &mut XmlBuilder, text: &str, bold: bool) -> Result<(), RenderError> {
        let size = self.font_size.to_string();
        xml.open("w:r", &[])?;
        xml.open("w:rPr", &[])?;
        xml.empty(
            "w:rFonts",
            &[
                ("w:ascii", self.font.as_str()),
                ("w:hAnsi", self.font.as_str()),
                ("w:cs", self.font.as_str()),
            ],
        )?;
        if bold {
            xml.empty("w:b", &[])?;
            xml.empty("w:bCs", &[])?;
        }
        xml.empty("w:sz", &[("w:val", size.as_str())])?;
        xml.empty("w:szCs", &[("w:val", size.as_str())])?;
        xml.empty("w:rtl", &[])?;
        xml.close("w:rPr")?;
        xml.open("w:t", &[("xml:space", "preserve")])?;
        xml.text(text)?;
        xml.close("w:t")?;
        xml.close("w:r")?;
        Ok(())
    }
}

struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn decl(&mut self) -> Result<(), RenderError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(())
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), RenderError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), RenderError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_is_escaped() {
        let document = PlanDocument {
            title: "T".to_string(),
            table: vec![vec!["h".to_string()], vec!["a < b & c".to_string()]],
            watermark: None,
        };
        let xml = DocxRenderer::default().document_xml(&document).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains("a &lt; b &amp; c"));
    }
}
