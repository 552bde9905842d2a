//! Renders a [`DisagreementReport`] as a WordprocessingML package.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::report::{DisagreementReport, ReportError, Span};

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Column widths in twentieths of a point: 0.6", 3" and 3".
const COLUMN_WIDTHS: [u32; 3] = [864, 4320, 4320];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults>
<w:rPrDefault>
<w:rPr>
<w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/>
<w:sz w:val="22"/>
<w:lang w:val="ru-RU"/>
</w:rPr>
</w:rPrDefault>
</w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal">
<w:name w:val="Normal"/>
<w:pPr>
<w:spacing w:after="0"/>
</w:pPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Heading1">
<w:name w:val="heading 1"/>
<w:basedOn w:val="Normal"/>
<w:next w:val="Normal"/>
<w:pPr>
<w:keepNext/>
<w:spacing w:before="480" w:after="240"/>
<w:outlineLvl w:val="0"/>
</w:pPr>
<w:rPr>
<w:b/>
<w:color w:val="365F91"/>
<w:sz w:val="28"/>
</w:rPr>
</w:style>
<w:style w:type="table" w:default="1" w:styleId="TableNormal">
<w:name w:val="Normal Table"/>
<w:tblPr>
<w:tblCellMar>
<w:left w:w="108" w:type="dxa"/>
<w:right w:w="108" w:type="dxa"/>
</w:tblCellMar>
</w:tblPr>
</w:style>
<w:style w:type="table" w:styleId="TableGrid">
<w:name w:val="Table Grid"/>
<w:basedOn w:val="TableNormal"/>
<w:tblPr>
<w:tblBorders>
<w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/>
</w:tblBorders>
</w:tblPr>
</w:style>
</w:styles>"#;

/// Drops chars that cannot appear in XML 1.0 text.
pub fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || (c >= '\u{20}' && c != '\u{fffe}' && c != '\u{ffff}')
        })
        .collect()
}

type XmlWriter = Writer<Vec<u8>>;

fn xml_err(err: impl std::fmt::Display) -> ReportError {
    ReportError::Xml(err.to_string())
}

fn start(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), ReportError> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    w.write_event(Event::Start(el)).map_err(xml_err)
}

fn empty(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), ReportError> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    w.write_event(Event::Empty(el)).map_err(xml_err)
}

fn end(w: &mut XmlWriter, name: &str) -> Result<(), ReportError> {
    w.write_event(Event::End(BytesEnd::new(name))).map_err(xml_err)
}

/// One `w:r`; newlines become breaks and tabs become tab stops.
fn write_run(w: &mut XmlWriter, text: &str, highlighted: bool) -> Result<(), ReportError> {
    let text = xml_safe(text);
    if text.is_empty() {
        return Ok(());
    }
    start(w, "w:r", &[])?;
    if highlighted {
        start(w, "w:rPr", &[])?;
        empty(w, "w:highlight", &[("w:val", "yellow")])?;
        end(w, "w:rPr")?;
    }
    let mut piece = String::new();
    for c in text.chars() {
        match c {
            '\n' | '\t' => {
                write_text(w, &piece)?;
                piece.clear();
                empty(w, if c == '\n' { "w:br" } else { "w:tab" }, &[])?;
            }
            _ => piece.push(c),
        }
    }
    write_text(w, &piece)?;
    end(w, "w:r")
}

fn write_text(w: &mut XmlWriter, text: &str) -> Result<(), ReportError> {
    if text.is_empty() {
        return Ok(());
    }
    start(w, "w:t", &[("xml:space", "preserve")])?;
    w.write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    end(w, "w:t")
}

fn write_cell(w: &mut XmlWriter, width: u32, spans: &[Span]) -> Result<(), ReportError> {
    let width = width.to_string();
    start(w, "w:tc", &[])?;
    start(w, "w:tcPr", &[])?;
    empty(w, "w:tcW", &[("w:w", width.as_str()), ("w:type", "dxa")])?;
    end(w, "w:tcPr")?;
    start(w, "w:p", &[])?;
    for span in spans {
        write_run(w, &span.text, span.highlighted)?;
    }
    end(w, "w:p")?;
    end(w, "w:tc")
}

fn write_row(w: &mut XmlWriter, cells: [&[Span]; 3]) -> Result<(), ReportError> {
    start(w, "w:tr", &[])?;
    for (width, spans) in COLUMN_WIDTHS.into_iter().zip(cells) {
        write_cell(w, width, spans)?;
    }
    end(w, "w:tr")
}

fn plain(text: String) -> Vec<Span> {
    vec![Span {
        text,
        highlighted: false,
    }]
}

pub fn document_xml(report: &DisagreementReport) -> Result<Vec<u8>, ReportError> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_err)?;
    start(&mut w, "w:document", &[("xmlns:w", WORD_NS)])?;
    start(&mut w, "w:body", &[])?;

    start(&mut w, "w:p", &[])?;
    start(&mut w, "w:pPr", &[])?;
    empty(&mut w, "w:pStyle", &[("w:val", "Heading1")])?;
    end(&mut w, "w:pPr")?;
    write_run(&mut w, &report.labels.heading, false)?;
    end(&mut w, "w:p")?;

    start(&mut w, "w:tbl", &[])?;
    start(&mut w, "w:tblPr", &[])?;
    empty(&mut w, "w:tblStyle", &[("w:val", "TableGrid")])?;
    empty(&mut w, "w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
    empty(&mut w, "w:tblLayout", &[("w:type", "fixed")])?;
    end(&mut w, "w:tblPr")?;
    start(&mut w, "w:tblGrid", &[])?;
    for width in COLUMN_WIDTHS {
        let width = width.to_string();
        empty(&mut w, "w:gridCol", &[("w:w", width.as_str())])?;
    }
    end(&mut w, "w:tblGrid")?;

    let number_header = plain(report.labels.number_column.clone());
    let source_header = plain(format!("{}\n{}", report.labels.source_column, report.source_name));
    let edited_header = plain(format!("{}\n{}", report.labels.edited_column, report.edited_name));
    write_row(&mut w, [&number_header, &source_header, &edited_header])?;

    for row in &report.rows {
        let number = plain(row.number.clone());
        write_row(&mut w, [&number, &row.source, &row.edited])?;
    }
    end(&mut w, "w:tbl")?;

    empty(&mut w, "w:p", &[])?;
    start(&mut w, "w:sectPr", &[])?;
    empty(&mut w, "w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
    empty(
        &mut w,
        "w:pgMar",
        &[
            ("w:top", "1134"),
            ("w:right", "850"),
            ("w:bottom", "1134"),
            ("w:left", "1701"),
            ("w:header", "708"),
            ("w:footer", "708"),
            ("w:gutter", "0"),
        ],
    )?;
    end(&mut w, "w:sectPr")?;
    end(&mut w, "w:body")?;
    end(&mut w, "w:document")?;
    Ok(w.into_inner())
}

/// Packages the report into `.docx` bytes.
pub fn write_report(report: &DisagreementReport) -> Result<Vec<u8>, ReportError> {
    let document = document_xml(report)?;
    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/document.xml", &document),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }
    let cursor = zip.finish()?;
    tracing::debug!(rows = report.rows.len(), bytes = cursor.get_ref().len(), "report packaged");
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportLabels;
    use crate::report::ReportRow;

    fn sample() -> DisagreementReport {
        DisagreementReport {
            labels: ReportLabels::default(),
            source_name: "a.docx".into(),
            edited_name: "b.pdf".into(),
            rows: vec![ReportRow {
                number: "1".into(),
                source: vec![
                    Span { text: "Line\tone\n".into(), highlighted: false },
                    Span { text: "x<y".into(), highlighted: true },
                ],
                edited: vec![Span { text: "bad\u{1}char".into(), highlighted: false }],
            }],
        }
    }

    #[test]
    fn xml_safe_strips_control_chars() {
        assert_eq!(xml_safe("a\u{0}b\u{b}c\td"), "abc\td");
    }

    #[test]
    fn document_marks_highlights_breaks_and_tabs() {
        let xml = String::from_utf8(document_xml(&sample()).unwrap()).unwrap();
        assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(xml.contains("Протокол разногласий"));
        assert!(xml.contains(r#"<w:gridCol w:w="864"/>"#));
        assert!(xml.contains(r#"<w:highlight w:val="yellow"/>"#));
        assert!(xml.contains("<w:tab/>"));
        assert!(xml.contains("<w:br/>"));
        assert!(xml.contains("x&lt;y"));
        assert!(xml.contains("badchar"));
        assert!(xml.contains("Редакция заказчика"));
    }

    #[test]
    fn package_contains_expected_parts() {
        let bytes = write_report(&sample()).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in ["[Content_Types].xml", "_rels/.rels", "word/document.xml", "word/styles.xml"] {
            assert!(names.contains(&part), "missing {part}");
        }
    }
}
