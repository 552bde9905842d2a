//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTRACT: [&str; 4] = [
    "1. Subject of the agreement covers delivery of steel pipes to the buyer",
    "2. The supplier delivers goods within thirty calendar days after payment",
    "3. Payment is made by bank transfer on the basis of an invoice",
    "4. Disputes are settled in the arbitration court of the city of Moscow",
];

pub fn contract_text() -> String {
    CONTRACT.join("\n")
}

/// Only the non-whitespace chars, in order.
pub fn letters(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn document_xml(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!(r#"<w:p><w:r><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

pub fn make_minimal_docx(document_xml: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)
        .expect("start [Content_Types].xml");
    zip.write_all(b"<Types/>")
        .expect("write [Content_Types].xml");

    zip.start_file("word/document.xml", options)
        .expect("start word/document.xml");
    zip.write_all(document_xml.as_bytes())
        .expect("write word/document.xml");

    zip.finish().expect("finish zip").into_inner()
}
