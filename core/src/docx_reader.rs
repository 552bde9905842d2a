//! Plain text extraction from `.docx` documents.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::container::{ContainerError, OpcPackage};
use crate::error_codes;

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocxError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("package has no {DOCUMENT_PART} part")]
    MissingDocument,
    #[error("XML parse error: {0}")]
    Xml(String),
}

impl DocxError {
    pub fn code(&self) -> &'static str {
        match self {
            DocxError::Container(inner) => inner.code(),
            DocxError::MissingDocument => error_codes::DOCX_MISSING_DOCUMENT,
            DocxError::Xml(_) => error_codes::DOCX_XML,
        }
    }
}

fn to_xml_err(err: impl std::fmt::Display) -> DocxError {
    DocxError::Xml(err.to_string())
}

/// Raw paragraph texts of `word/document.xml`, tabs and breaks included.
pub fn parse_document_paragraphs(xml: &[u8]) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"p" => {
                if depth == 0 {
                    current.clear();
                }
                depth += 1;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    paragraphs.push(std::mem::take(&mut current));
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"p" && depth == 0 => {
                paragraphs.push(String::new());
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"r" => run_depth += 1,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"r" => {
                run_depth = run_depth.saturating_sub(1);
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&t.unescape().map_err(to_xml_err)?);
            }
            // Tab stops in paragraph properties share the `tab` name.
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if run_depth > 0 => {
                match e.local_name().as_ref() {
                    b"tab" => current.push('\t'),
                    b"br" | b"cr" => current.push('\n'),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// Normalises extracted lines, each ending in `\n`: narrow no-break spaces
/// become spaces, runs of spaces collapse, tabs go away and blank lines are
/// dropped. A line ending in the `--` wrap marker loses its newline and joins
/// the next one.
pub fn clean_special_chars<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref().replace('\u{202f}', " ");
            let mut collapsed = String::with_capacity(line.len());
            for c in line.chars() {
                if c == ' ' && collapsed.ends_with(' ') {
                    continue;
                }
                collapsed.push(c);
            }
            collapsed
                .replace("--\n", "")
                .replace("--\t", "")
                .replace('\t', "")
        })
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Cleans `\n`-terminated lines and concatenates them, dropping the final
/// newline.
pub fn clean_text<S: AsRef<str>>(lines: &[S]) -> String {
    let mut text = clean_special_chars(lines).concat();
    let trimmed_len = text.trim_end_matches('\n').len();
    text.truncate(trimmed_len);
    text
}

/// Trimmed paragraph lines of a `.docx`, each terminated by `\n`.
pub fn docx_lines(bytes: Vec<u8>) -> Result<Vec<String>, DocxError> {
    let mut package = OpcPackage::from_bytes(bytes)?;
    let xml = match package.read_part(DOCUMENT_PART) {
        Ok(xml) => xml,
        Err(ContainerError::PartNotFound { .. }) => return Err(DocxError::MissingDocument),
        Err(e) => return Err(e.into()),
    };
    let paragraphs = parse_document_paragraphs(&xml)?;
    let lines: Vec<String> = paragraphs
        .iter()
        .flat_map(|paragraph| paragraph.split('\n'))
        .map(|line| format!("{}\n", line.trim()))
        .collect();
    tracing::debug!(paragraphs = paragraphs.len(), lines = lines.len(), "read docx lines");
    Ok(lines)
}

/// Cleaned document text, one line per paragraph line.
pub fn docx_text(bytes: Vec<u8>) -> Result<String, DocxError> {
    Ok(clean_text(&docx_lines(bytes)?))
}
