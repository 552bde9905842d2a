//! Disagreement protocol between two aligned texts.
//!
//! Texts are compared block by block (blocks are separated by blank lines).
//! Each row carries the clause number of the source block and both versions
//! split into spans, with changed spans marked for highlighting.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acceptable::{is_acceptable_replacement, is_acceptable_skip};
use crate::config::{ReportLabels, ReportOptions};
use crate::error_codes;
use crate::similarity::{OpTag, SequenceMatcher};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report XML: {0}")]
    Xml(String),
    #[error("failed to package report: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::Xml(_) => error_codes::REPORT_XML,
            ReportError::Zip(_) => error_codes::REPORT_ZIP,
            ReportError::Io(_) => error_codes::REPORT_IO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub number: String,
    pub source: Vec<Span>,
    pub edited: Vec<Span>,
}

impl ReportRow {
    fn plain(number: String, source: &str, edited: &str) -> Self {
        let span = |text: &str| {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Span {
                    text: text.to_string(),
                    highlighted: false,
                }]
            }
        };
        Self {
            number,
            source: span(source),
            edited: span(edited),
        }
    }

    pub fn highlighted_counts(&self) -> (usize, usize) {
        let count = |spans: &[Span]| {
            spans
                .iter()
                .filter(|span| span.highlighted)
                .map(|span| span.text.chars().count())
                .sum()
        };
        (count(&self.source), count(&self.edited))
    }

    pub fn source_text(&self) -> String {
        self.source.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn edited_text(&self) -> String {
        self.edited.iter().map(|span| span.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisagreementReport {
    pub labels: ReportLabels,
    pub source_name: String,
    pub edited_name: String,
    pub rows: Vec<ReportRow>,
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\.?,?\d{0,2}){0,4} ?").expect("number pattern is valid"))
}

fn strip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^(\.?,?\d{0,2}){0,4} ?|\.?,?\n?\z)").expect("strip pattern is valid")
    })
}

/// Splits a text into blank-line separated blocks without the marker glyphs
/// that scanned sources leave behind.
pub fn blocks(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|block| block.replace(['®', '\u{f0b7}'], ""))
        .collect()
}

/// Leading clause number, or an empty string when the block has none.
pub fn clause_number(block: &str) -> &str {
    number_regex()
        .find(block)
        .map(|m| m.as_str())
        .filter(|n| !n.chars().all(char::is_whitespace))
        .unwrap_or("")
}

/// Block body without its clause number and trailing `.`/`,`.
pub fn clause_body(block: &str) -> String {
    strip_regex().replace_all(block, "").trim().to_string()
}

/// Compares two texts char by char, ignoring case, and marks the changed
/// spans.
pub fn compare_row(number: String, source: &str, edited: &str) -> ReportRow {
    let source_chars: Vec<char> = source.chars().collect();
    let edited_chars: Vec<char> = edited.chars().collect();
    let lower = |chars: &[char]| -> Vec<char> {
        chars
            .iter()
            .map(|&c| c.to_lowercase().next().unwrap_or(c))
            .collect()
    };
    let (source_lower, edited_lower) = (lower(&source_chars), lower(&edited_chars));
    let matcher = SequenceMatcher::new(&source_lower, &edited_lower, false);

    let mut row = ReportRow {
        number,
        source: Vec::new(),
        edited: Vec::new(),
    };
    for op in matcher.opcodes() {
        let old: String = source_chars[op.a.clone()].iter().collect();
        let new: String = edited_chars[op.b.clone()].iter().collect();
        let (mark_old, mark_new) = match op.tag {
            OpTag::Equal => (false, false),
            OpTag::Delete | OpTag::Insert => (!is_acceptable_skip(&old), !is_acceptable_skip(&new)),
            OpTag::Replace => {
                let changed = !is_acceptable_replacement(&old, &new);
                (changed, changed)
            }
        };
        push_span(&mut row.source, old, mark_old);
        push_span(&mut row.edited, new, mark_new);
    }
    row
}

fn push_span(spans: &mut Vec<Span>, text: String, highlighted: bool) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.highlighted == highlighted => last.text.push_str(&text),
        _ => spans.push(Span { text, highlighted }),
    }
}

struct Block {
    current_number: String,
    number: String,
    source: String,
    edited: String,
    is_different: bool,
}

fn paired_blocks(source: &str, edited: &str) -> Vec<Block> {
    let mut last_known = String::new();
    blocks(source)
        .into_iter()
        .zip(blocks(edited))
        .map(|(source_block, edited_block)| {
            let is_different = source_block != edited_block;
            let current_number = clause_number(&source_block).to_string();
            if !current_number.is_empty() {
                last_known = current_number.clone();
            }
            let number = if !current_number.is_empty() {
                current_number.clone()
            } else if !last_known.is_empty() {
                format!("{last_known} ✓ ")
            } else {
                String::new()
            };
            Block {
                current_number,
                number,
                source: clause_body(&source_block),
                edited: clause_body(&edited_block),
                is_different,
            }
        })
        .collect()
}

/// Blocks collected under one clause number.
#[derive(Default)]
struct Group {
    number: String,
    source: Vec<String>,
    edited: Vec<String>,
    any_different: bool,
}

impl Group {
    fn push(&mut self, block: &Block) {
        self.number = block.number.trim_matches([' ', '✓']).to_string();
        self.source.push(block.source.clone());
        self.edited.push(block.edited.clone());
        self.any_different |= block.is_different;
    }

    fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    fn into_row(self, count_error: usize) -> Option<ReportRow> {
        let source = self.source.join("\n");
        let edited = self.edited.join("\n");
        if count_error == 0 {
            return Some(if self.any_different {
                compare_row(self.number, &source, &edited)
            } else {
                ReportRow::plain(self.number, &source, &edited)
            });
        }
        filtered(compare_row(self.number, &source, &edited), count_error)
    }
}

fn filtered(row: ReportRow, count_error: usize) -> Option<ReportRow> {
    let (left, right) = row.highlighted_counts();
    if count_error > 0 && left <= count_error && right <= count_error {
        None
    } else {
        Some(row)
    }
}

pub fn build_report(source: &str, edited: &str, options: &ReportOptions) -> DisagreementReport {
    let blocks = paired_blocks(source, edited);
    tracing::info!(
        blocks = blocks.len(),
        count_error = options.count_error,
        group = options.group_paragraph,
        "building disagreement report"
    );

    let mut rows = Vec::new();
    if options.group_paragraph {
        let mut group = Group::default();
        for block in &blocks {
            if !block.current_number.is_empty() && !group.is_empty() {
                let finished = std::mem::take(&mut group);
                rows.extend(finished.into_row(options.count_error));
            }
            group.push(block);
        }
        if !group.is_empty() {
            rows.extend(group.into_row(options.count_error));
        }
    } else {
        for block in blocks {
            if options.count_error == 0 {
                rows.push(if block.is_different {
                    compare_row(block.number, &block.source, &block.edited)
                } else {
                    ReportRow::plain(block.number, &block.source, &block.edited)
                });
            } else {
                rows.extend(filtered(
                    compare_row(block.number, &block.source, &block.edited),
                    options.count_error,
                ));
            }
        }
    }

    DisagreementReport {
        labels: options.labels.clone(),
        source_name: options.source_name.clone(),
        edited_name: options.edited_name.clone(),
        rows,
    }
}

/// Builds the report and renders it as a DOCX document.
pub fn save_disagreement(
    source: &str,
    edited: &str,
    options: &ReportOptions,
) -> Result<Vec<u8>, ReportError> {
    let report = build_report(source, edited, options);
    crate::docx_writer::write_report(&report)
}
