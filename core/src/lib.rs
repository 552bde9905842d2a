//! Doc Compare: aligning two revisions of a contract and reporting where they
//! disagree.
//!
//! This crate provides functionality for:
//! - Extracting plain text from `.docx` packages
//! - Regrouping rendered page lines into document paragraphs
//! - Aligning two texts into matching chapters ("unify")
//! - Building a disagreement protocol and rendering it as `.docx`
//!
//! # Quick Start
//!
//! ```ignore
//! use doc_compare::{unify_texts, save_disagreement, ReportOptions, UnifyConfig};
//!
//! let pair = unify_texts(&source, &edited, &UnifyConfig::default())?;
//! let docx = save_disagreement(&pair.left, &pair.right, &ReportOptions::default())?;
//! std::fs::write("data.docx", docx)?;
//! ```

mod acceptable;
mod chapter;
mod config;
mod container;
mod docx_reader;
mod docx_writer;
pub mod error_codes;
mod format;
mod paragraph;
mod reflow;
mod report;
mod similarity;
mod unify;

pub use acceptable::{is_acceptable_replacement, is_acceptable_skip};
pub use chapter::{BorderMatch, BorderStrategy, ChapterRange, MatchedChapter};
pub use config::{
    default_passes, ConfigError, Pass, PassKind, ReportLabels, ReportOptions, UnifyConfig,
    UnifyConfigBuilder,
};
pub use container::{ContainerError, OpcPackage, PackageLimits};
pub use docx_reader::{
    clean_special_chars, clean_text, docx_lines, docx_text, parse_document_paragraphs, DocxError,
};
pub use docx_writer::{document_xml, write_report, xml_safe};
pub use format::DocumentFormat;
pub use paragraph::{Paragraph, ParagraphSide, Token};
pub use reflow::{format_paragraphs, paragraph_starts};
pub use report::{
    build_report, clause_body, clause_number, compare_row, save_disagreement, DisagreementReport,
    ReportError, ReportRow, Span,
};
pub use similarity::{
    extract_best, full_process, fuzz_ratio, MatchingBlock, OpTag, Opcode, ScoredChoice,
    SequenceMatcher,
};
pub use unify::{
    split_lines, unify_lines, unify_texts, unify_with_threshold, UnifiedPair, UnifyError,
};
