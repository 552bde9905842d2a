//! Regrouping of rendered page lines into document paragraphs.
//!
//! A rendered page breaks paragraphs into visual lines. Each document line is
//! located among the rendered lines by fuzzy prefix matching; the located lines
//! open paragraphs and everything in between is folded into the paragraph
//! above.

use std::collections::{BTreeSet, VecDeque};

use crate::docx_reader::clean_special_chars;
use crate::similarity::extract_best;

const PREFIX_CHARS: usize = 70;
const MIN_LINE_CHARS: usize = 3;
const CANDIDATES: usize = 3;
/// Recent starts considered when choosing where the search window begins.
const WINDOW_STARTS: usize = 3;

/// Indices of `rendered` lines that open a paragraph, ascending and unique.
///
/// The search for each document line starts at the smallest of the last few
/// starts found, so a single bad match cannot push the window past the lines
/// that follow it.
pub fn paragraph_starts<S: AsRef<str>>(document: &[S], rendered: &[S]) -> Vec<usize> {
    let mut starts: VecDeque<usize> = VecDeque::from(vec![0; WINDOW_STARTS]);
    let mut found = BTreeSet::from([0]);
    for line in document.iter().map(AsRef::as_ref) {
        if line.chars().count() < MIN_LINE_CHARS {
            continue;
        }
        let prefix: String = line.chars().take(PREFIX_CHARS).collect();
        let from = starts.iter().copied().min().unwrap_or(0);
        let window = rendered
            .iter()
            .enumerate()
            .skip(from)
            .map(|(index, text)| (index, text.as_ref()));
        let Some(best) = extract_best(&prefix, window, CANDIDATES).into_iter().next() else {
            continue;
        };
        let index = rendered
            .iter()
            .position(|text| text.as_ref() == best.text)
            .unwrap_or(best.key);
        starts.push_back(index);
        if starts.len() > WINDOW_STARTS {
            starts.pop_front();
        }
        found.insert(index);
    }
    found.into_iter().collect()
}

/// Cleans both line lists and joins the rendered lines into paragraphs, one
/// `\n`-terminated paragraph per start.
pub fn format_paragraphs<S: AsRef<str>>(document: &[S], rendered: &[S]) -> String {
    let document = clean_special_chars(document);
    let rendered = clean_special_chars(rendered);
    let starts = paragraph_starts(&document, &rendered);
    tracing::debug!(
        lines = rendered.len(),
        paragraphs = starts.len(),
        "regrouped rendered lines"
    );

    let mut paragraphs = Vec::with_capacity(starts.len());
    let mut current = String::new();
    for (index, line) in rendered.iter().enumerate() {
        if starts.binary_search(&index).is_ok() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            current.push_str(line);
        } else {
            current = current.replace('\n', " ");
            current.push_str(line);
        }
    }
    paragraphs.push(current);
    paragraphs.concat()
}
