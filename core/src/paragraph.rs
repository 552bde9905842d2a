//! Paragraphs and the ordered paragraph map of one document side.
//!
//! A side is keyed by each paragraph's start position (cumulative char length
//! of the source lines). Splitting a paragraph inserts a new key inside the
//! old one, so chapter ranges expressed as `start..=end` positions stay valid.

use std::collections::BTreeMap;
use std::ops::Bound;

/// Sliding window of two words inside a paragraph, `start..end` in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    pub position: usize,
    symbols: String,
    symbols_count: usize,
    token_borders: Vec<usize>,
    tokens: Vec<Token>,
}

impl Paragraph {
    pub fn new(raw: &str, position: usize) -> Self {
        let symbols = clean_symbols(raw);
        let chars: Vec<char> = symbols.chars().collect();
        let token_borders = token_borders(&chars);
        let tokens = tokens(&chars, &token_borders, 2);
        Self {
            position,
            symbols_count: chars.len(),
            symbols,
            token_borders,
            tokens,
        }
    }

    /// Cleaned text; always ends with a single `\n`.
    pub fn symbols(&self) -> &str {
        &self.symbols
    }

    pub fn symbols_count(&self) -> usize {
        self.symbols_count
    }

    pub fn token_borders(&self) -> &[usize] {
        &self.token_borders
    }

    /// Never empty: a paragraph too short for a window is its own token.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn first_token(&self) -> &Token {
        &self.tokens[0]
    }

    pub fn last_token(&self) -> &Token {
        &self.tokens[self.tokens.len() - 1]
    }
}

impl std::fmt::Display for Paragraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let head: String = self.symbols.chars().take(15).collect();
        write!(
            f,
            "Paragraph(position={}, symbols={:?}...)",
            self.position, head
        )
    }
}

/// Collapses whitespace runs of two or more into one space and replaces the
/// trailing whitespace with a single newline.
fn clean_symbols(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    let mut run: Vec<char> = Vec::new();
    for c in raw.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_whitespace(&mut out, &mut run);
        out.push(c);
    }
    flush_whitespace(&mut out, &mut run);
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');
    out
}

fn flush_whitespace(out: &mut String, run: &mut Vec<char>) {
    match run.len() {
        0 => {}
        1 => out.push(run[0]),
        _ => out.push(' '),
    }
    run.clear();
}

/// `0`, then each space found at least four chars after the previous
/// border, then the paragraph length.
fn token_borders(chars: &[char]) -> Vec<usize> {
    let mut borders = vec![0];
    let mut j = 0;
    loop {
        let from = j + 4;
        let found = chars
            .get(from..)
            .and_then(|rest| rest.iter().position(|&c| c == ' '))
            .map(|offset| from + offset);
        match found {
            Some(pos) => {
                borders.push(pos);
                j = pos;
            }
            None => {
                borders.push(chars.len());
                break;
            }
        }
    }
    borders
}

fn tokens(chars: &[char], borders: &[usize], words_count: usize) -> Vec<Token> {
    let mut tokens: Vec<Token> = borders
        .windows(words_count + 1)
        .map(|window| {
            let (start, end) = (window[0], window[words_count]);
            Token {
                start,
                end,
                text: chars[start..end].iter().collect(),
            }
        })
        .collect();
    if tokens.is_empty() {
        tokens.push(Token {
            start: borders[0],
            end: borders[borders.len() - 1],
            text: chars.iter().collect(),
        });
    }
    tokens
}

/// All paragraphs of one document side, ordered by position.
#[derive(Debug, Clone, Default)]
pub struct ParagraphSide {
    paragraphs: BTreeMap<usize, Paragraph>,
}

impl ParagraphSide {
    /// Builds a side from source lines plus a trailing empty paragraph, so
    /// the last real paragraph also has a successor to border against.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut paragraphs = BTreeMap::new();
        let mut position = 0;
        for line in lines.iter().map(AsRef::as_ref).chain(std::iter::once("\n")) {
            paragraphs.insert(position, Paragraph::new(line, position));
            position += line.chars().count();
        }
        Self { paragraphs }
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Paragraph> {
        self.paragraphs.get(&position)
    }

    pub fn contains(&self, position: usize) -> bool {
        self.paragraphs.contains_key(&position)
    }

    pub fn first_position(&self) -> usize {
        self.paragraphs.keys().next().copied().unwrap_or(0)
    }

    pub fn last_position(&self) -> usize {
        self.paragraphs.keys().next_back().copied().unwrap_or(0)
    }

    pub fn position_before(&self, position: usize) -> Option<usize> {
        self.paragraphs
            .range(..position)
            .next_back()
            .map(|(&key, _)| key)
    }

    pub fn next_after(&self, position: usize) -> Option<&Paragraph> {
        self.paragraphs
            .range((Bound::Excluded(position), Bound::Unbounded))
            .next()
            .map(|(_, paragraph)| paragraph)
    }

    /// Paragraphs whose position lies in `start..=end`.
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = &Paragraph> {
        let upper = if start <= end { end } else { start };
        self.paragraphs
            .range(start..=upper)
            .filter(move |(&key, _)| key <= end)
            .map(|(_, paragraph)| paragraph)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs.values()
    }

    /// Splits the paragraph containing `position` so that a new paragraph
    /// starts there. The parent keeps the text up to and including the char
    /// at the border, the child gets the rest. Returns `false` when
    /// `position` already starts a paragraph or precedes every paragraph.
    pub fn split_at(&mut self, position: usize) -> bool {
        if self.contains(position) {
            return false;
        }
        let Some(before) = self.position_before(position) else {
            return false;
        };
        let Some(current) = self.paragraphs.remove(&before) else {
            return false;
        };

        let chars: Vec<char> = current.symbols.chars().collect();
        let slice = (position - before + 1).min(chars.len());
        let mut parent_symbols: String = chars[..slice].iter().collect();
        parent_symbols.push('\n');
        let child_symbols: String = chars[slice..].iter().collect();

        let parent = Paragraph::new(&parent_symbols, before);
        let child = Paragraph::new(&child_symbols, position);
        tracing::trace!(%parent, %child, "split paragraph");
        self.paragraphs.insert(before, parent);
        self.paragraphs.insert(position, child);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_symbols_collapses_runs_and_terminates_with_newline() {
        assert_eq!(clean_symbols("a  b\t\tc   "), "a b c\n");
        assert_eq!(clean_symbols("a\tb"), "a\tb\n");
        assert_eq!(clean_symbols("\n"), "\n");
        assert_eq!(clean_symbols(""), "\n");
    }

    #[test]
    fn borders_skip_spaces_closer_than_four_chars() {
        let chars: Vec<char> = "ab cd efgh ij\n".chars().collect();
        assert_eq!(token_borders(&chars), vec![0, 5, 10, 14]);
    }

    #[test]
    fn tokens_span_two_borders() {
        let p = Paragraph::new("alpha beta gamma delta", 0);
        let texts: Vec<&str> = p.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", " beta gamma", " gamma delta\n"]);
        assert_eq!(p.first_token().start, 0);
        assert_eq!(p.last_token().end, p.symbols_count());
    }

    #[test]
    fn short_paragraph_is_a_single_token() {
        let p = Paragraph::new("word", 7);
        assert_eq!(p.tokens().len(), 1);
        assert_eq!(p.first_token().text, "word\n");
        assert_eq!(p.position, 7);
    }

    #[test]
    fn side_positions_accumulate_raw_lengths() {
        let side = ParagraphSide::from_lines(&["first line", "second"]);
        let positions: Vec<usize> = side.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 10, 16]);
        assert_eq!(side.last_position(), 16);
        assert_eq!(side.get(16).map(Paragraph::symbols), Some("\n"));
        assert_eq!(side.position_before(10), Some(0));
        assert_eq!(side.next_after(0).map(|p| p.position), Some(10));
    }

    #[test]
    fn split_at_divides_the_containing_paragraph() {
        let mut side = ParagraphSide::from_lines(&["alpha beta gamma"]);
        assert!(side.split_at(5));
        assert_eq!(side.get(0).map(Paragraph::symbols), Some("alpha\n"));
        assert_eq!(side.get(5).map(Paragraph::symbols), Some("beta gamma\n"));
        assert!(!side.split_at(5));
    }

    #[test]
    fn range_is_inclusive() {
        let side = ParagraphSide::from_lines(&["aaaa", "bbbb", "cccc"]);
        let positions: Vec<usize> = side.range(4, 8).map(|p| p.position).collect();
        assert_eq!(positions, vec![4, 8]);
        assert_eq!(side.range(8, 4).count(), 0);
    }
}
