//! Matched chapters: a range of left paragraphs paired with a range of right
//! paragraphs, plus the best border at which the pair could be split.

use rayon::prelude::*;

use crate::paragraph::ParagraphSide;
use crate::similarity::extract_best;
use std::collections::BTreeMap;

/// Inclusive range of paragraph positions on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    pub start: usize,
    pub end: usize,
}

impl ChapterRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn whole(side: &ParagraphSide) -> Self {
        Self::new(side.first_position(), side.last_position())
    }

    /// Splits the range so that a child starts at `at`, splitting the
    /// underlying paragraph first when `at` falls inside one.
    pub fn split(
        self,
        side: &mut ParagraphSide,
        at: usize,
    ) -> Option<(ChapterRange, ChapterRange)> {
        if at <= self.start {
            return None;
        }
        if !side.contains(at) {
            side.split_at(at);
        }
        let before = side.position_before(at)?;
        Some((
            ChapterRange::new(self.start, before),
            ChapterRange::new(at, at.max(self.end)),
        ))
    }
}

/// How border candidates are collected on the right side and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStrategy {
    /// Borders between right paragraphs, keyed by global position.
    Paragraph,
    /// Token windows inside the first right paragraph, keyed by local offset.
    Token,
    /// Token windows, judged by the border-end similarity alone.
    BestBorderEnd,
    /// Token windows, judged by the border-start similarity alone; the end is
    /// the token right after the best start.
    BestBorderStart,
}

impl BorderStrategy {
    fn is_token_level(self) -> bool {
        !matches!(self, BorderStrategy::Paragraph)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoundToken {
    pub key: usize,
    pub text: String,
    pub rate: u8,
}

/// Right-side tokens that may end a paragraph (`starts`) and tokens that may
/// open the next one (`ends`).
#[derive(Debug, Clone, Default)]
pub struct RightCandidates {
    pub starts: BTreeMap<usize, String>,
    pub ends: BTreeMap<usize, String>,
}

impl RightCandidates {
    pub fn collect(strategy: BorderStrategy, range: ChapterRange, side: &ParagraphSide) -> Self {
        let mut candidates = RightCandidates::default();
        if strategy.is_token_level() {
            let Some(paragraph) = side.get(range.start) else {
                return candidates;
            };
            let borders = paragraph.token_borders();
            let first = borders[0];
            let last = borders[borders.len() - 1];
            for token in paragraph.tokens() {
                if token.end != last {
                    candidates.starts.insert(token.start, token.text.clone());
                }
                if token.start != first {
                    candidates.ends.insert(token.start, token.text.clone());
                }
            }
        } else {
            for paragraph in side.range(range.start, range.end) {
                if paragraph.position != range.end {
                    candidates
                        .starts
                        .insert(paragraph.position, paragraph.last_token().text.clone());
                }
                if paragraph.position != range.start {
                    candidates
                        .ends
                        .insert(paragraph.position, paragraph.first_token().text.clone());
                }
            }
        }
        candidates
    }

    fn best_matches(map: &BTreeMap<usize, String>, query: &str, limit: usize) -> Vec<FoundToken> {
        let choices = map.iter().map(|(&key, text)| (key, text.as_str()));
        extract_best(query, choices, limit)
            .into_iter()
            .map(|scored| FoundToken {
                key: scored.key,
                text: scored.text.to_string(),
                rate: scored.score,
            })
            .collect()
    }
}

/// The left border between a paragraph and its successor, located on the
/// right side.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderMatch {
    /// Position of the left paragraph that opens after the border.
    pub left_border: usize,
    pub border_start: FoundToken,
    pub border_end: FoundToken,
    pub tokens_rate: f64,
    pub char_distance: i64,
    pub rate: f64,
}

pub struct BorderQuery<'a> {
    pub left_start_token: &'a str,
    pub left_end_token: &'a str,
    pub left_border: usize,
}

fn squared_error(bs: &FoundToken, be: &FoundToken) -> f64 {
    let es = 100.0 - bs.rate as f64;
    let ee = 100.0 - be.rate as f64;
    (es * es + ee * ee) / 2.0
}

fn char_len(s: &str) -> i64 {
    s.chars().count() as i64
}

impl BorderMatch {
    /// `None` when either candidate set is empty or no candidate pair is
    /// geometrically plausible.
    pub fn locate(
        strategy: BorderStrategy,
        query: &BorderQuery<'_>,
        candidates: &RightCandidates,
        right_side: &ParagraphSide,
        limit: usize,
    ) -> Option<BorderMatch> {
        if candidates.starts.is_empty() || candidates.ends.is_empty() {
            return None;
        }
        let found_starts =
            RightCandidates::best_matches(&candidates.starts, query.left_start_token, limit);
        let found_ends =
            RightCandidates::best_matches(&candidates.ends, query.left_end_token, limit);
        let pairs = found_starts
            .iter()
            .flat_map(|bs| found_ends.iter().map(move |be| (bs, be)));

        let mut best: Option<(&FoundToken, &FoundToken)> = None;
        let mut best_error = f64::MAX;
        let mut best_distance = i64::MAX;

        match strategy {
            BorderStrategy::Paragraph => {
                for (bs, be) in pairs {
                    let symbols = right_side.get(bs.key).map_or(0, |p| p.symbols_count()) as i64;
                    let distance = be.key as i64 - bs.key as i64 - symbols;
                    let error = squared_error(bs, be);
                    if error == 0.0 && (-1..=1).contains(&distance) {
                        best = Some((bs, be));
                        best_error = error;
                        best_distance = distance;
                        break;
                    }
                    if distance >= -1 && distance <= best_distance && error < best_error {
                        best = Some((bs, be));
                        best_error = error;
                        best_distance = distance;
                    }
                }
            }
            BorderStrategy::Token => {
                for (bs, be) in pairs {
                    let distance = be.key as i64 - bs.key as i64 - char_len(&bs.text);
                    let error = squared_error(bs, be);
                    if distance >= 0 && distance <= best_distance && error < best_error {
                        best = Some((bs, be));
                        best_error = error;
                        best_distance = distance;
                    }
                }
            }
            BorderStrategy::BestBorderEnd => {
                for (bs, be) in pairs {
                    let error = 100.0 - be.rate as f64;
                    if error < best_error {
                        best = Some((bs, be));
                        best_error = error;
                        best_distance = 0;
                    }
                }
            }
            BorderStrategy::BestBorderStart => {
                for (bs, be) in pairs {
                    let error = 100.0 - bs.rate as f64;
                    if error < best_error {
                        best = Some((bs, be));
                        best_error = error;
                        best_distance = 0;
                    }
                }
                let (bs, _) = best?;
                let neighbour = bs.key + bs.text.chars().count();
                let text = candidates.ends.get(&neighbour)?;
                let forced_end = FoundToken {
                    key: neighbour,
                    text: text.clone(),
                    rate: 100,
                };
                return Some(BorderMatch {
                    left_border: query.left_border,
                    border_start: bs.clone(),
                    border_end: forced_end,
                    tokens_rate: best_error,
                    char_distance: best_distance,
                    rate: best_error / 10.0 + best_distance as f64,
                });
            }
        }

        let (bs, be) = best?;
        Some(BorderMatch {
            left_border: query.left_border,
            border_start: bs.clone(),
            border_end: be.clone(),
            tokens_rate: best_error,
            char_distance: best_distance,
            rate: best_error / 10.0 + best_distance as f64,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MatchedChapter {
    pub left: ChapterRange,
    pub right: ChapterRange,
    pub strategy: BorderStrategy,
    pub best_border: Option<BorderMatch>,
    /// Rate of the border this chapter was split off at.
    pub born_rate: Option<f64>,
}

impl MatchedChapter {
    pub fn new(
        left: ChapterRange,
        right: ChapterRange,
        strategy: BorderStrategy,
        left_side: &ParagraphSide,
        right_side: &ParagraphSide,
        candidates_per_border: usize,
        born_rate: Option<f64>,
    ) -> Self {
        let candidates = RightCandidates::collect(strategy, right, right_side);

        let queries: Vec<BorderQuery<'_>> = left_side
            .range(left.start, left.end)
            .filter(|paragraph| paragraph.position < left.end)
            .filter_map(|paragraph| {
                let next = left_side.next_after(paragraph.position)?;
                Some(BorderQuery {
                    left_start_token: paragraph.last_token().text.as_str(),
                    left_end_token: next.first_token().text.as_str(),
                    left_border: next.position,
                })
            })
            .collect();

        let best_border = queries
            .par_iter()
            .map(|query| {
                BorderMatch::locate(strategy, query, &candidates, right_side, candidates_per_border)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .fold(None::<BorderMatch>, |best, candidate| match best {
                Some(current) if current.rate <= candidate.rate => Some(current),
                _ => Some(candidate),
            });

        Self {
            left,
            right,
            strategy,
            best_border,
            born_rate,
        }
    }

    pub fn spawn_possible(&self, threshold: f64) -> bool {
        self.best_border
            .as_ref()
            .is_some_and(|border| border.rate <= threshold)
    }

    /// Splits the chapter at its best border, returning the parent and the
    /// child chapter. Both sides are split in place.
    pub fn spawn(
        &self,
        threshold: f64,
        left_side: &mut ParagraphSide,
        right_side: &mut ParagraphSide,
        candidates_per_border: usize,
    ) -> Option<(MatchedChapter, MatchedChapter)> {
        let border = self.best_border.as_ref().filter(|b| b.rate <= threshold)?;
        let right_at = if self.strategy.is_token_level() {
            self.right.start + border.border_end.key
        } else {
            border.border_end.key
        };

        let (parent_left, child_left) = self.left.split(left_side, border.left_border)?;
        let (parent_right, child_right) = self.right.split(right_side, right_at)?;

        let parent = MatchedChapter::new(
            parent_left,
            parent_right,
            self.strategy,
            left_side,
            right_side,
            candidates_per_border,
            self.born_rate,
        );
        let child = MatchedChapter::new(
            child_left,
            child_right,
            self.strategy,
            left_side,
            right_side,
            candidates_per_border,
            Some(border.rate),
        );
        tracing::debug!(
            rate = border.rate,
            parent = ?(parent.left, parent.right),
            child = ?(child.left, child.right),
            "spawned chapter"
        );
        Some((parent, child))
    }
}
