//! Aligns two revisions of a document into matching chapters.
//!
//! Both texts start as a single chapter. Each pass re-scores every chapter
//! with its border strategy and splits chapters while the best border rate
//! stays under a growing threshold. The result renders the chapters of both
//! sides in the same order, separated by blank lines, so chapter `n` of the
//! left text corresponds to chapter `n` of the right text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chapter::{ChapterRange, MatchedChapter};
use crate::config::{ConfigError, Pass, PassKind, UnifyConfig};
use crate::error_codes;
use crate::paragraph::ParagraphSide;

#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("threshold must be finite and greater than zero (got {value})")]
    InvalidThreshold { value: f64 },
    #[error("{side} text has no non-blank lines")]
    EmptySide { side: &'static str },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to write chapter snapshot {path}: {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UnifyError {
    pub fn code(&self) -> &'static str {
        match self {
            UnifyError::InvalidThreshold { .. } => error_codes::UNIFY_INVALID_THRESHOLD,
            UnifyError::EmptySide { .. } => error_codes::UNIFY_EMPTY_SIDE,
            UnifyError::Config(_) => error_codes::UNIFY_CONFIG,
            UnifyError::Dump { .. } => error_codes::UNIFY_DUMP_IO,
        }
    }
}

/// Both sides rendered chapter by chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedPair {
    pub left: String,
    pub right: String,
    pub chapters: usize,
}

/// Lines of `text` that contain anything besides whitespace.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Runs the pass pipeline with `config.max_threshold` replaced by
/// `threshold`.
pub fn unify_with_threshold(
    left: &str,
    right: &str,
    threshold: f64,
    config: &UnifyConfig,
) -> Result<UnifiedPair, UnifyError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(UnifyError::InvalidThreshold { value: threshold });
    }
    let config = UnifyConfig {
        max_threshold: threshold,
        ..config.clone()
    };
    unify_texts(left, right, &config)
}

pub fn unify_texts(
    left: &str,
    right: &str,
    config: &UnifyConfig,
) -> Result<UnifiedPair, UnifyError> {
    unify_lines(&split_lines(left), &split_lines(right), config)
}

pub fn unify_lines<S: AsRef<str>>(
    left: &[S],
    right: &[S],
    config: &UnifyConfig,
) -> Result<UnifiedPair, UnifyError> {
    if !config.max_threshold.is_finite() || config.max_threshold <= 0.0 {
        return Err(UnifyError::InvalidThreshold {
            value: config.max_threshold,
        });
    }
    config.validate()?;
    if left.is_empty() {
        return Err(UnifyError::EmptySide { side: "left" });
    }
    if right.is_empty() {
        return Err(UnifyError::EmptySide { side: "right" });
    }

    let mut aligner = Aligner::new(left, right, config);
    for (index, pass) in config.passes.iter().enumerate() {
        aligner.run_pass(index, pass)?;
    }
    Ok(aligner.render())
}

struct Aligner<'c> {
    config: &'c UnifyConfig,
    left_side: ParagraphSide,
    right_side: ParagraphSide,
    chapters: Vec<MatchedChapter>,
}

impl<'c> Aligner<'c> {
    fn new<S: AsRef<str>>(left: &[S], right: &[S], config: &'c UnifyConfig) -> Self {
        let left_side = ParagraphSide::from_lines(left);
        let right_side = ParagraphSide::from_lines(right);
        let first = config
            .passes
            .first()
            .map_or(PassKind::Paragraph, |pass| pass.kind);
        let chapter = MatchedChapter::new(
            ChapterRange::whole(&left_side),
            ChapterRange::whole(&right_side),
            first.strategy(),
            &left_side,
            &right_side,
            config.candidates_per_border,
            None,
        );
        Self {
            config,
            left_side,
            right_side,
            chapters: vec![chapter],
        }
    }

    fn run_pass(&mut self, index: usize, pass: &Pass) -> Result<(), UnifyError> {
        tracing::info!(
            pass = index,
            kind = pass.kind.label(),
            chapters = self.chapters.len(),
            "unify pass"
        );
        if pass.kind == PassKind::Reparagraph {
            self.reparagraph_right();
        } else {
            self.rescore(pass);
        }

        for threshold in self.config.thresholds(pass) {
            self.spawn_chapters(threshold);
            tracing::debug!(threshold, chapters = self.chapters.len(), "threshold done");
            if let Some(dir) = &self.config.dump_dir {
                let label = format!("{index}_{}", pass.kind.label());
                self.dump(dir, &label, threshold)?;
            }
        }
        Ok(())
    }

    /// Rebuilds every chapter over the same ranges with the pass strategy.
    fn rescore(&mut self, pass: &Pass) {
        let strategy = pass.kind.strategy();
        self.chapters = self
            .chapters
            .iter()
            .map(|chapter| {
                MatchedChapter::new(
                    chapter.left,
                    chapter.right,
                    strategy,
                    &self.left_side,
                    &self.right_side,
                    self.config.candidates_per_border,
                    chapter.born_rate,
                )
            })
            .collect();
    }

    /// Joins each right chapter into one line and restarts from a single
    /// chapter spanning both sides.
    fn reparagraph_right(&mut self) {
        let lines: Vec<String> = self
            .chapters
            .iter()
            .map(|chapter| {
                let mut line: String = self
                    .right_side
                    .range(chapter.right.start, chapter.right.end)
                    .map(|paragraph| paragraph.symbols().replace('\n', " "))
                    .collect();
                line.push('\n');
                line
            })
            .collect();
        self.right_side = ParagraphSide::from_lines(&lines);
        self.chapters = vec![MatchedChapter::new(
            ChapterRange::whole(&self.left_side),
            ChapterRange::whole(&self.right_side),
            PassKind::Reparagraph.strategy(),
            &self.left_side,
            &self.right_side,
            self.config.candidates_per_border,
            None,
        )];
    }

    fn spawn_chapters(&mut self, threshold: f64) {
        let previous = std::mem::take(&mut self.chapters);
        let mut spawned = Vec::with_capacity(previous.len());
        for chapter in previous {
            let mut current = chapter;
            while current.spawn_possible(threshold) {
                match current.spawn(
                    threshold,
                    &mut self.left_side,
                    &mut self.right_side,
                    self.config.candidates_per_border,
                ) {
                    Some((parent, child)) => {
                        spawned.push(parent);
                        current = child;
                    }
                    None => break,
                }
            }
            spawned.push(current);
        }
        self.chapters = spawned;
    }

    fn chapter_text(side: &ParagraphSide, range: ChapterRange) -> String {
        side.range(range.start, range.end)
            .map(|paragraph| paragraph.symbols())
            .collect()
    }

    fn render(&self) -> UnifiedPair {
        let mut left = String::new();
        let mut right = String::new();
        for chapter in &self.chapters {
            left.push_str(&Self::chapter_text(&self.left_side, chapter.left));
            left.push('\n');
            right.push_str(&Self::chapter_text(&self.right_side, chapter.right));
            right.push('\n');
        }
        UnifiedPair {
            left,
            right,
            chapters: self.chapters.len(),
        }
    }

    fn dump(&self, dir: &Path, label: &str, threshold: f64) -> Result<(), UnifyError> {
        let mut left = String::new();
        let mut right = String::new();
        for (index, chapter) in self.chapters.iter().enumerate() {
            let header = format!("chapter: {index}, born_rate: {:?}\n", chapter.born_rate);
            left.push_str(&header);
            left.push_str(&Self::chapter_text(&self.left_side, chapter.left));
            right.push_str(&header);
            right.push_str(&Self::chapter_text(&self.right_side, chapter.right));
        }
        for (side, text) in [("left", left), ("right", right)] {
            let path = dir.join(format!("{label}_{side}_{threshold}.txt"));
            fs::write(&path, text).map_err(|source| UnifyError::Dump { path, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_drops_blank_lines() {
        assert_eq!(split_lines("a\n\n  \nb\t\n"), vec!["a", "b\t"]);
        assert!(split_lines("\n \n").is_empty());
    }

    #[test]
    fn rejects_bad_threshold() {
        let config = UnifyConfig::default();
        let err = unify_with_threshold("a", "b", 0.0, &config).unwrap_err();
        assert_eq!(err.code(), error_codes::UNIFY_INVALID_THRESHOLD);
        let err = unify_with_threshold("a", "b", f64::INFINITY, &config).unwrap_err();
        assert!(matches!(err, UnifyError::InvalidThreshold { .. }));
    }

    #[test]
    fn rejects_blank_side() {
        let err = unify_texts("text", " \n\n", &UnifyConfig::default()).unwrap_err();
        assert!(matches!(err, UnifyError::EmptySide { side: "right" }));
    }

    #[test]
    fn renders_even_when_no_threshold_runs() {
        let config = UnifyConfig::builder().max_threshold(0.05).build().unwrap();
        let pair = unify_texts("one line here", "another line", &config).unwrap();
        assert_eq!(pair.chapters, 1);
        assert!(pair.left.starts_with("one line here\n"));
        assert!(pair.left.ends_with("\n\n"));
    }
}
