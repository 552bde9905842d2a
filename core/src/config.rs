//! Configuration for the alignment passes and the disagreement report.
//!
//! `UnifyConfig` holds every threshold the chapter splitter uses so the pass
//! schedule is data rather than code.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::chapter::BorderStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Split on right paragraph borders.
    Paragraph,
    /// Flatten every right chapter into one paragraph, then split on
    /// paragraph borders again.
    Reparagraph,
    Token,
    BestBorderEnd,
    BestBorderStart,
}

impl PassKind {
    pub fn strategy(self) -> BorderStrategy {
        match self {
            PassKind::Paragraph | PassKind::Reparagraph => BorderStrategy::Paragraph,
            PassKind::Token => BorderStrategy::Token,
            PassKind::BestBorderEnd => BorderStrategy::BestBorderEnd,
            PassKind::BestBorderStart => BorderStrategy::BestBorderStart,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Paragraph => "paragraph",
            PassKind::Reparagraph => "reparagraph",
            PassKind::Token => "token",
            PassKind::BestBorderEnd => "be_bt",
            PassKind::BestBorderStart => "bs_bt",
        }
    }
}

/// One pass of the pipeline; thresholds run up to `max_threshold * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    pub kind: PassKind,
    pub scale: f64,
}

impl Pass {
    pub const fn new(kind: PassKind, scale: f64) -> Self {
        Self { kind, scale }
    }
}

const GOLDEN: f64 = 1.618;
const GOLDEN_INV: f64 = 0.618;

pub fn default_passes() -> Vec<Pass> {
    let fine = GOLDEN_INV.powi(8);
    vec![
        Pass::new(PassKind::Paragraph, 1.0),
        Pass::new(PassKind::Reparagraph, 1.0),
        Pass::new(PassKind::Token, GOLDEN_INV),
        Pass::new(PassKind::BestBorderEnd, fine),
        Pass::new(PassKind::BestBorderEnd, fine),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifyConfig {
    pub max_threshold: f64,
    pub initial_threshold: f64,
    pub threshold_growth: f64,
    /// Fuzzy candidates kept per border side.
    pub candidates_per_border: usize,
    pub passes: Vec<Pass>,
    /// When set, chapter snapshots are written here after every threshold.
    pub dump_dir: Option<PathBuf>,
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self {
            max_threshold: 200.0,
            initial_threshold: 0.1,
            threshold_growth: GOLDEN,
            candidates_per_border: 3,
            passes: default_passes(),
            dump_dir: None,
        }
    }
}

impl UnifyConfig {
    pub fn builder() -> UnifyConfigBuilder {
        UnifyConfigBuilder {
            inner: UnifyConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive(self.max_threshold, "max_threshold")?;
        ensure_positive(self.initial_threshold, "initial_threshold")?;
        if !self.threshold_growth.is_finite() || self.threshold_growth <= 1.0 {
            return Err(ConfigError::InvalidGrowth {
                value: self.threshold_growth,
            });
        }
        if self.candidates_per_border == 0 {
            return Err(ConfigError::NonPositiveLimit {
                field: "candidates_per_border",
                value: 0,
            });
        }
        if self.passes.is_empty() {
            return Err(ConfigError::NoPasses);
        }
        for pass in &self.passes {
            ensure_positive(pass.scale, "passes.scale")?;
        }
        Ok(())
    }

    /// Thresholds visited by one pass, in order.
    pub fn thresholds(&self, pass: &Pass) -> Vec<f64> {
        let limit = self.max_threshold * pass.scale;
        let mut thresholds = Vec::new();
        let mut threshold = self.initial_threshold;
        while threshold < limit {
            thresholds.push(threshold);
            threshold *= self.threshold_growth;
        }
        thresholds
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be finite and greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("threshold_growth must be finite and greater than one (got {value})")]
    InvalidGrowth { value: f64 },
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveLimit { field: &'static str, value: u64 },
    #[error("at least one pass is required")]
    NoPasses,
}

fn ensure_positive(value: f64, field: &'static str) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct UnifyConfigBuilder {
    inner: UnifyConfig,
}

impl Default for UnifyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifyConfigBuilder {
    pub fn new() -> Self {
        UnifyConfig::builder()
    }

    pub fn max_threshold(mut self, value: f64) -> Self {
        self.inner.max_threshold = value;
        self
    }

    pub fn initial_threshold(mut self, value: f64) -> Self {
        self.inner.initial_threshold = value;
        self
    }

    pub fn threshold_growth(mut self, value: f64) -> Self {
        self.inner.threshold_growth = value;
        self
    }

    pub fn candidates_per_border(mut self, value: usize) -> Self {
        self.inner.candidates_per_border = value;
        self
    }

    pub fn passes(mut self, value: Vec<Pass>) -> Self {
        self.inner.passes = value;
        self
    }

    pub fn dump_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.inner.dump_dir = Some(value.into());
        self
    }

    pub fn build(self) -> Result<UnifyConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// Column captions and heading of the rendered protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLabels {
    pub heading: String,
    pub number_column: String,
    pub source_column: String,
    pub edited_column: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            heading: "Протокол разногласий".to_string(),
            number_column: "№".to_string(),
            source_column: "Редакция заказчика".to_string(),
            edited_column: "Редакция исполнителя".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Rows where both sides have at most this many highlighted chars are
    /// dropped. Zero keeps unchanged rows as plain text.
    pub count_error: usize,
    pub group_paragraph: bool,
    pub source_name: String,
    pub edited_name: String,
    pub labels: ReportLabels,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            count_error: 0,
            group_paragraph: false,
            source_name: "Исходный файл".to_string(),
            edited_name: "Редактированный файл".to_string(),
            labels: ReportLabels::default(),
        }
    }
}
