use crate::commands::input::load_text;
use crate::output::text;
use anyhow::{Context, Result};
use doc_compare::{
    build_report, unify_texts, unify_with_threshold, write_report, ReportOptions, UnifyConfig,
};
use std::io;
use std::path::Path;
use std::process::ExitCode;

pub fn run(
    left_path: &Path,
    right_path: &Path,
    count_error: usize,
    group_paragraph: bool,
    unify: bool,
    threshold: Option<f64>,
    output: &Path,
) -> Result<ExitCode> {
    let mut left = load_text(left_path)?;
    let mut right = load_text(right_path)?;

    if unify {
        let config = UnifyConfig::default();
        let pair = match threshold {
            Some(value) => unify_with_threshold(&left, &right, value, &config),
            None => unify_texts(&left, &right, &config),
        }
        .context("Unify failed")?;
        left = pair.left;
        right = pair.right;
    }

    let options = ReportOptions {
        count_error,
        group_paragraph,
        source_name: display_name(left_path),
        edited_name: display_name(right_path),
        ..ReportOptions::default()
    };
    let report = build_report(&left, &right, &options);
    let bytes = write_report(&report).context("Failed to render report")?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write report: {}", output.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    text::write_report_summary(&mut handle, &report, output)?;
    Ok(ExitCode::from(0))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
