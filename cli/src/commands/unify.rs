use crate::commands::input::load_text;
use crate::output::{json, text};
use crate::OutputFormat;
use anyhow::{Context, Result};
use doc_compare::{unify_texts, unify_with_threshold, UnifyConfig};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run(
    left_path: &Path,
    right_path: &Path,
    threshold: Option<f64>,
    out_dir: Option<PathBuf>,
    dump_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let left = load_text(left_path)?;
    let right = load_text(right_path)?;

    let mut builder = UnifyConfig::builder();
    if let Some(dir) = dump_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create dump directory: {}", dir.display()))?;
        builder = builder.dump_dir(dir);
    }
    let config = builder.build().context("Invalid unify configuration")?;

    let pair = match threshold {
        Some(value) => unify_with_threshold(&left, &right, value, &config),
        None => unify_texts(&left, &right, &config),
    }
    .context("Unify failed")?;

    if let Some(dir) = out_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        std::fs::write(dir.join("left.txt"), &pair.left)?;
        std::fs::write(dir.join("right.txt"), &pair.right)?;
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Text => text::write_unified(&mut handle, &pair, left_path, right_path)?,
        OutputFormat::Json => json::write_json(&mut handle, &pair)?,
    }
    Ok(ExitCode::from(0))
}
