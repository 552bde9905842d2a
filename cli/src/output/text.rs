use anyhow::Result;
use doc_compare::{DisagreementReport, UnifiedPair};
use std::io::Write;
use std::path::Path;

pub fn write_unified<W: Write>(
    w: &mut W,
    pair: &UnifiedPair,
    left: &Path,
    right: &Path,
) -> Result<()> {
    writeln!(w, "Chapters: {}", pair.chapters)?;
    writeln!(w, "--- {}", left.display())?;
    write!(w, "{}", pair.left)?;
    writeln!(w, "+++ {}", right.display())?;
    write!(w, "{}", pair.right)?;
    Ok(())
}

pub fn write_report_summary<W: Write>(
    w: &mut W,
    report: &DisagreementReport,
    output: &Path,
) -> Result<()> {
    let changed = report
        .rows
        .iter()
        .filter(|row| row.highlighted_counts() != (0, 0))
        .count();
    writeln!(w, "Report written: {}", output.display())?;
    writeln!(w, "Rows: {} ({} with changes)", report.rows.len(), changed)?;
    for row in report.rows.iter().filter(|row| row.highlighted_counts() != (0, 0)) {
        let (removed, added) = row.highlighted_counts();
        writeln!(w, "  {} -{} +{}", row.number.trim(), removed, added)?;
    }
    Ok(())
}
