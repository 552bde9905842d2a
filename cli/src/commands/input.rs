use anyhow::{bail, Context, Result};
use doc_compare::{docx_text, DocumentFormat};
use std::path::Path;

/// Text of a local input: `.docx` packages are unpacked, anything else must
/// be UTF-8 text. PDFs and legacy `.doc` need the server.
pub(crate) fn load_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to open {}", path.display()))?;
    match DocumentFormat::sniff(&bytes) {
        DocumentFormat::Zip => {
            docx_text(bytes).with_context(|| format!("Failed to read document: {}", path.display()))
        }
        DocumentFormat::Pdf | DocumentFormat::LegacyDoc => bail!(
            "{} needs server-side conversion; use `doc-compare remote`",
            path.display()
        ),
        DocumentFormat::Unknown => String::from_utf8(bytes)
            .with_context(|| format!("{} is neither a .docx nor UTF-8 text", path.display())),
    }
}
