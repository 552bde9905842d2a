//! Upload format detection from leading bytes.

use serde::Serialize;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    /// ZIP container; a `.docx` when it carries `word/document.xml`.
    Zip,
    /// Compound File Binary, the legacy Word `.doc` format.
    LegacyDoc,
    Unknown,
}

impl DocumentFormat {
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(PDF_MAGIC) {
            DocumentFormat::Pdf
        } else if head.starts_with(ZIP_MAGIC) {
            DocumentFormat::Zip
        } else if head.starts_with(CFB_MAGIC) {
            DocumentFormat::LegacyDoc
        } else {
            DocumentFormat::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_known_magic() {
        assert_eq!(DocumentFormat::sniff(b"%PDF-1.7\n"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::sniff(b"PK\x03\x04rest"), DocumentFormat::Zip);
        assert_eq!(
            DocumentFormat::sniff(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0]),
            DocumentFormat::LegacyDoc
        );
        assert_eq!(DocumentFormat::sniff(b"hello"), DocumentFormat::Unknown);
        assert_eq!(DocumentFormat::sniff(b""), DocumentFormat::Unknown);
    }
}
