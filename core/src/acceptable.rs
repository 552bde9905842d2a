//! Edits that do not count as disagreements.

/// Pairs of spellings that are treated as the same text, matched in either
/// order.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\"", "«"),
    ("\"", "»"),
    ("\"", "“"),
    ("\"", "”"),
    ("\"", "„"),
    ("«", "»"),
    ("“", "”"),
    ("„", "“"),
    ("'", "’"),
    ("'", "‘"),
    ("‘", "’"),
    ("-", "–"),
    ("-", "—"),
    ("–", "—"),
    ("-", "‑"),
    (" ", "\u{a0}"),
    (" ", "\u{202f}"),
    ("\u{a0}", "\u{202f}"),
    ("ё", "е"),
    ("Ё", "Е"),
    ("...", "…"),
    ("№", "N"),
];

const EXTRA_PUNCTUATION: &[char] = &['«', '»', '“', '”', '„', '‘', '’', '–', '—', '…', '№'];

/// A deleted or inserted run that is only whitespace or a single punctuation
/// mark.
pub fn is_acceptable_skip(run: &str) -> bool {
    if run.is_empty() {
        return false;
    }
    if run.chars().all(char::is_whitespace) {
        return true;
    }
    let mut chars = run.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_ascii_punctuation() || EXTRA_PUNCTUATION.contains(&c),
        _ => false,
    }
}

pub fn is_acceptable_replacement(old: &str, new: &str) -> bool {
    REPLACEMENTS
        .iter()
        .any(|&(a, b)| (a == old && b == new) || (a == new && b == old))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_whitespace_and_lone_punctuation() {
        assert!(is_acceptable_skip(" "));
        assert!(is_acceptable_skip("\n\t"));
        assert!(is_acceptable_skip(","));
        assert!(is_acceptable_skip("»"));
        assert!(!is_acceptable_skip(",,"));
        assert!(!is_acceptable_skip("a"));
        assert!(!is_acceptable_skip(""));
    }

    #[test]
    fn replacements_match_in_both_orders() {
        assert!(is_acceptable_replacement("\"", "«"));
        assert!(is_acceptable_replacement("«", "\""));
        assert!(is_acceptable_replacement("е", "ё"));
        assert!(!is_acceptable_replacement("a", "b"));
    }
}
