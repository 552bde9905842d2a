//! Sequence matching and fuzzy string similarity.
//!
//! [`SequenceMatcher`] finds the longest contiguous matching blocks between two
//! sequences (the Ratcliff/Obershelp recursion) and derives edit opcodes and a
//! similarity ratio from them. [`fuzz_ratio`] and [`extract_best`] build the
//! 0..=100 scoring used to locate paragraph borders.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

const AUTOJUNK_MIN_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

pub struct SequenceMatcher<'a, T: Eq + Hash> {
    a: &'a [T],
    b: &'a [T],
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    /// With `autojunk`, elements of `b` that make up more than 1% of a
    /// sequence of at least 200 items are not used to seed matches.
    pub fn new(a: &'a [T], b: &'a [T], autojunk: bool) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }

        if autojunk && b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchingBlock {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular elements were never seeded, but adjacent equal items still extend a match.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        MatchingBlock {
            a: besti,
            b: bestj,
            size: bestsize,
        }
    }

    /// Matching blocks sorted by position, adjacent blocks merged, terminated
    /// by a zero-size sentinel at `(len(a), len(b))`.
    pub fn matching_blocks(&self) -> Vec<MatchingBlock> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            blocks.push(block);
            if alo < block.a && blo < block.b {
                queue.push((alo, block.a, blo, block.b));
            }
            if block.a + block.size < ahi && block.b + block.size < bhi {
                queue.push((block.a + block.size, ahi, block.b + block.size, bhi));
            }
        }
        blocks.sort_by_key(|block| (block.a, block.b, block.size));

        let mut merged: Vec<MatchingBlock> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }
        merged.push(MatchingBlock {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        let (mut i, mut j) = (0, 0);
        let mut opcodes = Vec::new();

        for block in self.matching_blocks() {
            let tag = if i < block.a && j < block.b {
                Some(OpTag::Replace)
            } else if i < block.a {
                Some(OpTag::Delete)
            } else if j < block.b {
                Some(OpTag::Insert)
            } else {
                None
            };
            if let Some(tag) = tag {
                opcodes.push(Opcode {
                    tag,
                    a: i..block.a,
                    b: j..block.b,
                });
            }
            i = block.a + block.size;
            j = block.b + block.size;
            if block.size > 0 {
                opcodes.push(Opcode {
                    tag: OpTag::Equal,
                    a: block.a..i,
                    b: block.b..j,
                });
            }
        }

        opcodes
    }

    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|block| block.size).sum();
        2.0 * matches as f64 / total as f64
    }
}

/// Similarity score in `0..=100`. Equal strings score 100, otherwise an empty
/// side scores 0.
pub fn fuzz_ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let ratio = SequenceMatcher::new(&a, &b, true).ratio();
    (100.0 * ratio).round_ties_even() as u8
}

/// Lowercases, replaces everything but letters, digits and `_` with spaces and
/// trims the result.
pub fn full_process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    replaced.to_lowercase().trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredChoice<'a, K> {
    pub key: K,
    pub text: &'a str,
    pub score: u8,
}

/// Scores every choice against `query` and returns the `limit` best, highest
/// first. Equal scores keep the order in which choices were supplied.
pub fn extract_best<'a, K, I>(query: &str, choices: I, limit: usize) -> Vec<ScoredChoice<'a, K>>
where
    I: IntoIterator<Item = (K, &'a str)>,
{
    let processed_query = full_process(query);
    let mut scored: Vec<ScoredChoice<'a, K>> = choices
        .into_iter()
        .map(|(key, text)| ScoredChoice {
            score: fuzz_ratio(&processed_query, &full_process(text)),
            key,
            text,
        })
        .collect();
    scored.sort_by(|x, y| y.score.cmp(&x.score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn opcodes_describe_a_single_replacement() {
        let a = chars("qabxcd");
        let b = chars("abycdf");
        let ops = SequenceMatcher::new(&a, &b, false).opcodes();
        let tags: Vec<OpTag> = ops.iter().map(|op| op.tag).collect();
        assert_eq!(
            tags,
            vec![
                OpTag::Delete,
                OpTag::Equal,
                OpTag::Replace,
                OpTag::Equal,
                OpTag::Insert
            ]
        );
        assert_eq!(ops[0].a, 0..1);
        assert_eq!(ops[2].a, 3..4);
        assert_eq!(ops[2].b, 2..3);
        assert_eq!(ops[4].b, 5..6);
    }

    #[test]
    fn matching_blocks_end_with_sentinel() {
        let a = chars("abxcd");
        let b = chars("abcd");
        let blocks = SequenceMatcher::new(&a, &b, false).matching_blocks();
        assert_eq!(
            blocks,
            vec![
                MatchingBlock { a: 0, b: 0, size: 2 },
                MatchingBlock { a: 3, b: 2, size: 2 },
                MatchingBlock { a: 5, b: 4, size: 0 },
            ]
        );
    }

    #[test]
    fn ratio_of_empty_sequences_is_one() {
        let empty: Vec<char> = Vec::new();
        assert_eq!(SequenceMatcher::new(&empty, &empty, true).ratio(), 1.0);
    }

    #[test]
    fn fuzz_ratio_matches_known_scores() {
        assert_eq!(fuzz_ratio("this is a test", "this is a test!"), 97);
        assert_eq!(fuzz_ratio("abc", "abc"), 100);
        assert_eq!(fuzz_ratio("", "abc"), 0);
        assert_eq!(fuzz_ratio("abcd", "wxyz"), 0);
    }

    #[test]
    fn autojunk_drops_popular_seeds_in_long_sequences() {
        let b = chars(&"ab".repeat(150));
        let a = chars(&format!("b{}", "ab".repeat(150)));
        let with_junk = SequenceMatcher::new(&a, &b, true).ratio();
        let without_junk = SequenceMatcher::new(&a, &b, false).ratio();
        assert_eq!(with_junk, 0.0);
        assert!(without_junk > 0.99);

        let short_a = chars("babab");
        let short_b = chars("abab");
        assert!(SequenceMatcher::new(&short_a, &short_b, true).ratio() > 0.8);
    }

    #[test]
    fn identical_long_sequences_still_match_fully() {
        let a = chars(&"a".repeat(250));
        assert_eq!(SequenceMatcher::new(&a, &a, true).ratio(), 1.0);
    }

    #[test]
    fn full_process_strips_punctuation_and_case() {
        assert_eq!(full_process("  Hello, World! "), "hello  world");
        assert_eq!(full_process("Пункт 1.2"), "пункт 1 2");
    }

    #[test]
    fn extract_best_orders_by_score_then_input() {
        let choices = vec![(10usize, "another text"), (20, "same text"), (30, "same text")];
        let best = extract_best("same text", choices, 2);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].key, 20);
        assert_eq!(best[1].key, 30);
        assert_eq!(best[0].score, 100);
    }
}
