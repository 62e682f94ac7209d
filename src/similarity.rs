//! Text normalisation and bounded similarity scores for titles and venues.

use std::collections::HashSet;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercase, strip diacritics and punctuation, collapse whitespace.
///
/// Punctuation is deleted rather than replaced, so `state-of-the-art` and `stateoftheart`
/// normalise to the same string.
pub fn normalize(s: &str) -> String {
    let stripped: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sequence similarity of the normalised strings: `2·M / (|a| + |b|)`, where `M` is the number
/// of characters covered by matching blocks (Ratcliff/Obershelp).
///
/// Empty input on either side scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matched = matching_chars(&a, &b);
    (2 * matched) as f64 / (a.len() + b.len()) as f64
}

/// Jaccard similarity over the word tokens of both strings.
///
/// Tolerant of word order and punctuation, which is what truncated venue strings need. Unlike
/// [`normalize`], punctuation separates tokens, so `ACM/IEEE` is `acm` and `ieee`.
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count();
    if inter == 0 {
        return 0.0;
    }
    inter as f64 / ta.union(&tb).count() as f64
}

fn tokens(s: &str) -> HashSet<String> {
    let folded: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().map(str::to_string).collect()
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + k..], &b[j + k..])
}

/// Longest common contiguous run as `(start_in_a, start_in_b, len)`; earliest wins on ties.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = cur[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}
