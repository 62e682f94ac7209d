//! Citation key derivation and run-scoped uniqueness.

use std::collections::HashSet;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Maximum length of each slug component of a key.
pub const SLUG_MAX: usize = 40;

/// How keys are derived for records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyStyle {
    /// `<surname><year|nd><title-slug>`
    #[default]
    Slug,
    /// The record's DOI when it has one, otherwise a slug key.
    Doi,
}

/// Lowercase ASCII alphanumerics of the NFKD-decomposed text, truncated to [`SLUG_MAX`].
pub fn slug(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(SLUG_MAX)
        .collect()
}

/// Surname of the first author of a BibTeX-style author list.
///
/// Handles `Last, First` and `First Last`, with authors separated by `and`.
pub fn first_author_surname(authors: &str) -> Option<&str> {
    let first = authors
        .split(" and ")
        .map(str::trim)
        .find(|a| !a.is_empty())?;
    let surname = match first.split_once(',') {
        Some((last, _)) => last.trim(),
        None => first.split_whitespace().last()?,
    };
    (!surname.is_empty()).then_some(surname)
}

/// Deterministic base key for a record.
pub fn make_key(surname: Option<&str>, year: &str, title: &str) -> String {
    let author = surname.map(slug).filter(|s| !s.is_empty());
    let year = year.trim();
    let year = year
        .get(..4)
        .filter(|y| y.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or("nd");
    let mut title = slug(title);
    if title.is_empty() {
        title.push_str("untitled");
    }
    format!("{}{year}{title}", author.as_deref().unwrap_or("anon"))
}

/// The set of keys issued so far in one run.
#[derive(Debug, Default)]
pub struct CitekeyRegistry {
    issued: HashSet<String>,
}

impl CitekeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `base` if unused, else the first free `base2`, `base3`, ...; the result is
    /// registered before it is returned.
    pub fn unique(&mut self, base: &str) -> String {
        let key = if self.issued.contains(base) {
            (2..)
                .map(|n| format!("{base}{n}"))
                .find(|k| !self.issued.contains(k))
                .unwrap_or_else(|| base.to_string())
        } else {
            base.to_string()
        };
        self.issued.insert(key.clone());
        key
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
