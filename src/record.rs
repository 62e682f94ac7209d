//! Candidate and canonical bibliographic records.

use std::{collections::BTreeMap, fmt};

use crate::merge::clean_value;

/// Lowercase field name to non-empty value.
pub type Fields = BTreeMap<String, String>;

/// The entry types a canonical record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Article,
    InProceedings,
    InCollection,
    Book,
    Misc,
}

impl EntryType {
    /// Map a BibTeX/BibLaTeX entry type name; anything unsupported becomes `misc`.
    pub fn from_bibtex(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "article" => EntryType::Article,
            "inproceedings" | "conference" => EntryType::InProceedings,
            "incollection" | "inbook" => EntryType::InCollection,
            "book" => EntryType::Book,
            _ => EntryType::Misc,
        }
    }

    /// Map a Crossref work type such as `proceedings-article` or `book-chapter`.
    pub fn from_crossref(kind: &str) -> Self {
        let kind = kind.to_ascii_lowercase();
        if kind.contains("proceedings") {
            EntryType::InProceedings
        } else if kind.contains("journal") || kind.contains("article") {
            EntryType::Article
        } else if kind.contains("chapter") {
            EntryType::InCollection
        } else if kind.contains("book") {
            EntryType::Book
        } else {
            EntryType::Misc
        }
    }

    /// Whether the venue of this type lives in `booktitle` rather than `journal`.
    pub fn uses_booktitle(self) -> bool {
        matches!(self, EntryType::InProceedings | EntryType::InCollection)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Article => "article",
            EntryType::InProceedings => "inproceedings",
            EntryType::InCollection => "incollection",
            EntryType::Book => "book",
            EntryType::Misc => "misc",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unvalidated record fetched from one source for one seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Name of the source that produced this candidate.
    pub source: &'static str,
    pub entry_type: EntryType,
    pub fields: Fields,
}

impl Candidate {
    pub fn new(source: &'static str, entry_type: EntryType) -> Self {
        Candidate {
            source,
            entry_type,
            fields: Fields::new(),
        }
    }

    /// Store a cleaned value; values that clean down to nothing are not stored.
    pub fn set(&mut self, field: &str, value: &str) {
        let value = clean_value(value);
        if !value.is_empty() {
            self.fields.insert(field.to_ascii_lowercase(), value);
        }
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.get("title")
    }

    pub fn year(&self) -> &str {
        self.get("year")
    }

    /// The venue used for matching: journal, booktitle, then looser venue-like fields.
    pub fn venue(&self) -> &str {
        ["journal", "booktitle", "eventtitle", "series", "howpublished"]
            .into_iter()
            .map(|f| self.get(f))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }

    pub fn doi(&self) -> Option<&str> {
        self.fields.get("doi").map(String::as_str)
    }
}

/// The single accepted, merged and keyed record for a seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub entry_type: EntryType,
    /// Citekey, unique within a run.
    pub id: String,
    pub fields: Fields,
    /// Source of the candidate the record was built from.
    pub source: &'static str,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Four-digit year as a number, for sorting.
    pub fn year(&self) -> Option<i32> {
        self.get("year")
            .and_then(|y| y.get(..4))
            .and_then(|y| y.parse().ok())
    }
}
