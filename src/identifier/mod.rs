//! Recognising DOIs and arXiv ids inside free text.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::seed::Seed;

pub mod arxiv;
pub mod doi;

use self::{arxiv::Arxiv, doi::Doi};

/// An identifier pattern that can be found inside arbitrary text.
pub trait Recognize<'a>: Sized + 'a {
    /// First occurrence of the pattern in `text`, if any.
    fn parse(text: &'a str) -> Option<Self>;
    /// The identifier as it should be stored in a record.
    fn canonical(&self) -> String;
}

/// The strongest identifier known for a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Doi(String),
    Preprint(String),
    None,
}

/// DOI embedded in `text`, if any. Percent-encoded links are decoded first.
pub fn extract_doi(text: &str) -> Option<String> {
    let text = decode_link(text);
    Doi::parse(&text).map(|d| d.canonical())
}

/// arXiv id embedded in `text` (URL, `arxiv:` prefix, DataCite DOI, or the whole text), if any.
pub fn extract_preprint_id(text: &str) -> Option<String> {
    let text = decode_link(text);
    Arxiv::parse(&text).map(|a| a.canonical())
}

fn decode_link(text: &str) -> Cow<'_, str> {
    if text.contains("://") && text.contains('%') {
        percent_decode_str(text).decode_utf8_lossy()
    } else {
        Cow::Borrowed(text)
    }
}

/// Identifiers gathered from every text field of a seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    pub doi: Option<String>,
    pub preprint: Option<String>,
}

impl Identifiers {
    /// Probe the seed's fields in priority order, keeping the first hit of each kind.
    pub fn scan(seed: &Seed) -> Self {
        let fields = [
            seed.doi.as_str(),
            seed.eprint.as_str(),
            seed.link.as_str(),
            seed.citation.as_str(),
            seed.bibtex.as_str(),
        ];
        let mut ids = Identifiers::default();
        for text in fields.into_iter().filter(|t| !t.trim().is_empty()) {
            if ids.doi.is_none() {
                ids.doi = extract_doi(text).filter(|d| !is_preprint_doi(d));
            }
            if ids.preprint.is_none() {
                ids.preprint = extract_preprint_id(text);
            }
            if ids.doi.is_some() && ids.preprint.is_some() {
                break;
            }
        }
        ids
    }

    pub fn primary(&self) -> Identifier {
        match (&self.doi, &self.preprint) {
            (Some(doi), _) => Identifier::Doi(doi.clone()),
            (None, Some(id)) => Identifier::Preprint(id.clone()),
            (None, None) => Identifier::None,
        }
    }
}

// arXiv's DataCite DOIs are routed to the preprint API rather than the registry.
fn is_preprint_doi(doi: &str) -> bool {
    doi.to_ascii_lowercase().starts_with("10.48550/arxiv.")
}
