//! arXiv Atom API: lookup by id and search by title.

use std::rc::Rc;

use once_cell::sync::Lazy;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use regex::Regex;
use url::Url;

use crate::{
    citekey::first_author_surname,
    error::{Result, SourceError},
    identifier::{Recognize, arxiv::Arxiv},
    record::{Candidate, EntryType},
    similarity::similarity,
    source::{Query, Source, http::Transport},
    validate::Check,
};

const API: &str = "https://export.arxiv.org/api/query";
const ATOM: &str = "application/atom+xml";
const SEARCH_RESULTS: &str = "5";

/// Preprint lookup for seeds with a known arXiv id.
pub struct ArxivId {
    transport: Rc<dyn Transport>,
}

impl ArxivId {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        ArxivId { transport }
    }
}

impl Source for ArxivId {
    fn name(&self) -> &'static str {
        "arxiv-id"
    }

    fn check(&self) -> Check {
        Check::Exact
    }

    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>> {
        let Some(id) = query.ids.preprint.as_deref() else {
            return Err(SourceError::NotApplicable);
        };
        let mut url = api_url()?;
        url.query_pairs_mut()
            .append_pair("id_list", id)
            .append_pair("max_results", "1");
        let xml = self.transport.get(&url, Some(ATOM))?;
        let entry = parse_feed(&xml)?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Parse(format!("no Atom entry for arXiv id {id}")))?;
        Ok(vec![entry.into_candidate(self.name())])
    }
}

/// Preprint search by title, biased by the first author's surname when known.
pub struct ArxivTitle {
    transport: Rc<dyn Transport>,
}

impl ArxivTitle {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        ArxivTitle { transport }
    }
}

impl Source for ArxivTitle {
    fn name(&self) -> &'static str {
        "arxiv-title"
    }

    fn check(&self) -> Check {
        Check::Title
    }

    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>> {
        let title = query.seed.title.trim();
        if query.ids.preprint.is_some() || title.is_empty() {
            return Err(SourceError::NotApplicable);
        }
        let mut url = api_url()?;
        url.query_pairs_mut()
            .append_pair("search_query", &search_query(title, &query.seed.bibtex_authors()))
            .append_pair("start", "0")
            .append_pair("max_results", SEARCH_RESULTS);
        let xml = self.transport.get(&url, Some(ATOM))?;

        let mut entries = parse_feed(&xml)?;
        // Best title match first; the validator still has the final word.
        entries.sort_by(|a, b| {
            similarity(title, &b.title).total_cmp(&similarity(title, &a.title))
        });
        Ok(entries
            .into_iter()
            .map(|e| e.into_candidate(self.name()))
            .collect())
    }
}

fn api_url() -> Result<Url> {
    Url::parse(API).map_err(|e| SourceError::Parse(e.to_string()))
}

/// `ti:"<title>"`, plus `AND au:<surname>` when the authors are known.
pub fn search_query(title: &str, authors: &str) -> String {
    let title = title.replace('"', "");
    match first_author_surname(authors) {
        Some(surname) => format!("ti:\"{title}\" AND au:{surname}"),
        None => format!("ti:\"{title}\""),
    }
}

/// The Atom fields we keep for one entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub published: String,
    pub authors: Vec<String>,
    pub primary_class: Option<String>,
    pub doi: Option<String>,
}

impl AtomEntry {
    pub fn into_candidate(self, source: &'static str) -> Candidate {
        let arxiv = Arxiv::parse(&self.id);

        let mut c = Candidate::new(source, EntryType::Misc);
        c.set("title", &self.title);
        c.set("author", &self.authors.join(" and "));
        if let Some(year) = self.published.get(..4)
            && year.bytes().all(|b| b.is_ascii_digit())
        {
            c.set("year", year);
        }
        c.set("abstract", &self.summary);
        if let Some(arxiv) = arxiv {
            c.set("eprint", arxiv.id());
            c.set("url", &arxiv.abs_url());
            c.set("archiveprefix", "arXiv");
            c.set("howpublished", "arXiv");
        }
        c.set("primaryclass", self.primary_class.as_deref().unwrap_or_default());
        c.set("doi", self.doi.as_deref().unwrap_or_default());
        c
    }
}

/// Parse every `<entry>` of an arXiv Atom feed.
pub fn parse_feed(xml: &str) -> Result<Vec<AtomEntry>> {
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut current: Option<AtomEntry> = None;
    let mut in_author = false;
    let mut text = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.name();
                if is_local(name.as_ref(), "entry") {
                    current = Some(AtomEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    if is_local(name.as_ref(), "author") {
                        in_author = true;
                    } else {
                        read_attributes(entry, &e);
                    }
                }
                text.clear();
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    read_attributes(entry, &e);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let name = name.as_ref();
                if is_local(name, "entry") {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                } else if is_local(name, "author") {
                    in_author = false;
                } else if let Some(entry) = current.as_mut() {
                    let value = normalize_ws(&text);
                    if in_author && is_local(name, "name") {
                        if !value.is_empty() {
                            entry.authors.push(value);
                        }
                    } else if is_local(name, "id") {
                        entry.id = value;
                    } else if is_local(name, "title") {
                        entry.title = value;
                    } else if is_local(name, "summary") {
                        entry.summary = value;
                    } else if is_local(name, "published") {
                        entry.published = value;
                    } else if is_local(name, "doi") && !value.is_empty() {
                        entry.doi.get_or_insert(value);
                    }
                }
                text.clear();
            }
            Event::Text(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            // Entity references are re-emitted as written and decoded when the value is cleaned.
            Event::GeneralRef(r) => {
                text.push('&');
                text.push_str(&String::from_utf8_lossy(&r));
                text.push(';');
            }
            _ => {}
        }
        buf.clear();
    }

    // arXiv answers unknown ids with a feed holding one "Error" entry.
    entries.retain(|e| !(e.title == "Error" && e.authors.is_empty()));
    Ok(entries)
}

fn read_attributes(entry: &mut AtomEntry, e: &BytesStart<'_>) {
    let name = e.name();
    if is_local(name.as_ref(), "primary_category") {
        if let Some(term) = get_attr_value(e, b"term") {
            entry.primary_class = Some(term);
        }
    } else if is_local(name.as_ref(), "link")
        && get_attr_value(e, b"title").as_deref() == Some("doi")
        && let Some(href) = get_attr_value(e, b"href")
        && let Some(doi) = doi_from_url(&href)
    {
        entry.doi.get_or_insert(doi);
    }
}

fn is_local(name: &[u8], target: &str) -> bool {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..] == target.as_bytes(),
        None => name == target.as_bytes(),
    }
}

fn get_attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(a.value.as_ref()).to_string())
}

fn doi_from_url(url: &str) -> Option<String> {
    static DOI_IN_URL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)https?://(?:dx\.)?doi\.org/(?P<doi>10\.\d{4,9}/[-._;()/:A-Z0-9]+)")
            .expect("valid DOI URL regex")
    });
    DOI_IN_URL
        .captures(url)
        .and_then(|c| c.name("doi").map(|m| m.as_str().to_string()))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
