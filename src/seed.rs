//! Seeds: what the author profile knows about a publication before reconciliation.

use std::{fs, path::PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::{
    error::PipelineError,
    identifier::{extract_doi, extract_preprint_id},
    source::publisher::chunks_to_string,
};

/// Minimal known facts about one publication. Empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub title: String,
    pub authors: String,
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    pub venue: String,
    pub link: String,
    /// Explicit DOI field, when the profile export carries one.
    pub doi: String,
    /// Explicit preprint id field.
    pub eprint: String,
    /// Raw citation line, e.g. "FooConf '25, 123-130, 2025".
    pub citation: String,
    /// Raw BibTeX entry exported by the profile; mined for identifiers and used as a fallback record.
    pub bibtex: String,
}

impl Seed {
    /// Build a seed from a single command-line argument: identifiers go to `link`, anything
    /// else is taken as a title.
    pub fn from_argument(arg: &str) -> Self {
        let arg = arg.trim();
        if extract_doi(arg).is_some() || extract_preprint_id(arg).is_some() {
            Seed {
                link: arg.to_string(),
                ..Seed::default()
            }
        } else {
            Seed {
                title: arg.to_string(),
                ..Seed::default()
            }
        }
    }

    /// Read a profile entry. Accepts both a flat seed object and the nested shape produced by
    /// profile scrapers (`{"bib": {...}, "pub_url": ...}`).
    pub fn from_profile_entry(value: &Value) -> Result<Self, serde_json::Error> {
        let Some(bib) = value.get("bib").and_then(Value::as_object) else {
            return Seed::deserialize(value);
        };
        let citation = normalize_ws(&text(bib.get("citation")));
        let venue = [bib.get("venue"), bib.get("journal"), bib.get("conference")]
            .into_iter()
            .map(text)
            .find(|v| !v.trim().is_empty())
            .map(|v| normalize_ws(&v))
            .unwrap_or_else(|| venue_from_citation(&citation));
        Ok(Seed {
            title: normalize_ws(&text(bib.get("title"))),
            authors: normalize_ws(&text(bib.get("author"))),
            year: text(bib.get("pub_year").or_else(|| bib.get("year"))).trim().to_string(),
            venue,
            link: [value.get("pub_url"), bib.get("url"), value.get("eprint_url")]
                .into_iter()
                .map(text)
                .find(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            doi: text(bib.get("doi")),
            eprint: text(bib.get("eprint").or_else(|| value.get("eprint_url"))),
            citation,
            bibtex: text(value.get("bibtex")),
        })
    }

    /// Author list in BibTeX form. Comma-separated lists of full names become
    /// `and`-separated; a single-word segment means `Last, First` and the text is kept as is.
    pub fn bibtex_authors(&self) -> String {
        static AND_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\s+and\s+").expect("valid and regex"));

        let s = normalize_ws(&self.authors);
        if s.is_empty() || AND_RE.is_match(&s) || !s.contains(',') {
            return s;
        }
        let parts: Vec<&str> = s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        if parts.len() >= 2 && parts.iter().all(|p| p.split_whitespace().count() >= 2) {
            return parts.join(" and ");
        }
        s
    }

    /// Whether the seed carries anything the pipeline can look up.
    pub fn is_resolvable(&self) -> bool {
        !self.title.trim().is_empty()
            || [&self.doi, &self.eprint, &self.link]
                .into_iter()
                .any(|t| extract_doi(t).is_some() || extract_preprint_id(t).is_some())
    }
}

/// The author-profile collaborator: enumerate publications, then fetch each one's details.
pub trait SeedSource {
    type Handle;

    fn list_publications(&mut self) -> Result<Vec<Self::Handle>, PipelineError>;
    fn fetch_details(&mut self, handle: &Self::Handle) -> Result<Seed, PipelineError>;
}

/// Drain a seed source. A publication whose details cannot be fetched is logged and skipped.
pub fn collect_seeds<S: SeedSource>(source: &mut S) -> Result<Vec<Seed>, PipelineError> {
    let handles = source.list_publications()?;
    let mut seeds = Vec::with_capacity(handles.len());
    for handle in &handles {
        match source.fetch_details(handle) {
            Ok(seed) => seeds.push(seed),
            Err(e) => warn!(error = %e, "skipping publication"),
        }
    }
    Ok(seeds)
}

/// A profile export on disk: a JSON array of entries, or one JSON object per line.
pub struct JsonSeedFile {
    path: PathBuf,
    entries: Vec<Value>,
}

impl JsonSeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSeedFile {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    fn input_error(&self, reason: impl ToString) -> PipelineError {
        PipelineError::Input {
            origin: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SeedSource for JsonSeedFile {
    type Handle = usize;

    fn list_publications(&mut self) -> Result<Vec<usize>, PipelineError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.input_error(e))?;
        self.entries = parse_entries(&raw).map_err(|e| self.input_error(e))?;
        Ok((0..self.entries.len()).collect())
    }

    fn fetch_details(&mut self, handle: &usize) -> Result<Seed, PipelineError> {
        let value = self
            .entries
            .get(*handle)
            .ok_or_else(|| self.input_error(format!("no entry #{handle}")))?;
        Seed::from_profile_entry(value).map_err(|e| self.input_error(format!("entry #{handle}: {e}")))
    }
}

/// A BibTeX file whose entries are re-resolved as seeds.
pub struct BibtexSeedFile {
    path: PathBuf,
    seeds: Vec<Seed>,
}

impl BibtexSeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        BibtexSeedFile {
            path: path.into(),
            seeds: Vec::new(),
        }
    }

    fn input_error(&self, reason: impl ToString) -> PipelineError {
        PipelineError::Input {
            origin: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SeedSource for BibtexSeedFile {
    type Handle = usize;

    fn list_publications(&mut self) -> Result<Vec<usize>, PipelineError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.input_error(e))?;
        self.seeds = seeds_from_bibtex(&raw).map_err(|e| self.input_error(e))?;
        Ok((0..self.seeds.len()).collect())
    }

    fn fetch_details(&mut self, handle: &usize) -> Result<Seed, PipelineError> {
        self.seeds
            .get(*handle)
            .cloned()
            .ok_or_else(|| self.input_error(format!("no entry #{handle}")))
    }
}

/// One seed per BibTeX entry.
pub fn seeds_from_bibtex(raw: &str) -> Result<Vec<Seed>, String> {
    let bib = biblatex::Bibliography::parse(raw).map_err(|e| e.to_string())?;
    Ok(bib
        .iter()
        .map(|entry| {
            let field = |name: &str| {
                entry
                    .fields
                    .get(name)
                    .map(|chunks| normalize_ws(&chunks_to_string(chunks)))
                    .unwrap_or_default()
            };
            let year = [field("year"), field("date")]
                .into_iter()
                .find_map(|y| y.get(..4).map(str::to_string))
                .unwrap_or_default();
            let venue = ["journal", "journaltitle", "booktitle", "howpublished"]
                .into_iter()
                .map(field)
                .find(|v| !v.is_empty())
                .unwrap_or_default();
            Seed {
                title: field("title"),
                authors: field("author"),
                year,
                venue,
                link: field("url"),
                doi: field("doi"),
                eprint: field("eprint"),
                ..Seed::default()
            }
        })
        .collect())
}

fn parse_entries(raw: &str) -> Result<Vec<Value>, serde_json::Error> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect()
}

/// Venue guess from a citation line: the head before the first comma, or the whole line with a
/// trailing year removed.
fn venue_from_citation(citation: &str) -> String {
    static TRAILING_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\s*\(?\b(19|20)\d{2}\b\)?\s*$").expect("valid trailing year regex")
    });
    let head = citation.split(',').next().unwrap_or_default().trim();
    if !head.is_empty() && !head.eq_ignore_ascii_case("unknown") {
        return head.to_string();
    }
    TRAILING_YEAR_RE
        .replace(citation, "")
        .trim()
        .trim_end_matches(',')
        .trim()
        .to_string()
}

fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|i| text(Some(i)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(text(Some(&v)).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_entry_with_numeric_year() {
        let s = Seed::from_profile_entry(&json!({
            "title": "Foo", "year": 2025, "authors": "J Smith"
        }))
        .unwrap();
        assert_eq!(s.year, "2025");
        assert_eq!(s.venue, "");
    }

    #[test]
    fn nested_profile_entry() {
        let s = Seed::from_profile_entry(&json!({
            "bib": {
                "title": "  Leveraging   Large Language Models ",
                "author": "J Smith and W Zhang",
                "pub_year": "2025",
                "citation": "Proceedings of the 33rd ACM International…, 2025"
            },
            "pub_url": "https://dl.acm.org/doi/10.1145/3600000.1"
        }))
        .unwrap();
        assert_eq!(s.title, "Leveraging Large Language Models");
        assert_eq!(s.venue, "Proceedings of the 33rd ACM International…");
        assert_eq!(s.link, "https://dl.acm.org/doi/10.1145/3600000.1");
    }

    #[test]
    fn venue_from_unknown_citation_drops_year() {
        assert_eq!(venue_from_citation("FooConf '25, 123-130, 2025"), "FooConf '25");
        assert_eq!(venue_from_citation("Unknown, 2024"), "Unknown");
        assert_eq!(venue_from_citation(", 2024"), "");
    }

    #[test]
    fn comma_separated_authors_become_and() {
        let s = Seed {
            authors: "J Smith, W Zhang, A B Chen".into(),
            ..Seed::default()
        };
        assert_eq!(s.bibtex_authors(), "J Smith and W Zhang and A B Chen");

        let kept = Seed {
            authors: "Smith, Jane".into(),
            ..Seed::default()
        };
        assert_eq!(kept.bibtex_authors(), "Smith, Jane");
    }

    #[test]
    fn argument_seeds() {
        assert_eq!(Seed::from_argument("10.1145/3600000.1").link, "10.1145/3600000.1");
        assert_eq!(Seed::from_argument("A paper title").title, "A paper title");
    }

    #[test]
    fn json_lines_and_arrays() {
        assert_eq!(parse_entries("[{\"title\":\"a\"},{\"title\":\"b\"}]").unwrap().len(), 2);
        assert_eq!(parse_entries("{\"title\":\"a\"}\n\n{\"title\":\"b\"}\n").unwrap().len(), 2);
        assert!(parse_entries("   ").unwrap().is_empty());
    }

    #[test]
    fn bibtex_entries_become_seeds() {
        let seeds = seeds_from_bibtex(
            "@inproceedings{a, title = {Foo  Bar}, author = {Smith, Jane}, date = {2024-05-01},
              booktitle = {FooConf}, doi = {10.1145/3600000.1}}
             @misc{b, title = {Baz}, eprint = {2501.01234}}",
        )
        .unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].title, "Foo Bar");
        assert_eq!(seeds[0].year, "2024");
        assert_eq!(seeds[0].venue, "FooConf");
        assert_eq!(seeds[0].doi, "10.1145/3600000.1");
        assert_eq!(seeds[1].eprint, "2501.01234");
    }

    #[test]
    fn resolvable_needs_title_or_identifier() {
        assert!(!Seed::default().is_resolvable());
        assert!(Seed::from_argument("arXiv:2501.01234").is_resolvable());
    }
}
