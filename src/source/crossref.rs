//! Crossref REST API: lookup by DOI and search by title.

use std::rc::Rc;

use serde_json::Value;
use url::Url;

use crate::{
    citekey::first_author_surname,
    error::{Result, SourceError},
    identifier::doi::encode_segment,
    record::{Candidate, EntryType},
    source::{Query, Source, http::Transport},
    validate::Check,
};

const API: &str = "https://api.crossref.org/works";
const SEARCH_ROWS: &str = "5";

/// Registry lookup for seeds with a known DOI.
pub struct CrossrefDoi {
    transport: Rc<dyn Transport>,
    mailto: Option<String>,
}

impl CrossrefDoi {
    pub fn new(transport: Rc<dyn Transport>, mailto: Option<String>) -> Self {
        CrossrefDoi { transport, mailto }
    }

    fn url(&self, doi: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{API}/{}", encode_segment(doi)))
            .map_err(|e| SourceError::Parse(format!("bad Crossref URL for {doi}: {e}")))?;
        if let Some(mailto) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }
        Ok(url)
    }
}

impl Source for CrossrefDoi {
    fn name(&self) -> &'static str {
        "crossref-doi"
    }

    fn check(&self) -> Check {
        Check::Exact
    }

    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>> {
        let Some(doi) = query.ids.doi.as_deref() else {
            return Err(SourceError::NotApplicable);
        };
        let body = self
            .transport
            .get(&self.url(doi)?, Some("application/json"))?;
        let v: Value = serde_json::from_str(&body)?;
        let message = v
            .get("message")
            .filter(|m| m.is_object())
            .ok_or_else(|| SourceError::Parse(format!("no message in Crossref response for {doi}")))?;
        let mut candidate = candidate_from_message(self.name(), message);
        // The DOI we asked for is authoritative over Crossref's casing of it.
        candidate.set("doi", doi);
        Ok(vec![candidate])
    }
}

/// Registry search for seeds without a DOI.
pub struct CrossrefTitle {
    transport: Rc<dyn Transport>,
    mailto: Option<String>,
}

impl CrossrefTitle {
    pub fn new(transport: Rc<dyn Transport>, mailto: Option<String>) -> Self {
        CrossrefTitle { transport, mailto }
    }

    fn url(&self, query: &Query<'_>) -> Result<Url> {
        let mut url = Url::parse(API).map_err(|e| SourceError::Parse(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query.title", query.seed.title.trim())
                .append_pair("rows", SEARCH_ROWS);
            let authors = query.seed.bibtex_authors();
            if let Some(surname) = first_author_surname(&authors) {
                pairs.append_pair("query.author", surname);
            }
            if let Some(mailto) = &self.mailto {
                pairs.append_pair("mailto", mailto);
            }
        }
        Ok(url)
    }
}

impl Source for CrossrefTitle {
    fn name(&self) -> &'static str {
        "crossref-title"
    }

    fn check(&self) -> Check {
        Check::Full
    }

    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>> {
        if query.ids.doi.is_some() || query.seed.title.trim().is_empty() {
            return Err(SourceError::NotApplicable);
        }
        let body = self
            .transport
            .get(&self.url(query)?, Some("application/json"))?;
        let v: Value = serde_json::from_str(&body)?;
        let items = v["message"]["items"]
            .as_array()
            .ok_or_else(|| SourceError::Parse("no items in Crossref search response".into()))?;
        Ok(items
            .iter()
            .map(|item| candidate_from_message(self.name(), item))
            .collect())
    }
}

/// Map a Crossref work to candidate fields.
pub fn candidate_from_message(source: &'static str, msg: &Value) -> Candidate {
    let entry_type = EntryType::from_crossref(msg["type"].as_str().unwrap_or_default());
    let mut c = Candidate::new(source, entry_type);

    c.set("title", &first_str(&msg["title"]));
    c.set("author", &authors(msg));
    c.set("year", &year(msg));

    let container = first_str(&msg["container-title"]);
    let event = msg["event"]["name"].as_str().unwrap_or_default();
    let publisher = msg["publisher"].as_str().unwrap_or_default();
    match entry_type {
        EntryType::InProceedings => {
            let venue = [event, container.as_str(), publisher]
                .into_iter()
                .find(|v| !v.trim().is_empty())
                .unwrap_or_default();
            c.set("booktitle", venue);
        }
        EntryType::InCollection => c.set("booktitle", &container),
        _ => c.set("journal", &container),
    }

    let doi = msg["DOI"].as_str().unwrap_or_default();
    c.set("doi", doi);
    match msg["URL"].as_str() {
        Some(url) => c.set("url", url),
        None if !doi.is_empty() => c.set("url", &format!("https://doi.org/{doi}")),
        None => {}
    }
    c.set("publisher", publisher);
    c.set("pages", msg["page"].as_str().unwrap_or_default());
    c.set("volume", msg["volume"].as_str().unwrap_or_default());
    c.set("number", msg["issue"].as_str().unwrap_or_default());
    if matches!(
        entry_type,
        EntryType::Book | EntryType::InCollection | EntryType::InProceedings
    ) {
        c.set("isbn", &first_str(&msg["ISBN"]));
    }
    c.set("issn", &first_str(&msg["ISSN"]));
    c.set("abstract", msg["abstract"].as_str().unwrap_or_default());
    c
}

/// `Family, Given and Family, Given ...`
fn authors(msg: &Value) -> String {
    msg["author"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| {
                    let family = a["family"].as_str().unwrap_or_default().trim();
                    let given = a["given"].as_str().unwrap_or_default().trim();
                    match (family.is_empty(), given.is_empty()) {
                        (false, false) => Some(format!("{family}, {given}")),
                        (false, true) => Some(family.to_string()),
                        (true, false) => Some(given.to_string()),
                        (true, true) => a["name"].as_str().map(str::to_string),
                    }
                })
                .collect::<Vec<_>>()
                .join(" and ")
        })
        .unwrap_or_default()
}

/// First year found in the print, online, issued and created dates, in that order.
fn year(msg: &Value) -> String {
    ["published-print", "published-online", "issued", "created"]
        .into_iter()
        .find_map(|key| match &msg[key]["date-parts"][0][0] {
            Value::Number(n) => n.as_u64().map(|y| y.to_string()),
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                Some(s.clone())
            }
            _ => None,
        })
        .unwrap_or_default()
}

/// Crossref wraps most text fields in arrays; take the first string.
fn first_str(v: &Value) -> String {
    match v {
        Value::Array(items) => items
            .iter()
            .find_map(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identifier::Identifiers, seed::Seed, source::http::Canned};
    use serde_json::json;

    fn proceedings_work() -> Value {
        json!({
            "DOI": "10.1145/3600000.1",
            "type": "proceedings-article",
            "title": ["Leveraging Large Language Models for <i>Test</i> Generation"],
            "author": [
                {"family": "Smith", "given": "Jane"},
                {"family": "Zhang", "given": "Wei"},
                {"name": "The FooConf Consortium"}
            ],
            "container-title": ["Proceedings of the 33rd ACM International Conference on the Foundations of Software Engineering"],
            "event": {"name": "FSE '25: 33rd ACM International Conference on the Foundations of Software Engineering"},
            "published-online": {"date-parts": [[2025, 6, 19]]},
            "issued": {"date-parts": [[2024]]},
            "publisher": "ACM",
            "page": "123-130",
            "ISBN": ["9798400700001"],
            "URL": "http://dx.doi.org/10.1145/3600000.1",
            "abstract": "<jats:p>We study &amp; compare.</jats:p>"
        })
    }

    #[test]
    fn maps_proceedings_article() {
        let c = candidate_from_message("crossref-doi", &proceedings_work());
        assert_eq!(c.entry_type, EntryType::InProceedings);
        assert_eq!(c.title(), "Leveraging Large Language Models for Test Generation");
        assert_eq!(c.get("author"), "Smith, Jane and Zhang, Wei and The FooConf Consortium");
        assert_eq!(c.year(), "2025");
        assert!(c.get("booktitle").starts_with("FSE '25"));
        assert!(!c.fields.contains_key("journal"));
        assert_eq!(c.get("isbn"), "9798400700001");
        assert_eq!(c.get("abstract"), "We study & compare.");
        assert_eq!(c.get("pages"), "123-130");
    }

    #[test]
    fn journal_article_uses_journal_and_no_isbn() {
        let c = candidate_from_message(
            "crossref-title",
            &json!({
                "type": "journal-article",
                "title": ["On Graphs"],
                "container-title": ["Journal of Graph Theory"],
                "ISBN": ["123"],
                "ISSN": ["0364-9024", "1097-0118"],
                "issue": "4",
                "created": {"date-parts": [[2023, 1, 1]]}
            }),
        );
        assert_eq!(c.entry_type, EntryType::Article);
        assert_eq!(c.get("journal"), "Journal of Graph Theory");
        assert_eq!(c.get("issn"), "0364-9024");
        assert_eq!(c.get("number"), "4");
        assert_eq!(c.year(), "2023");
        assert!(!c.fields.contains_key("isbn"));
    }

    #[test]
    fn doi_lookup_encodes_doi_and_keeps_queried_doi() {
        let body = json!({"status": "ok", "message": proceedings_work()}).to_string();
        let t = Rc::new(Canned::new().route("/works/10.1145%2F3600000.1", body));
        let source = CrossrefDoi::new(t.clone(), Some("me@example.org".into()));
        let seed = Seed::default();
        let ids = Identifiers {
            doi: Some("10.1145/3600000.1".into()),
            preprint: None,
        };
        let got = source.fetch(&Query { seed: &seed, ids: &ids }).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].doi(), Some("10.1145/3600000.1"));
        assert_eq!(
            t.requests(),
            ["https://api.crossref.org/works/10.1145%2F3600000.1?mailto=me%40example.org"]
        );
    }

    #[test]
    fn doi_lookup_needs_doi() {
        let source = CrossrefDoi::new(Rc::new(Canned::new()), None);
        let seed = Seed::default();
        let ids = Identifiers::default();
        assert!(matches!(
            source.fetch(&Query { seed: &seed, ids: &ids }),
            Err(SourceError::NotApplicable)
        ));
    }

    #[test]
    fn title_search_returns_every_item() {
        let body = json!({"message": {"items": [
            {"type": "journal-article", "title": ["A"]},
            {"type": "journal-article", "title": ["B"]}
        ]}})
        .to_string();
        let t = Rc::new(Canned::new().route("api.crossref.org/works?", body));
        let source = CrossrefTitle::new(t.clone(), None);
        let seed = Seed {
            title: "A study".into(),
            authors: "J Smith, W Zhang".into(),
            ..Seed::default()
        };
        let ids = Identifiers::default();
        let got = source.fetch(&Query { seed: &seed, ids: &ids }).unwrap();
        assert_eq!(got.len(), 2);
        let requested = &t.requests()[0];
        assert!(requested.contains("query.title=A+study"));
        assert!(requested.contains("rows=5"));
        assert!(requested.contains("query.author=Smith"));
    }

    #[test]
    fn title_search_skips_doi_seeds_but_not_preprints() {
        let t = Rc::new(Canned::new().route("api.crossref.org/works?", r#"{"message": {"items": []}}"#));
        let source = CrossrefTitle::new(t.clone(), None);
        let seed = Seed {
            title: "Sparse Graph Transformers".into(),
            ..Seed::default()
        };
        let with_doi = Identifiers {
            doi: Some("10.1145/1".into()),
            preprint: None,
        };
        assert!(matches!(
            source.fetch(&Query { seed: &seed, ids: &with_doi }),
            Err(SourceError::NotApplicable)
        ));
        let preprint_only = Identifiers {
            doi: None,
            preprint: Some("2501.01234".into()),
        };
        assert!(source.fetch(&Query { seed: &seed, ids: &preprint_only }).unwrap().is_empty());
        assert_eq!(t.requests().len(), 1);
    }

    #[test]
    fn garbage_body_is_a_parse_error() {
        let t = Rc::new(Canned::new().route("crossref", "<html>rate limited</html>"));
        let source = CrossrefDoi::new(t, None);
        let seed = Seed::default();
        let ids = Identifiers {
            doi: Some("10.1145/1".into()),
            preprint: None,
        };
        assert!(matches!(
            source.fetch(&Query { seed: &seed, ids: &ids }),
            Err(SourceError::Parse(_))
        ));
    }
}
