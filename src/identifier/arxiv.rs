use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifier::Recognize;

/// An arXiv identifier, normalised to its canonical id and optional version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arxiv<'a> {
    /// Canonical arXiv ID without version (e.g., "1810.04805" or "astro-ph/0603274").
    canonical_id: &'a str,
    /// Explicit version number when present in the input (e.g., Some("2")).
    version: Option<&'a str>,
}

// new-style: YYMM.NNNN(N) with optional vN; legacy: archive(.SUB)?/NNNNNNN with optional vN
const ID: &str = r"(?P<core>\d{4}\.\d{4,5}|[A-Za-z-]+(?:\.[A-Za-z-]+)?/\d{7})(?:v(?P<v>\d+))?";

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:arxiv\.org|xxx\.lanl\.gov)/(?:abs|pdf)/{ID}(?:\.pdf)?\b"
    ))
    .expect("valid arXiv URL regex")
});
static PREFIXED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\barxiv:\s*{ID}\b")).expect("valid arXiv prefix regex")
});
static DATACITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b10\.48550/arxiv\.(?P<core>\d{4}\.\d{4,5})(?:v(?P<v>\d+))?\b")
        .expect("valid arXiv DOI regex")
});
static BARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{ID}$")).expect("valid bare arXiv regex"));

impl<'a> Recognize<'a> for Arxiv<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        // Ordering matters: a URL or explicit prefix anywhere in the text beats a bare id, and a
        // bare id is only accepted when it is the whole (trimmed) text.
        [&*URL_RE, &*PREFIXED_RE, &*DATACITE_RE]
            .into_iter()
            .find_map(|re| re.captures(text))
            .or_else(|| BARE_RE.captures(text.trim().trim_matches('/')))
            .and_then(|c| {
                let core = c.name("core")?.as_str();
                Some(Arxiv {
                    canonical_id: core,
                    version: c.name("v").map(|m| m.as_str()),
                })
            })
    }

    fn canonical(&self) -> String {
        match self.version {
            Some(v) => format!("{}v{}", self.canonical_id, v),
            None => self.canonical_id.to_string(),
        }
    }
}

impl<'a> Arxiv<'a> {
    pub fn id(&self) -> &'a str {
        self.canonical_id
    }

    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.canonical_id)
    }
}

/// Whether the text mentions arXiv at all, e.g. a venue string like "arXiv preprint".
pub fn mentions_arxiv(text: &str) -> bool {
    static WORD_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\barxiv\b").expect("valid arXiv word regex"));
    WORD_RE.is_match(text)
}
