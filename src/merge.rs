//! Non-destructive field merging.
//!
//! Everything here is a pure function over field maps so it can be tested without any network
//! code. A populated field is never replaced unless the patch explicitly asks to overwrite, and
//! only `url` and `id` are ever overwritten by the pipeline.

use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::{Captures, Regex};

use crate::{
    identifier::doi::resolver_url,
    record::{Candidate, EntryType, Fields},
    seed::Seed,
};

/// One field value to merge into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch<'a> {
    pub field: &'a str,
    pub value: &'a str,
    pub overwrite: bool,
}

impl<'a> Patch<'a> {
    /// Set the field only when it is absent or empty.
    pub fn fill(field: &'a str, value: &'a str) -> Self {
        Patch {
            field,
            value,
            overwrite: false,
        }
    }

    /// Replace the field even when it is populated.
    pub fn overwrite(field: &'a str, value: &'a str) -> Self {
        Patch {
            field,
            value,
            overwrite: true,
        }
    }
}

/// Apply `patches` in order. Empty values in `base` are dropped; patch values are cleaned and
/// skipped when they clean down to nothing.
pub fn merge(mut base: Fields, patches: &[Patch<'_>]) -> Fields {
    base.retain(|_, v| !v.trim().is_empty());
    for patch in patches {
        let value = clean_value(patch.value);
        if value.is_empty() {
            continue;
        }
        let field = patch.field.to_ascii_lowercase();
        if patch.overwrite || !base.contains_key(&field) {
            base.insert(field, value);
        }
    }
    base
}

/// Fill the venue from a fallback string, but only when the record has no venue of its own.
///
/// The target field follows the entry type. A `howpublished` value already plays the venue role
/// for `misc` records, so it also blocks the patch.
pub fn patch_venue(fields: Fields, entry_type: EntryType, venue: &str) -> Fields {
    if ["journal", "booktitle", "howpublished"]
        .iter()
        .any(|f| fields.contains_key(*f))
    {
        return fields;
    }
    let target = if entry_type.uses_booktitle() {
        "booktitle"
    } else {
        "journal"
    };
    merge(fields, &[Patch::fill(target, venue)])
}

/// Point `url` at the DOI resolver whenever a DOI is known.
pub fn canonicalize_doi(fields: Fields) -> Fields {
    let Some(doi) = fields.get("doi").cloned() else {
        return fields;
    };
    let url = resolver_url(&doi);
    merge(fields, &[Patch::overwrite("url", &url)])
}

/// Merge an accepted candidate with the seed's own knowledge.
pub fn build_record(candidate: &Candidate, seed: &Seed) -> Fields {
    let authors = seed.bibtex_authors();
    let fields = merge(
        candidate.fields.clone(),
        &[
            Patch::fill("title", &seed.title),
            Patch::fill("author", &authors),
            Patch::fill("year", &seed.year),
            Patch::fill("url", &seed.link),
        ],
    );
    let fields = patch_venue(fields, candidate.entry_type, &seed.venue);
    canonicalize_doi(fields)
}

/// Normalise a field value: decode entities, strip markup, collapse whitespace.
///
/// XML and HTML5 named entities and numeric references are decoded one at a time; anything that
/// is not a known entity is kept as written.
pub fn clean_value(raw: &str) -> String {
    static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
    static ENTITY_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("valid entity regex"));

    let decoded = ENTITY_RE.replace_all(raw, |caps: &Captures<'_>| {
        let entity = &caps[0];
        unescape_with(entity, resolve_html5_entity)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| entity.to_string())
    });
    let stripped = TAG_RE.replace_all(&decoded, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fill_only_touches_missing_fields() {
        let base = fields(&[("title", "Kept"), ("year", "")]);
        let out = merge(
            base,
            &[
                Patch::fill("title", "Replaced"),
                Patch::fill("year", "2025"),
                Patch::fill("Journal", " FooConf "),
            ],
        );
        assert_eq!(out["title"], "Kept");
        assert_eq!(out["year"], "2025");
        assert_eq!(out["journal"], "FooConf");
    }

    #[test]
    fn overwrite_replaces() {
        let out = merge(
            fields(&[("url", "http://dx.doi.org/10.1/x")]),
            &[Patch::overwrite("url", "https://doi.org/10.1/x")],
        );
        assert_eq!(out["url"], "https://doi.org/10.1/x");
    }

    #[test]
    fn empty_patches_are_dropped() {
        let out = merge(Fields::new(), &[Patch::fill("abstract", "  <p> </p> ")]);
        assert!(out.is_empty());
    }

    #[test]
    fn venue_goes_to_booktitle_for_proceedings() {
        let out = patch_venue(Fields::new(), EntryType::InProceedings, "FooConf '25");
        assert_eq!(out["booktitle"], "FooConf '25");
        let out = patch_venue(Fields::new(), EntryType::Article, "J. Foo");
        assert_eq!(out["journal"], "J. Foo");
    }

    #[test]
    fn venue_patch_needs_both_absent() {
        let out = patch_venue(
            fields(&[("booktitle", "Full Proceedings Title")]),
            EntryType::Article,
            "Full Proc…",
        );
        assert!(!out.contains_key("journal"));
    }

    #[test]
    fn doi_canonicalises_url() {
        let out = canonicalize_doi(fields(&[("doi", "10.1145/1"), ("url", "https://dl.acm.org/x")]));
        assert_eq!(out["url"], "https://doi.org/10.1145/1");
    }

    #[test]
    fn clean_value_decodes_and_strips() {
        assert_eq!(
            clean_value("<jats:p>Graphs &amp; <i>trees</i>\n\tcompared</jats:p>"),
            "Graphs & trees compared"
        );
        assert_eq!(clean_value("AT&T labs"), "AT&T labs");
    }

    #[test]
    fn clean_value_decodes_html_entities() {
        assert_eq!(
            clean_value("Caf&eacute; &amp; bar&nbsp;<i>x</i>"),
            "Caf\u{e9} & bar x"
        );
        assert_eq!(clean_value("G&ouml;del &#8211; &#x00e9;"), "G\u{f6}del \u{2013} \u{e9}");
        assert_eq!(clean_value("&bogus; &amp; more"), "&bogus; & more");
    }

    #[test]
    fn build_record_uses_seed_fallbacks() {
        let cand = Candidate::new("crossref-doi", EntryType::InProceedings)
            .with("title", "Authoritative Title")
            .with("doi", "10.1145/3600000.1");
        let seed = Seed {
            title: "authoritative title…".into(),
            authors: "J Smith, W Zhang".into(),
            year: "2025".into(),
            venue: "FooConf '25".into(),
            link: "https://scholar.example/x".into(),
            ..Seed::default()
        };
        let out = build_record(&cand, &seed);
        assert_eq!(out["title"], "Authoritative Title");
        assert_eq!(out["author"], "J Smith and W Zhang");
        assert_eq!(out["year"], "2025");
        assert_eq!(out["booktitle"], "FooConf '25");
        assert_eq!(out["url"], "https://doi.org/10.1145/3600000.1");
    }

    #[test]
    fn merge_is_non_destructive() {
        let field = proptest::sample::select(vec!["title", "author", "year", "journal", "doi"]);
        proptest::proptest!(|(
            base in proptest::collection::btree_map(field.clone(), "[A-Za-z0-9 ]{1,12}", 0..5),
            patches in proptest::collection::vec((field, "[A-Za-z0-9 <>&;]{0,12}"), 0..8),
        )| {
            let base: Fields = base
                .into_iter()
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            let patches: Vec<Patch<'_>> =
                patches.iter().map(|(f, v)| Patch::fill(f, v.as_str())).collect();
            let out = merge(base.clone(), &patches);
            for (k, v) in &base {
                proptest::prop_assert_eq!(out.get(k), Some(v));
            }
            proptest::prop_assert!(out.values().all(|v| !v.trim().is_empty()));
        })
    }
}
