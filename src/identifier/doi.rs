use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

use crate::identifier::Recognize;

/// Characters left alone when a DOI is embedded as a single path segment or query value.
const DOI_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A DOI found somewhere in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doi<'a> {
    name: &'a str,
    prefix: &'a str,
}

impl<'a> Recognize<'a> for Doi<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        // Case-insensitive, based on Crossref guidance. The trailing \b keeps prose punctuation
        // such as "." or ")" out of the suffix.
        static DOI_ANYWHERE_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)\b(10\.\d{4,9})/([-._;()/:A-Z0-9]+)\b").expect("valid DOI regex")
        });

        let caps = DOI_ANYWHERE_RE.captures(text)?;
        Some(Doi {
            name: caps.get(0)?.as_str(),
            prefix: caps.get(1)?.as_str(),
        })
    }

    fn canonical(&self) -> String {
        self.name.to_string()
    }
}

impl<'a> Doi<'a> {
    /// Registrant prefix, e.g. `10.1145`.
    pub fn prefix(&self) -> &'a str {
        self.prefix
    }
}

/// Percent-encode a whole DOI, slash included, for use as one URL path segment.
pub fn encode_segment(doi: &str) -> String {
    utf8_percent_encode(doi, DOI_SEGMENT_ENCODE_SET).to_string()
}

/// `https://doi.org/<doi>`, the canonical resolver URL for a record.
pub fn resolver_url(doi: &str) -> String {
    format!("https://doi.org/{doi}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::Strategy;

    fn doi_suffix_char() -> impl Strategy<Value = char> {
        let letters = proptest::sample::select(
            ('A'..='Z').chain('a'..='z').chain('0'..='9').collect::<Vec<_>>(),
        );
        let punct = proptest::sample::select(vec!['-', '.', '_', ';', '(', ')', '/', ':']);
        proptest::prop_oneof![3 => letters, 1 => punct]
    }

    // Suffixes end in an alphanumeric so the trailing word boundary sits after the whole suffix.
    fn doi_core() -> impl Strategy<Value = (String, String, String)> {
        let last = proptest::sample::select(('a'..='z').chain('0'..='9').collect::<Vec<_>>());
        (
            "[0-9]{4,9}",
            proptest::collection::vec(doi_suffix_char(), 0..48),
            last,
        )
            .prop_map(|(digits, body, last)| {
                let prefix = format!("10.{digits}");
                let mut suffix: String = body.into_iter().collect();
                suffix.push(last);
                (format!("{prefix}/{suffix}"), prefix, suffix)
            })
    }

    #[test]
    fn finds_doi_in_prose_and_urls() {
        proptest::proptest!(|(t in doi_core(), trail in "[.,;:)\\]'\"]?")| {
            let (full, prefix, _) = t;
            for text in [
                format!("see doi:{full}{trail}"),
                format!("https://doi.org/{full}"),
                format!("Proc. FooConf, 2025. {full}{trail} (accepted)"),
            ] {
                let d = Doi::parse(&text).expect("embedded DOI");
                proptest::prop_assert_eq!(d.prefix(), prefix.as_str());
                proptest::prop_assert_eq!(d.canonical(), full.clone());
            }
        })
    }

    #[test]
    fn first_of_several_wins() {
        let d = Doi::parse("10.1145/3600000.1 and 10.1007/978-3-031-1_2").unwrap();
        assert_eq!(d.canonical(), "10.1145/3600000.1");
    }

    #[test]
    fn rejects_text_without_registrant() {
        proptest::proptest!(|(s in "[A-Za-z0-9 _-]{1,64}")| {
            proptest::prop_assume!(!s.contains("10."));
            proptest::prop_assert!(Doi::parse(&s).is_none());
        })
    }

    #[test]
    fn short_registrant_is_not_a_doi() {
        assert!(Doi::parse("10.123/abc").is_none());
    }

    #[test]
    fn encodes_slash_for_path_segment() {
        assert_eq!(encode_segment("10.1145/3600000.1"), "10.1145%2F3600000.1");
        assert_eq!(
            encode_segment("10.1002/(SICI)1097-4571"),
            "10.1002%2F%28SICI%291097-4571"
        );
    }
}
