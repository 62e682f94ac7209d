use crate::{
    error::{Result, SourceError},
    record::{Candidate, EntryType},
    source::{Query, Source, publisher::candidate_from_bibtex},
    validate::Check,
};

/// The BibTeX entry the profile export carries for the seed, if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedBibtex;

impl Source for SeedBibtex {
    fn name(&self) -> &'static str {
        "seed-bibtex"
    }

    fn check(&self) -> Check {
        Check::Exact
    }

    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>> {
        let blob = query.seed.bibtex.trim();
        if !blob.contains('@') {
            return Err(SourceError::NotApplicable);
        }
        Ok(vec![candidate_from_bibtex(self.name(), blob)?])
    }
}

/// Last resort: a `misc` record built from the seed alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedRecord;

impl Source for SeedRecord {
    fn name(&self) -> &'static str {
        "seed"
    }

    fn check(&self) -> Check {
        Check::Exact
    }

    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>> {
        let seed = query.seed;
        if seed.title.trim().is_empty() {
            return Err(SourceError::NotApplicable);
        }
        let candidate = Candidate::new(self.name(), EntryType::Misc)
            .with("title", &seed.title)
            .with("author", &seed.bibtex_authors())
            .with("year", &seed.year)
            .with("howpublished", &seed.venue)
            .with("url", &seed.link);
        Ok(vec![candidate])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identifier::Identifiers, seed::Seed};

    #[test]
    fn minimal_record_from_seed() {
        let seed = Seed {
            title: "Notes on Graphs".into(),
            authors: "J Smith, W Zhang".into(),
            year: "2024".into(),
            venue: "Workshop on Graphs".into(),
            link: "https://example.org/notes".into(),
            ..Seed::default()
        };
        let ids = Identifiers::default();
        let c = SeedRecord.fetch(&Query { seed: &seed, ids: &ids }).unwrap().remove(0);
        assert_eq!(c.entry_type, EntryType::Misc);
        assert_eq!(c.get("author"), "J Smith and W Zhang");
        assert_eq!(c.get("howpublished"), "Workshop on Graphs");
        assert!(!c.fields.contains_key("journal"));
    }

    #[test]
    fn profile_bibtex_becomes_candidate() {
        let seed = Seed {
            title: "Notes on Graphs".into(),
            bibtex: "@inproceedings{smith2024notes, title = {Notes on Graphs}, \
                     booktitle = {Workshop on Graphs}, pages = {1--2}, year = {2024}}"
                .into(),
            ..Seed::default()
        };
        let ids = Identifiers::default();
        let c = SeedBibtex.fetch(&Query { seed: &seed, ids: &ids }).unwrap().remove(0);
        assert_eq!(c.source, "seed-bibtex");
        assert_eq!(c.entry_type, EntryType::InProceedings);
        assert_eq!(c.get("booktitle"), "Workshop on Graphs");
        assert!(c.get("pages").starts_with('1'));
    }

    #[test]
    fn missing_or_broken_bibtex() {
        let ids = Identifiers::default();
        let none = Seed::default();
        assert!(matches!(
            SeedBibtex.fetch(&Query { seed: &none, ids: &ids }),
            Err(SourceError::NotApplicable)
        ));
        let broken = Seed {
            bibtex: "@misc{".into(),
            ..Seed::default()
        };
        assert!(matches!(
            SeedBibtex.fetch(&Query { seed: &broken, ids: &ids }),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn untitled_seed_is_not_applicable() {
        let seed = Seed::default();
        let ids = Identifiers::default();
        assert!(matches!(
            SeedRecord.fetch(&Query { seed: &seed, ids: &ids }),
            Err(SourceError::NotApplicable)
        ));
    }
}
