//! Accept or reject a candidate as a match for a seed.

use tracing::trace;

use crate::{
    record::Candidate,
    seed::Seed,
    similarity::{similarity, token_set_similarity},
};

pub const DEFAULT_TITLE_THRESHOLD: f64 = 0.88;
pub const DEFAULT_VENUE_THRESHOLD: f64 = 0.45;

const TITLE_WEIGHT: f64 = 0.75;
const VENUE_WEIGHT: f64 = 0.25;

/// How much validation a source's candidates need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Looked up by an exact identifier; accepted as is.
    Exact,
    /// Found by title search on a source without reliable venues; title rule only.
    Title,
    /// Found by title search; title, year and venue rules.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub title: f64,
    pub venue: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            title: DEFAULT_TITLE_THRESHOLD,
            venue: DEFAULT_VENUE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    pub thresholds: Thresholds,
}

impl Validator {
    pub fn new(thresholds: Thresholds) -> Self {
        Validator { thresholds }
    }

    /// Full validation: title similarity, exact year, and venue overlap when the seed has one.
    pub fn accept(&self, seed: &Seed, candidate: &Candidate) -> bool {
        self.score(Check::Full, seed, candidate).is_some()
    }

    /// Ranking score of an accepted candidate, or `None` when it is rejected.
    pub fn score(&self, check: Check, seed: &Seed, candidate: &Candidate) -> Option<f64> {
        if check == Check::Exact {
            return Some(1.0);
        }

        let title = similarity(&seed.title, candidate.title());
        if title < self.thresholds.title {
            trace!(title = candidate.title(), score = title, "title below threshold");
            return None;
        }
        if check == Check::Title {
            return Some(title);
        }

        let seed_year = seed.year.trim();
        if !seed_year.is_empty() && seed_year != candidate.year() {
            trace!(seed_year, candidate_year = candidate.year(), "year mismatch");
            return None;
        }

        let venue = if seed.venue.trim().is_empty() {
            0.0
        } else {
            let v = token_set_similarity(&seed.venue, candidate.venue());
            if v < self.thresholds.venue {
                trace!(venue = candidate.venue(), score = v, "venue below threshold");
                return None;
            }
            v
        };

        Some(TITLE_WEIGHT * title + VENUE_WEIGHT * venue)
    }
}
