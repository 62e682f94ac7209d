//! Seed-by-seed reconciliation: identify, query sources in order, validate, merge, key.

use std::{cmp::Reverse, collections::HashSet, fmt, rc::Rc, thread};

use tracing::{debug, info, warn};

use crate::{
    citekey::{CitekeyRegistry, KeyStyle, first_author_surname, make_key},
    config::Config,
    error::{PipelineError, SourceError},
    identifier::{
        Identifier, Identifiers, Recognize,
        arxiv::{Arxiv, mentions_arxiv},
    },
    merge::build_record,
    record::{Candidate, Record},
    seed::Seed,
    similarity::normalize,
    source::{Query, Source, default_sources, http::Transport},
    validate::Validator,
};

/// Where a seed's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    IdentifierResolved,
    SourceAttempted(usize),
    Validated,
    Merged,
    Keyed,
}

/// Why a seed was not processed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Duplicate,
    OutsideYearWindow,
    /// Neither a title nor an identifier to look up.
    Unresolvable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Duplicate => "duplicate",
            SkipReason::OutsideYearWindow => "outside year window",
            SkipReason::Unresolvable => "nothing to look up",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved { key: String, source: &'static str },
    Failed { stage: Stage, reason: String },
    Skipped(SkipReason),
}

/// State owned by one run: issued keys, seen seeds and the records produced so far.
#[derive(Debug, Default)]
pub struct RunContext {
    pub keys: CitekeyRegistry,
    seen: HashSet<String>,
    pub records: Vec<Record>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signature; `false` when it was already seen.
    fn mark_seen(&mut self, signature: String) -> bool {
        self.seen.insert(signature)
    }
}

/// The result of a whole run.
#[derive(Debug, Default)]
pub struct Run {
    pub records: Vec<Record>,
    pub resolved: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct Pipeline {
    sources: Vec<Box<dyn Source>>,
    validator: Validator,
    config: Config,
}

impl Pipeline {
    /// Pipeline over the standard source chain.
    pub fn new(config: Config, transport: Rc<dyn Transport>) -> Self {
        let sources = default_sources(transport, config.mailto.as_deref());
        Self::with_sources(config, sources)
    }

    pub fn with_sources(config: Config, sources: Vec<Box<dyn Source>>) -> Self {
        Pipeline {
            sources,
            validator: Validator::new(config.thresholds),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every seed in order. Per-seed failures are reported through `observe` and never
    /// end the run.
    pub fn run(
        &self,
        seeds: &[Seed],
        mut observe: impl FnMut(&Seed, &Outcome),
    ) -> Result<Run, PipelineError> {
        if seeds.is_empty() {
            return Err(PipelineError::NoSeeds);
        }
        let limit = self.config.max_seeds.unwrap_or(seeds.len());
        let mut ctx = RunContext::new();
        let mut run = Run::default();

        for seed in seeds.iter().take(limit) {
            let outcome = self.process(seed, &mut ctx);
            match &outcome {
                Outcome::Resolved { key, source } => {
                    info!(title = %seed.title, key, source, "resolved");
                    run.resolved += 1;
                }
                Outcome::Failed { stage, reason } => {
                    warn!(title = %seed.title, ?stage, reason, "dropping seed");
                    run.failed += 1;
                }
                Outcome::Skipped(reason) => {
                    debug!(title = %seed.title, %reason, "skipping seed");
                    run.skipped += 1;
                }
            }
            observe(seed, &outcome);
            if !matches!(outcome, Outcome::Skipped(_)) && !self.config.delay.is_zero() {
                thread::sleep(self.config.delay);
            }
        }

        run.records = ctx.records;
        if self.config.newest_first {
            run.records.sort_by_key(|r| Reverse(r.year()));
        }
        Ok(run)
    }

    fn process(&self, seed: &Seed, ctx: &mut RunContext) -> Outcome {
        if !seed.is_resolvable() {
            return Outcome::Skipped(SkipReason::Unresolvable);
        }
        if !self.in_year_window(seed) {
            return Outcome::Skipped(SkipReason::OutsideYearWindow);
        }
        let ids = Identifiers::scan(seed);
        if !ctx.mark_seen(signature(seed, &ids)) {
            return Outcome::Skipped(SkipReason::Duplicate);
        }

        match self.resolve(seed, &ids, ctx) {
            Ok(record) => {
                if let Some(doi) = record.get("doi") {
                    ctx.mark_seen(format!("doi:{}", doi.to_ascii_lowercase()));
                }
                let outcome = Outcome::Resolved {
                    key: record.id.clone(),
                    source: record.source,
                };
                ctx.records.push(record);
                outcome
            }
            Err((stage, reason)) => Outcome::Failed { stage, reason },
        }
    }

    /// Resolve one seed into a keyed record.
    pub fn resolve(
        &self,
        seed: &Seed,
        ids: &Identifiers,
        ctx: &mut RunContext,
    ) -> Result<Record, (Stage, String)> {
        debug!(title = %seed.title, doi = ?ids.doi, preprint = ?ids.preprint, "identifiers");
        if ids.preprint.is_none() && mentions_arxiv(&seed.venue) {
            debug!(title = %seed.title, "venue mentions arXiv but no id was found");
        }

        let mut stage = Stage::IdentifierResolved;
        let candidate = self
            .select(seed, ids, &mut stage)
            .ok_or_else(|| (stage, "no source produced an acceptable record".to_string()))?;

        if let (Some(seed_doi), Some(found)) = (ids.doi.as_deref(), candidate.doi())
            && !seed_doi.eq_ignore_ascii_case(found)
        {
            let conflict = SourceError::IdentifierConflict {
                seed: seed_doi.to_string(),
                candidate: found.to_string(),
            };
            warn!(title = %seed.title, source = candidate.source, "{conflict}; keeping candidate");
        }

        let fields = build_record(&candidate, seed);
        debug!(title = %seed.title, stage = ?Stage::Merged, fields = fields.len());

        let base = match (self.config.key_style, fields.get("doi")) {
            (KeyStyle::Doi, Some(doi)) => doi.clone(),
            _ => make_key(
                fields.get("author").and_then(|a| first_author_surname(a)),
                fields.get("year").map(String::as_str).unwrap_or_default(),
                fields.get("title").map(String::as_str).unwrap_or_default(),
            ),
        };
        let id = ctx.keys.unique(&base);
        debug!(key = %id, stage = ?Stage::Keyed);

        Ok(Record {
            entry_type: candidate.entry_type,
            id,
            fields,
            source: candidate.source,
        })
    }

    /// Try each source in priority order and return the first acceptable candidate.
    fn select(&self, seed: &Seed, ids: &Identifiers, stage: &mut Stage) -> Option<Candidate> {
        let query = Query { seed, ids };
        for (n, source) in self.sources.iter().enumerate() {
            *stage = Stage::SourceAttempted(n);
            let candidates = match source.fetch(&query) {
                Ok(candidates) => candidates,
                Err(SourceError::NotApplicable) => {
                    debug!(title = %seed.title, source = source.name(), "not applicable");
                    continue;
                }
                Err(e) => {
                    warn!(title = %seed.title, source = source.name(), error = %e, "source failed");
                    continue;
                }
            };

            let mut best: Option<(f64, Candidate)> = None;
            for candidate in candidates {
                let Some(score) = self.validator.score(source.check(), seed, &candidate) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(s, _)| score > *s) {
                    best = Some((score, candidate));
                }
            }
            match best {
                Some((score, candidate)) => {
                    debug!(title = %seed.title, source = source.name(), score, stage = ?Stage::Validated, "accepted");
                    return Some(candidate);
                }
                None => {
                    debug!(title = %seed.title, source = source.name(), error = %SourceError::NoMatch, "rejected");
                }
            }
        }
        None
    }

    fn in_year_window(&self, seed: &Seed) -> bool {
        let Some(window) = self.config.year_window else {
            return true;
        };
        let current = self.config.current_year;
        seed.year
            .trim()
            .get(..4)
            .and_then(|y| y.parse::<i32>().ok())
            .is_some_and(|y| y <= current && y > current - window as i32)
    }
}

/// Duplicate-detection key: DOI, else preprint id, else normalised title.
fn signature(seed: &Seed, ids: &Identifiers) -> String {
    match ids.primary() {
        Identifier::Doi(doi) => format!("doi:{}", doi.to_ascii_lowercase()),
        Identifier::Preprint(id) => match Arxiv::parse(&id) {
            Some(a) => format!("arxiv:{}", a.id()),
            None => format!("arxiv:{id}"),
        },
        Identifier::None => format!("title:{}", normalize(&seed.title)),
    }
}
