//! Adapters that turn a seed into candidate records.
//!
//! Adapters are tried in a fixed order by the pipeline. Each one either produces candidates,
//! declines with [`SourceError::NotApplicable`], or fails; failures never end the run.

use std::rc::Rc;

use crate::{
    error::Result, identifier::Identifiers, record::Candidate, seed::Seed, validate::Check,
};

pub mod arxiv;
pub mod crossref;
pub mod http;
pub mod publisher;
pub mod seed;

use self::{
    arxiv::{ArxivId, ArxivTitle},
    crossref::{CrossrefDoi, CrossrefTitle},
    http::Transport,
    publisher::PublisherExport,
    seed::{SeedBibtex, SeedRecord},
};

/// What an adapter gets to work with for one seed.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub seed: &'a Seed,
    pub ids: &'a Identifiers,
}

pub trait Source {
    /// Short provenance tag, e.g. `crossref-doi`.
    fn name(&self) -> &'static str;
    /// Validation the adapter's candidates must pass.
    fn check(&self) -> Check;
    fn fetch(&self, query: &Query<'_>) -> Result<Vec<Candidate>>;
}

/// The standard adapter chain, highest priority first.
pub fn default_sources(transport: Rc<dyn Transport>, mailto: Option<&str>) -> Vec<Box<dyn Source>> {
    let mailto = mailto.map(str::to_string);
    vec![
        Box::new(CrossrefDoi::new(transport.clone(), mailto.clone())),
        Box::new(PublisherExport::new(transport.clone())),
        Box::new(ArxivId::new(transport.clone())),
        Box::new(ArxivTitle::new(transport.clone())),
        Box::new(CrossrefTitle::new(transport, mailto)),
        Box::new(SeedBibtex),
        Box::new(SeedRecord),
    ]
}
