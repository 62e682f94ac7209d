//! Error types shared by the reconciliation pipeline.
//!
//! Source failures are always local to one seed: the orchestrator logs them and moves on to the
//! next source. Only [`PipelineError`] can end a run.

use thiserror::Error;

/// Why a single source could not produce an acceptable candidate.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has nothing to work with for this seed (no DOI, no preprint id, ...).
    #[error("not applicable")]
    NotApplicable,

    /// Transport or HTTP failure, including timeouts.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The payload came back but could not be turned into fields.
    #[error("parse failure: {0}")]
    Parse(String),

    /// Every candidate returned by the source was rejected.
    #[error("no candidate matched the seed")]
    NoMatch,

    /// An accepted candidate carries a different DOI than the one found on the seed.
    #[error("identifier conflict: seed has {seed}, candidate has {candidate}")]
    IdentifierConflict { seed: String, candidate: String },
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(e: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML parse error: {e}"))
    }
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no seeds to process")]
    NoSeeds,

    /// The seed source could not be read.
    #[error("failed to read seeds from {origin}: {reason}")]
    Input { origin: String, reason: String },
}

pub type Result<T, E = SourceError> = std::result::Result<T, E>;
