//! Reconcile a researcher's publication list into one canonical record per publication.

pub mod citekey;
pub mod config;
pub mod error;
pub mod identifier;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod seed;
pub mod similarity;
pub mod source;
pub mod validate;
