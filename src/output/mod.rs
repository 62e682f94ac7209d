//! Serializers for the records of a run.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::record::Record;

pub mod bibtex;
pub mod typescript;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// BibTeX entries
    #[default]
    Bibtex,
    /// A TypeScript `publications` constant
    #[value(name = "ts", alias = "typescript")]
    Ts,
}

/// Render `records` in insertion order.
pub fn render(records: &[Record], format: Format, generated_at: DateTime<Utc>) -> String {
    let stamp = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    match format {
        Format::Bibtex => bibtex::render(records, &stamp),
        Format::Ts => typescript::render(records, &stamp),
    }
}
