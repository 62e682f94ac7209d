use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, bail};
use bibsync::{
    citekey::KeyStyle,
    config::Config,
    output::Format,
    validate::{DEFAULT_TITLE_THRESHOLD, DEFAULT_VENUE_THRESHOLD, Thresholds},
};
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile publications into one canonical citation file
    Resolve(ResolveArgs),
    /// Print the DOI and arXiv id found in each text
    Identify {
        #[arg(value_name = "TEXT", required = true)]
        text: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Seed files (JSON, JSON lines or BibTeX), identifiers, or titles
    #[arg(value_name = "SRC")]
    pub from: Vec<Source>,

    /// Author-profile id the seeds belong to
    #[arg(long, env = "SCHOLAR_ID")]
    pub author: Option<String>,

    /// Write here instead of standard output
    #[arg(short, long, env = "OUT_BIB")]
    pub out: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Bibtex)]
    pub format: Format,

    /// Contact address sent to Crossref
    #[arg(long, env = "CROSSREF_MAILTO")]
    pub mailto: Option<String>,

    /// Seconds to pause after each seed
    #[arg(long, env = "SLEEP_SEC", default_value_t = 1.0)]
    pub delay: f64,

    #[arg(long, default_value_t = DEFAULT_TITLE_THRESHOLD)]
    pub title_threshold: f64,

    #[arg(long, default_value_t = DEFAULT_VENUE_THRESHOLD)]
    pub venue_threshold: f64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 20)]
    pub timeout: u64,

    #[arg(long, value_enum, default_value_t = KeyStyle::Slug)]
    pub key_style: KeyStyle,

    /// Keep only publications from the last N years
    #[arg(long, env = "YEAR_WINDOW")]
    pub year_window: Option<u32>,

    /// Process at most this many seeds
    #[arg(long = "max", env = "SCHOLAR_MAX_PUBS")]
    pub max_seeds: Option<usize>,

    /// Sort the output by year, newest first
    #[arg(long)]
    pub newest_first: bool,

    /// Never touch the network; every record is built from its seed
    #[arg(long)]
    pub offline: bool,
}

impl ResolveArgs {
    pub fn config(&self) -> anyhow::Result<Config> {
        for (name, t) in [
            ("title", self.title_threshold),
            ("venue", self.venue_threshold),
        ] {
            if !(0.0..=1.0).contains(&t) {
                bail!("{name} threshold must be within [0, 1], got {t}");
            }
        }
        let delay = Duration::try_from_secs_f64(self.delay)
            .with_context(|| format!("invalid delay: {}", self.delay))?;
        Ok(Config {
            author_id: self.author.clone(),
            out: self.out.clone(),
            format: self.format,
            thresholds: Thresholds {
                title: self.title_threshold,
                venue: self.venue_threshold,
            },
            delay,
            mailto: self.mailto.clone().filter(|m| !m.trim().is_empty()),
            timeout: Duration::from_secs(self.timeout),
            key_style: self.key_style,
            year_window: self.year_window.filter(|w| *w > 0),
            max_seeds: self.max_seeds,
            newest_first: self.newest_first,
            ..Config::default()
        })
    }
}

#[derive(Clone, Debug)]
/// Defines where we can get seeds from, which can either be
///
/// - a single identifier or title, or
/// - a file of publications.
///
/// The latter will be treated as a list of the former.
pub enum Source {
    Identifier(String),
    File(PathBuf),
}

impl FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Is this a path?
        if let Ok(path) = fs::canonicalize(s) {
            Ok(Source::File(path))
        }
        // No? Must be an identifier then!
        else {
            Ok(Source::Identifier(s.to_string()))
        }
    }
}
