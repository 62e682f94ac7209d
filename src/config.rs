//! Run configuration, filled from CLI flags and environment variables.

use std::{path::PathBuf, time::Duration};

use crate::{
    citekey::KeyStyle, output::Format, source::http::DEFAULT_TIMEOUT, validate::Thresholds,
};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Config {
    /// Opaque author-profile id; only logged.
    pub author_id: Option<String>,
    /// Output file; standard output when unset.
    pub out: Option<PathBuf>,
    pub format: Format,
    pub thresholds: Thresholds,
    /// Pause after every seed that was looked up, resolved or not.
    pub delay: Duration,
    /// Contact address for Crossref's polite pool.
    pub mailto: Option<String>,
    pub timeout: Duration,
    pub key_style: KeyStyle,
    /// Keep only seeds from the last N years, the current one included.
    pub year_window: Option<u32>,
    pub max_seeds: Option<usize>,
    pub newest_first: bool,
    /// Reference year for the year window.
    pub current_year: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            author_id: None,
            out: None,
            format: Format::default(),
            thresholds: Thresholds::default(),
            delay: DEFAULT_DELAY,
            mailto: None,
            timeout: DEFAULT_TIMEOUT,
            key_style: KeyStyle::default(),
            year_window: None,
            max_seeds: None,
            newest_first: false,
            current_year: current_year(),
        }
    }
}

fn current_year() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year()
}
