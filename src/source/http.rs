//! Blocking HTTP transport for the source adapters.

use std::{cell::RefCell, time::Duration};

use tracing::debug;
use url::Url;

use crate::error::{Result, SourceError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetch a URL and return its body. Any non-success status is [`SourceError::Unavailable`].
pub trait Transport {
    fn get(&self, url: &Url, accept: Option<&str>) -> Result<String>;
}

/// `ureq`-backed transport with connect and overall timeouts.
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(timeout: Duration, mailto: Option<&str>) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_connect(Some(timeout.min(Duration::from_secs(5))))
            .timeout_global(Some(timeout))
            .build();
        let user_agent = match mailto {
            Some(email) => format!(
                "bibsync/{} (mailto:{email})",
                env!("CARGO_PKG_VERSION")
            ),
            None => format!("bibsync/{}", env!("CARGO_PKG_VERSION")),
        };
        HttpClient {
            agent: ureq::Agent::new_with_config(cfg),
            user_agent,
        }
    }
}

impl Transport for HttpClient {
    fn get(&self, url: &Url, accept: Option<&str>) -> Result<String> {
        debug!(%url, "GET");
        let mut req = self
            .agent
            .get(url.as_str())
            .header("User-Agent", &self.user_agent);
        if let Some(accept) = accept {
            req = req.header("Accept", accept);
        }
        req.call()
            .map_err(|e| SourceError::Unavailable(format!("{url}: {e}")))?
            .into_body()
            .read_to_string()
            .map_err(|e| SourceError::Unavailable(format!("{url}: failed to read body: {e}")))
    }
}

/// Transport that refuses every request, so only seed-derived records are produced.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl Transport for Offline {
    fn get(&self, url: &Url, _accept: Option<&str>) -> Result<String> {
        Err(SourceError::Unavailable(format!("offline: {url}")))
    }
}

/// In-memory transport serving fixed bodies for URLs containing a given fragment.
///
/// Routes are matched in insertion order. Every requested URL is recorded.
#[derive(Debug, Default)]
pub struct Canned {
    routes: Vec<(String, String)>,
    requests: RefCell<Vec<String>>,
}

impl Canned {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: impl Into<String>, body: impl Into<String>) -> Self {
        self.routes.push((fragment.into(), body.into()));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Transport for Canned {
    fn get(&self, url: &Url, _accept: Option<&str>) -> Result<String> {
        self.requests.borrow_mut().push(url.to_string());
        self.routes
            .iter()
            .find(|(fragment, _)| url.as_str().contains(fragment.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| SourceError::Unavailable(format!("{url}: 404 Not Found")))
    }
}
