//! Tracker scrape clients.
//!
//! A swarm's announce URLs decide the transport: `udp://` trackers are
//! scraped with the BEP 15 binary protocol, `http://` and `https://`
//! trackers with a BEP 48 scrape request. [`Client`] dispatches on the
//! scheme and is the production implementation of the core's
//! [`TrackerScraper`] capability.
pub mod http;
pub mod udp;

use std::time::Duration;

use async_trait::async_trait;
use swarmwatch_primitives::info_hash::InfoHash;
use url::Url;

use crate::core::scrape::{ScrapeError, TrackerScrape, TrackerScraper};

/// Error returned by the tracker scrape clients.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("the announce URL cannot be scraped: {reason}")]
    UnscrapableAnnounce { reason: String },

    #[error("unsupported tracker scheme `{scheme}`")]
    UnsupportedScheme { scheme: String },

    #[error("timed out waiting for the tracker")]
    Timeout,

    #[error("I/O failure talking to the tracker: {source}")]
    Io { source: std::io::Error },

    #[error("HTTP request failed: {source}")]
    Http { source: reqwest::Error },

    #[error("unexpected response from the tracker: {reason}")]
    UnexpectedResponse { reason: String },

    #[error("the tracker reported a failure: {reason}")]
    TrackerFailure { reason: String },
}

/// Scheme-dispatching tracker scrape client.
pub struct Client {
    http: http::Client,
    udp: udp::Client,
}

impl Client {
    /// It builds one client for each supported transport, sharing the same
    /// externally configured timeout.
    ///
    /// # Errors
    ///
    /// Will return an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration, bind_port: u16) -> Result<Self, Error> {
        Ok(Self {
            http: http::Client::new(timeout)?,
            udp: udp::Client::new(timeout, bind_port),
        })
    }
}

#[async_trait]
impl TrackerScraper for Client {
    async fn scrape(&self, info_hash: &InfoHash, announce: &Url) -> Result<TrackerScrape, ScrapeError> {
        let result = match announce.scheme() {
            "udp" => self.udp.scrape(info_hash, announce).await,
            "http" | "https" => self.http.scrape(info_hash, announce).await,
            scheme => Err(Error::UnsupportedScheme {
                scheme: scheme.to_string(),
            }),
        };

        result.map_err(|err| ScrapeError::new(format!("{announce}: {err}")))
    }
}
