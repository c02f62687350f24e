//! HTTP tracker scrape client (BEP 48).
//!
//! The scrape URL is derived from the announce URL by the path convention:
//! the last path segment must start with `announce`, and that prefix is
//! replaced with `scrape`. Announce URLs that do not follow the convention
//! cannot be scraped. The binary info-hash travels percent-encoded in the
//! query string, and the response is a bencoded dictionary.
use std::time::Duration;

use percent_encoding::{percent_encode, NON_ALPHANUMERIC};
use serde_bencode::value::Value;
use swarmwatch_primitives::info_hash::InfoHash;
use tracing::debug;
use url::Url;

use super::Error;
use crate::core::scrape::TrackerScrape;

/// HTTP tracker scrape client.
pub struct Client {
    client: reqwest::Client,
}

impl Client {
    /// # Errors
    ///
    /// Will return an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| Error::Http { source })?;

        Ok(Self { client })
    }

    /// It scrapes one tracker for one swarm.
    ///
    /// # Errors
    ///
    /// Will return an error if the announce URL does not follow the scrape
    /// convention, if the request fails or times out, or if the response is
    /// not a valid scrape dictionary reporting the swarm.
    pub async fn scrape(&self, info_hash: &InfoHash, announce: &Url) -> Result<TrackerScrape, Error> {
        let url = scrape_url(announce, info_hash)?;

        debug!("Scraping HTTP tracker {url}");

        let response = self.client.get(url).send().await.map_err(|source| Error::Http { source })?;
        let body = response.bytes().await.map_err(|source| Error::Http { source })?;

        parse_scrape_response(info_hash, &body)
    }
}

/// It derives the scrape URL from an announce URL, keeping any existing
/// query parameters (private trackers carry passkeys there).
fn scrape_url(announce: &Url, info_hash: &InfoHash) -> Result<Url, Error> {
    let path = announce.path();

    let last_slash = path.rfind('/').ok_or_else(|| Error::UnscrapableAnnounce {
        reason: "the announce URL has no path".to_string(),
    })?;
    let last_segment = &path[last_slash + 1..];

    if !last_segment.starts_with("announce") {
        return Err(Error::UnscrapableAnnounce {
            reason: "the announce path does not follow the scrape convention".to_string(),
        });
    }

    let scrape_path = format!(
        "{}{}",
        &path[..=last_slash],
        last_segment.replacen("announce", "scrape", 1)
    );

    let mut url = announce.clone();
    url.set_path(&scrape_path);

    let bytes = info_hash.bytes();
    let encoded = percent_encode(&bytes, NON_ALPHANUMERIC).to_string();
    let query = match announce.query() {
        Some(existing) => format!("{existing}&info_hash={encoded}"),
        None => format!("info_hash={encoded}"),
    };
    url.set_query(Some(&query));

    Ok(url)
}

fn parse_scrape_response(info_hash: &InfoHash, bytes: &[u8]) -> Result<TrackerScrape, Error> {
    let value: Value = serde_bencode::from_bytes(bytes).map_err(|err| Error::UnexpectedResponse {
        reason: format!("invalid bencoding: {err}"),
    })?;

    let Value::Dict(top) = value else {
        return Err(Error::UnexpectedResponse {
            reason: "the response is not a dictionary".to_string(),
        });
    };

    if let Some(Value::Bytes(reason)) = top.get(b"failure reason".as_slice()) {
        return Err(Error::TrackerFailure {
            reason: String::from_utf8_lossy(reason).to_string(),
        });
    }

    let Some(Value::Dict(files)) = top.get(b"files".as_slice()) else {
        return Err(Error::UnexpectedResponse {
            reason: "the response has no files dictionary".to_string(),
        });
    };

    let Some(Value::Dict(stats)) = files.get(info_hash.bytes().as_slice()) else {
        return Err(Error::UnexpectedResponse {
            reason: "the tracker did not report the swarm".to_string(),
        });
    };

    Ok(TrackerScrape {
        seeders: require_int(stats, b"complete")?,
        leechers: require_int(stats, b"incomplete")?,
        completed: require_int(stats, b"downloaded")?,
    })
}

fn require_int(dict: &std::collections::HashMap<Vec<u8>, Value>, field: &[u8]) -> Result<i64, Error> {
    match dict.get(field) {
        Some(Value::Int(value)) => Ok(*value),
        Some(_) => Err(Error::UnexpectedResponse {
            reason: format!("field `{}` is not an integer", String::from_utf8_lossy(field)),
        }),
        None => Err(Error::UnexpectedResponse {
            reason: format!("missing field `{}`", String::from_utf8_lossy(field)),
        }),
    }
}
