//! Raw feed retrieval from a remote endpoint or a local file.

mod client;

pub use client::{BasicClient, HttpClient};

use std::fmt;
use std::path::PathBuf;

use reqwest::header::{self, HeaderValue};
use tracing::debug;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("gtfs_rt_merge/", env!("CARGO_PKG_VERSION"));

/// Where a feed's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Remote(String),
    Local(PathBuf),
}

impl FeedSource {
    /// Builds a source from a descriptor and a locality flag.
    ///
    /// With `is_local` unset, descriptors starting with `http` are fetched
    /// over the network and anything else is read from disk.
    pub fn from_descriptor(descriptor: &str, is_local: bool) -> Self {
        if !is_local && descriptor.starts_with("http") {
            FeedSource::Remote(descriptor.to_string())
        } else {
            FeedSource::Local(PathBuf::from(descriptor))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Remote(url) => write!(f, "{url}"),
            FeedSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// GETs `url` through `client` and returns the binary body. Every request
/// carries the crate's user agent, whatever the client.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let mut req = reqwest::Request::new(reqwest::Method::GET, parsed);
    req.headers_mut()
        .insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

    let resp = client.execute(req).await?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: resp.status().as_u16(),
        });
    }

    Ok(resp.bytes().await?.to_vec())
}

/// Resolves a [`FeedSource`] into bytes, sharing one HTTP client across calls.
pub struct FeedFetcher {
    client: Box<dyn HttpClient>,
}

impl FeedFetcher {
    pub fn new(client: impl HttpClient + 'static) -> Self {
        Self {
            client: Box::new(client),
        }
    }

    #[tracing::instrument(skip(self, source), fields(source = %source))]
    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, FetchError> {
        let bytes = match source {
            FeedSource::Remote(url) => fetch_bytes(self.client.as_ref(), url).await?,
            FeedSource::Local(path) => {
                tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?
            }
        };
        debug!(bytes = bytes.len(), "Feed bytes received");
        Ok(bytes)
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new(BasicClient::new())
    }
}
