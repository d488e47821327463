//! Bundle fetching
//!
//! The registry never talks to the network directly: it asks a [`Fetcher`]
//! for the body at a URL. [`HttpFetcher`] performs a plain HTTP GET with
//! reqwest; tests substitute their own implementation.

use crate::bundle::Bundle;
use crate::config::FetchConfig;
use crate::error::{LoadError, LoadResult};
use async_trait::async_trait;

/// Source of bundle text
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body at `url`; only a success status yields text
    async fn fetch(&self, url: &str) -> LoadResult<String>;
}

/// Fetch `url` and parse the body as a bundle
pub async fn load_bundle(fetcher: &dyn Fetcher, url: &str) -> LoadResult<Bundle> {
    let body = fetcher.fetch(url).await?;

    Bundle::from_json(&body).map_err(|e| LoadError::InvalidBundle {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// HTTP GET fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from client settings
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone());

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LoadResult<String> {
        log::debug!("Fetching translations from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| LoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
