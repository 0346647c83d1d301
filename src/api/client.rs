//! Authenticated HTTP client for the hub REST API
//!
//! Wraps reqwest::Client with base URL resolution and bearer token injection.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;

/// Per-request timeout. Sends have no delivery timeout beyond this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HubClient {
    http: reqwest::Client,
    base: url::Url,
    token: Option<String>,
}

impl HubClient {
    /// Load config from disk and build a client.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::with_config(&config)
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        let mut base = url::Url::parse(&config.server_url)
            .with_context(|| format!("Invalid server URL {}", config.server_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base,
            token: config.token.clone(),
        })
    }

    /// Resolve an API path (without leading slash) against the server URL.
    pub fn url(&self, path: &str) -> Result<url::Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid API path {}", path))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!("Hub GET {}", url);

        let resp = self
            .authorize(self.http.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("Hub GET {} failed", url))?;

        check_response(resp, url.as_str())
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// POST a JSON body and return the raw response.
    pub async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.url(path)?;
        tracing::debug!("Hub POST {}", url);

        let resp = self
            .authorize(self.http.post(url.clone()))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Hub POST {} failed", url))?;

        check_response(resp, url.as_str()).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'heronix-hub configure --token ...'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
