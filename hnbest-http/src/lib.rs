//! hnbest-http
//!
//! The raw [`Transport`] that talks to the Hacker News Firebase API over HTTPS.
//! It performs exactly one GET per call and applies the per-call deadline; all
//! resilience policies live in `hnbest-middleware`.
#![warn(missing_docs)]

use std::time::Duration;

use async_trait::async_trait;
use hnbest_core::{HnError, Transport, TransportConfig, UpstreamRequest, UpstreamResponse};
use url::Url;

const NAME: &str = "hn-http";

/// HTTP transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HnHttpTransport {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl HnHttpTransport {
    /// Start building a transport with the default base URL and timeout.
    #[must_use]
    pub fn builder() -> HnHttpTransportBuilder {
        HnHttpTransportBuilder::default()
    }

    /// Build a transport from the outbound channel settings.
    ///
    /// # Errors
    /// Returns `HnError::InvalidArg` if the base URL does not parse, or
    /// `HnError::Other` if the HTTP client cannot be constructed.
    pub fn try_new(config: &TransportConfig) -> Result<Self, HnError> {
        Self::builder()
            .base_url(config.base_url.clone())
            .timeout(config.timeout)
            .build()
    }

    /// Base URL that request paths are joined onto.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn map_send_error(&self, req: &UpstreamRequest, err: &reqwest::Error) -> HnError {
        if err.is_timeout() {
            HnError::timeout(req.path(), self.timeout)
        } else {
            HnError::connection(NAME, err.to_string())
        }
    }
}

/// Builder for [`HnHttpTransport`].
#[derive(Debug)]
pub struct HnHttpTransportBuilder {
    base_url: String,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl Default for HnHttpTransportBuilder {
    fn default() -> Self {
        let defaults = TransportConfig::default();
        Self {
            base_url: defaults.base_url,
            timeout: defaults.timeout,
            client: None,
        }
    }
}

impl HnHttpTransportBuilder {
    /// Absolute base URL. A trailing slash is added if missing.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Deadline for a single call, body included.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured client instead of the default one.
    #[must_use]
    pub fn custom_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Finish the transport.
    ///
    /// # Errors
    /// Returns `HnError::InvalidArg` if the base URL does not parse or cannot
    /// carry paths, or `HnError::Other` if the HTTP client cannot be built.
    pub fn build(self) -> Result<HnHttpTransport, HnError> {
        let mut raw = self.base_url;
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw)
            .map_err(|e| HnError::InvalidArg(format!("base url {raw:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(HnError::InvalidArg(format!(
                "base url {raw:?} cannot carry paths"
            )));
        }
        let client = match self.client {
            Some(c) => c,
            None => reqwest::Client::builder()
                .user_agent(concat!("hnbest/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| HnError::Other(e.to_string()))?,
        };
        Ok(HnHttpTransport {
            client,
            base,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl Transport for HnHttpTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "hnbest::http::send",
            skip(self, req),
            fields(path = %req.path()),
        )
    )]
    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        let url = self
            .base
            .join(req.path())
            .map_err(|e| HnError::InvalidArg(format!("path {:?}: {e}", req.path())))?;

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(req, &e))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.map_send_error(req, &e))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(status, bytes = body.len(), "upstream responded");
        Ok(UpstreamResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let t = HnHttpTransport::builder()
            .base_url("https://hacker-news.firebaseio.com/v0")
            .build()
            .unwrap();
        assert_eq!(t.base_url().as_str(), "https://hacker-news.firebaseio.com/v0/");
        assert_eq!(
            t.base_url().join("item/8863.json").unwrap().as_str(),
            "https://hacker-news.firebaseio.com/v0/item/8863.json"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HnHttpTransport::builder().base_url("not a url").build().unwrap_err();
        assert!(matches!(err, HnError::InvalidArg(_)));
    }
}
