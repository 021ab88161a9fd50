use anyhow::{Result, anyhow};
use std::time::Duration;
use url::Url;

/// What a completed fetch yields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn with_status(status: u16) -> Self {
        Self { status, ..Self::default() }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Network fetch capability used by probes.
///
/// One attempt per call, no retries. Any transport problem (DNS, TLS,
/// refused connection, timeout) comes back as `Err`.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher. Without `timeout` the client default applies.
    pub fn new(timeout: Option<Duration>, user_agent: &str) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self { client: builder.build()? })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?
            .to_vec();

        Ok(FetchResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(FetchResponse::with_status(200).is_success());
        assert!(FetchResponse::with_status(204).is_success());
        assert!(FetchResponse::with_status(299).is_success());

        assert!(!FetchResponse::with_status(199).is_success());
        assert!(!FetchResponse::with_status(301).is_success());
        assert!(!FetchResponse::with_status(404).is_success());
        assert!(!FetchResponse::with_status(500).is_success());
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(None, "openping-test").is_ok());
        assert!(HttpFetcher::new(Some(Duration::from_secs(5)), "openping-test").is_ok());
    }
}
