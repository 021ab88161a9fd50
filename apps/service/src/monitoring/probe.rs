use chrono::Utc;
use tracing::debug;
use url::Url;

use super::checker::Fetcher;
use crate::models::Site;

/// Check a site once and return a copy carrying the outcome.
///
/// Up means the fetch completed with a 2xx status. Unparsable URLs fail
/// without touching the network. `last_pinged_at` is stamped when the
/// attempt concludes, whatever the outcome.
pub async fn probe(site: &Site, fetcher: &dyn Fetcher) -> Site {
    let is_success = match parse_target(&site.url) {
        Some(url) => match fetcher.fetch(&url).await {
            Ok(response) => {
                debug!(site = %site.id, url = %site.url, status = response.status, "Probe completed");
                response.is_success()
            }
            Err(e) => {
                debug!(site = %site.id, url = %site.url, error = %e, "Probe failed");
                false
            }
        },
        None => {
            debug!(site = %site.id, url = %site.url, "Skipping probe of unparsable URL");
            false
        }
    };

    site.with_probe_result(is_success, Utc::now())
}

/// Absolute http(s) URL with a host, or nothing
fn parse_target(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::checker::FetchResponse;
    use anyhow::{Result, anyhow};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Status(u16),
        Error,
    }

    struct StubFetcher {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(reply: Reply) -> Self {
            Self { reply, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, _url: &Url) -> Result<FetchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Status(status) => Ok(FetchResponse::with_status(status)),
                Reply::Error => Err(anyhow!("connection refused")),
            }
        }
    }

    #[tokio::test]
    async fn test_probe_success() {
        let fetcher = StubFetcher::new(Reply::Status(200));
        let site = Site::new("https://google.com", 30);

        let before = Utc::now();
        let probed = probe(&site, &fetcher).await;

        assert!(probed.is_success);
        assert!(probed.last_pinged_at.unwrap() >= before);
        assert_eq!(probed.id, site.id);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_probe_non_2xx_is_down() {
        for status in [404, 500, 301, 199] {
            let fetcher = StubFetcher::new(Reply::Status(status));
            let site = Site::new("https://aol.com", 60);

            let probed = probe(&site, &fetcher).await;
            assert!(!probed.is_success, "status {status} should be down");
            assert!(probed.last_pinged_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_probe_transport_error_is_down() {
        let fetcher = StubFetcher::new(Reply::Error);
        let site = Site::new("https://example.com", 30).with_probe_result(true, Utc::now());

        let probed = probe(&site, &fetcher).await;
        assert!(!probed.is_success);
        assert!(probed.last_pinged_at >= site.last_pinged_at);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_probe_invalid_url_skips_network() {
        let fetcher = StubFetcher::new(Reply::Status(200));

        for raw in ["ht!tp://invalid-url", "not a valid url", "ftp://example.com", ""] {
            let probed = probe(&Site::new(raw, 45), &fetcher).await;
            assert!(!probed.is_success);
            assert!(probed.last_pinged_at.is_some());
        }

        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_probe_keeps_identity_fields() {
        let fetcher = StubFetcher::new(Reply::Status(204));
        let mut site = Site::new("https://example.com/health", 120);
        site.is_active = false;

        let probed = probe(&site, &fetcher).await;
        assert_eq!(probed.url, site.url);
        assert_eq!(probed.frequency, 120);
        assert!(!probed.is_active);
        assert!(probed.is_success);
    }
}
