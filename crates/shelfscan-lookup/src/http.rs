use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::tls::Version;
use shelfscan_core::SourcesConfig;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{LookupError, Result};

// ─── TransportConfig ──────────────────────────────────────────────────────────

/// Transport settings owned by one client. Nothing here touches
/// process-wide TLS state.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub min_interval: Duration,
    /// Accept certificates that do not verify (old retailer endpoints).
    pub accept_invalid_certs: bool,
    pub min_tls_version: Option<Version>,
}

impl TransportConfig {
    /// Settings for `source`, relaxing TLS only for sources listed as legacy.
    pub fn for_source(config: &SourcesConfig, source: &str) -> Self {
        let legacy = config.legacy_tls_sources.iter().any(|s| s == source);
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            min_interval: Duration::from_millis(config.min_interval_ms),
            accept_invalid_certs: legacy,
            min_tls_version: if legacy { Some(Version::TLS_1_0) } else { None },
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::for_source(&SourcesConfig::default(), "")
    }
}

// ─── HttpClient ───────────────────────────────────────────────────────────────

/// Single-shot HTTP client with a minimum spacing between requests.
///
/// There is no retry: a failed request is reported to the caller at once.
pub struct HttpClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl HttpClient {
    pub fn new(transport: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&transport.user_agent)
            .timeout(transport.timeout)
            .gzip(true)
            .danger_accept_invalid_certs(transport.accept_invalid_certs);
        if let Some(version) = transport.min_tls_version {
            builder = builder.min_tls_version(version);
        }

        Ok(Self {
            client: builder.build()?,
            min_interval: transport.min_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET `url` and return the body. `Ok(None)` means the server answered 404.
    pub async fn get_text(&self, url: &str) -> Result<Option<String>> {
        self.wait_for_rate_limit().await;
        let resp = self.client.get(url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                Err(LookupError::ApiError(
                    url.to_string(),
                    format!("HTTP {}: {snippet}", status.as_u16()),
                ))
            }
            _ => Ok(Some(resp.text().await?)),
        }
    }
}

/// Parse `base` and append path segments and query pairs.
pub fn build_url(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| LookupError::Parse(format!("invalid URL {base}: {e}")))?;
    if !segments.is_empty() {
        let mut segs = url
            .path_segments_mut()
            .map_err(|_| LookupError::Parse(format!("URL cannot be a base: {base}")))?;
        segs.pop_if_empty();
        for segment in segments {
            segs.push(segment);
        }
    }
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fast_transport() -> TransportConfig {
        TransportConfig {
            min_interval: Duration::from_millis(0),
            timeout: Duration::from_secs(5),
            ..TransportConfig::default()
        }
    }

    #[test]
    fn legacy_tls_is_per_source() {
        let config = SourcesConfig::default();
        let honto = TransportConfig::for_source(&config, "honto");
        let openbd = TransportConfig::for_source(&config, "openbd");
        assert!(honto.accept_invalid_certs);
        assert_eq!(honto.min_tls_version, Some(Version::TLS_1_0));
        assert!(!openbd.accept_invalid_certs);
        assert_eq!(openbd.min_tls_version, None);
    }

    #[test]
    fn build_url_appends_segments_and_query() {
        let url = build_url("https://api.example.jp/", &["v1", "get"], &[("isbn", "978-4")]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.jp/v1/get?isbn=978-4");
    }

    #[tokio::test]
    async fn not_found_is_none() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/missing").with_status(404).create_async().await;

        let client = HttpClient::new(&fast_transport()).unwrap();
        let body = client.get_text(&format!("{}/missing", server.url())).await.unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(&fast_transport()).unwrap();
        let result = client.get_text(&format!("{}/flaky", server.url())).await;
        assert!(matches!(result, Err(LookupError::ApiError(_, msg)) if msg.contains("503")));
        m.assert_async().await;
    }
}
