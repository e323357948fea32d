use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use shelfscan_core::BookRecordPartial;

use crate::error::Result;
use crate::http::{HttpClient, TransportConfig, build_url};
use crate::sources::{BookSource, SourceOutcome};

const BASE_URL: &str = "https://api.openbd.jp";

static ROLE_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"／.*$").expect("valid regex"));

pub struct OpenBdSource {
    client: HttpClient,
    base_url: String,
}

impl OpenBdSource {
    pub fn new(transport: &TransportConfig) -> Result<Self> {
        Self::with_base_url(transport, BASE_URL)
    }

    pub fn with_base_url(transport: &TransportConfig, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(transport)?,
            base_url: base_url.into(),
        })
    }

    async fn lookup(&self, isbn: &str) -> Result<Option<BookRecordPartial>> {
        let url = build_url(&self.base_url, &["v1", "get"], &[("isbn", isbn)])?;
        let Some(body) = self.client.get_text(url.as_str()).await? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&body)?;
        Ok(parse_response(&value))
    }
}

#[async_trait]
impl BookSource for OpenBdSource {
    fn name(&self) -> &str {
        "openbd"
    }

    async fn fetch(&self, isbn: &str) -> SourceOutcome<BookRecordPartial> {
        SourceOutcome::from_result(self.lookup(isbn).await)
    }
}

/// First record of an openBD `/v1/get` response. The API answers `[null]`
/// for unknown ISBNs.
pub fn parse_response(value: &Value) -> Option<BookRecordPartial> {
    let summary = value
        .as_array()?
        .iter()
        .find(|entry| !entry.is_null())?
        .get("summary")?;

    let field = |name: &str| {
        summary
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
    };

    let authors = field("author").map(|raw| split_authors(&raw));

    Some(BookRecordPartial {
        title: field("title"),
        authors: authors.filter(|list| !list.is_empty()),
        publisher: field("publisher"),
        category: None,
        sub_category: None,
        series: field("series"),
    })
}

/// `"山田太郎／著 鈴木花子／イラスト"` → `["山田太郎", "鈴木花子"]`.
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split(' ')
        .map(|name| ROLE_SUFFIX_RE.replace(name, "").trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    fn fast_transport() -> TransportConfig {
        TransportConfig {
            min_interval: Duration::from_millis(0),
            timeout: Duration::from_secs(5),
            ..TransportConfig::default()
        }
    }

    #[test]
    fn parses_summary() {
        let doc = json!([{
            "summary": {
                "isbn": "9784780802047",
                "title": "はじめての Rust",
                "series": "",
                "publisher": "技術評論社",
                "author": "山田太郎／著 鈴木花子／イラスト"
            }
        }]);
        let record = parse_response(&doc).unwrap();
        assert_eq!(record.title.as_deref(), Some("はじめての Rust"));
        assert_eq!(
            record.authors,
            Some(vec!["山田太郎".to_string(), "鈴木花子".to_string()])
        );
        assert_eq!(record.publisher.as_deref(), Some("技術評論社"));
        assert_eq!(record.series, None);
        assert_eq!(record.category, None);
    }

    #[test]
    fn null_entry_is_a_miss() {
        assert_eq!(parse_response(&json!([null])), None);
        assert_eq!(parse_response(&json!([])), None);
    }

    #[tokio::test]
    async fn fetch_reads_summary() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/get")
            .match_query(Matcher::UrlEncoded("isbn".into(), "9784780802047".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"summary":{"title":"本","author":"著者／著","publisher":"出版社"}}]"#)
            .create_async()
            .await;

        let source = OpenBdSource::with_base_url(&fast_transport(), server.url()).unwrap();
        match source.fetch("9784780802047").await {
            SourceOutcome::Found(record) => {
                assert_eq!(record.title.as_deref(), Some("本"));
                assert_eq!(record.authors, Some(vec!["著者".to_string()]));
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_isbn_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/get")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[null]")
            .create_async()
            .await;

        let source = OpenBdSource::with_base_url(&fast_transport(), server.url()).unwrap();
        assert_eq!(source.fetch("9780000000002").await, SourceOutcome::NotFound);
    }

    #[tokio::test]
    async fn malformed_body_is_transient() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/get")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let source = OpenBdSource::with_base_url(&fast_transport(), server.url()).unwrap();
        assert!(matches!(
            source.fetch("9780000000002").await,
            SourceOutcome::Transient(_)
        ));
    }
}
