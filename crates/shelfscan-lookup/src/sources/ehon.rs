use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use crate::error::Result;
use crate::http::{HttpClient, TransportConfig, build_url};
use crate::sources::html::{element_text, parse_selector};
use crate::sources::{SeriesSource, SourceOutcome};

const BASE_URL: &str = "https://www.e-hon.ne.jp";
const SERIES_HEADER: &str = "シリーズ名";

/// Series names from e-hon's item detail table.
pub struct EhonSource {
    client: HttpClient,
    base_url: String,
}

impl EhonSource {
    pub fn new(transport: &TransportConfig) -> Result<Self> {
        Self::with_base_url(transport, BASE_URL)
    }

    pub fn with_base_url(transport: &TransportConfig, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(transport)?,
            base_url: base_url.into(),
        })
    }

    async fn lookup(&self, isbn: &str) -> Result<Option<String>> {
        let url = build_url(&self.base_url, &["bec", "SA", "Detail"], &[("refISBN", isbn)])?;
        let Some(html) = self.client.get_text(url.as_str()).await? else {
            return Ok(None);
        };
        let series = parse_series(&html)?;
        if series.is_none() {
            debug!(isbn, "e-hon has no series row");
        }
        Ok(series)
    }
}

#[async_trait]
impl SeriesSource for EhonSource {
    fn name(&self) -> &str {
        "ehon"
    }

    async fn fetch_series(&self, isbn: &str) -> SourceOutcome<String> {
        SourceOutcome::from_result(self.lookup(isbn).await)
    }
}

pub fn parse_series(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let row_selector = parse_selector("div.mainItemTable > table > tbody > tr")?;
    let th_selector = parse_selector("th")?;
    let td_selector = parse_selector("td")?;

    Ok(document.select(&row_selector).find_map(|row| {
        let header = row.select(&th_selector).next().map(|th| element_text(&th))?;
        if header != SERIES_HEADER {
            return None;
        }
        row.select(&td_selector)
            .next()
            .map(|td| element_text(&td))
            .filter(|value| !value.is_empty())
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server};

    use super::*;

    const DETAIL: &str = r#"<html><body><div class="mainItemTable"><table>
        <tr><th>出版社名</th><td>KADOKAWA</td></tr>
        <tr><th>シリーズ名</th><td>電撃文庫 ソードアート・オンライン</td></tr>
        </table></div></body></html>"#;

    #[test]
    fn finds_series_row() {
        assert_eq!(
            parse_series(DETAIL).unwrap().as_deref(),
            Some("電撃文庫 ソードアート・オンライン")
        );
    }

    #[test]
    fn missing_series_row_is_none() {
        let html = r#"<div class="mainItemTable"><table><tr><th>出版社名</th><td>新潮社</td></tr></table></div>"#;
        assert_eq!(parse_series(html).unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_series_from_detail_page() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/bec/SA/Detail")
            .match_query(Matcher::UrlEncoded("refISBN".into(), "9784048677424".into()))
            .with_status(200)
            .with_body(DETAIL)
            .create_async()
            .await;

        let transport = TransportConfig {
            min_interval: Duration::from_millis(0),
            ..TransportConfig::default()
        };
        let source = EhonSource::with_base_url(&transport, server.url()).unwrap();
        assert_eq!(
            source.fetch_series("9784048677424").await,
            SourceOutcome::Found("電撃文庫 ソードアート・オンライン".to_string())
        );
    }

    #[tokio::test]
    async fn missing_detail_page_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/bec/SA/Detail")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let transport = TransportConfig {
            min_interval: Duration::from_millis(0),
            ..TransportConfig::default()
        };
        let source = EhonSource::with_base_url(&transport, server.url()).unwrap();
        assert_eq!(source.fetch_series("9780000000002").await, SourceOutcome::NotFound);
    }
}
