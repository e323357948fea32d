use async_trait::async_trait;
use scraper::Html;
use shelfscan_core::BookRecordPartial;
use tracing::debug;

use crate::error::{LookupError, Result};
use crate::http::{HttpClient, TransportConfig, build_url};
use crate::sources::html::{
    meta_content, non_empty, parse_selector, select_first_text, select_texts,
};
use crate::sources::{BookSource, SourceOutcome};

const BASE_URL: &str = "https://honto.jp";
const SALE_SUFFIX: &str = "の通販";
const EBOOK_FORMAT: &str = "電子書籍";

/// Which honto storefront to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HontoStore {
    PaperAndEbook,
    Ebook,
}

impl HontoStore {
    fn name(self) -> &'static str {
        match self {
            HontoStore::PaperAndEbook => "honto",
            HontoStore::Ebook => "honto-ebook",
        }
    }

    fn search_segments(self) -> &'static [&'static str] {
        match self {
            HontoStore::PaperAndEbook => &["netstore", "search.html"],
            HontoStore::Ebook => &["ebook", "search.html"],
        }
    }

    fn store_param(self) -> &'static str {
        match self {
            HontoStore::PaperAndEbook => "1",
            HontoStore::Ebook => "2",
        }
    }
}

/// Scrapes honto's search and item pages. This is the only source that
/// reports a category, so it usually leads the fallback order.
pub struct HontoSource {
    client: HttpClient,
    base_url: String,
    store: HontoStore,
}

impl HontoSource {
    pub fn new(store: HontoStore, transport: &TransportConfig) -> Result<Self> {
        Self::with_base_url(store, transport, BASE_URL)
    }

    pub fn with_base_url(
        store: HontoStore,
        transport: &TransportConfig,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(transport)?,
            base_url: base_url.into(),
            store,
        })
    }

    async fn lookup(&self, isbn: &str) -> Result<Option<BookRecordPartial>> {
        let search_url = build_url(
            &self.base_url,
            self.store.search_segments(),
            &[
                ("detailFlg", "1"),
                ("isbn", isbn),
                ("srchf", "1"),
                ("store", self.store.store_param()),
            ],
        )?;
        let Some(search_html) = self.client.get_text(search_url.as_str()).await? else {
            return Ok(None);
        };
        let Some(href) = first_item_link(&search_html)? else {
            debug!(source = self.store.name(), isbn, "no search hit");
            return Ok(None);
        };

        let item_url = search_url
            .join(&href)
            .map_err(|e| LookupError::Parse(format!("invalid item link {href}: {e}")))?;
        let Some(item_html) = self.client.get_text(item_url.as_str()).await? else {
            return Ok(None);
        };
        parse_item_page(&item_html).map(Some)
    }
}

#[async_trait]
impl BookSource for HontoSource {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn fetch(&self, isbn: &str) -> SourceOutcome<BookRecordPartial> {
        SourceOutcome::from_result(self.lookup(isbn).await)
    }
}

/// `href` of the first search result. Several hits resolve to the first.
pub fn first_item_link(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let selector = parse_selector("a.dyTitle")?;
    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(ToOwned::to_owned))
}

pub fn parse_item_page(html: &str) -> Result<BookRecordPartial> {
    let document = Html::parse_document(html);

    let topics = select_texts(&document, "div#stTopicPath > ol > li")?;
    let title = match select_first_text(&document, "h1.stTitle")? {
        Some(title) => Some(title),
        None => meta_content(&document, "og:title")?,
    };
    let authors = select_texts(&document, "p#stAuthor > span > a")?;
    let publisher = select_first_text(&document, "p.stPublisher")?;
    let is_ebook = format_label(&document)?.as_deref() == Some(EBOOK_FORMAT);

    let category = non_empty(topics.get(2).map(|t| strip_sale_suffix(t)));
    let sub_category = category
        .as_deref()
        .and_then(|category| sub_category_for(category, &topics, &authors, is_ebook));

    Ok(BookRecordPartial {
        title: non_empty(title),
        authors: (!authors.is_empty()).then_some(authors),
        publisher: non_empty(publisher),
        category,
        sub_category: non_empty(sub_category),
        series: None,
    })
}

fn format_label(document: &Html) -> Result<Option<String>> {
    let selector = parse_selector("p.stFormat")?;
    Ok(document
        .select(&selector)
        .next()
        .and_then(|el| el.text().map(str::trim).find(|t| !t.is_empty()))
        .map(ToOwned::to_owned))
}

fn sub_category_for(
    category: &str,
    topics: &[String],
    authors: &[String],
    is_ebook: bool,
) -> Option<String> {
    let second_to_last = || {
        topics
            .len()
            .checked_sub(2)
            .and_then(|i| topics.get(i))
            .cloned()
    };

    match category {
        "文庫" | "小説・文学" => authors
            .first()
            .and_then(|author| author.rsplit([':', '：']).next())
            .map(|name| name.trim().to_string()),
        "漫画・コミック" | "ライトノベル" if is_ebook => second_to_last(),
        "漫画・コミック" | "ライトノベル" => None,
        "新書・選書・ブックレット" => second_to_last(),
        _ => topics.get(3).map(|t| strip_sale_suffix(t)),
    }
}

fn strip_sale_suffix(label: &str) -> String {
    label
        .split(SALE_SUFFIX)
        .next()
        .unwrap_or(label)
        .trim()
        .to_string()
}
