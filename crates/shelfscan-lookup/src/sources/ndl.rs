use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use shelfscan_core::BookRecordPartial;

use crate::error::{LookupError, Result};
use crate::http::{HttpClient, TransportConfig, build_url};
use crate::sources::{BookSource, SourceOutcome};

const BASE_URL: &str = "https://ndlsearch.ndl.go.jp";

/// National Diet Library search over SRU with Dublin Core records.
pub struct NdlSource {
    client: HttpClient,
    base_url: String,
}

impl NdlSource {
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
        let query = format!("isbn={isbn}");
        let url = build_url(
            &self.base_url,
            &["api", "sru"],
            &[
                ("operation", "searchRetrieve"),
                ("query", query.as_str()),
                ("recordSchema", "dc"),
                ("recordPacking", "xml"),
                ("maximumRecords", "1"),
            ],
        )?;
        let Some(body) = self.client.get_text(url.as_str()).await? else {
            return Ok(None);
        };
        parse_sru_response(&body)
    }
}

#[async_trait]
impl BookSource for NdlSource {
    fn name(&self) -> &str {
        "ndl"
    }

    async fn fetch(&self, isbn: &str) -> SourceOutcome<BookRecordPartial> {
        SourceOutcome::from_result(self.lookup(isbn).await)
    }
}

#[derive(Debug, Default)]
struct DcFields {
    title: Option<String>,
    creators: Vec<String>,
    publisher: Option<String>,
}

impl DcFields {
    fn accept(&mut self, element: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match element {
            "title" if self.title.is_none() => self.title = Some(text.to_string()),
            "creator" => self.creators.push(text.to_string()),
            "publisher" if self.publisher.is_none() => self.publisher = Some(text.to_string()),
            _ => {}
        }
    }

    fn into_partial(self) -> BookRecordPartial {
        BookRecordPartial {
            title: self.title,
            authors: (!self.creators.is_empty()).then_some(self.creators),
            publisher: self.publisher,
            ..BookRecordPartial::default()
        }
    }
}

/// Dublin Core fields of the first record, or `None` when the response
/// reports zero records. Handles both `xml` and `string` record packing.
pub fn parse_sru_response(xml: &str) -> Result<Option<BookRecordPartial>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut total: Option<u64> = None;
    let mut records = 0usize;
    let mut fields = DcFields::default();
    let mut embedded: Option<String> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                if name == "record" {
                    records += 1;
                }
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                let Some(current) = stack.last() else {
                    continue;
                };
                if current == "numberOfRecords" {
                    total = text.trim().parse().ok();
                } else if records == 1 && stack.iter().any(|n| n == "recordData") {
                    if current == "recordData" {
                        embedded.get_or_insert_with(String::new).push_str(&text);
                    } else {
                        fields.accept(current, &text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if total == Some(0) || records == 0 {
        return Ok(None);
    }
    if let Some(fragment) = embedded {
        read_dc_fragment(&fragment, &mut fields)?;
    }
    Ok(Some(fields.into_partial()))
}

fn read_dc_fragment(fragment: &str, fields: &mut DcFields) -> Result<()> {
    let mut reader = Reader::from_str(fragment);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => stack.push(local_name(e.local_name().as_ref())),
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                if let Some(current) = stack.last() {
                    fields.accept(current, &text);
                }
            }
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn xml_error(e: impl std::fmt::Display) -> LookupError {
    LookupError::Parse(format!("invalid SRU response: {e}"))
}
