use scraper::{ElementRef, Html, Selector};

use crate::error::{LookupError, Result};

pub(crate) fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input)
        .map_err(|e| LookupError::Parse(format!("invalid selector {input}: {e}")))
}

pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of every element matching `selector`, empty entries dropped.
pub(crate) fn select_texts(document: &Html, selector: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    Ok(document
        .select(&selector)
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .collect())
}

pub(crate) fn select_first_text(document: &Html, selector: &str) -> Result<Option<String>> {
    Ok(select_texts(document, selector)?.into_iter().next())
}

pub(crate) fn meta_content(document: &Html, property: &str) -> Result<Option<String>> {
    let selector = parse_selector(&format!("meta[property='{property}']"))?;
    Ok(document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(normalize_whitespace)
        .find(|content| !content.is_empty()))
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
