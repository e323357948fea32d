//! Field normalization applied to every record a source reports.
//!
//! Source pages mix full-width and half-width characters, decorate titles
//! with bracketed promotional runs and append role annotations to author
//! names. Everything that later becomes a path component or a lookup-table
//! name goes through here first.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{BookRecord, BookRecordPartial};

static ANNOTATION_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"【[^】]*】").expect("valid regex"));
static AUTHOR_ROLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[(（][^)）]*[)）]").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Characters that may not appear inside a single path component.
/// `?` and `!` are deliberately absent.
const PATH_ILLEGAL: &[char] = &[
    '(', ')', '[', ']', ':', '<', '>', '/', '=', '"', '（', '）', '\u{3000}',
];

/// Fold full-width digits and Latin letters to their half-width forms.
pub fn to_half_width(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

fn replace_path_illegal(input: &str) -> String {
    input
        .chars()
        .map(|c| if PATH_ILLEGAL.contains(&c) { ' ' } else { c })
        .collect()
}

fn collapse_whitespace(input: &str, separator: &str) -> String {
    WHITESPACE_RE
        .replace_all(input.trim(), separator)
        .into_owned()
}

/// Normalize a title (or series name) into a single path-safe component.
///
/// `【…】` annotation runs are dropped and whitespace runs become `_`.
pub fn format_title(title: &str) -> String {
    let spaced = replace_path_illegal(title);
    let without_annotations = ANNOTATION_RUN_RE.replace_all(&spaced, "");
    collapse_whitespace(&to_half_width(&without_annotations), "_")
}

/// Normalize one author name: role annotations in parentheses, role
/// prefixes such as `著:` and all whitespace are removed.
pub fn format_author(author: &str) -> String {
    let without_role = AUTHOR_ROLE_RE.replace_all(author, "");
    let name = without_role
        .rsplit([':', '：'])
        .next()
        .unwrap_or_default();
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    to_half_width(&compact)
}

pub fn format_authors(authors: &[String]) -> Vec<String> {
    authors
        .iter()
        .map(|author| format_author(author))
        .filter(|author| !author.is_empty())
        .collect()
}

pub fn format_publisher(publisher: &str) -> String {
    to_half_width(&publisher.replace('・', "")).trim().to_string()
}

/// Normalize a category or sub-category label for use as a directory name.
pub fn format_path_component(label: &str) -> String {
    collapse_whitespace(&to_half_width(&replace_path_illegal(label)), " ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Build a normalized [`BookRecord`] from what a source reported.
///
/// Returns `None` when no usable title survives normalization.
pub fn normalize_record(
    partial: BookRecordPartial,
    isbn: &str,
    source: &str,
) -> Option<BookRecord> {
    let title = partial.title.as_deref().map(format_title).and_then(non_empty)?;

    Some(BookRecord {
        title,
        authors: partial
            .authors
            .as_deref()
            .map(format_authors)
            .unwrap_or_default(),
        publisher: partial
            .publisher
            .as_deref()
            .map(format_publisher)
            .and_then(non_empty),
        category: partial
            .category
            .as_deref()
            .map(format_path_component)
            .and_then(non_empty),
        sub_category: partial
            .sub_category
            .as_deref()
            .map(format_path_component)
            .and_then(non_empty),
        series: partial
            .series
            .as_deref()
            .map(format_title)
            .and_then(non_empty),
        isbn: isbn.to_string(),
        source: source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_annotation_runs_are_removed() {
        assert_eq!(format_title("【hoge】hoge"), "hoge");
        assert_eq!(format_title("hoge【hoge】"), "hoge");
    }

    #[test]
    fn title_whitespace_is_trimmed_and_joined() {
        assert_eq!(format_title(" hoge"), "hoge");
        assert_eq!(format_title("\u{3000}hoge"), "hoge");
        assert_eq!(format_title("hoge "), "hoge");
        assert_eq!(format_title("hoge\u{3000}"), "hoge");
        assert_eq!(format_title("hoge hoge"), "hoge_hoge");
        assert_eq!(format_title("hoge   hoge"), "hoge_hoge");
    }

    #[test]
    fn title_path_illegal_characters_become_separators() {
        assert_eq!(format_title("Rust: the book"), "Rust_the_book");
        assert_eq!(format_title("上巻（完全版）"), "上巻_完全版");
        assert_eq!(format_title("a/b=\"c\""), "a_b_c");
    }

    #[test]
    fn title_keeps_question_and_exclamation_marks() {
        assert_eq!(format_title("本当に?"), "本当に?");
        assert_eq!(format_title("やった!"), "やった!");
    }

    #[test]
    fn full_width_alphanumerics_fold_to_half_width() {
        assert_eq!(to_half_width("Ｐｙｔｈｏｎ３"), "Python3");
        assert_eq!(format_title("退屈なことはＰｙｔｈｏｎにやらせよう"), "退屈なことはPythonにやらせよう");
        assert_eq!(to_half_width("漢字かな"), "漢字かな");
    }

    #[test]
    fn author_roles_and_spaces_are_removed() {
        assert_eq!(
            format_authors(&["hog e".to_string(), "foo bar".to_string()]),
            vec!["hoge", "foobar"]
        );
        assert_eq!(
            format_authors(&["foo(foo)".to_string(), "bar（bar）".to_string()]),
            vec!["foo", "bar"]
        );
        assert_eq!(format_author("著:夏目 漱石"), "夏目漱石");
    }

    #[test]
    fn publisher_middle_dots_are_removed() {
        assert_eq!(format_publisher("ho・ge"), "hoge");
        assert_eq!(format_publisher("ＫＡＤＯＫＡＷＡ"), "KADOKAWA");
    }

    #[test]
    fn record_without_title_is_rejected() {
        let partial = BookRecordPartial {
            title: Some("【限定】".to_string()),
            ..Default::default()
        };
        assert!(normalize_record(partial, "9784867104562", "test").is_none());
    }

    #[test]
    fn record_fields_are_normalized_and_empties_dropped() {
        let partial = BookRecordPartial {
            title: Some("Foo Bar".to_string()),
            authors: Some(vec!["著:山田 太郎".to_string()]),
            publisher: Some("".to_string()),
            category: Some("ライトノベル".to_string()),
            sub_category: Some("Label:X".to_string()),
            series: None,
        };
        let record = normalize_record(partial, "9784867104562", "honto").unwrap();
        assert_eq!(record.title, "Foo_Bar");
        assert_eq!(record.authors, vec!["山田太郎"]);
        assert_eq!(record.publisher, None);
        assert_eq!(record.category.as_deref(), Some("ライトノベル"));
        assert_eq!(record.sub_category.as_deref(), Some("Label X"));
        assert_eq!(record.series, None);
        assert_eq!(record.source, "honto");
    }
}
