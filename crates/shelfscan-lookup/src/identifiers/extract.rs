use once_cell::sync::Lazy;
use regex::Regex;
use shelfscan_core::normalize::to_half_width;

use crate::identifiers::isbn::repair_check_digit;

static MARKED_ISBN13_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)isbn([0-9]{12,13})").expect("valid regex"));
static MARKED_ISBN10_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)isbn([0-9a-z]{9,10})").expect("valid regex"));
static BARE_978_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"978[0-9]{9,10}").expect("valid regex"));

/// Separators OCR tends to insert inside digit runs.
const SEPARATORS: &[char] = &[
    ' ', '\u{3000}', '-', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2212}',
    '\u{FF0D}',
];

/// Which extraction rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsbnPattern {
    /// `ISBN` followed by 12–13 digits.
    MarkedIsbn13,
    /// `ISBN` followed by a 9-digit stem and optional check character.
    MarkedIsbn10,
    /// A bare `978…` digit run without the marker.
    Bare978,
}

/// Digits pulled out of OCR text, possibly one character short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsbnCandidate {
    pub digits: String,
    pub pattern: IsbnPattern,
}

impl IsbnCandidate {
    pub fn needs_repair(&self) -> bool {
        matches!(self.digits.len(), 9 | 12)
    }

    /// Complete the candidate, repairing a missing check character.
    pub fn into_code(self) -> Option<String> {
        if self.needs_repair() {
            repair_check_digit(&self.digits).ok()
        } else {
            Some(self.digits)
        }
    }
}

/// Remove spaces and hyphens and fold full-width digits.
pub fn strip_separators(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !SEPARATORS.contains(c)).collect();
    to_half_width(&stripped)
}

/// Shape a marked ISBN-10 capture. A tenth character that cannot be a check
/// character (the `C` of a following C-code) belongs to the next token, so
/// only the 9-digit stem is kept.
fn marked_isbn10(capture: &str) -> Option<String> {
    let mut candidate = capture.to_ascii_uppercase();
    if candidate.len() == 10 && !candidate.ends_with(|c: char| c.is_ascii_digit() || c == 'X') {
        candidate.truncate(9);
    }
    is_isbn10_shape(&candidate).then_some(candidate)
}

fn is_isbn10_shape(candidate: &str) -> bool {
    let (stem, check) = candidate.split_at(9.min(candidate.len()));
    stem.len() == 9
        && stem.chars().all(|c| c.is_ascii_digit())
        && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
}

/// Apply the extraction rules in priority order to already-cleaned text.
pub fn find_isbn_candidate(cleaned: &str) -> Option<IsbnCandidate> {
    if let Some(caps) = MARKED_ISBN13_RE.captures(cleaned) {
        return Some(IsbnCandidate {
            digits: caps[1].to_string(),
            pattern: IsbnPattern::MarkedIsbn13,
        });
    }

    let marked10 = MARKED_ISBN10_RE
        .captures_iter(cleaned)
        .find_map(|caps| marked_isbn10(&caps[1]));
    if let Some(digits) = marked10 {
        return Some(IsbnCandidate {
            digits,
            pattern: IsbnPattern::MarkedIsbn10,
        });
    }

    BARE_978_RE.find(cleaned).map(|m| IsbnCandidate {
        digits: m.as_str().to_string(),
        pattern: IsbnPattern::Bare978,
    })
}

/// Normalize a hand-typed ISBN: separators removed, `x` upper-cased and a
/// missing check character repaired. `None` when the value is not ISBN-shaped.
pub fn normalize_isbn_input(raw: &str) -> Option<String> {
    let code = strip_separators(raw.trim()).to_ascii_uppercase();
    if !code.is_ascii() {
        return None;
    }
    match code.len() {
        9 | 12 => repair_check_digit(&code).ok(),
        10 if is_isbn10_shape(&code) => Some(code),
        13 if code.chars().all(|c| c.is_ascii_digit()) => Some(code),
        _ => None,
    }
}

/// Extract a single ISBN from raw OCR output of one page.
pub fn extract_isbn_from_ocr_text(text: &str) -> Option<String> {
    find_isbn_candidate(&strip_separators(text)).and_then(IsbnCandidate::into_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_isbn13_is_returned_unmodified() {
        assert_eq!(
            extract_isbn_from_ocr_text("ISBN9784867104562").as_deref(),
            Some("9784867104562")
        );
    }

    #[test]
    fn twelve_digit_code_is_repaired() {
        assert_eq!(
            extract_isbn_from_ocr_text("ISBN978486710456").as_deref(),
            Some("9784867104569")
        );
    }

    #[test]
    fn separators_are_stripped_before_matching() {
        let text = "定価 本体680円+税\nISBN 978-4-08-872515-4 C0079";
        let candidate = find_isbn_candidate(&strip_separators(text)).unwrap();
        assert_eq!(candidate.pattern, IsbnPattern::MarkedIsbn13);
        assert_eq!(candidate.digits, "9784088725154");
    }

    #[test]
    fn marker_is_case_insensitive() {
        assert_eq!(
            extract_isbn_from_ocr_text("isbn 978-0-306-40615-7").as_deref(),
            Some("9780306406157")
        );
    }

    #[test]
    fn isbn10_with_x_check_digit() {
        let candidate = find_isbn_candidate(&strip_separators("ISBN0-07-462542-X C3055")).unwrap();
        assert_eq!(candidate.pattern, IsbnPattern::MarkedIsbn10);
        assert_eq!(candidate.into_code().as_deref(), Some("007462542X"));
    }

    #[test]
    fn nine_digit_stem_is_repaired() {
        assert_eq!(
            extract_isbn_from_ocr_text("ISBN4-08-872515").as_deref(),
            Some("4088725158")
        );
    }

    #[test]
    fn nine_digit_stem_before_c_code_is_repaired() {
        assert_eq!(
            extract_isbn_from_ocr_text("ISBN4-08-872515 C0079 ¥400E").as_deref(),
            Some("4088725158")
        );
        let candidate = find_isbn_candidate("ISBN408872515C0079").unwrap();
        assert_eq!(candidate.digits, "408872515");
    }

    #[test]
    fn hand_typed_isbns_are_normalized() {
        assert_eq!(normalize_isbn_input("4-04-866157-x").as_deref(), Some("404866157X"));
        assert_eq!(normalize_isbn_input("978-4-08-872515-4").as_deref(), Some("9784088725154"));
        assert_eq!(normalize_isbn_input("978-4-86710-456").as_deref(), Some("9784867104569"));
        assert_eq!(normalize_isbn_input("408872515").as_deref(), Some("4088725158"));
        assert_eq!(normalize_isbn_input("/library/manga"), None);
        assert_eq!(normalize_isbn_input("2023"), None);
        assert_eq!(normalize_isbn_input("978408872515X"), None);
        assert_eq!(normalize_isbn_input(""), None);
    }

    #[test]
    fn bare_978_run_without_marker() {
        let candidate = find_isbn_candidate(&strip_separators("9 7 8 0 3 0 6 4 0 6 1 5 7")).unwrap();
        assert_eq!(candidate.pattern, IsbnPattern::Bare978);
        assert_eq!(candidate.into_code().as_deref(), Some("9780306406157"));
    }

    #[test]
    fn full_width_digits_are_folded() {
        assert_eq!(
            extract_isbn_from_ocr_text("ＩＳＢＮ９７８０３０６４０６１５７").as_deref(),
            Some("9780306406157")
        );
    }

    #[test]
    fn marked_isbn10_rejects_non_isbn_shapes() {
        assert_eq!(find_isbn_candidate("ISBNABCDEFGHIJ"), None);
    }

    #[test]
    fn text_without_isbn() {
        assert_eq!(extract_isbn_from_ocr_text("奥付\n発行所 株式会社テスト"), None);
        assert_eq!(extract_isbn_from_ocr_text(""), None);
    }
}
