use crate::error::{LookupError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Isbn {
    pub raw: String,
    pub isbn13: String,
    pub isbn10: Option<String>,
}

fn strip_isbn(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_uppercase()
}

fn digit_values(digits: &str) -> Option<Vec<u32>> {
    digits.chars().map(|c| c.to_digit(10)).collect()
}

fn isbn13_check_digit(stem: &[u32]) -> u32 {
    let sum: u32 = stem
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}

fn isbn10_check_digit(stem: &[u32]) -> u32 {
    let sum: u32 = stem
        .iter()
        .enumerate()
        .map(|(i, &d)| (10 - i as u32) * d)
        .sum();
    (11 - sum % 11) % 11
}

fn isbn10_check_char(check: u32) -> char {
    if check == 10 {
        'X'
    } else {
        char::from_digit(check, 10).unwrap_or('0')
    }
}

/// Append the missing check character to a truncated ISBN.
///
/// Accepts exactly 12 digits (ISBN-13 stem) or 9 digits (ISBN-10 stem);
/// anything else is rejected with [`LookupError::InvalidIsbn`].
pub fn repair_check_digit(digits: &str) -> Result<String> {
    let values = digit_values(digits)
        .ok_or_else(|| LookupError::InvalidIsbn(digits.to_string()))?;

    match values.len() {
        12 => Ok(format!("{digits}{}", isbn13_check_digit(&values))),
        9 => Ok(format!("{digits}{}", isbn10_check_char(isbn10_check_digit(&values)))),
        _ => Err(LookupError::InvalidIsbn(digits.to_string())),
    }
}

impl Isbn {
    /// Parse a complete ISBN-10 or ISBN-13, validating its check character.
    pub fn parse(input: &str) -> Result<Self> {
        let stripped = strip_isbn(input);
        let invalid = || LookupError::InvalidIsbn(input.to_string());

        match stripped.len() {
            13 => {
                let digits = digit_values(&stripped).ok_or_else(invalid)?;
                if isbn13_check_digit(&digits[..12]) != digits[12] {
                    return Err(invalid());
                }
                // ISBN-10 only exists for the 978 prefix
                let isbn10 = if stripped.starts_with("978") {
                    let stem = &digits[3..12];
                    Some(format!(
                        "{}{}",
                        &stripped[3..12],
                        isbn10_check_char(isbn10_check_digit(stem))
                    ))
                } else {
                    None
                };
                Ok(Self { raw: input.to_string(), isbn13: stripped, isbn10 })
            }
            10 => {
                let stem = digit_values(&stripped[..9]).ok_or_else(invalid)?;
                let check = stripped.chars().last().ok_or_else(invalid)?;
                if isbn10_check_char(isbn10_check_digit(&stem)) != check {
                    return Err(invalid());
                }
                let isbn13 = repair_check_digit(&format!("978{}", &stripped[..9]))?;
                Ok(Self { raw: input.to_string(), isbn13, isbn10: Some(stripped) })
            }
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isbn13_checksum_ok(code: &str) -> bool {
        let sum: u32 = code
            .chars()
            .enumerate()
            .map(|(i, c)| c.to_digit(10).unwrap() * if i % 2 == 0 { 1 } else { 3 })
            .sum();
        sum % 10 == 0
    }

    fn isbn10_checksum_ok(code: &str) -> bool {
        let sum: u32 = code
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let d = if c == 'X' { 10 } else { c.to_digit(10).unwrap() };
                (10 - i as u32) * d
            })
            .sum();
        sum % 11 == 0
    }

    #[test]
    fn repair_isbn13_stem() {
        assert_eq!(repair_check_digit("978030640615").unwrap(), "9780306406157");
        assert_eq!(repair_check_digit("978486710456").unwrap(), "9784867104569");
    }

    #[test]
    fn repair_isbn10_stem() {
        assert_eq!(repair_check_digit("030640615").unwrap(), "0306406152");
        assert_eq!(repair_check_digit("007462542").unwrap(), "007462542X");
    }

    #[test]
    fn repair_rejects_other_shapes() {
        assert!(repair_check_digit("97803064061").is_err());
        assert!(repair_check_digit("9780306406157").is_err());
        assert!(repair_check_digit("97803064061A").is_err());
        assert!(repair_check_digit("").is_err());
    }

    #[test]
    fn repaired_isbn13_always_satisfies_checksum() {
        let mut stem: u64 = 978_000_000_000;
        for _ in 0..500 {
            let digits = format!("{stem:012}");
            let repaired = repair_check_digit(&digits).unwrap();
            assert_eq!(repaired.len(), 13);
            assert!(repaired.starts_with(&digits));
            assert!(isbn13_checksum_ok(&repaired), "{repaired}");
            stem = (stem * 7 + 1_234_567) % 1_000_000_000_000;
        }
    }

    #[test]
    fn repaired_isbn10_always_satisfies_checksum() {
        let mut stem: u64 = 408_872_515;
        let mut saw_x = false;
        for _ in 0..500 {
            let digits = format!("{stem:09}");
            let repaired = repair_check_digit(&digits).unwrap();
            assert_eq!(repaired.len(), 10);
            saw_x |= repaired.ends_with('X');
            assert!(isbn10_checksum_ok(&repaired), "{repaired}");
            stem = (stem * 13 + 7_654_321) % 1_000_000_000;
        }
        assert!(saw_x);
    }

    #[test]
    fn valid_isbn13() {
        let isbn = Isbn::parse("9780306406157").unwrap();
        assert_eq!(isbn.isbn13, "9780306406157");
        assert_eq!(isbn.isbn10.as_deref(), Some("0306406152"));
    }

    #[test]
    fn isbn13_with_hyphens() {
        let isbn = Isbn::parse("978-0-306-40615-7").unwrap();
        assert_eq!(isbn.isbn13, "9780306406157");
    }

    #[test]
    fn valid_isbn10() {
        let isbn = Isbn::parse("0306406152").unwrap();
        assert_eq!(isbn.isbn10, Some("0306406152".to_string()));
        assert_eq!(isbn.isbn13, "9780306406157");
    }

    #[test]
    fn isbn10_with_x_check() {
        let isbn = Isbn::parse("007462542X").unwrap();
        assert_eq!(isbn.isbn10, Some("007462542X".to_string()));
    }

    #[test]
    fn invalid_check_digit() {
        assert!(Isbn::parse("9780306406158").is_err());
        assert!(Isbn::parse("0306406153").is_err());
    }

    #[test]
    fn isbn13_979_no_isbn10() {
        let isbn = Isbn::parse("9791032305690").unwrap();
        assert_eq!(isbn.isbn10, None);
    }
}
