pub mod extract;
pub mod isbn;

pub use extract::{extract_isbn_from_ocr_text, normalize_isbn_input, strip_separators};
pub use isbn::{Isbn, repair_check_digit};
