//! Compiled regex patterns for date extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // DD.MM.YYYY, DD/MM/YYYY, DD.MM.YY, DD/MM/YY (separators may be mixed).
    // ASCII boundaries: a date glued to Cyrillic text still matches.
    pub static ref DATE_DMY: Regex = Regex::new(
        r"(?-u:\b)(0[1-9]|[12][0-9]|3[01])([./])(0[1-9]|1[0-2])[./]([0-9]{4}|[0-9]{2})(?-u:\b)"
    ).unwrap();

    // Line breaks as produced by OCR engines, CRLF counted once
    pub static ref LINE_BREAK: Regex = Regex::new(r"\r\n|\r|\n").unwrap();
}
