//! # Codecs
//!
//! Text representations of a [`crate::model::DataTemplate`]:
//!
//! - [`wire`]: the JSON payload stored remotely (single and multi-dataset forms)
//! - [`render`]: the payload handed to the rendering engine for the active dataset
//! - [`export`]: the portable YAML-flavored document used for files and the clipboard
//! - [`remote`]: the document body returned by a fetch
//! - [`link`]: deep links, either a remote id or a fully inline DataTemplate
//!
//! Every decoder either returns a complete value or an error. Nothing is applied to a
//! session until decoding has fully succeeded.

pub mod export;
pub mod link;
pub mod remote;
pub mod render;
pub mod wire;

use crate::error::EncodingError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Tabs become two spaces in templates and variables.
pub fn expand_tabs(text: &str) -> String {
    text.replace('\t', "  ")
}

pub fn encode_field(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decodes one base64 field. An absent or whitespace-only field is the empty string.
pub fn decode_field(field: &str, name: &str) -> Result<String, EncodingError> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let bytes = STANDARD
        .decode(trimmed)
        .map_err(|e| EncodingError::BadEncoding(format!("{}: {}", name, e)))?;
    String::from_utf8(bytes).map_err(|e| EncodingError::BadEncoding(format!("{}: {}", name, e)))
}

/// True for lines the renderer ignores: blank, or `#` after optional whitespace.
pub fn is_ignored_row(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Drops blank and comment lines from tabular data.
pub fn filter_data_rows(data: &str) -> String {
    data.lines()
        .filter(|line| !is_ignored_row(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_blank_field() {
        assert_eq!(decode_field("", "data").unwrap(), "");
        assert_eq!(decode_field("  \n", "data").unwrap(), "");
    }

    #[test]
    fn test_decode_bad_field() {
        let err = decode_field("not base64!", "vars").unwrap_err();
        assert!(matches!(err, EncodingError::BadEncoding(ref m) if m.starts_with("vars")));

        // valid base64, invalid UTF-8
        let err = decode_field(&STANDARD.encode([0xff, 0xfe]), "data").unwrap_err();
        assert!(matches!(err, EncodingError::BadEncoding(_)));
    }

    #[test]
    fn test_filter_data_rows() {
        let data = "h1,h2\n\n# comment\n   # indented\nx,y\n  \nz,w";
        assert_eq!(filter_data_rows(data), "h1,h2\nx,y\nz,w");
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("a:\n\tb: 1"), "a:\n  b: 1");
    }
}
