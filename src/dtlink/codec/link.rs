//! Deep links.
//!
//! A link either names a remote document (`?dt=<id>`) or carries a whole single-dataset
//! DataTemplate inline (`?data=..&template=..&vars=..`, each base64). Query keys are matched
//! case-insensitively and consumed once, when the link is opened.

use super::{decode_field, encode_field, expand_tabs};
use crate::error::{DtError, EncodingError, Result, ValidationError};
use crate::model::DataTemplate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::HashMap;

static REMOTE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,24}$").expect("remote id pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Remote(String),
    Inline(DataTemplate),
}

pub fn validate_remote_id(id: &str) -> std::result::Result<(), ValidationError> {
    if REMOTE_ID.is_match(id) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRemoteId(id.to_string()))
    }
}

/// Accepts a full URL, a bare query string (with or without `?`), or a bare remote id.
pub fn parse(link: &str) -> Result<LinkTarget> {
    let link = link.trim();
    if REMOTE_ID.is_match(link) {
        return Ok(LinkTarget::Remote(link.to_string()));
    }

    let params = query_params(link)?;

    if let Some(id) = params.get("dt") {
        validate_remote_id(id)?;
        return Ok(LinkTarget::Remote(id.clone()));
    }

    if !["data", "template", "vars"].iter().any(|k| params.contains_key(*k)) {
        return Err(EncodingError::Malformed("link carries no DataTemplate".to_string()).into());
    }

    let field = |key: &str| -> std::result::Result<String, EncodingError> {
        // '+' arrives as a space after query decoding
        let raw = params.get(key).map(|v| v.replace(' ', "+")).unwrap_or_default();
        decode_field(&raw, key)
    };
    let dt = DataTemplate::single(field("data")?, field("vars")?, field("template")?);
    Ok(LinkTarget::Inline(dt))
}

/// `<base>?dt=<id>`
pub fn remote_link(base: &str, id: &str) -> Result<String> {
    validate_remote_id(id)?;
    let mut url = parse_base(base)?;
    url.query_pairs_mut().clear().append_pair("dt", id);
    Ok(url.to_string())
}

/// A self-contained link. Only single-form DataTemplates can be inlined.
pub fn inline_link(base: &str, dt: &DataTemplate) -> Result<String> {
    if !dt.is_single_form() {
        return Err(ValidationError::NotInlinable.into());
    }
    let buffers = &dt.registry.active().buffers;
    let mut url = parse_base(base)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("data", &encode_field(&buffers.data))
        .append_pair("template", &encode_field(&expand_tabs(&dt.template)))
        .append_pair("vars", &encode_field(&expand_tabs(&buffers.vars)));
    Ok(url.to_string())
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| DtError::Config(format!("Invalid server URL '{}': {}", base, e)))
}

fn query_params(link: &str) -> Result<HashMap<String, String>> {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(_) => {
            let query = link.trim_start_matches('?');
            Url::parse(&format!("http://localhost/?{}", query))
                .map_err(|e| EncodingError::Malformed(format!("unreadable link: {}", e)))?
        }
    };
    Ok(url
        .query_pairs()
        .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_link_forms() {
        let expected = LinkTarget::Remote("Ab3_x-9".into());
        assert_eq!(parse("https://dt.example.com/?dt=Ab3_x-9").unwrap(), expected);
        assert_eq!(parse("?DT=Ab3_x-9").unwrap(), expected);
        assert_eq!(parse("Ab3_x-9").unwrap(), expected);
    }

    #[test]
    fn test_remote_id_validation() {
        assert!(validate_remote_id("abcdefghijkl").is_ok());
        assert!(validate_remote_id("").is_err());
        assert!(validate_remote_id("has space").is_err());
        assert!(validate_remote_id(&"a".repeat(25)).is_err());

        let err = parse("https://dt.example.com/?dt=../../etc").unwrap_err();
        assert!(matches!(
            err,
            DtError::Validation(ValidationError::InvalidRemoteId(_))
        ));
    }

    #[test]
    fn test_inline_round_trip() {
        // '>' and '?' produce '+' and '/' in base64
        let dt = DataTemplate::single("h1,h2\nx,y", "a: >>>", "{{ h1 }}???");
        let link = inline_link("https://dt.example.com/", &dt).unwrap();
        assert_eq!(parse(&link).unwrap(), LinkTarget::Inline(dt));
    }

    #[test]
    fn test_inline_with_literal_plus_turned_into_space() {
        let encoded = encode_field("a: >>>");
        assert!(encoded.contains('+'));
        let raw = format!("?vars={}&template=", encoded.replace('+', " "));
        match parse(&raw).unwrap() {
            LinkTarget::Inline(dt) => assert_eq!(dt.registry.active().buffers.vars, "a: >>>"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_multi_dataset_not_inlinable() {
        let mut dt = DataTemplate::single("", "", "t");
        dt.registry.add("Lab").unwrap();
        assert!(matches!(
            inline_link("https://dt.example.com/", &dt),
            Err(DtError::Validation(ValidationError::NotInlinable))
        ));
    }

    #[test]
    fn test_link_without_payload() {
        assert!(matches!(
            parse("https://dt.example.com/?foo=bar"),
            Err(DtError::Encoding(EncodingError::Malformed(_)))
        ));
    }

    #[test]
    fn test_remote_link_building() {
        assert_eq!(
            remote_link("https://dt.example.com/", "abc").unwrap(),
            "https://dt.example.com/?dt=abc"
        );
    }
}
