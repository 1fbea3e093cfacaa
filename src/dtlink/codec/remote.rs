//! Body of a fetched remote document.
//!
//! The store keeps each document as YAML: the `dt:` block in the portable layout, followed
//! by bookkeeping keys.
//!
//! ```text
//! ---
//! dt:
//!   ...
//! revision: 3
//! dt_hash: "9f86d0..."
//! dt_password: "..."     (present when an open password is set)
//! dt_mpassword: "..."    (present when a modify password is set)
//! updated: "1718900000"
//! ```

use super::export::PlainTemplate;
use crate::error::EncodingError;
use crate::model::DataTemplate;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub template: DataTemplate,
    pub dt_hash: String,
    /// Absent on documents written before revisions were tracked.
    pub revision: Option<u64>,
    pub updated: Option<DateTime<Utc>>,
    /// A password of either kind is set server-side.
    pub protected: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteBody {
    dt: PlainTemplate,
    #[serde(default)]
    dt_hash: Option<String>,
    #[serde(default)]
    revision: Option<u64>,
    #[serde(default)]
    updated: Option<serde_yaml::Value>,
    #[serde(default)]
    dt_password: Option<String>,
    #[serde(default)]
    dt_mpassword: Option<String>,
}

impl RemoteDocument {
    pub fn parse(body: &str) -> Result<Self, EncodingError> {
        let raw: RemoteBody =
            serde_yaml::from_str(body).map_err(|e| EncodingError::Malformed(e.to_string()))?;

        let dt_hash = raw
            .dt_hash
            .filter(|h| !h.is_empty())
            .ok_or_else(|| EncodingError::Malformed("missing dt_hash".to_string()))?;

        Ok(Self {
            template: raw.dt.into_template()?,
            dt_hash,
            revision: raw.revision,
            updated: raw.updated.as_ref().and_then(parse_epoch),
            protected: raw.dt_password.is_some() || raw.dt_mpassword.is_some(),
        })
    }
}

/// `updated` is epoch seconds, written either as an integer or as a quoted string.
fn parse_epoch(value: &serde_yaml::Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        serde_yaml::Value::Number(n) => n.as_i64()?,
        serde_yaml::Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    DateTime::<Utc>::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "---\ndt:\n  data: |2\n    h1,h2\n    x,y\n\n  vars: \"\"\n\n  template: |2\n    {{ h1 }}\n\nrevision: 4\ndt_hash: \"abc123\"\nupdated: \"1700000000\"\n";

    #[test]
    fn test_parse_full_body() {
        let doc = RemoteDocument::parse(BODY).unwrap();
        assert_eq!(doc.template, DataTemplate::single("h1,h2\nx,y", "", "{{ h1 }}"));
        assert_eq!(doc.dt_hash, "abc123");
        assert_eq!(doc.revision, Some(4));
        assert_eq!(doc.updated.unwrap().timestamp(), 1_700_000_000);
        assert!(!doc.protected);
    }

    #[test]
    fn test_protection_flags() {
        let body = format!("{}dt_mpassword: \"0102\"\n", BODY);
        assert!(RemoteDocument::parse(&body).unwrap().protected);
    }

    #[test]
    fn test_revision_and_updated_optional() {
        let body = "---\ndt:\n  template: \"\"\ndt_hash: \"h\"\nupdated: 1700000000\n";
        let doc = RemoteDocument::parse(body).unwrap();
        assert_eq!(doc.revision, None);
        assert!(doc.updated.is_some());
    }

    #[test]
    fn test_missing_hash_is_malformed() {
        let body = "---\ndt:\n  template: \"\"\n";
        assert!(matches!(
            RemoteDocument::parse(body),
            Err(EncodingError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let body = format!("{}remote_addr: \"10.0.0.1\"\nuser_agent: \"x\"\n", BODY);
        assert!(RemoteDocument::parse(&body).is_ok());
    }
}
