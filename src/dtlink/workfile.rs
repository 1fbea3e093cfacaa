//! # Working Copies
//!
//! The CLI keeps each DataTemplate in a local file: the portable export document, followed
//! by a `link:` block once the file has been synced with a remote copy.
//!
//! ```text
//! # dtlink DataTemplate
//!
//! ---
//! dt:
//!   ...
//!
//! link:
//!   id: mI4xRz0aQk2b
//!   revision: 3
//!   hash: 9f86d0...
//!   protected: false
//!   synced: 2c26b4...
//! ```
//!
//! `synced` is the checksum of the content as it was last written to (or read from) the
//! remote copy. A file whose content no longer matches it is dirty, which is what lets
//! `push` skip the network when nothing changed. Passwords are never written.

use crate::codec::export::{self, ExportStyle};
use crate::error::{DtError, EncodingError, Result};
use crate::model::DataTemplate;
use crate::session::{Session, SyncRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub template: DataTemplate,
    pub record: Option<SyncRecord>,
    synced: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkBlock {
    #[serde(flatten)]
    record: SyncRecord,
    synced: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Trailer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<LinkBlock>,
}

impl WorkingCopy {
    /// An unlinked copy.
    pub fn new(template: DataTemplate) -> Self {
        Self {
            template,
            record: None,
            synced: None,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        let mut copy = Self::new(DataTemplate::default());
        copy.update_from(session);
        copy
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(DtError::Io)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let template = export::parse(text)?;
        let trailer: Trailer =
            serde_yaml::from_str(text).map_err(|e| EncodingError::Malformed(e.to_string()))?;

        let (record, synced) = match trailer.link {
            Some(block) => (Some(block.record), Some(block.synced)),
            None => (None, None),
        };
        Ok(Self {
            template,
            record,
            synced,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(DtError::Io)?;
            }
        }
        fs::write(path, self.render()?).map_err(DtError::Io)?;
        Ok(())
    }

    pub fn render(&self) -> Result<String> {
        let mut out = export::export(&self.template, ExportStyle::Plain);
        let link = match (&self.record, &self.synced) {
            (Some(record), Some(synced)) => Some(LinkBlock {
                record: record.clone(),
                synced: synced.clone(),
            }),
            _ => None,
        };
        if link.is_some() {
            let trailer = serde_yaml::to_string(&Trailer { link })
                .map_err(|e| EncodingError::Malformed(e.to_string()))?;
            out.push('\n');
            out.push_str(&trailer);
        }
        Ok(out)
    }

    /// Changed since the last sync. Unlinked copies are always dirty.
    pub fn is_dirty(&self) -> bool {
        self.synced.as_deref() != Some(checksum(&self.template).as_str())
    }

    pub fn into_session(self) -> Session {
        let dirty = self.is_dirty();
        match self.record {
            Some(record) => Session::linked(self.template, record, dirty),
            None => Session::unsaved(self.template),
        }
    }

    /// Takes over the session's content and link. The sync checksum only moves when the
    /// session has nothing left to save.
    pub fn update_from(&mut self, session: &Session) {
        self.template = session.snapshot();
        self.record = session.sync_record();
        if self.record.is_none() {
            self.synced = None;
        } else if !session.is_dirty() {
            self.synced = Some(checksum(&self.template));
        }
    }
}

/// Content checksum over the portable form, so trailing whitespace does not count as a change.
pub fn checksum(dt: &DataTemplate) -> String {
    let text = export::export(dt, ExportStyle::Plain);
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> SyncRecord {
        SyncRecord {
            id: "abc123".into(),
            revision: 2,
            hash: Some("deadbeef".into()),
            protected: false,
            updated: None,
        }
    }

    #[test]
    fn test_unlinked_copy_has_no_trailer() {
        let copy = WorkingCopy::new(DataTemplate::single("a,b\n1,2", "", "{{ a }}"));
        let text = copy.render().unwrap();
        assert!(!text.contains("link:"));
        assert!(copy.is_dirty());

        let parsed = WorkingCopy::parse(&text).unwrap();
        assert_eq!(parsed, copy);
    }

    #[test]
    fn test_linked_copy_round_trip() {
        let dt = DataTemplate::single("a,b\n1,2", "x: 1", "{{ a }}");
        let session = Session::linked(dt.clone(), record(), false);
        let copy = WorkingCopy::from_session(&session);
        assert!(!copy.is_dirty());

        let text = copy.render().unwrap();
        assert!(text.contains("link:\n  id: abc123\n"));
        let parsed = WorkingCopy::parse(&text).unwrap();
        assert_eq!(parsed.template, dt);
        assert_eq!(parsed.record, Some(record()));
        assert!(!parsed.is_dirty());
    }

    #[test]
    fn test_hand_edit_makes_copy_dirty() {
        let session = Session::linked(DataTemplate::single("a,b\n1,2", "", "t"), record(), false);
        let text = WorkingCopy::from_session(&session).render().unwrap();
        let edited = text.replace("    1,2\n", "    1,3\n");

        let session = WorkingCopy::parse(&edited).unwrap().into_session();
        assert!(session.is_dirty());
        assert_eq!(session.remote_id(), Some("abc123"));
    }

    #[test]
    fn test_dirty_session_keeps_old_checksum() {
        let mut session = Session::linked(DataTemplate::single("a", "", "t"), record(), false);
        let mut copy = WorkingCopy::from_session(&session);
        session.edit_template("t2");
        copy.update_from(&session);
        assert!(copy.is_dirty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.dt.yml");
        let copy = WorkingCopy::new(DataTemplate::single("", "", "hello"));
        copy.save(&path).unwrap();
        assert_eq!(WorkingCopy::load(&path).unwrap(), copy);
    }

    #[test]
    fn test_not_a_document() {
        assert!(matches!(
            WorkingCopy::parse("just text"),
            Err(DtError::Encoding(EncodingError::Malformed(_)))
        ));
    }
}
