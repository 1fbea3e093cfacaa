use super::helpers::open_copy;
use super::{CmdMessage, CmdResult};
use crate::codec::link::{inline_link, remote_link};
use crate::error::Result;
use std::path::Path;

/// The shareable link for a working copy: the remote link once pushed, a self-contained
/// inline link before that.
pub fn run(path: &Path, base: &str) -> Result<CmdResult> {
    let (copy, session) = open_copy(path)?;
    let mut result = CmdResult::default();

    let link = match session.remote_id() {
        Some(id) => {
            if copy.is_dirty() {
                result.add_message(CmdMessage::warning(
                    "Local changes are not in the linked copy yet; push first",
                ));
            }
            remote_link(base, id)?
        }
        None => inline_link(base, &session.snapshot())?,
    };
    Ok(result.with_output(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::link::{parse, LinkTarget};
    use crate::error::{DtError, ValidationError};
    use crate::model::DataTemplate;
    use crate::session::{Session, SyncRecord};
    use crate::workfile::WorkingCopy;
    use tempfile::tempdir;

    const BASE: &str = "https://dt.example.com/";

    #[test]
    fn test_unlinked_copy_gets_inline_link() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let dt = DataTemplate::single("a,b\n1,2", "", "{{ a }}");
        WorkingCopy::new(dt.clone()).save(&path).unwrap();

        let link = run(&path, BASE).unwrap().output.unwrap();
        assert_eq!(parse(&link).unwrap(), LinkTarget::Inline(dt));
    }

    #[test]
    fn test_linked_copy_gets_remote_link() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let record = SyncRecord {
            id: "abc".into(),
            revision: 1,
            hash: None,
            protected: false,
            updated: None,
        };
        let session = Session::linked(DataTemplate::default(), record, false);
        WorkingCopy::from_session(&session).save(&path).unwrap();

        let result = run(&path, BASE).unwrap();
        assert_eq!(result.output.unwrap(), "https://dt.example.com/?dt=abc");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_multi_dataset_cannot_inline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let mut session = Session::new();
        session.add_dataset("Lab").unwrap();
        WorkingCopy::from_session(&session).save(&path).unwrap();

        let err = run(&path, BASE).unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::NotInlinable)));
    }
}
