use super::helpers::{open_copy, save_with_prompt, store_copy};
use super::{CmdMessage, CmdResult, Prompter};
use crate::error::Result;
use crate::passwords::ProtectRequest;
use crate::protocol::Transport;
use crate::sync::{SaveOutcome, SyncClient};
use std::path::Path;

/// Sets open and/or modify passwords on the remote copy of a working copy.
///
/// Any unsaved edits in the file go up with the same update.
pub fn run<T: Transport>(
    client: &SyncClient<T>,
    prompter: &mut dyn Prompter,
    path: &Path,
    request: ProtectRequest,
) -> Result<CmdResult> {
    let (mut copy, mut session) = open_copy(path)?;
    let wants_modify = request.modify().is_some();
    session.protect(request)?;

    let outcome = client.update(&mut session)?;
    let outcome = save_with_prompt(client, &mut session, outcome, prompter)?;

    let mut result = CmdResult::default();
    match outcome {
        SaveOutcome::Updated { .. } => {
            store_copy(path, &mut copy, &session)?;
            result.add_message(CmdMessage::success("Passwords Set"));
            if !wants_modify {
                result.add_message(CmdMessage::info(
                    "The open password also protects against changes",
                ));
            }
        }
        _ => result.add_message(CmdMessage::warning("Passwords Not Set")),
    }
    Ok(result.with_view(session.view()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Scripted;
    use crate::error::{DtError, ValidationError};
    use crate::model::DataTemplate;
    use crate::protocol::memory::MemoryRemote;
    use crate::session::Session;
    use crate::workfile::WorkingCopy;
    use tempfile::tempdir;

    fn linked_file(client: &SyncClient<MemoryRemote>, path: &Path) {
        let mut session = Session::new();
        client.fetch(&mut session, "doc1").unwrap();
        WorkingCopy::from_session(&session).save(path).unwrap();
    }

    #[test]
    fn test_protect_sets_passwords() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let remote = MemoryRemote::new();
        remote.seed("doc1", &DataTemplate::single("", "", "t"), 1, None, None);
        let client = SyncClient::new(remote);
        linked_file(&client, &path);

        let request = ProtectRequest::from_entries(("open", "open"), ("", "")).unwrap();
        let result = run(&client, &mut Scripted::default(), &path, request).unwrap();
        assert_eq!(result.messages[0].content, "Passwords Set");

        let record = WorkingCopy::load(&path).unwrap().record.unwrap();
        assert!(record.protected);
        assert_eq!(record.revision, 2);
        let stored = client.transport().document("doc1").unwrap();
        assert!(stored.contains("dt_password: "));
    }

    #[test]
    fn test_protect_twice_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let remote = MemoryRemote::new();
        remote.seed("doc1", &DataTemplate::single("", "", "t"), 1, None, Some("m"));
        let client = SyncClient::new(remote);
        linked_file(&client, &path);

        let request = ProtectRequest::new(Some("x".into()), None).unwrap();
        let err = run(&client, &mut Scripted::default(), &path, request).unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::ProtectUnavailable)));
    }

    #[test]
    fn test_protect_unlinked_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        WorkingCopy::new(DataTemplate::default()).save(&path).unwrap();
        let client = SyncClient::new(MemoryRemote::new());

        let request = ProtectRequest::new(Some("x".into()), None).unwrap();
        let err = run(&client, &mut Scripted::default(), &path, request).unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::NoRemoteCopy)));
        assert_eq!(client.transport().request_count(), 0);
    }
}
