use super::{CmdMessage, CmdResult, Prompter};
use crate::error::{DtError, Result};
use crate::protocol::Transport;
use crate::session::Session;
use crate::sync::{FetchOutcome, LoadSummary, SaveOutcome, SyncClient};
use crate::workfile::WorkingCopy;
use std::path::Path;

/// Loads a working copy and the session it describes.
pub fn open_copy(path: &Path) -> Result<(WorkingCopy, Session)> {
    let copy = WorkingCopy::load(path)?;
    let session = copy.clone().into_session();
    Ok((copy, session))
}

/// Writes the session back over its working copy.
pub fn store_copy(path: &Path, copy: &mut WorkingCopy, session: &Session) -> Result<()> {
    copy.update_from(session);
    copy.save(path)
}

/// Asks before replacing a file holding changes that were never pushed.
///
/// Returns `Ok(false)` (with a warning in `result`) when the user declines.
pub fn confirm_replace(
    path: &Path,
    prompter: &mut dyn Prompter,
    result: &mut CmdResult,
) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let existing = WorkingCopy::load(path)?;
    if !existing.is_dirty() {
        return Ok(true);
    }
    let prompt = format!(
        "Unsaved changes in {} will be lost. Replace them?",
        path.display()
    );
    if prompter.confirm(&prompt) {
        return Ok(true);
    }
    result.add_message(CmdMessage::warning("Not Loaded"));
    Ok(false)
}

/// Fetches `id`, asking once for the open password if the store wants one.
pub fn fetch_with_prompt<T: Transport>(
    client: &SyncClient<T>,
    session: &mut Session,
    id: &str,
    prompter: &mut dyn Prompter,
) -> Result<LoadSummary> {
    let outcome = match client.fetch(session, id)? {
        FetchOutcome::PasswordRequired(prompt) => {
            let answer = prompter.password(&format!("Password for {}", prompt.id()));
            client.fetch_with_password(session, prompt, answer)?
        }
        other => other,
    };
    match outcome {
        FetchOutcome::Loaded(summary) => Ok(summary),
        // a second 401 after a password ends in an error above
        FetchOutcome::PasswordRequired(_) => Err(DtError::Unauthorized),
        FetchOutcome::Discarded => Err(DtError::Transport("load was superseded".to_string())),
    }
}

/// Keeps answering update password prompts until the store accepts or the user gives up.
pub fn save_with_prompt<T: Transport>(
    client: &SyncClient<T>,
    session: &mut Session,
    mut outcome: SaveOutcome,
    prompter: &mut dyn Prompter,
) -> Result<SaveOutcome> {
    while let SaveOutcome::PasswordRequired(prompt) = outcome {
        let question = if prompt.rejected {
            "Password rejected. Modify password"
        } else {
            "Modify password"
        };
        let answer = prompter.password(question);
        outcome = client.resume_update(session, prompt, answer)?;
    }
    Ok(outcome)
}
