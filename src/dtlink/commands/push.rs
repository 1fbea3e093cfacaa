use super::helpers::{open_copy, save_with_prompt, store_copy};
use super::{CmdMessage, CmdResult, Prompter};
use crate::codec::link::remote_link;
use crate::error::{DtError, Result};
use crate::protocol::Transport;
use crate::sync::{SaveOutcome, SyncClient};
use crate::workfile::WorkingCopy;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Create a fresh remote copy even when the file is already linked.
    pub new_link: bool,
    /// Overwrite a later remote revision without asking.
    pub force: bool,
}

/// Saves a working copy to the remote store: creates a link the first time, updates it after.
pub fn run<T: Transport>(
    client: &SyncClient<T>,
    prompter: &mut dyn Prompter,
    path: &Path,
    link_base: &str,
    options: PushOptions,
) -> Result<CmdResult> {
    let (mut copy, mut session) = open_copy(path)?;
    if options.new_link && !session.is_unsaved() {
        info!("detaching working copy from its link");
        copy = WorkingCopy::new(copy.template);
        session = copy.clone().into_session();
    }

    let mut result = CmdResult::default();
    let outcome = match client.save(&mut session) {
        Ok(outcome) => outcome,
        Err(DtError::Conflict { .. }) => {
            let pending = client.request_overwrite(&session)?;
            result.add_message(CmdMessage::warning("Remote DataTemplate is a Later Revision"));
            if !options.force && !prompter.confirm(&pending.prompt) {
                result.add_message(CmdMessage::warning("Not Updated"));
                return Ok(result.with_view(session.view()));
            }
            client.overwrite(&mut session, pending)?
        }
        Err(e) => return Err(e),
    };
    let outcome = save_with_prompt(client, &mut session, outcome, prompter)?;

    match outcome {
        SaveOutcome::Created { id } => {
            store_copy(path, &mut copy, &session)?;
            result.add_message(CmdMessage::success("Link Created"));
            result = result.with_output(remote_link(link_base, &id)?);
        }
        SaveOutcome::Updated { id, revision } => {
            store_copy(path, &mut copy, &session)?;
            result.add_message(CmdMessage::success(format!("Link Updated (revision {})", revision)));
            result = result.with_output(remote_link(link_base, &id)?);
        }
        SaveOutcome::NoChanges => {
            result.add_message(CmdMessage::info("No Changes Detected"));
        }
        SaveOutcome::NotUpdated | SaveOutcome::Discarded | SaveOutcome::PasswordRequired(_) => {
            result.add_message(CmdMessage::warning("Not Updated"));
        }
    }
    Ok(result.with_view(session.view()))
}
