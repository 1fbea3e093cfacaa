use super::helpers::{confirm_replace, fetch_with_prompt};
use super::{CmdMessage, CmdResult, Prompter};
use crate::error::Result;
use crate::protocol::Transport;
use crate::session::Session;
use crate::sync::SyncClient;
use crate::workfile::WorkingCopy;
use std::path::Path;

/// Fetches a remote DataTemplate into a working copy at `output`.
pub fn run<T: Transport>(
    client: &SyncClient<T>,
    prompter: &mut dyn Prompter,
    id: &str,
    output: &Path,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    if !confirm_replace(output, prompter, &mut result)? {
        return Ok(result);
    }

    let mut session = Session::new();
    let summary = fetch_with_prompt(client, &mut session, id, prompter)?;
    WorkingCopy::from_session(&session).save(output)?;

    result.add_message(CmdMessage::success(format!(
        "Loaded {} into {}",
        summary.id,
        output.display()
    )));
    if summary.protected {
        result.add_message(CmdMessage::info("Password protected"));
    }
    Ok(result.with_view(session.view()))
}
