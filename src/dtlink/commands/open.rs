use super::helpers::confirm_replace;
use super::{pull, CmdMessage, CmdResult, Prompter};
use crate::codec::link::{self, LinkTarget};
use crate::error::Result;
use crate::protocol::Transport;
use crate::session::Session;
use crate::sync::SyncClient;
use crate::workfile::WorkingCopy;
use std::path::Path;

/// Opens a shared link: fetches `?dt=<id>` links, unpacks inline ones locally.
pub fn run<T: Transport>(
    client: &SyncClient<T>,
    prompter: &mut dyn Prompter,
    link_text: &str,
    output: &Path,
) -> Result<CmdResult> {
    match link::parse(link_text)? {
        LinkTarget::Remote(id) => pull::run(client, prompter, &id, output),
        LinkTarget::Inline(dt) => {
            let mut result = CmdResult::default();
            if !confirm_replace(output, prompter, &mut result)? {
                return Ok(result);
            }
            let session = Session::from_template(dt);
            WorkingCopy::from_session(&session).save(output)?;
            result.add_message(CmdMessage::success(format!(
                "Opened inline DataTemplate into {}",
                output.display()
            )));
            Ok(result.with_view(session.view()))
        }
    }
}
