use super::helpers::open_copy;
use super::{CmdMessage, CmdResult, Prompter};
use crate::codec::export;
use crate::codec::wire::WirePayload;
use crate::decision::Decision;
use crate::error::Result;
use crate::model::DataTemplate;
use crate::session::Session;
use crate::workfile::WorkingCopy;
use std::path::Path;

/// Recognizes pasted text: the portable document, or a wire JSON payload.
///
/// Nothing is applied unless the whole text parses.
pub fn parse_pasted(text: &str) -> Result<DataTemplate> {
    if export::looks_like_export(text) {
        return Ok(export::parse(text)?);
    }
    Ok(WirePayload::from_json(text.trim())?.decode()?)
}

/// Replaces the content of `output` with a pasted DataTemplate. The result has no link.
pub fn run(text: &str, output: &Path, prompter: &mut dyn Prompter) -> Result<CmdResult> {
    let dt = parse_pasted(text)?;
    let mut result = CmdResult::default();

    let mut session = if output.exists() {
        open_copy(output)?.1
    } else {
        Session::new()
    };

    match session.paste(dt) {
        Decision::Done(()) => {}
        Decision::Confirm(pending) => {
            if !prompter.confirm(&pending.prompt) {
                result.add_message(CmdMessage::warning("Not Pasted"));
                return Ok(result.with_view(session.view()));
            }
            session.confirm_paste(pending);
        }
    }

    WorkingCopy::from_session(&session).save(output)?;
    result.add_message(CmdMessage::success(format!(
        "Pasted DataTemplate into {}",
        output.display()
    )));
    Ok(result.with_view(session.view()))
}
