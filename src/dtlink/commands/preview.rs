use super::helpers::open_copy;
use super::{CmdMessage, CmdResult};
use crate::codec::render::RenderPayload;
use crate::csv;
use crate::error::Result;
use crate::session::Session;
use std::path::Path;

fn session_for(path: &Path, dataset: Option<&str>) -> Result<Session> {
    let (_, mut session) = open_copy(path)?;
    if let Some(name) = dataset {
        session.switch_dataset(name, true)?;
    }
    Ok(session)
}

/// Splits the data of one dataset (the first by default) into a table.
pub fn run(path: &Path, dataset: Option<&str>) -> Result<CmdResult> {
    let session = session_for(path, dataset)?;
    let mut result = CmdResult::default().with_view(session.view());

    match csv::preview(&session.editor().data) {
        Some(preview) => {
            let mismatched = preview.mismatched_rows();
            if mismatched > 0 {
                result.add_message(CmdMessage::warning(format!(
                    "{} row(s) do not match the header ({} fields)",
                    mismatched,
                    preview.header.len()
                )));
            }
            Ok(result.with_preview(preview))
        }
        None => {
            result.add_message(CmdMessage::info("No Data"));
            Ok(result)
        }
    }
}

/// The JSON payload the rendering engine would receive for one dataset.
pub fn render(path: &Path, dataset: Option<&str>) -> Result<CmdResult> {
    let session = session_for(path, dataset)?;
    let payload = RenderPayload::build(&session)?;

    let mut result = CmdResult::default().with_output(payload.to_json()?);
    if payload.needs_vault_password() {
        result.add_message(CmdMessage::warning(
            "Variables contain vaulted values; the renderer will need a vault password",
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::Delimiter;
    use crate::error::{DtError, ValidationError};
    use crate::model::{BufferPair, DataTemplate, Dataset};
    use crate::registry::DatasetRegistry;
    use crate::workfile::WorkingCopy;
    use tempfile::tempdir;

    fn write(dir: &Path, dt: DataTemplate) -> std::path::PathBuf {
        let path = dir.join("doc.yml");
        WorkingCopy::new(dt).save(&path).unwrap();
        path
    }

    #[test]
    fn test_preview_flags_short_rows() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), DataTemplate::single("a,b,c\n1,2,3\n4,5", "", "t"));

        let result = run(&path, None).unwrap();
        let preview = result.preview.unwrap();
        assert_eq!(preview.delimiter, Delimiter::Comma);
        assert_eq!(preview.rows.len(), 2);
        assert!(preview.rows[1].mismatched);
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn test_preview_other_dataset() {
        let dir = tempdir().unwrap();
        let registry = DatasetRegistry::from_datasets(vec![
            Dataset::new("Default", BufferPair::new("a,b\n1,2", "")),
            Dataset::new("Lab", BufferPair::new("x\ty\n1\t2", "")),
        ])
        .unwrap();
        let path = write(dir.path(), DataTemplate::new(registry, "t"));

        let preview = run(&path, Some("Lab")).unwrap().preview.unwrap();
        assert_eq!(preview.delimiter, Delimiter::Whitespace);
        assert!(run(&path, Some("Nope")).is_err());
    }

    #[test]
    fn test_render_payload_rules() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), DataTemplate::single("a\n# only a comment\n1", "", ""));
        let err = render(&path, None).unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::EmptyTemplate)));

        let path = write(dir.path(), DataTemplate::single("a\n# only a comment\n", "", "t"));
        let err = render(&path, None).unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::NotEnoughDataRows)));

        let path = write(
            dir.path(),
            DataTemplate::single("a\n1", "pw: !vault |\n  $ANSIBLE_VAULT;1.1;AES256", "t"),
        );
        let result = render(&path, None).unwrap();
        assert!(result.output.unwrap().contains("\"dataset\":\"Default\""));
        assert_eq!(result.messages.len(), 1);
    }
}
