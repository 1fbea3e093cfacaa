use super::helpers::open_copy;
use super::CmdResult;
use crate::codec::export::{self, ExportStyle};
use crate::codec::wire::WirePayload;
use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The portable document, in the given style
    Document(ExportStyle),
    /// The JSON payload sent to the remote store
    Wire,
}

/// Produces the shareable text of a working copy, without its link block.
pub fn run(path: &Path, format: ExportFormat) -> Result<CmdResult> {
    let (_, session) = open_copy(path)?;
    let dt = session.snapshot();
    let text = match format {
        ExportFormat::Document(style) => export::export(&dt, style),
        ExportFormat::Wire => WirePayload::encode(&dt).to_json()?,
    };
    Ok(CmdResult::default().with_output(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataTemplate;
    use crate::session::{Session, SyncRecord};
    use crate::workfile::WorkingCopy;
    use tempfile::tempdir;

    #[test]
    fn test_export_strips_link() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let record = SyncRecord {
            id: "abc".into(),
            revision: 2,
            hash: None,
            protected: false,
            updated: None,
        };
        let dt = DataTemplate::single("a<b\n1", "", "{{ a }}");
        WorkingCopy::from_session(&Session::linked(dt.clone(), record, false))
            .save(&path)
            .unwrap();

        let plain = run(&path, ExportFormat::Document(ExportStyle::Plain)).unwrap().output.unwrap();
        assert!(!plain.contains("link:"));
        assert_eq!(export::parse(&plain).unwrap(), dt);

        let html = run(&path, ExportFormat::Document(ExportStyle::Html)).unwrap().output.unwrap();
        assert!(html.contains("a&lt;b"));

        let wire = run(&path, ExportFormat::Wire).unwrap().output.unwrap();
        assert_eq!(WirePayload::from_json(&wire).unwrap().decode().unwrap(), dt);
    }
}
