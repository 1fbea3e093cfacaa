use super::helpers::{open_copy, store_copy};
use super::{CmdMessage, CmdResult, Prompter};
use crate::decision::Decision;
use crate::error::Result;
use std::path::Path;
use tracing::debug;

pub fn list(path: &Path) -> Result<CmdResult> {
    let (_, session) = open_copy(path)?;
    Ok(CmdResult::default().with_view(session.view()))
}

pub fn add(path: &Path, name: &str) -> Result<CmdResult> {
    let (mut copy, mut session) = open_copy(path)?;
    session.add_dataset(name)?;
    store_copy(path, &mut copy, &session)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Data Set '{}' added", name)));
    Ok(result.with_view(session.view()))
}

/// Removes a dataset. One holding data or variables is only removed after confirmation.
pub fn remove(path: &Path, name: &str, prompter: &mut dyn Prompter) -> Result<CmdResult> {
    let (mut copy, mut session) = open_copy(path)?;
    let mut result = CmdResult::default();

    let removal = match session.remove_dataset(name)? {
        Decision::Done(removal) => removal,
        Decision::Confirm(pending) => {
            if !prompter.confirm(&pending.prompt) {
                result.add_message(CmdMessage::info(format!("Data Set '{}' kept", name)));
                return Ok(result.with_view(session.view()));
            }
            session.confirm_remove(pending)?
        }
    };
    debug!(dataset = %removal.dataset.name, active_changed = removal.active_changed, "removed");
    store_copy(path, &mut copy, &session)?;

    result.add_message(CmdMessage::success(format!("Data Set '{}' removed", name)));
    Ok(result.with_view(session.view()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Scripted;
    use crate::error::{DtError, ValidationError};
    use crate::model::DataTemplate;
    use crate::workfile::WorkingCopy;
    use tempfile::tempdir;

    fn names(result: &CmdResult) -> Vec<String> {
        result.view.as_ref().unwrap().datasets.names.clone()
    }

    #[test]
    fn test_add_list_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        WorkingCopy::new(DataTemplate::single("h1,h2\nx,y", "", "{{h1}}"))
            .save(&path)
            .unwrap();

        add(&path, "Lab-1").unwrap();
        let err = add(&path, "Lab-1").unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::DuplicateName(_))));
        let err = add(&path, "1bad").unwrap_err();
        assert!(matches!(err, DtError::Validation(ValidationError::InvalidName(_))));

        assert_eq!(names(&list(&path).unwrap()), vec!["Default", "Lab-1"]);

        // empty dataset goes without asking
        let mut prompter = Scripted::default();
        let result = remove(&path, "Lab-1", &mut prompter).unwrap();
        assert!(prompter.asked.is_empty());
        assert_eq!(names(&result), vec!["Default"]);

        let copy = WorkingCopy::load(&path).unwrap();
        assert!(copy.template.is_single_form());
        assert_eq!(copy.template.registry.active().buffers.data, "h1,h2\nx,y");
    }

    #[test]
    fn test_remove_with_content_asks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        WorkingCopy::new(DataTemplate::single("h1\nx", "", "t")).save(&path).unwrap();
        add(&path, "Lab").unwrap();

        let result = remove(&path, "Default", &mut Scripted::confirms(&[false])).unwrap();
        assert_eq!(result.messages[0].content, "Data Set 'Default' kept");
        assert_eq!(names(&list(&path).unwrap()), vec!["Default", "Lab"]);

        remove(&path, "Default", &mut Scripted::confirms(&[true])).unwrap();
        assert_eq!(names(&list(&path).unwrap()), vec!["Lab"]);
    }

    #[test]
    fn test_remove_last_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        WorkingCopy::new(DataTemplate::default()).save(&path).unwrap();
        let err = remove(&path, "Default", &mut Scripted::default()).unwrap_err();
        assert!(matches!(
            err,
            DtError::Validation(ValidationError::LastDatasetRemaining)
        ));
    }
}
