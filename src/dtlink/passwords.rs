//! Open/modify password entry.
//!
//! A document may carry an *open* password (needed to fetch it) and a *modify* password
//! (needed to update it). When only the open password is set it gates both. Every password
//! the user sets is typed twice and both entries must match exactly.

use crate::error::ValidationError;
use std::fmt;

/// Checks an "enter + confirm" pair.
///
/// Returns `Ok(None)` when both entries are empty (the user chose not to set this password).
pub fn confirm_password(entry: &str, confirmation: &str) -> Result<Option<String>, ValidationError> {
    if entry != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    if entry.is_empty() {
        return Ok(None);
    }
    if entry.trim().is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(Some(entry.to_string()))
}

/// Normalizes the answer to a "password required" prompt.
///
/// An abandoned prompt and a blank answer both mean "give up".
pub fn prompt_answer(answer: Option<String>) -> Option<String> {
    answer.filter(|a| !a.trim().is_empty())
}

/// Passwords the user asked to set on a remote document.
#[derive(Clone, PartialEq, Eq)]
pub struct ProtectRequest {
    open: Option<String>,
    modify: Option<String>,
}

impl ProtectRequest {
    /// At least one password is required. A modify password equal to the open password adds
    /// nothing and is dropped.
    pub fn new(open: Option<String>, modify: Option<String>) -> Result<Self, ValidationError> {
        let modify = match (&open, modify) {
            (Some(o), Some(m)) if *o == m => None,
            (_, m) => m,
        };
        if open.is_none() && modify.is_none() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(Self { open, modify })
    }

    /// Builds a request from the two "enter + confirm" pairs of the protect dialog.
    pub fn from_entries(open: (&str, &str), modify: (&str, &str)) -> Result<Self, ValidationError> {
        let open = confirm_password(open.0, open.1)?;
        let modify = confirm_password(modify.0, modify.1)?;
        Self::new(open, modify)
    }

    pub fn open(&self) -> Option<&str> {
        self.open.as_deref()
    }

    pub fn modify(&self) -> Option<&str> {
        self.modify.as_deref()
    }

    /// The password that will gate updates once this request is accepted.
    pub fn effective_modify(&self) -> Option<&str> {
        self.modify().or(self.open())
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.open, self.modify)
    }
}

impl fmt::Debug for ProtectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectRequest")
            .field("open", &self.open.as_ref().map(|_| "<redacted>"))
            .field("modify", &self.modify.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_password() {
        assert_eq!(confirm_password("s3cret", "s3cret"), Ok(Some("s3cret".into())));
        assert_eq!(confirm_password("", ""), Ok(None));
        assert_eq!(
            confirm_password("s3cret", "s3cre"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(confirm_password("  ", "  "), Err(ValidationError::EmptyPassword));
    }

    #[test]
    fn test_prompt_answer() {
        assert_eq!(prompt_answer(None), None);
        assert_eq!(prompt_answer(Some(" \t".into())), None);
        assert_eq!(prompt_answer(Some("pw".into())), Some("pw".into()));
    }

    #[test]
    fn test_protect_request_requires_a_password() {
        assert_eq!(
            ProtectRequest::new(None, None),
            Err(ValidationError::EmptyPassword)
        );
        assert_eq!(
            ProtectRequest::from_entries(("", ""), ("", "")),
            Err(ValidationError::EmptyPassword)
        );
    }

    #[test]
    fn test_identical_modify_password_dropped() {
        let req = ProtectRequest::new(Some("a".into()), Some("a".into())).unwrap();
        assert_eq!(req.open(), Some("a"));
        assert_eq!(req.modify(), None);
        assert_eq!(req.effective_modify(), Some("a"));
    }

    #[test]
    fn test_mismatch_in_either_pair_rejected() {
        assert_eq!(
            ProtectRequest::from_entries(("a", "a"), ("b", "c")),
            Err(ValidationError::PasswordMismatch)
        );
        let req = ProtectRequest::from_entries(("", ""), ("m", "m")).unwrap();
        assert_eq!(req.open(), None);
        assert_eq!(req.effective_modify(), Some("m"));
    }

    #[test]
    fn test_debug_redacts() {
        let req = ProtectRequest::new(Some("hunter2".into()), None).unwrap();
        let printed = format!("{:?}", req);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("redacted"));
    }
}
