//! Dataset name validation.
//!
//! Valid names:
//! - Must start with an ASCII letter
//! - May continue with ASCII letters, digits, underscores (`_`), spaces and hyphens (`-`)
//!
//! Uniqueness is an exact string comparison, checked by the registry.

use crate::error::ValidationError;

/// Validates a dataset name against `^[A-Za-z][A-Za-z0-9_ -]*$`.
///
/// # Examples
/// ```
/// use dtlink::registry::validation::validate_dataset_name;
///
/// assert!(validate_dataset_name("Default").is_ok());
/// assert!(validate_dataset_name("Lab-1").is_ok());
/// assert!(validate_dataset_name("core site_2").is_ok());
///
/// assert!(validate_dataset_name("").is_err());
/// assert!(validate_dataset_name("1bad").is_err());
/// assert!(validate_dataset_name("a.b").is_err());
/// ```
pub fn validate_dataset_name(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Err(ValidationError::InvalidName(name.to_string())),
    }

    if chars.all(is_valid_name_char) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

fn is_valid_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == ' ' || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_dataset_name("Default").is_ok());
        assert!(validate_dataset_name("x").is_ok());
        assert!(validate_dataset_name("Lab-1").is_ok());
        assert!(validate_dataset_name("Site A_2").is_ok());
        assert!(validate_dataset_name("trailing-").is_ok());
        assert!(validate_dataset_name("a--b").is_ok());
    }

    #[test]
    fn test_invalid_start() {
        for name in ["1bad", "-x", "_x", " x", ""] {
            assert_eq!(
                validate_dataset_name(name),
                Err(ValidationError::InvalidName(name.to_string())),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate_dataset_name("a.b").is_err());
        assert!(validate_dataset_name("a\tb").is_err());
        assert!(validate_dataset_name("naïve").is_err());
        assert!(validate_dataset_name("a\"b").is_err());
    }
}
