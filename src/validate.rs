//! Runtime validation for inputs the type system can't rule out.
//!
//! Most of what the source implementation validates dynamically (metadata
//! value types, message structure) is instead enforced statically here by
//! [`crate::logs::Scalar`] and [`crate::logs::LogEntry`]. What remains is
//! parsing a [`MessageType`][crate::logs::MessageType] out of a caller-supplied
//! string, and `apply`'s "at least one of tags or metadata" rule.

use std::fmt;

/// An error produced while validating caller input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A string didn't match one of `"system"`, `"error"`, `"user"`.
    UnknownMessageType(String),
    /// `apply` was called with every optional source left unset.
    EmptyApply,
    /// A tag was empty or contained only whitespace.
    EmptyTag,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownMessageType(s) => {
                write!(f, "unknown message type `{s}`, expected one of system, error, user")
            }
            ValidationError::EmptyApply => {
                write!(f, "apply requires at least one of: tags, metadata")
            }
            ValidationError::EmptyTag => write!(f, "tags must be non-empty, non-whitespace strings"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Checks the "at least one source" rule for `apply`.
pub fn validate_apply<A, B>(tags: &Option<A>, metadata: &Option<B>) -> Result<(), ValidationError> {
    if tags.is_none() && metadata.is_none() {
        return Err(ValidationError::EmptyApply);
    }
    Ok(())
}

/// Checks that every tag is non-empty once trimmed.
pub fn validate_tags<S: AsRef<str>>(tags: &[S]) -> Result<(), ValidationError> {
    if tags.iter().any(|t| t.as_ref().trim().is_empty()) {
        return Err(ValidationError::EmptyTag);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_requires_at_least_one_source() {
        let none: Option<()> = None;
        assert_eq!(validate_apply(&none, &none), Err(ValidationError::EmptyApply));
        assert!(validate_apply(&Some(()), &none).is_ok());
    }

    #[test]
    fn tags_reject_blank_entries() {
        assert!(validate_tags(&["ok"]).is_ok());
        assert_eq!(validate_tags(&["  "]), Err(ValidationError::EmptyTag));
    }
}
