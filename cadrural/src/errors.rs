use std::borrow::Cow;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::EntityKind;

/// Top-level error type returned by cadrural stores, repositories and services.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Target entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// Invalid input supplied to a repository/search operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The value already exists on another entity.
    #[error("unique constraint violation: {field} '{value}' already exists on entity '{existing_entity_id}'")]
    UniqueConstraintViolation {
        field: String,
        value: String,
        existing_entity_id: String,
    },

    /// A document record exists but its stored file does not.
    #[error("stored file '{name}' not found")]
    FileMissing { name: String },

    /// Document file storage failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl RepoError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn other(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(format!("json error: {err}"))
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Messages grouped per field, in field order.
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.field.clone()).or_default().push(issue.message.clone());
        }
        grouped
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accumulates issues across fields so callers report every failure at once.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, code: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(field, code, message));
    }

    /// Records `message` when `failed` holds.
    pub fn check(&mut self, failed: bool, field: &str, code: &str, message: impl Into<String>) {
        if failed {
            self.push(field, code, message);
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }

    pub fn finish(self) -> ValidationResult<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_groups_messages_by_field() {
        let mut issues = IssueCollector::new();
        issues.push("nome", "validation.required", "nome is required");
        issues.check(true, "uf", "validation.length", "uf must have exactly 2 characters");
        issues.check(false, "uf", "validation.uppercase", "never recorded");
        issues.push("nome", "validation.length", "nome must be at most 255 characters");

        let err = issues.finish().expect_err("issues were recorded");
        let grouped = err.by_field();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["nome"].len(), 2);
        assert_eq!(grouped["uf"], vec!["uf must have exactly 2 characters".to_string()]);
    }

    #[test]
    fn empty_collector_passes() {
        assert!(IssueCollector::new().finish().is_ok());
    }
}
