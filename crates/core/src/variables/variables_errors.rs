use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::variables_model::{Category, Revision};

/// Which rule a [`Violation`] broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    DuplicateLabel,
    DuplicateId,
    EmptyLabel,
    DanglingParentReference,
    MissingParentReference,
    UnexpectedParentReference,
    OrphanReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the commit.
    Error,
    /// Reported to the caller, never blocks.
    Info,
}

/// A specific rule failure produced by the taxonomy validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn error(
        kind: ViolationKind,
        category: Category,
        option_id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            option_id: option_id.map(str::to_string),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn info(
        kind: ViolationKind,
        category: Category,
        option_id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(kind, category, option_id, message)
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Errors raised by the variables store, validator, codec and service.
#[derive(Error, Debug)]
pub enum VariablesError {
    #[error("No {category} option with id '{id}'")]
    NotFound { category: Category, id: String },

    #[error("Unknown category '{0}' (expected genres, subgenres, moods or eras)")]
    UnknownCategory(String),

    #[error("{}", summarize(.0))]
    ValidationFailed(Vec<Violation>),

    #[error("Genre '{id}' still has {} dependent subgenre(s)", .dependents.len())]
    HasDependents { id: String, dependents: Vec<String> },

    #[error("Variables changed concurrently (expected revision {expected}, current revision {current})")]
    Conflict { expected: Revision, current: Revision },

    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

impl VariablesError {
    /// The action a caller can take to get past this error, if there is one.
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            VariablesError::Conflict { .. } => {
                Some("Reload the latest variables and retry the change.")
            }
            VariablesError::HasDependents { .. } => {
                Some("Delete the subgenres first or confirm a cascade delete.")
            }
            VariablesError::ValidationFailed(_) => Some("Fix the listed violations and resubmit."),
            VariablesError::NotFound { .. }
            | VariablesError::UnknownCategory(_)
            | VariablesError::MalformedDocument(_) => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            VariablesError::ValidationFailed(violations) => violations,
            _ => &[],
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    match violations {
        [] => "Validation failed".to_string(),
        [only] => format!("Validation failed: {}", only.message),
        [first, rest @ ..] => format!(
            "Validation failed: {} (and {} more)",
            first.message,
            rest.len()
        ),
    }
}
