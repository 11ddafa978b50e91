#![forbid(unsafe_code)]

use std::fmt;

use crate::record::RecordId;

/// Errors produced while normalizing a raw inventory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required field is missing or cannot be interpreted.
    MalformedRecord {
        /// Record the failure belongs to.
        id: RecordId,
        /// Upstream field name, e.g. `Posted`.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
}

impl ParseError {
    pub(crate) fn malformed(id: &RecordId, field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.clone(),
            field,
            reason: reason.into(),
        }
    }

    /// The record the error refers to.
    pub fn record_id(&self) -> &RecordId {
        match self {
            Self::MalformedRecord { id, .. } => id,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord { id, field, reason } => {
                write!(f, "malformed record {id}: field `{field}` {reason}")
            }
        }
    }
}

impl std::error::Error for ParseError {}
