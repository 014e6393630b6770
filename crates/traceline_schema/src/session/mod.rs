//! Session contract and write-path error taxonomy.
//!
//! # Responsibility
//! - Define the four-operation session boundary records are persisted through.
//! - Normalize backend-specific integrity violations into one catchable kind.
//!
//! # Invariants
//! - `add`/`merge` only stage; no backing-store I/O happens before `flush`.
//! - Integrity violations always surface as `PersistenceError`; every other
//!   backend failure passes through unmodified.
//!
//! # See also
//! - docs/architecture/persistence.md

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::db::DbError;
use crate::record::Record;

mod sqlite;

pub use sqlite::SqliteSession;

pub type SessionResult<T> = Result<T, SessionError>;

/// Category of a violated schema constraint.
///
/// Tagged so callers can match on the violation class instead of parsing the
/// backend's message vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Unique index or primary key collision.
    Unique,
    /// NOT NULL column received no value.
    NotNull,
    /// Referenced row is missing.
    ForeignKey,
    /// CHECK constraint evaluated false.
    Check,
    /// Constraint class the backend did not identify further.
    Other,
}

impl ViolationKind {
    /// Stable lowercase token used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::NotNull => "not_null",
            Self::ForeignKey => "foreign_key",
            Self::Check => "check",
            Self::Other => "other",
        }
    }
}

/// Unified schema-integrity violation raised at flush/commit time.
///
/// Terminal representation of the failure: carries the violation category and
/// a detail string derived from the underlying cause, never constructed
/// without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceError {
    /// Violation category for pattern matching.
    pub kind: ViolationKind,
    /// Description derived from the backing store's violation message.
    pub detail: String,
}

impl PersistenceError {
    /// Creates a violation from its category and underlying description.
    pub fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PersistenceError: {}", self.detail)
    }
}

impl Error for PersistenceError {}

/// Error surface of session operations.
#[derive(Debug)]
pub enum SessionError {
    /// Schema constraint violation, normalized across backends.
    Integrity(PersistenceError),
    /// Backend failure unrelated to schema integrity, passed through.
    Db(DbError),
    /// Record broke the staging contract (no fields, merge without identity).
    InvalidRecord(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integrity(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidRecord(message) => write!(f, "invalid record: {message}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Integrity(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidRecord(_) => None,
        }
    }
}

impl From<PersistenceError> for SessionError {
    fn from(value: PersistenceError) -> Self {
        Self::Integrity(value)
    }
}

impl From<DbError> for SessionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence session borrowed by records for the duration of one call.
///
/// Single-owner and single-threaded: the contract does not define concurrent
/// use, and a batched (staged but unflushed) window must be resolved before
/// the session is reused for unrelated work.
pub trait Session {
    /// Stages `record` for insertion. No backing-store I/O.
    fn add(&mut self, record: &dyn Record) -> SessionResult<()>;

    /// Stages `record` for insert-or-update addressed by its identity
    /// columns. No backing-store I/O.
    fn merge(&mut self, record: &dyn Record) -> SessionResult<()>;

    /// Sends every staged write to the backing store, in staging order.
    ///
    /// # Errors
    /// Surfaces schema constraint violations as `SessionError::Integrity`.
    fn flush(&mut self) -> SessionResult<()>;

    /// Durably finalizes the current transaction boundary.
    fn commit(&mut self) -> SessionResult<()>;
}

#[cfg(test)]
mod tests {
    use super::{DbError, PersistenceError, SessionError, ViolationKind};
    use std::error::Error;

    #[test]
    fn persistence_error_display_is_stable() {
        let err = PersistenceError::new(
            ViolationKind::Unique,
            "UNIQUE constraint failed: subscriber.email",
        );
        assert_eq!(
            err.to_string(),
            "PersistenceError: UNIQUE constraint failed: subscriber.email"
        );
    }

    #[test]
    fn violation_kind_tokens_are_lowercase() {
        assert_eq!(ViolationKind::Unique.as_str(), "unique");
        assert_eq!(ViolationKind::NotNull.as_str(), "not_null");
        assert_eq!(ViolationKind::ForeignKey.as_str(), "foreign_key");
        assert_eq!(ViolationKind::Check.as_str(), "check");
        assert_eq!(ViolationKind::Other.as_str(), "other");
    }

    #[test]
    fn session_error_exposes_integrity_source() {
        let err = SessionError::from(PersistenceError::new(ViolationKind::Check, "range"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "PersistenceError: range");
    }

    #[test]
    fn backend_failures_pass_through_unmodified() {
        let backend = rusqlite::Error::InvalidQuery;
        let message = backend.to_string();
        let err = SessionError::from(backend);
        assert!(matches!(err, SessionError::Db(DbError::Sqlite(_))));
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn invalid_record_has_no_source() {
        let err = SessionError::InvalidRecord("merge requires identity columns".to_string());
        assert!(err.source().is_none());
        assert_eq!(
            err.to_string(),
            "invalid record: merge requires identity columns"
        );
    }
}
