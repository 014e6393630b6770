//! Schema-layer persistence base for traceline analysis records.
//! This crate is the single source of truth for write-path invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod record;
pub mod session;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::job_event::{JobEvent, JobEventId, JobState};
pub use record::{FieldValue, Persistable, Record};
pub use session::{
    PersistenceError, Session, SessionError, SessionResult, SqliteSession, ViolationKind,
};

/// Returns the schema crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
