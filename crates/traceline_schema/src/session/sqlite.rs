//! SQLite-backed session with staged writes.
//!
//! # Responsibility
//! - Turn record field listings into staged INSERT/upsert statements.
//! - Execute staged writes transactionally and normalize constraint failures.
//!
//! # Invariants
//! - Staging never touches the connection; I/O starts at `flush`.
//! - A failed flush rolls back and clears the queue, returning the borrowed
//!   connection clean.
//! - A session dropped with an open transaction rolls back.

use std::time::Instant;

use log::{error, info};
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode};

use crate::db::DbError;
use crate::record::{FieldValue, Record};

use super::{PersistenceError, Session, SessionError, SessionResult, ViolationKind};

/// One staged write: statement text plus its bind values, snapshotted at
/// staging time so the record is not borrowed past the call.
#[derive(Debug)]
struct StagedWrite {
    table: &'static str,
    op: &'static str,
    sql: String,
    params: Vec<FieldValue>,
}

/// Session implementation over a borrowed SQLite connection.
///
/// The connection stays owned by the caller; the session only opens and
/// resolves one deferred transaction around the staged writes.
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
    staged: Vec<StagedWrite>,
    tx_open: bool,
}

impl<'conn> SqliteSession<'conn> {
    /// Creates a session over the caller-owned connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            staged: Vec::new(),
            tx_open: false,
        }
    }

    /// Number of writes currently staged and not yet flushed.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    fn begin_if_needed(&mut self) -> SessionResult<()> {
        if self.tx_open {
            return Ok(());
        }
        self.conn.execute_batch("BEGIN DEFERRED;")?;
        self.tx_open = true;
        Ok(())
    }

    fn rollback(&mut self) {
        if !self.tx_open {
            return;
        }
        match self.conn.execute_batch("ROLLBACK;") {
            Ok(()) => info!("event=session_rollback module=session status=ok"),
            Err(err) => {
                error!("event=session_rollback module=session status=error error={err}");
            }
        }
        self.tx_open = false;
    }
}

impl Session for SqliteSession<'_> {
    fn add(&mut self, record: &dyn Record) -> SessionResult<()> {
        self.staged.push(insert_write(record)?);
        Ok(())
    }

    fn merge(&mut self, record: &dyn Record) -> SessionResult<()> {
        self.staged.push(merge_write(record)?);
        Ok(())
    }

    fn flush(&mut self) -> SessionResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        self.begin_if_needed()?;
        let staged = std::mem::take(&mut self.staged);

        for write in &staged {
            if let Err(err) = self
                .conn
                .execute(&write.sql, params_from_iter(write.params.iter()))
            {
                self.rollback();
                return Err(flush_failure(write, err, &started_at));
            }
        }

        info!(
            "event=session_flush module=session status=ok staged={} duration_ms={}",
            staged.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn commit(&mut self) -> SessionResult<()> {
        self.flush()?;
        if !self.tx_open {
            return Ok(());
        }

        let started_at = Instant::now();
        if let Err(err) = self.conn.execute_batch("COMMIT;") {
            // A failed COMMIT leaves the transaction state backend-defined;
            // force a known-clean connection before surfacing the error.
            self.rollback();
            return Err(commit_failure(err, &started_at));
        }
        self.tx_open = false;

        info!(
            "event=session_commit module=session status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

impl Drop for SqliteSession<'_> {
    fn drop(&mut self) {
        self.staged.clear();
        self.rollback();
    }
}

fn insert_write(record: &dyn Record) -> SessionResult<StagedWrite> {
    let table = record.table();
    let fields = record.fields();
    if fields.is_empty() {
        return Err(SessionError::InvalidRecord(format!(
            "`{table}` record lists no fields"
        )));
    }

    let columns: Vec<&'static str> = fields.iter().map(|(column, _)| *column).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(", "),
        placeholders(columns.len())
    );

    Ok(StagedWrite {
        table,
        op: "insert",
        sql,
        params: fields.into_iter().map(|(_, value)| value).collect(),
    })
}

fn merge_write(record: &dyn Record) -> SessionResult<StagedWrite> {
    let table = record.table();
    let fields = record.fields();
    if fields.is_empty() {
        return Err(SessionError::InvalidRecord(format!(
            "`{table}` record lists no fields"
        )));
    }

    let keys = record.key_columns();
    if keys.is_empty() {
        return Err(SessionError::InvalidRecord(format!(
            "merge into `{table}` requires identity columns"
        )));
    }
    for key in keys {
        if !fields.iter().any(|(column, _)| column == key) {
            return Err(SessionError::InvalidRecord(format!(
                "identity column `{key}` is not in the `{table}` field listing"
            )));
        }
    }

    let columns: Vec<&'static str> = fields.iter().map(|(column, _)| *column).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|column| !keys.contains(*column))
        .map(|column| format!("{column} = excluded.{column}"))
        .collect();
    let conflict_action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT({}) {conflict_action};",
        columns.join(", "),
        placeholders(columns.len()),
        keys.join(", ")
    );

    Ok(StagedWrite {
        table,
        op: "merge",
        sql,
        params: fields.into_iter().map(|(_, value)| value).collect(),
    })
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn flush_failure(write: &StagedWrite, err: rusqlite::Error, started_at: &Instant) -> SessionError {
    match normalize_violation(&err) {
        Some(violation) => {
            error!(
                "event=session_flush module=session status=error table={} op={} error_code=integrity_violation kind={} duration_ms={} error={}",
                write.table,
                write.op,
                violation.kind.as_str(),
                started_at.elapsed().as_millis(),
                violation.detail
            );
            SessionError::Integrity(violation)
        }
        None => {
            error!(
                "event=session_flush module=session status=error table={} op={} error_code=db_failure duration_ms={} error={}",
                write.table,
                write.op,
                started_at.elapsed().as_millis(),
                err
            );
            SessionError::Db(DbError::Sqlite(err))
        }
    }
}

fn commit_failure(err: rusqlite::Error, started_at: &Instant) -> SessionError {
    match normalize_violation(&err) {
        Some(violation) => {
            error!(
                "event=session_commit module=session status=error error_code=integrity_violation kind={} duration_ms={} error={}",
                violation.kind.as_str(),
                started_at.elapsed().as_millis(),
                violation.detail
            );
            SessionError::Integrity(violation)
        }
        None => {
            error!(
                "event=session_commit module=session status=error error_code=db_failure duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            SessionError::Db(DbError::Sqlite(err))
        }
    }
}

/// Maps a SQLite constraint failure to the unified violation kind.
///
/// Returns `None` for anything that is not a constraint violation, so
/// unrelated backend failures keep their original shape.
fn normalize_violation(err: &rusqlite::Error) -> Option<PersistenceError> {
    match err {
        rusqlite::Error::SqliteFailure(cause, message)
            if cause.code == ErrorCode::ConstraintViolation =>
        {
            let kind = match cause.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    ViolationKind::Unique
                }
                ffi::SQLITE_CONSTRAINT_NOTNULL => ViolationKind::NotNull,
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ViolationKind::ForeignKey,
                ffi::SQLITE_CONSTRAINT_CHECK => ViolationKind::Check,
                _ => ViolationKind::Other,
            };
            let detail = message.clone().unwrap_or_else(|| err.to_string());
            Some(PersistenceError::new(kind, detail))
        }
        _ => None,
    }
}
