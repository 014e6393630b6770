//! Record contract and persistence capability.
//!
//! # Responsibility
//! - Define the schema-binding contract (`Record`) every persisted type implements.
//! - Provide the `Persistable` capability: save/merge against a borrowed session.
//!
//! # Invariants
//! - `fields()` lists every schema column of the record, in declaration order.
//! - `key_columns()` names a subset of `fields()`; identity is never inferred.
//! - Non-batched save/merge always flushes before committing.
//!
//! # See also
//! - docs/architecture/persistence.md

use crate::session::{Session, SessionResult};

/// SQLite-typed value for one schema field.
///
/// Kept as a type alias to make semantic intent explicit in signatures: the
/// same field listing feeds both statement binding and diagnostics output.
pub type FieldValue = rusqlite::types::Value;

/// Schema binding for a persistable record type.
///
/// Concrete schema types describe themselves explicitly instead of being
/// introspected: the field listing is the single source for staged writes and
/// for the debug representation.
pub trait Record {
    /// Target table for staged writes of this record type.
    fn table(&self) -> &'static str;

    /// Every schema column of this record as `(column, value)` pairs.
    ///
    /// # Contract
    /// - Order is stable and matches the schema declaration.
    /// - Optional columns are listed with `FieldValue::Null` when unset.
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    /// Identity columns used by merge to address an existing row.
    ///
    /// Empty for insert-only record types; merging such a record is rejected
    /// by the session as contract misuse.
    fn key_columns(&self) -> &'static [&'static str];
}

/// Persistence capability gained by every [`Record`] type.
///
/// A session is borrowed for the duration of each call and stays owned by the
/// caller. With `batch = false` the record is staged, flushed and committed
/// immediately; afterwards it is synchronized with storage. With
/// `batch = true` the record is only staged — the caller resolves the pending
/// window later by flushing/committing the same session.
pub trait Persistable: Record {
    /// Stages this record for insertion; flushes and commits unless batched.
    ///
    /// # Errors
    /// - `SessionError::Integrity` when the store rejects the staged row for
    ///   a schema constraint violation at flush/commit time.
    /// - `SessionError::Db` for any other backend failure, unmodified.
    fn save(&self, session: &mut dyn Session, batch: bool) -> SessionResult<()>
    where
        Self: Sized,
    {
        session.add(self)?;
        if batch {
            return Ok(());
        }
        session.flush()?;
        session.commit()
    }

    /// Stages this record for insert-or-update by identity; flushes and
    /// commits unless batched.
    ///
    /// # Contract
    /// - The caller has populated the identity fields named by
    ///   [`Record::key_columns`] before calling.
    ///
    /// # Errors
    /// - Same error surface as [`Persistable::save`], plus
    ///   `SessionError::InvalidRecord` when the type declares no identity.
    fn merge(&self, session: &mut dyn Session, batch: bool) -> SessionResult<()>
    where
        Self: Sized,
    {
        session.merge(self)?;
        if batch {
            return Ok(());
        }
        session.flush()?;
        session.commit()
    }

    /// Renders a multi-line diagnostic view of this record.
    ///
    /// First line is the concrete type name, followed by one line per schema
    /// field. Diagnostics only — never a serialization format.
    fn describe(&self) -> String
    where
        Self: Sized,
    {
        let type_name = std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("record");
        let mut rendered = format!("{type_name}:\n");
        for (column, value) in self.fields() {
            rendered.push_str("  * ");
            rendered.push_str(column);
            rendered.push_str(" : ");
            rendered.push_str(&display_field(&value));
            rendered.push('\n');
        }
        rendered
    }
}

impl<T: Record> Persistable for T {}

fn display_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::Integer(number) => number.to_string(),
        FieldValue::Real(number) => number.to_string(),
        FieldValue::Text(text) => text.clone(),
        FieldValue::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
