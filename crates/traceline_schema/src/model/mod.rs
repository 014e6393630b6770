//! Schema record types built on the persistence base.
//!
//! # Responsibility
//! - Define the concrete analysis records and their schema bindings.
//!
//! # Invariants
//! - Every record is identified by a stable, caller-visible ID.
//! - Table definitions live with the storage owner, not in this crate.

pub mod job_event;
