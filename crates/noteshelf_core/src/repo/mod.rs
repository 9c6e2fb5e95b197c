//! Repository layer over the SQLite schema.
//!
//! # Responsibility
//! - Define the note data access contract.
//! - Isolate SQL details from the store handle and screen flows.
//!
//! # Invariants
//! - Repository APIs report affected row counts instead of guessing intent;
//!   callers decide what zero rows means.

pub mod note_repo;
