//! Domain model for notes.
//!
//! # Responsibility
//! - Define the data structures shared by storage, list state and screens.
//!
//! # Invariants
//! - Every stored note is identified by a stable `NoteId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod note;
