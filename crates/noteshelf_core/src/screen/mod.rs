//! Screen-level flows driven by the (external) rendering layer.
//!
//! # Responsibility
//! - Run store work on the blocking pool and apply results on the owning
//!   task.
//! - Carry results between the edit screen and the list screen.
//!
//! # Invariants
//! - Each screen owns its state; only the `NoteStore` handle and the
//!   `ResultSlot` are shared.

pub mod edit;
pub mod handoff;
pub mod home;
