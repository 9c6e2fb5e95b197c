//! In-memory list state for the note list screen.
//!
//! # Responsibility
//! - Keep snapshot/selection logic free of storage and rendering concerns.

pub mod controller;
