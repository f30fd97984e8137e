//! Geodesic presence evaluation.
//!
//! # Responsibility
//! - Decide which zones contain a given location fix.
//! - Keep distance math pure and free of storage or platform concerns.

pub mod presence;
