//! Domain model for zone-based ringer control.
//!
//! # Responsibility
//! - Define canonical data structures shared by storage, presence
//!   evaluation and mode derivation.
//!
//! # Invariants
//! - Every zone is identified by a stable `ZoneId`.
//! - Zone geometry is validated before persistence, never masked after.

pub mod zone;
