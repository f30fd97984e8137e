//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for zone definitions and runtime
//!   state.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Zone writes must enforce `Zone::validate()` before persistence.
//! - Runtime state is only reachable through the `StateStore` trait;
//!   no service touches the backing table directly.

pub mod state_store;
pub mod zone_repo;
