//! Core presence-reconciliation and ringer-control services.
//!
//! # Responsibility
//! - Merge the two presence sources into one authoritative active zone
//!   set and derive the system ringer mode from it.
//! - Keep exactly one code path from presence to mode (`tracker`),
//!   regardless of which source reported.
//!
//! # See also
//! - `crate::repo` for the persisted state these services share.

pub mod echo;
pub mod monitor;
pub mod notify;
pub mod ringer;
pub mod tracker;
