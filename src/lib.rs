//! Rent reconciliation and co-owner distribution for rental property ledgers.
//!
//! `core` is the calculation engine and never does I/O. `input` reads the
//! snapshots of already-fetched records the engine works on.

pub mod core;
pub mod input;
