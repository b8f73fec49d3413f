//! Ocap CLI Library
//!
//! Command implementations for the `ocap` binary: transcoding messages
//! between body formats, printing order-preserving keys, and rank-sorting.
//! Slots in the input are opaque JSON; the CLI stands in for them with
//! presences and writes them back unchanged.

#![forbid(unsafe_code)]

pub mod commands;
pub mod slots;

pub use slots::{OutgoingSlots, SlotTable};
