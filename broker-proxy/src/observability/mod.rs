//! Canonical structured event names and field helpers for `tracing` output.

pub mod events;
pub mod fields;
