//! Advancement propagator.
//!
//! Per-fixture state machine: `pending -> scheduled -> in_progress ->
//! completed`, with `cancelled` reachable from any non-terminal state. Only
//! `completed` triggers advancement into the next bracket slot.

pub mod propagator;

pub use propagator::{AdvanceError, AdvanceResult, Advancement, AdvancementPropagator};
