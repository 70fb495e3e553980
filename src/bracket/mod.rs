//! Bracket topology builder.
//!
//! Turns a roster of participants into the full match skeleton for a
//! competition: rounds, bye assignments, forward links, and (for the mixed
//! format) balanced group partitions. Generation is pure; persisting the
//! resulting plan is a single repository call.

pub mod builder;
pub mod models;

pub use builder::{BracketError, BracketResult, build_bracket};
pub use models::{BracketOptions, BracketPlan, CompetitionFormat, SeedingPolicy};
