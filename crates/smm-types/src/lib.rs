//! Shared type definitions for the shared mental model belief tracker.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace: what a tick of the kitchen looks like when observed, and
//! what an observer believes about it. Types flow downstream to `TypeScript`
//! via `ts-rs` for the belief renderer.
//!
//! # Modules
//!
//! - [`ids`] -- Sequential identifier wrappers for objects, agents, and
//!   snapshot-local observations
//! - [`geometry`] -- Grid positions, offsets, and facing directions
//! - [`enums`] -- Object categories, visibility kinds, predicates, and recipe
//!   steps
//! - [`policy`] -- Visibility policies (`O20`, `D2`, `V4`)
//! - [`snapshot`] -- One observed tick of the world
//! - [`belief`] -- Belief records and belief states
//! - [`error`] -- Parse errors for the textual and vector forms above

pub mod belief;
pub mod enums;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod policy;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use belief::{AgentRecord, BeliefState, ObjectRecord, UsabilityEdge};
pub use enums::{Category, Predicate, RecipeStep, VisibilityKind};
pub use error::ParseError;
pub use geometry::{Offset, Orientation, Position};
pub use ids::{AgentId, ObjectId, TempId};
pub use policy::VisibilityPolicy;
pub use snapshot::{HeldObject, ObservedAgent, ObservedObject, WorldSnapshot};
