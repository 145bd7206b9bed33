//! Belief tracking under partial observability for the shared mental model
//! study.
//!
//! A [`BeliefModel`] keeps one observer's best reconstruction of the kitchen
//! from everything it has seen: which objects exist, where they last were,
//! who carries what, and what each agent is working on. Models chain into a
//! [`BeliefChain`] so one model's belief becomes the next one's observation.
//!
//! # Modules
//!
//! - [`adapter`] -- Game log lines into [`WorldSnapshot`]s.
//! - [`chain`] -- Chained models and per-tick chain reports.
//! - [`config`] -- Configuration loading from `smm-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- Contract violations raised by seeding and updating.
//! - [`layout`] -- Kitchen grids and their start state.
//! - [`matcher`] -- Re-identification of observed objects across ticks.
//! - [`model`] -- The seeded/updated lifecycle of one observer.
//! - [`predicates`] -- Applying a match: holdings, usability, and goals.
//! - [`store`] -- The append-only arena of object records.
//! - [`visibility`] -- Omni, directional, and cone visibility.
//! - [`worker`] -- A chain on a background task with a last-write-wins
//!   input.
//!
//! [`WorldSnapshot`]: smm_types::WorldSnapshot

pub mod adapter;
pub mod chain;
pub mod config;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod model;
pub mod predicates;
pub mod store;
pub mod visibility;
pub mod worker;

// Re-export primary types at crate root.
pub use chain::{BeliefChain, ChainReport, Stage, StageReport};
pub use error::SmmError;
pub use layout::{Layout, LayoutError};
pub use matcher::{MatchOutcome, ObjectMatcher};
pub use model::{BeliefModel, TickReport};
pub use predicates::PredicateUpdater;
pub use store::BeliefStore;
pub use worker::BeliefWorker;
