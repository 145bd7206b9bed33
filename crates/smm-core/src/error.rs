//! Error types for the `smm-core` crate.
//!
//! Every variant is a contract violation by the caller or by the data
//! source. Ambiguity during matching is never an error: the matcher degrades
//! and logs instead.

use smm_types::{AgentId, ParseError};

use crate::layout::LayoutError;

/// Errors that can occur while seeding or updating a belief model.
#[derive(Debug, thiserror::Error)]
pub enum SmmError {
    /// `update` was called before the model was seeded.
    #[error("belief model used before it was seeded")]
    NotInitialized,

    /// The model's own agent is absent from the snapshot.
    #[error("agent {0} is missing from the snapshot")]
    UnknownAgent(AgentId),

    /// A textual or vector form of a model type was malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The kitchen layout could not be loaded.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The store ran out of object identifiers.
    #[error("object identifier space exhausted")]
    IdSpaceExhausted,
}
