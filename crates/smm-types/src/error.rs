//! Parse errors for the shared data model.
//!
//! Every variant signals a contract violation by the producer of the data
//! (log writer, layout author, configuration). None of them is recoverable
//! by coercion.

/// Errors raised while parsing textual or vector forms of model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// An object category outside the fixed kitchen ontology.
    #[error("unknown object category: {0:?}")]
    UnknownCategory(String),

    /// A visibility policy that is not a kind letter followed by a radius.
    #[error("invalid visibility policy {text:?}: expected O, D or V followed by a radius, e.g. V5")]
    InvalidPolicy {
        /// The rejected text.
        text: String,
    },

    /// A facing vector that is not one of the four unit vectors.
    #[error("invalid orientation vector ({dx}, {dy})")]
    InvalidOrientation {
        /// Column component.
        dx: i32,
        /// Row component.
        dy: i32,
    },

    /// An identifier that is neither `<prefix><n>` nor `<n>`.
    #[error("invalid identifier {text:?}: {reason}")]
    InvalidId {
        /// The rejected text.
        text: String,
        /// Why parsing failed.
        reason: String,
    },
}
