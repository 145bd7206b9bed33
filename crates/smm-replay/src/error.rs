//! Error types for the replay binary.
//!
//! [`ReplayError`] wraps every failure mode of a replay run so `main` can
//! propagate with `?`.

/// Top-level error for the replay binary.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: smm_core::config::ConfigError,
    },

    /// The kitchen layout could not be loaded.
    #[error("layout error: {source}")]
    Layout {
        /// The underlying layout error.
        #[from]
        source: smm_core::LayoutError,
    },

    /// A belief model rejected a snapshot.
    #[error("belief error: {source}")]
    Belief {
        /// The underlying model error.
        #[from]
        source: smm_core::SmmError,
    },

    /// A log line could not be adapted.
    #[error("log line {line}: {source}")]
    Adapter {
        /// One-based line number in the log.
        line: usize,
        /// The underlying adapter error.
        source: smm_core::adapter::AdapterError,
    },

    /// The belief worker failed.
    #[error("worker error: {source}")]
    Worker {
        /// The underlying worker error.
        #[from]
        source: smm_core::worker::WorkerError,
    },

    /// Reading the log or writing reports failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or stream involved.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A report could not be serialized.
    #[error("report serialization failed: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
