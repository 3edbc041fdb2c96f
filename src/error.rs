//! Typed errors for the HTTP boundary and the submission path.
//!
//! Application glue (CLI, TUI startup) wraps these in `anyhow` with context.

/// Failure talking to the forge API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The server answered 2xx but refused the operation.
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("select at least one mode to run")]
    NoModesSelected,

    #[error("missing or invalid input: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("submitted {modes} mode(s) but server returned {task_ids} task ids and {result_dirs} result dirs")]
    MismatchedResponse {
        modes: usize,
        task_ids: usize,
        result_dirs: usize,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}
