use thiserror::Error as ThisError;

/// Failures the interpreter reports without terminating.
///
/// These travel inside `anyhow::Error`; use `downcast_ref::<Error>()` to tell
/// them apart.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("empty command in pipeline")]
    EmptyStage,

    #[error("expected a file name after `{0}`")]
    MissingRedirectTarget(String),

    #[error("argument contains a NUL byte: {0:?}")]
    NulByte(String),

    #[error("failed to create a pipe")]
    Pipe(#[source] nix::Error),

    #[error("failed to fork")]
    Fork(#[source] nix::Error),

    #[error("{builtin}: usage: {usage}")]
    Usage {
        builtin: &'static str,
        usage: &'static str,
    },

    #[error("{builtin}: invalid job id: {arg}")]
    InvalidJobId { builtin: &'static str, arg: String },

    #[error("{builtin}: no such job: {id}")]
    NoSuchJob { builtin: &'static str, id: usize },
}
