use thiserror::Error;

/// Structured errors surfaced by the coordination core.
///
/// Nothing here is process-fatal: every variant is either user-visible and
/// retryable, or resolved by re-deriving state from the store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Duplicate like on the same directed (from, to, event) triple.
    /// Informational for the caller, not a failure.
    #[error("like already recorded for this user and event")]
    AlreadyLiked,

    /// Users cannot like themselves.
    #[error("cannot like yourself")]
    SelfLike,

    /// The chat/match no longer exists (e.g. unmatched by the other side).
    /// Callers should drop local state for the id.
    #[error("no such chat or match")]
    NotFound,

    /// Store or network unavailability. Retryable; optimistic local state
    /// must be rolled back with the original input preserved.
    #[error("transient store failure: {0}")]
    TransientIo(#[from] anyhow::Error),

    /// A read-state or presence write raced with a newer event. Resolve by
    /// refetching the authoritative summary, not by trusting the local delta.
    #[error("write raced with a newer event")]
    StaleWrite,
}

impl CoreError {
    /// Stable machine-readable code for API bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyLiked => "ALREADY_LIKED",
            Self::SelfLike => "SELF_LIKE",
            Self::NotFound => "NOT_FOUND",
            Self::TransientIo(_) => "TRANSIENT_IO",
            Self::StaleWrite => "STALE_WRITE",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
