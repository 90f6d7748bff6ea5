//! Error kinds for the terminal core.
//!
//! Propagation policy (see DESIGN.md / SPEC_FULL.md §7): anything locally
//! recoverable is recovered inside the component that noticed it, usually
//! with a `log::debug!` and a no-op or clamp. Only `PtyClosed` and
//! allocation failure during construction/resize escape to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The host's PTY read returned EOF or an error other than `EAGAIN`.
    /// The embedder decides whether to tear the session down.
    #[error("pty closed")]
    PtyClosed,

    /// Allocation failed while constructing or resizing the grid. The
    /// previous state (if any) is left untouched.
    #[error("allocation failed: {0}")]
    Alloc(String),

    /// A file (`.kb`, `.keys`, color scheme) could not be read or parsed.
    /// Reserved for the narrow set of explicit, user-triggered load
    /// actions; parser-driven malformed bytes are never surfaced this way.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
