//! Unified error type for the protocol core.
//!
//! Every recoverable failure of the TLV codec, the characteristic value
//! codec and the attribute database serializer funnels into [`Error`].
//! All variants are `Copy` so they travel through callbacks and state
//! machines without allocation.
//!
//! Contract violations by application callbacks are *not* represented
//! here: they indicate a programming defect and abort via `panic!`.

use core::fmt;

// ---------------------------------------------------------------------------
// Protocol error
// ---------------------------------------------------------------------------

/// Recoverable protocol error, surfaced to the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Opaque application failure.
    Unknown,
    /// Operation not valid in the current session / characteristic state.
    InvalidState,
    /// Malformed or constraint-violating input.
    InvalidData,
    /// Buffer or storage capacity exceeded. Retry with more space.
    OutOfResources,
    /// The controller lacks the required authorization.
    NotAuthorized,
    /// Transient application failure. Retry later.
    Busy,
}

impl Error {
    /// Allowed outcomes of a read / subscribe / unsubscribe callback.
    pub const READ_ALLOWED: &'static [Error] = &[
        Error::Unknown,
        Error::InvalidState,
        Error::OutOfResources,
        Error::Busy,
    ];

    /// Allowed outcomes of a write callback.
    pub const WRITE_ALLOWED: &'static [Error] = &[
        Error::Unknown,
        Error::InvalidState,
        Error::InvalidData,
        Error::OutOfResources,
        Error::NotAuthorized,
        Error::Busy,
    ];
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown error"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::InvalidData => write!(f, "invalid data"),
            Self::OutOfResources => write!(f, "out of resources"),
            Self::NotAuthorized => write!(f, "not authorized"),
            Self::Busy => write!(f, "busy"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
