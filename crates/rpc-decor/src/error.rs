//! Error types for decorated calls and strategy resolution.
//!
//! There are two distinct failure domains with different lifetimes:
//!
//! - [`CallError`] — raised while a decorated call is executing. These
//!   propagate through the decoration chain, where each enclosing
//!   decoration may catch, map, or rethrow them.
//! - [`ResolveError`] — raised while a [`Strategy`](crate::Strategy) is
//!   being applied to a higher-level decoration list. Resolution happens
//!   once, at decorator construction time, so these are never observed
//!   by a caller invoking a call.
//!
//! # Cancellation
//!
//! [`CallError::Cancelled`] is the distinguished in-band cancellation
//! signal. Decorations that translate errors (see
//! [`ExceptionMapping`](crate::decorations::ExceptionMapping)) must let
//! it pass through unmodified; only non-cancellation failures are
//! eligible for mapping. Native cancellation — dropping the composed
//! future or stream — propagates structurally and cannot be intercepted
//! by any decoration.
//!
//! # Retryability
//!
//! Transport and status variants carry a `retryable` flag set by the
//! adapter that produced them. Retry middleware inspects the flag via
//! [`CallError::is_retryable`]:
//!
//! ```rust
//! use rpc_decor::CallError;
//!
//! let err = CallError::Timeout { elapsed_ms: 5000 };
//! assert!(err.is_retryable());
//!
//! let err = CallError::Cancelled;
//! assert!(!err.is_retryable());
//! ```

use crate::decoration::DecorationId;

/// The error type produced by decorated calls.
///
/// Variants are `#[non_exhaustive]` — new failure kinds may be added in
/// minor releases without breaking downstream matches (always include a
/// wildcard arm).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CallError {
    /// The request never completed at the transport level (connection
    /// reset, DNS failure, broken pipe).
    #[error("transport error: {message}")]
    Transport {
        /// A human-readable description of the failure.
        message: String,
        /// Whether the caller should retry this call.
        retryable: bool,
    },

    /// The remote end answered with a failure status.
    #[error("call failed with status {code}: {message}")]
    Status {
        /// The status code reported by the remote end (e.g. `"unavailable"`).
        code: String,
        /// Human-readable error description.
        message: String,
        /// Whether the caller should retry this call.
        retryable: bool,
    },

    /// The call exceeded its deadline.
    #[error("call timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// The call was cancelled.
    ///
    /// This variant always propagates to the original caller unmapped;
    /// error-translating decorations are required to pass it through.
    #[error("call cancelled")]
    Cancelled,

    /// A short-circuiting decoration substituted a response of a type
    /// other than the one the call was declared with.
    ///
    /// Seeing this error means a [`Decoration`](crate::Decoration)
    /// violated its contract, not that the call itself failed.
    #[error("decoration produced a response of an unexpected type")]
    ResponseType,
}

impl CallError {
    /// Returns `true` if the error is transient and the call may succeed
    /// on retry.
    ///
    /// Checks the `retryable` flag on applicable variants and treats
    /// timeouts as always retryable. Cancellation is never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } | Self::Status { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this error is the distinguished cancellation
    /// signal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// An error raised while applying a [`Strategy`](crate::Strategy) to a
/// higher-level decoration list.
///
/// Both variants mean a `Custom` strategy action referenced a
/// [`DecorationId`] absent from the list it was applied to. They surface
/// at decorator construction time, either to the registered
/// [`ResolveErrorHook`](crate::ResolveErrorHook) or, with no hook, to
/// whoever is constructing the decorator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A `Remove` action named a provider id not present in the list.
    #[error("tried to remove decoration provider \"{id}\", but it was not found")]
    RemoveTargetNotFound {
        /// The id the action tried to remove.
        id: DecorationId,
    },

    /// A `Replace` action named a provider id not present in the list.
    #[error("tried to replace decoration provider \"{id}\", but it was not found")]
    ReplaceTargetNotFound {
        /// The id the action tried to replace.
        id: DecorationId,
    },
}

impl ResolveError {
    /// The id of the provider the failing action referenced.
    pub fn target(&self) -> &DecorationId {
        match self {
            Self::RemoveTargetNotFound { id } | Self::ReplaceTargetNotFound { id } => id,
        }
    }
}
