//! Engine errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the device link and the session engine.
///
/// Nothing here is fatal: polling absorbs transport and device failures into
/// the offline state, and user actions surface them as notices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandbotError {
    /// Request failed before the device answered (connect, read, timeout).
    #[error("transport error '{0}'")]
    Transport(SmolStr),

    /// Device answered but reported failure.
    #[error("{action} rejected by device: {reason}")]
    DeviceRejected { action: SmolStr, reason: SmolStr },

    /// Response body did not have the expected shape.
    #[error("parse error '{0}'")]
    Parse(SmolStr),

    /// Action attempted without a target, connectivity or loaded pattern.
    #[error("{0}")]
    Precondition(SmolStr),

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),
}

impl SandbotError {
    /// True for failures that polling folds into the offline state.
    #[must_use]
    pub fn is_link_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::DeviceRejected { .. })
    }
}

impl From<serde_json::Error> for SandbotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string().into())
    }
}
