use thiserror::Error;

use super::capacity::Capacity;

/// Errors raised synchronously by registry operations
///
/// Both variants are raised before any state is touched, so a failed call
/// always leaves the registry exactly as it was.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Malformed input: blank event name, negative or fractional capacity, ...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An event would hold (or already holds) more listeners than allowed
    #[error("Possible memory leak detected: event '{event}' has {count} listeners, max is {max}")]
    CapacityViolation {
        event: String,
        count: usize,
        max: Capacity,
    },
}

impl RegistryError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        RegistryError::InvalidArgument(msg.into())
    }

    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::InvalidArgument(_) => "invalid_argument",
            RegistryError::CapacityViolation { .. } => "capacity_violation",
        }
    }
}

/// Trims an event name, rejecting names that are empty once trimmed
pub(crate) fn validate_event_name(event: &str) -> Result<&str, RegistryError> {
    let trimmed = event.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::invalid_argument(
            "event name must be a non-empty string",
        ));
    }
    Ok(trimmed)
}
