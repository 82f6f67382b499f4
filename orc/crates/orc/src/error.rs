//! Error Module - ORC Error Types
//!
//! Defines the error types used outside the object-lifecycle hot path.
//!
//! The lifecycle primitives themselves (allocate, retain/release, deallocate)
//! never return errors: precondition violations are assertions and allocator
//! exhaustion is fatal. Errors exist for the surrounding surfaces.
//!
//! # Error Categories
//!
//! ## Class Registration Errors
//! - `UnknownClass` - Class id not present in the registry
//! - `DuplicateClass` - Class name already published
//! - `AbstractClass` - Protocol class used where a concrete class is required
//! - `InvalidProperty` - Property does not fit the declaring class
//!
//! ## Finalization Errors
//! - `TeardownFailed` - A property teardown callback aborted finalization
//!
//! ## Configuration Errors
//! - `Configuration` - Invalid runtime configuration
//! - `InvalidArgument` - Invalid function argument
//! - `Internal` - Invariant violation inside ORC

use crate::class::ClassId;
use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for ORC operations
///
/// # Examples
///
/// ```rust
/// use orc::OrcError;
///
/// fn handle_error(err: OrcError) {
///     match err {
///         OrcError::DuplicateClass { name } => {
///             eprintln!("class {} already exists", name);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum OrcError {
    /// Class id is not known to the registry
    ///
    /// **When returned:** A builder names a superclass or protocol class that
    /// was never published, or a C caller passes a stale id.
    #[error("Unknown class: {class}")]
    UnknownClass { class: ClassId },

    /// Class name already published
    ///
    /// **When returned:** Publishing a builder whose name is taken
    ///
    /// **Recovery strategy:** Look up the existing class by name instead
    #[error("Class '{name}' is already registered")]
    DuplicateClass { name: String },

    /// Protocol class used where a concrete class is required
    ///
    /// **When returned:** A protocol class is named as a superclass, or a
    /// concrete class is adopted as a protocol class.
    #[error("Class '{name}' is not {expected}")]
    AbstractClass { name: String, expected: &'static str },

    /// Property does not fit the declaring class
    ///
    /// **Example scenarios:**
    /// - Offset + slot size exceeds the instance size
    /// - Object slot not aligned to a machine word
    /// - Property name declared twice in the same class
    #[error("Invalid property '{property}' on class '{class}': {reason}")]
    InvalidProperty {
        class: String,
        property: String,
        reason: String,
    },

    /// Teardown callback failed
    ///
    /// **When returned:** A `PropertyTeardown` implementation reported an error.
    /// The finalize call that invoked it stops at that property.
    #[error("Teardown of property '{property}' declared by '{class}' failed: {reason}")]
    TeardownFailed {
        class: String,
        property: String,
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Invalid argument
    ///
    /// **Example scenarios:**
    /// - Empty class name
    /// - Instance size smaller than the superclass instance size
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error - indicates a bug in ORC
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrcError {
    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(self, OrcError::Internal(_))
    }

    /// Check if this error was raised while publishing class metadata
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            OrcError::UnknownClass { .. }
                | OrcError::DuplicateClass { .. }
                | OrcError::AbstractClass { .. }
                | OrcError::InvalidProperty { .. }
        )
    }
}

/// Result type alias for ORC operations
pub type Result<T> = std::result::Result<T, OrcError>;
