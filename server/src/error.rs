//! Error types for the list store.
//!
//! # Error Types
//!
//! - [`StoreError::NotFound`] - a requested list or todo id is absent
//! - [`StoreError::DuplicateName`] - a list with the same name already exists
//! - [`StoreError::InvalidLength`] - a name is outside the allowed length
//!
//! The `Display` output of each variant is the human-readable message shown
//! to the user, so route handlers can surface it verbatim.
//!
//! # Example
//!
//! ```rust
//! use listkeeper_server::error::{Entity, StoreError};
//!
//! let err = StoreError::InvalidLength(Entity::Todo);
//! assert_eq!(err.to_string(), "Todo name must be between 1 and 100 characters.");
//! assert!(err.is_validation());
//! ```

use std::fmt;

use thiserror::Error;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    List,
    Todo,
}

impl Entity {
    fn noun(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Todo => "todo",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("List"),
            Self::Todo => f.write_str("Todo"),
        }
    }
}

/// Errors returned by list store lookups and validations.
///
/// None of these indicate a defect: `NotFound` aborts the current request,
/// and the validation variants leave the collection untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("The specified {} was not found.", .0.noun())]
    NotFound(Entity),

    /// Another list already carries exactly this name.
    #[error("List name must be unique.")]
    DuplicateName,

    /// The name is empty or longer than the allowed maximum.
    #[error("{0} name must be between 1 and 100 characters.")]
    InvalidLength(Entity),
}

impl StoreError {
    /// Returns `true` for errors raised by name validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::DuplicateName | Self::InvalidLength(_))
    }
}

/// A specialized Result type for list store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
