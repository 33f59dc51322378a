use thiserror::Error;

/// Engine error taxonomy.
///
/// Every variant is raised synchronously from an engine call and surfaced
/// unmodified to the caller; the REST layer maps them to status codes. The
/// engine never retries or swallows them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MdrError {
    /// Unknown identifier, or no version matching the requested filter.
    #[error("{0}")]
    NotFound(String),

    /// Illegal state transition, or the item is in use on approve/delete.
    #[error("{0}")]
    BusinessLogic(String),

    /// The item's library does not allow the requested mutation.
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate name within a library.
    #[error("{0}")]
    AlreadyExists(String),

    /// Malformed version string or attribute.
    #[error("{0}")]
    Validation(String),

    /// Optimistic-lock conflict detected at save time.
    #[error("{0}")]
    Versioning(String),
}

impl MdrError {
    pub fn not_found(what: impl std::fmt::Display, uid: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} with UID '{uid}' does not exist."))
    }
}

pub type Result<T> = std::result::Result<T, MdrError>;
