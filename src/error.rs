use std::fmt;

/// Coarse classification shared by every domain error in the crate.
///
/// Callers use it to decide how to surface a failure: validation problems are
/// shown next to the form, not-found turns into a redirect, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input; nothing was written.
    Validation,
    /// The referenced event or account does not exist.
    NotFound,
    /// The record being created already exists.
    Duplicate,
    /// The session is not allowed to perform the operation.
    Forbidden,
    /// Concurrent writers kept winning the compare-and-swap.
    Conflict,
    /// A stored blob could not be decoded.
    StorageCorruption,
    /// The backing store itself failed.
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Duplicate => "duplicate",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::StorageCorruption => "storage_corruption",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
