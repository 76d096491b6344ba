use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for identifier validation and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
}

fn validated(raw: impl Into<String>, kind: &'static str) -> Result<String, IdError> {
    let raw = raw.into();
    if raw.trim().is_empty() {
        return Err(IdError::Empty { kind });
    }
    Ok(raw)
}

/// Stable identifier for a user, as handed out by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a `UserId`, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the identifier has no visible characters.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        validated(id, "user id").map(Self)
    }

    /// Mints a fresh random identifier for a newly registered user.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier for a daily task (e.g. one exercise in the daily set).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a `TaskId`, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the identifier has no visible characters.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        validated(id, "task id").map(Self)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Case-sensitive name keying a shape in the catalog.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeName(String);

impl ShapeName {
    /// Creates a `ShapeName`, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the name has no visible characters.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        validated(name, "shape name").map(Self)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl fmt::Debug for ShapeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeName({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ShapeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ShapeName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
