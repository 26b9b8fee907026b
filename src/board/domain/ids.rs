//! Identifier types for the board domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of hex characters taken from a random UUID for column suffixes.
const COLUMN_SUFFIX_LEN: usize = 12;

/// Slug used when a name contains no ASCII alphanumerics.
const FALLBACK_SLUG: &str = "untitled";

/// Identifier of a board column.
///
/// Generated identifiers take the form `column-<slug>-<suffix>`, keeping them
/// legible in the stored document while staying collision resistant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    /// Generates a fresh identifier for a column with the given name.
    #[must_use]
    pub fn generate(name: &str) -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(COLUMN_SUFFIX_LEN)
            .collect();
        Self(format!("column-{}-{suffix}", slugify(name)))
    }

    /// Wraps an existing identifier, typically one read back from storage.
    #[must_use]
    pub fn from_existing(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ColumnId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercases ASCII alphanumerics and collapses every other run of characters
/// into a single `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_owned()
    } else {
        slug
    }
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Board-wide unique identifier of a task.
    TaskId
);

uuid_identifier!(
    /// Identifier of a subtask within its task.
    SubtaskId
);

uuid_identifier!(
    /// Identifier of a comment within its task.
    CommentId
);
