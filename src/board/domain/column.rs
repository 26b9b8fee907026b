//! Board column type.

use super::ColumnId;
use serde::{Deserialize, Serialize};

/// Name given to columns created or renamed with a blank name.
pub const DEFAULT_COLUMN_NAME: &str = "Untitled";

/// A named lane on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    id: ColumnId,
    name: String,
}

impl Column {
    /// Creates a column with a freshly generated identifier.
    ///
    /// Blank names fall back to [`DEFAULT_COLUMN_NAME`].
    #[must_use]
    pub fn new(name: &str) -> Self {
        let name = normalize_name(name);
        Self {
            id: ColumnId::generate(&name),
            name,
        }
    }

    /// Reconstructs a column from known parts.
    #[must_use]
    pub fn from_parts(id: ColumnId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the column identifier.
    #[must_use]
    pub const fn id(&self) -> &ColumnId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the display name, applying the blank-name default.
    pub fn rename(&mut self, name: &str) {
        self.name = normalize_name(name);
    }
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_COLUMN_NAME.to_owned()
    } else {
        trimmed.to_owned()
    }
}
