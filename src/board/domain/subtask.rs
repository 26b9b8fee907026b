//! Checklist items embedded in a task.

use super::{BoardDomainError, SubtaskId, UserRef};
use serde::{Deserialize, Serialize};

/// A checklist entry on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Subtask identifier.
    pub id: SubtaskId,
    /// Description of the step.
    pub name: String,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// User who added the subtask.
    pub user: UserRef,
}

impl Subtask {
    /// Creates an incomplete subtask owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptySubtaskName`] when the name is blank.
    pub fn new(name: &str, owner: &UserRef) -> Result<Self, BoardDomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BoardDomainError::EmptySubtaskName);
        }
        Ok(Self {
            id: SubtaskId::new(),
            name: trimmed.to_owned(),
            completed: false,
            user: owner.clone(),
        })
    }
}
