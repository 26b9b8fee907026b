//! The board aggregate: ordered columns and their task lists.

use super::{BoardDomainError, Column, ColumnId, MalformedBoardError, Task, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Task lists keyed by owning column.
pub type TaskLayout = BTreeMap<ColumnId, Vec<Task>>;

/// Task positions keyed by owning column, as requested by a drag and drop.
pub type TaskPlacement = BTreeMap<ColumnId, Vec<TaskId>>;

/// Snapshot of the shared board record.
///
/// Invariants: every column id has an entry in the task mapping (possibly
/// empty), column ids are unique, and task ids are unique across the whole
/// board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    columns: Vec<Column>,
    tasks: TaskLayout,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct BoardDocument {
    #[serde(default)]
    columns: Option<Vec<Column>>,
    #[serde(default)]
    tasks: Option<TaskLayout>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Board {
    /// Creates a board with no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes a stored board document and checks its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedBoardError`] when the document does not decode or
    /// violates a board invariant.
    pub fn from_record(value: &Value) -> Result<Self, MalformedBoardError> {
        let document: BoardDocument = serde_json::from_value(value.clone())
            .map_err(|err| MalformedBoardError::Decode(err.to_string()))?;
        let columns = document.columns.unwrap_or_default();
        let tasks = match document.tasks {
            Some(tasks) => tasks,
            None if columns.is_empty() => TaskLayout::new(),
            None => return Err(MalformedBoardError::MissingTasks),
        };
        let board = Self {
            columns,
            tasks,
            extra: document.extra,
        };
        board.check_invariants()?;
        Ok(board)
    }

    /// Encodes the board as a storable document.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedBoardError::Encode`] when serialization fails.
    pub fn to_record(&self) -> Result<Value, MalformedBoardError> {
        serde_json::to_value(self).map_err(|err| MalformedBoardError::Encode(err.to_string()))
    }

    fn check_invariants(&self) -> Result<(), MalformedBoardError> {
        let mut column_ids = HashSet::new();
        for column in &self.columns {
            if !column_ids.insert(column.id()) {
                return Err(MalformedBoardError::DuplicateColumn(column.id().clone()));
            }
            if !self.tasks.contains_key(column.id()) {
                return Err(MalformedBoardError::MissingTaskList(column.id().clone()));
            }
        }

        let mut task_ids = HashSet::new();
        for task in self.tasks.values().flatten() {
            if !task_ids.insert(task.id()) {
                return Err(MalformedBoardError::DuplicateTask(task.id()));
            }
        }
        Ok(())
    }

    /// Returns columns in display order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns every task list keyed by column.
    #[must_use]
    pub const fn tasks(&self) -> &TaskLayout {
        &self.tasks
    }

    /// Returns a column by id.
    #[must_use]
    pub fn column(&self, column_id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id() == column_id)
    }

    /// Returns the task list of a column.
    #[must_use]
    pub fn tasks_in(&self, column_id: &ColumnId) -> Option<&[Task]> {
        self.tasks.get(column_id).map(Vec::as_slice)
    }

    /// Returns the total number of tasks on the board.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    /// Checks that a column exists.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::ColumnNotFound`] when absent.
    pub fn require_column(&self, column_id: &ColumnId) -> Result<&Column, BoardDomainError> {
        self.column(column_id)
            .ok_or_else(|| BoardDomainError::ColumnNotFound(column_id.clone()))
    }

    /// Returns a task by column and id.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskNotFound`] when the pair does not
    /// exist.
    pub fn task(&self, column_id: &ColumnId, task_id: TaskId) -> Result<&Task, BoardDomainError> {
        self.tasks
            .get(column_id)
            .and_then(|tasks| tasks.iter().find(|task| task.id() == task_id))
            .ok_or_else(|| BoardDomainError::TaskNotFound {
                column_id: column_id.clone(),
                task_id,
            })
    }

    /// Returns a mutable task by column and id.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskNotFound`] when the pair does not
    /// exist.
    pub fn task_mut(
        &mut self,
        column_id: &ColumnId,
        task_id: TaskId,
    ) -> Result<&mut Task, BoardDomainError> {
        self.tasks
            .get_mut(column_id)
            .and_then(|tasks| tasks.iter_mut().find(|task| task.id() == task_id))
            .ok_or_else(|| BoardDomainError::TaskNotFound {
                column_id: column_id.clone(),
                task_id,
            })
    }

    /// Locates a task by id alone, without knowing which column holds it.
    ///
    /// Returns the column the task is stored under together with the task.
    #[must_use]
    pub fn find_task(&self, task_id: TaskId) -> Option<(&ColumnId, &Task)> {
        self.tasks.iter().find_map(|(column_id, tasks)| {
            tasks
                .iter()
                .find(|task| task.id() == task_id)
                .map(|task| (column_id, task))
        })
    }

    /// Renames a column, returning the updated value.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::ColumnNotFound`] when absent.
    pub fn rename_column(
        &mut self,
        column_id: &ColumnId,
        name: &str,
    ) -> Result<Column, BoardDomainError> {
        let column = self
            .columns
            .iter_mut()
            .find(|column| column.id() == column_id)
            .ok_or_else(|| BoardDomainError::ColumnNotFound(column_id.clone()))?;
        column.rename(name);
        Ok(column.clone())
    }

    /// Removes a column together with its task list.
    ///
    /// Returns the tasks that were on the column.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::ColumnNotFound`] when absent.
    pub fn remove_column(&mut self, column_id: &ColumnId) -> Result<Vec<Task>, BoardDomainError> {
        let position = self
            .columns
            .iter()
            .position(|column| column.id() == column_id)
            .ok_or_else(|| BoardDomainError::ColumnNotFound(column_id.clone()))?;
        self.columns.remove(position);
        Ok(self.tasks.remove(column_id).unwrap_or_default())
    }

    /// Returns the column identifiers in display order.
    #[must_use]
    pub fn column_order(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|column| column.id().clone()).collect()
    }

    /// Returns where each task sits, as task identifiers per column.
    #[must_use]
    pub fn placement(&self) -> TaskPlacement {
        self.tasks
            .iter()
            .map(|(column_id, tasks)| (column_id.clone(), tasks.iter().map(Task::id).collect()))
            .collect()
    }

    /// Reorders the columns to match `ordered`.
    ///
    /// Only positions change; column values stay as stored.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::ColumnOrderMismatch`] unless `ordered`
    /// names exactly the board's columns, each once.
    pub fn reorder_columns(&mut self, ordered: &[ColumnId]) -> Result<(), BoardDomainError> {
        let current: HashSet<&ColumnId> = self.columns.iter().map(Column::id).collect();
        let mut proposed = HashSet::new();
        let is_permutation = ordered.len() == self.columns.len()
            && ordered
                .iter()
                .all(|column_id| current.contains(column_id) && proposed.insert(column_id));
        if !is_permutation {
            return Err(BoardDomainError::ColumnOrderMismatch);
        }
        self.columns.sort_by_key(|column| {
            ordered
                .iter()
                .position(|column_id| column_id == column.id())
        });
        Ok(())
    }

    /// Moves tasks within and between columns to match `placement`.
    ///
    /// Task values are taken from this board, so edits committed after the
    /// caller read its placement are kept. Each moved task's `status` is
    /// rewritten to the column that now holds it. Task lists stored under
    /// keys that are not board columns are dropped.
    ///
    /// Returns the identifiers of tasks that changed column.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskLayoutMismatch`] when the placement's
    /// columns differ from the board's, or when it drops, duplicates, or
    /// invents tasks.
    pub fn apply_placement(
        &mut self,
        placement: &TaskPlacement,
    ) -> Result<Vec<TaskId>, BoardDomainError> {
        let column_ids: HashSet<&ColumnId> = self.columns.iter().map(Column::id).collect();
        let placement_ids: HashSet<&ColumnId> = placement.keys().collect();
        if column_ids != placement_ids {
            return Err(BoardDomainError::TaskLayoutMismatch(
                "placement columns differ from board columns".to_owned(),
            ));
        }

        let current: HashSet<TaskId> = self
            .tasks
            .iter()
            .filter(|(column_id, _)| column_ids.contains(column_id))
            .flat_map(|(_, tasks)| tasks.iter().map(Task::id))
            .collect();
        let mut placed = HashSet::new();
        for task_id in placement.values().flatten() {
            if !placed.insert(*task_id) {
                return Err(BoardDomainError::TaskLayoutMismatch(format!(
                    "task {task_id} placed more than once"
                )));
            }
            if !current.contains(task_id) {
                return Err(BoardDomainError::TaskLayoutMismatch(format!(
                    "task {task_id} is not on the board"
                )));
            }
        }
        if placed.len() != current.len() {
            return Err(BoardDomainError::TaskLayoutMismatch(
                "placement omits tasks that are on the board".to_owned(),
            ));
        }

        let mut pool: HashMap<TaskId, Task> = std::mem::take(&mut self.tasks)
            .into_iter()
            .filter(|(column_id, _)| column_ids.contains(column_id))
            .flat_map(|(_, tasks)| tasks)
            .map(|task| (task.id(), task))
            .collect();
        let mut moved = Vec::new();
        for (column_id, task_ids) in placement {
            let mut tasks = Vec::with_capacity(task_ids.len());
            for task_id in task_ids {
                if let Some(mut task) = pool.remove(task_id) {
                    if task.status() != column_id {
                        moved.push(*task_id);
                        task.set_status(column_id.clone());
                    }
                    tasks.push(task);
                }
            }
            self.tasks.insert(column_id.clone(), tasks);
        }
        Ok(moved)
    }

    /// Finds a task by identifier alone, for mutation.
    pub(crate) fn find_task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks
            .values_mut()
            .flatten()
            .find(|task| task.id() == task_id)
    }

    /// Removes a task from a column.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TaskNotFound`] when the pair does not
    /// exist.
    pub fn remove_task(
        &mut self,
        column_id: &ColumnId,
        task_id: TaskId,
    ) -> Result<Task, BoardDomainError> {
        let not_found = || BoardDomainError::TaskNotFound {
            column_id: column_id.clone(),
            task_id,
        };
        let tasks = self.tasks.get_mut(column_id).ok_or_else(not_found)?;
        let position = tasks
            .iter()
            .position(|task| task.id() == task_id)
            .ok_or_else(not_found)?;
        Ok(tasks.remove(position))
    }
}
