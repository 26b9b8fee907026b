//! Column and task operations on the shared board.

use super::{
    BoardConfig, BoardServiceError, BoardServiceResult, CleanupReport, LiveBoard,
    TaskResourceService,
    cleanup::release_blobs,
    handle::{BoardHandle, encode},
};
use crate::board::{
    domain::{Board, Column, ColumnId, NewTask, Task, TaskId, TaskPatch, TaskPlacement, UserRef},
    ports::{BlobStorage, FieldPath, FieldUpdate, RecordStore, RecordVersion},
};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

const COLUMNS_FIELD: &str = "columns";
const TASKS_FIELD: &str = "tasks";

fn task_list_path(column_id: &ColumnId) -> FieldPath {
    FieldPath::field(TASKS_FIELD).child(column_id.as_str())
}

/// Board orchestration service for columns and tasks.
///
/// Structural changes that rewrite whole lists run as version-checked
/// transactions; additive changes use path-scoped store writes so that
/// concurrent clients never overwrite each other.
pub struct BoardService<S, B, C>
where
    S: RecordStore,
    B: BlobStorage,
    C: Clock + Send + Sync,
{
    board: BoardHandle<S>,
    storage: Arc<B>,
    clock: Arc<C>,
}

impl<S, B, C> Clone for BoardService<S, B, C>
where
    S: RecordStore,
    B: BlobStorage,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            board: self.board.clone(),
            storage: Arc::clone(&self.storage),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, B, C> BoardService<S, B, C>
where
    S: RecordStore,
    B: BlobStorage,
    C: Clock + Send + Sync,
{
    /// Creates a board service over the given store, blob storage, and
    /// clock.
    #[must_use]
    pub fn new(store: Arc<S>, storage: Arc<B>, clock: Arc<C>, config: BoardConfig) -> Self {
        Self {
            board: BoardHandle::new(store, config),
            storage,
            clock,
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        self.board.config()
    }

    /// Returns a resource service sharing this service's store, storage,
    /// clock, and configuration.
    #[must_use]
    pub fn resources(&self) -> TaskResourceService<S, B, C> {
        TaskResourceService::from_parts(
            self.board.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.clock),
        )
    }

    /// Creates an empty board unless one already exists, returning the
    /// stored board either way.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError`] when the store fails or the existing
    /// record is malformed.
    pub async fn initialize(&self) -> BoardServiceResult<Board> {
        let empty = Board::empty();
        let record = empty.to_record()?;
        let key = &self.board.config().board_key;
        match self
            .board
            .store()
            .set_if_version(key, record, RecordVersion::ABSENT)
            .await
        {
            Ok(_) => {
                info!(key = %key, "initialized empty board");
                Ok(empty)
            }
            Err(err) if err.is_conflict() => Ok(self.board.load().await?.0),
            Err(err) => Err(BoardServiceError::Store(err)),
        }
    }

    /// Reads the current board.
    ///
    /// Returns `Ok(None)` when the board has not been initialized.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError`] when the store fails or the record is
    /// malformed.
    pub async fn board(&self) -> BoardServiceResult<Option<Board>> {
        Ok(self.board.read().await?.map(|(board, _)| board))
    }

    /// Finds a task anywhere on the board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError`] when the board cannot be read.
    pub async fn find_task(&self, task_id: TaskId) -> BoardServiceResult<Option<Task>> {
        let (board, _) = self.board.load().await?;
        Ok(board.find_task(task_id).map(|(_, task)| task.clone()))
    }

    /// Opens a live projection of the board, driven by the current Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::NoRuntime`] when called outside a Tokio
    /// runtime, or [`BoardServiceError::Store`] when the store refuses the
    /// subscription.
    pub fn subscribe(&self) -> BoardServiceResult<LiveBoard> {
        let runtime = Handle::try_current()?;
        self.subscribe_on(&runtime)
    }

    /// Opens a live projection of the board, driven by `runtime`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Store`] when the store refuses the
    /// subscription.
    pub fn subscribe_on(&self, runtime: &Handle) -> BoardServiceResult<LiveBoard> {
        let key = &self.board.config().board_key;
        let subscription = self.board.store().subscribe(key)?;
        debug!(key = %key, "opened board subscription");
        Ok(LiveBoard::spawn(subscription, key, runtime))
    }

    /// Appends a column with an empty task list.
    ///
    /// A blank name becomes the default column name.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::BoardMissing`] when the board has not
    /// been initialized, or a store error.
    pub async fn create_column(&self, name: &str) -> BoardServiceResult<Column> {
        let column = Column::new(name);
        self.board
            .merge(vec![
                FieldUpdate::append_unique(FieldPath::field(COLUMNS_FIELD), encode(&column)?),
                FieldUpdate::set(task_list_path(column.id()), Value::Array(Vec::new())),
            ])
            .await?;
        info!(column_id = %column.id(), name = column.name(), "created column");
        Ok(column)
    }

    /// Renames a column.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the column does not exist.
    pub async fn update_column(&self, column_id: &ColumnId, name: &str) -> BoardServiceResult<Column> {
        let column = self
            .board
            .transact("update_column", |board| Ok(board.rename_column(column_id, name)?))
            .await?;
        info!(column_id = %column_id, name = column.name(), "renamed column");
        Ok(column)
    }

    /// Replaces the column order.
    ///
    /// Only positions are taken from `ordered`; names come from the stored
    /// board, so a reorder never undoes a concurrent rename.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Domain`] when `ordered` is not a
    /// permutation of the board's columns.
    pub async fn move_columns(&self, ordered: Vec<ColumnId>) -> BoardServiceResult<()> {
        let count = ordered.len();
        self.board
            .transact("move_columns", move |board| {
                Ok(board.reorder_columns(&ordered)?)
            })
            .await?;
        info!(columns = count, "reordered columns");
        Ok(())
    }

    /// Removes every task from a column, keeping the column.
    ///
    /// Blobs owned by the removed tasks are released afterwards.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the column does not exist.
    pub async fn clear_column(&self, column_id: &ColumnId) -> BoardServiceResult<CleanupReport> {
        let (board, _) = self.board.load().await?;
        board.require_column(column_id)?;
        let removed: Vec<Task> = board.tasks_in(column_id).unwrap_or_default().to_vec();
        self.board
            .merge(vec![FieldUpdate::set(
                task_list_path(column_id),
                Value::Array(Vec::new()),
            )])
            .await?;
        info!(column_id = %column_id, tasks = removed.len(), "cleared column");
        Ok(self.release_task_blobs(&removed).await)
    }

    /// Removes a column and its tasks.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the column does not exist.
    pub async fn delete_column(&self, column_id: &ColumnId) -> BoardServiceResult<CleanupReport> {
        let removed = self
            .board
            .transact("delete_column", |board| Ok(board.remove_column(column_id)?))
            .await?;
        info!(column_id = %column_id, tasks = removed.len(), "deleted column");
        Ok(self.release_task_blobs(&removed).await)
    }

    /// Creates a task at the end of a column.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the column does not exist, or a
    /// validation error for a blank name.
    pub async fn create_task(
        &self,
        column_id: &ColumnId,
        request: NewTask,
        actor: &UserRef,
    ) -> BoardServiceResult<Task> {
        let (board, _) = self.board.load().await?;
        board.require_column(column_id)?;
        let task = Task::create(
            request,
            column_id.clone(),
            actor,
            self.board.config().default_due_window,
            &*self.clock,
        )?;
        self.board
            .store()
            .append_unique(
                &self.board.config().board_key,
                &task_list_path(column_id),
                encode(&task)?,
            )
            .await?;
        info!(column_id = %column_id, task_id = %task.id(), "created task");
        Ok(task)
    }

    /// Applies a partial update to a task.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task is not in the column, or a
    /// validation error for invalid patch values.
    pub async fn update_task(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        patch: TaskPatch,
        actor: &UserRef,
    ) -> BoardServiceResult<Task> {
        let task = self
            .board
            .transact("update_task", move |board| {
                let task = board.task_mut(column_id, task_id)?;
                task.apply_patch(patch.clone())?;
                task.touch(actor, &*self.clock);
                Ok(task.clone())
            })
            .await?;
        info!(column_id = %column_id, task_id = %task_id, "updated task");
        Ok(task)
    }

    /// Moves tasks within and between columns.
    ///
    /// `placement` only says where each task goes. Task contents come from
    /// the stored board, so edits other clients committed after the caller
    /// read its placement survive the move.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::Domain`] when the placement does not hold
    /// exactly the board's columns and tasks.
    pub async fn move_tasks(
        &self,
        placement: TaskPlacement,
        actor: &UserRef,
    ) -> BoardServiceResult<()> {
        let moved = self
            .board
            .transact("move_tasks", move |board| {
                let relocated = board.apply_placement(&placement)?;
                for task_id in &relocated {
                    if let Some(task) = board.find_task_mut(*task_id) {
                        task.touch(actor, &*self.clock);
                    }
                }
                Ok(relocated.len())
            })
            .await?;
        info!(moved, "rearranged tasks");
        Ok(())
    }

    /// Removes a task and releases its blobs.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task is not in the column.
    pub async fn delete_task(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
    ) -> BoardServiceResult<CleanupReport> {
        let removed = self
            .board
            .transact("delete_task", |board| Ok(board.remove_task(column_id, task_id)?))
            .await?;
        info!(column_id = %column_id, task_id = %task_id, "deleted task");
        Ok(self.release_task_blobs(std::slice::from_ref(&removed)).await)
    }

    async fn release_task_blobs(&self, tasks: &[Task]) -> CleanupReport {
        let paths = tasks.iter().flat_map(Task::owned_blob_paths).collect();
        release_blobs(&*self.storage, paths).await
    }
}
