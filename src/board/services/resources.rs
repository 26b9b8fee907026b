//! Subtask, label, comment, and attachment operations on a single task.

use super::{
    BoardConfig, BoardServiceError, BoardServiceResult, CleanupReport,
    cleanup::release_blobs,
    handle::BoardHandle,
};
use crate::board::{
    domain::{
        Attachment, AttachmentUpload, BlobPath, BoardDomainError, ColumnId, Comment,
        CommentId, CommentMessage, MalformedBoardError, NewComment, Subtask, SubtaskId, Task,
        TaskId, UserRef, normalize_label,
    },
    ports::{BlobStorage, FieldPath, RecordStore},
};
use mockable::Clock;
use serde::Deserialize;
use serde_json::Value;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

const LABELS_FIELD: &str = "labels";
const FALLBACK_FILE_NAME: &str = "file";

#[derive(Debug, Deserialize)]
struct LabelVocabulary {
    #[serde(default)]
    labels: BTreeSet<String>,
}

/// Outcome of attaching a label to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAdded {
    /// Normalized label text.
    pub label: String,
    /// `false` when the task already carried the label.
    pub attached: bool,
    /// `true` when the label was new to the board vocabulary.
    pub vocabulary_added: bool,
}

/// Service for the nested collections of a task.
///
/// Every record change runs as a version-checked transaction over the board,
/// so concurrent edits to different fields of the same task are preserved.
pub struct TaskResourceService<S, B, C>
where
    S: RecordStore,
    B: BlobStorage,
    C: Clock + Send + Sync,
{
    board: BoardHandle<S>,
    storage: Arc<B>,
    clock: Arc<C>,
}

impl<S, B, C> Clone for TaskResourceService<S, B, C>
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

impl<S, B, C> TaskResourceService<S, B, C>
where
    S: RecordStore,
    B: BlobStorage,
    C: Clock + Send + Sync,
{
    /// Creates a resource service over the given store, blob storage, and
    /// clock.
    #[must_use]
    pub fn new(store: Arc<S>, storage: Arc<B>, clock: Arc<C>, config: BoardConfig) -> Self {
        Self::from_parts(BoardHandle::new(store, config), storage, clock)
    }

    pub(crate) const fn from_parts(board: BoardHandle<S>, storage: Arc<B>, clock: Arc<C>) -> Self {
        Self {
            board,
            storage,
            clock,
        }
    }

    /// Adds a subtask owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name or a not-found error when
    /// the task does not exist.
    pub async fn add_subtask(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        name: &str,
        actor: &UserRef,
    ) -> BoardServiceResult<Subtask> {
        let subtask = Subtask::new(name, actor)?;
        self.mutate_task("add_subtask", column_id, task_id, actor, |task| {
            task.add_subtask(subtask.clone());
            Ok(())
        })
        .await?;
        info!(task_id = %task_id, subtask_id = %subtask.id, "added subtask");
        Ok(subtask)
    }

    /// Flips a subtask's completion flag.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task or subtask does not exist.
    pub async fn toggle_subtask(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        subtask_id: SubtaskId,
        actor: &UserRef,
    ) -> BoardServiceResult<Subtask> {
        let subtask = self
            .mutate_task("toggle_subtask", column_id, task_id, actor, |task| {
                task.toggle_subtask(subtask_id)
            })
            .await?;
        info!(task_id = %task_id, subtask_id = %subtask_id, completed = subtask.completed, "toggled subtask");
        Ok(subtask)
    }

    /// Removes a subtask.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task or subtask does not exist.
    pub async fn delete_subtask(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        subtask_id: SubtaskId,
        actor: &UserRef,
    ) -> BoardServiceResult<Subtask> {
        let subtask = self
            .mutate_task("delete_subtask", column_id, task_id, actor, |task| {
                task.remove_subtask(subtask_id)
            })
            .await?;
        info!(task_id = %task_id, subtask_id = %subtask_id, "deleted subtask");
        Ok(subtask)
    }

    /// Attaches a label to a task and records it in the board vocabulary.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank label or a not-found error when
    /// the task does not exist.
    pub async fn add_label(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        label: &str,
        actor: &UserRef,
    ) -> BoardServiceResult<LabelAdded> {
        let normalized = normalize_label(label)?;
        let attached = self
            .mutate_task("add_label", column_id, task_id, actor, |task| {
                task.add_label(&normalized)
            })
            .await?;

        let vocabulary_added = if self.label_vocabulary().await?.contains(&normalized) {
            false
        } else {
            self.board
                .store()
                .append_unique(
                    &self.board.config().label_vocabulary_key,
                    &FieldPath::field(LABELS_FIELD),
                    Value::String(normalized.clone()),
                )
                .await?;
            true
        };
        info!(task_id = %task_id, label = %normalized, vocabulary_added, "added label");
        Ok(LabelAdded {
            label: normalized,
            attached,
            vocabulary_added,
        })
    }

    /// Detaches a label from a task. The board vocabulary keeps it.
    ///
    /// Returns `false` when the task did not carry the label.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task does not exist.
    pub async fn remove_label(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        label: &str,
        actor: &UserRef,
    ) -> BoardServiceResult<bool> {
        let removed = self
            .mutate_task("remove_label", column_id, task_id, actor, |task| {
                Ok(task.remove_label(label))
            })
            .await?;
        info!(task_id = %task_id, label, removed, "removed label");
        Ok(removed)
    }

    /// Returns every label ever added on the board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardServiceError::InvalidState`] when the vocabulary record
    /// is malformed, or a store error.
    pub async fn label_vocabulary(&self) -> BoardServiceResult<BTreeSet<String>> {
        let key = &self.board.config().label_vocabulary_key;
        let Some(record) = self.board.store().get(key).await? else {
            return Ok(BTreeSet::new());
        };
        let vocabulary = LabelVocabulary::deserialize(&record.value)
            .map_err(|err| MalformedBoardError::Decode(err.to_string()))?;
        Ok(vocabulary.labels)
    }

    /// Posts a text comment, optionally replying to an earlier comment on
    /// the same task.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank text or a not-found error when
    /// the task or replied-to comment does not exist.
    pub async fn add_comment(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        request: NewComment,
        actor: &UserRef,
    ) -> BoardServiceResult<Comment> {
        let created_at = self.clock.utc();
        let comment = self
            .mutate_task("add_comment", column_id, task_id, actor, move |task| {
                task.add_comment(request.clone(), actor, created_at)
            })
            .await?;
        info!(task_id = %task_id, comment_id = %comment.id, "added comment");
        Ok(comment)
    }

    /// Uploads an image and posts it as a comment.
    ///
    /// The blob is deleted again when the comment cannot be recorded.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task or replied-to comment does
    /// not exist, or a storage error when the upload fails.
    pub async fn add_image_comment(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        upload: AttachmentUpload,
        reply_to: Option<CommentId>,
        actor: &UserRef,
    ) -> BoardServiceResult<Comment> {
        self.ensure_task(column_id, task_id).await?;
        let path = self.upload_path(task_id, Some("comments"), &upload.name)?;
        let attachment = self.upload(path.clone(), upload).await?;
        let request = NewComment {
            message: CommentMessage::Image { attachment },
            reply_to,
        };
        let created_at = self.clock.utc();
        let outcome = self
            .mutate_task("add_image_comment", column_id, task_id, actor, |task| {
                task.add_comment(request.clone(), actor, created_at)
            })
            .await;
        let comment = self.discard_on_error(outcome, path).await?;
        info!(task_id = %task_id, comment_id = %comment.id, "added image comment");
        Ok(comment)
    }

    /// Lists a task's comments, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task does not exist.
    pub async fn comments(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
    ) -> BoardServiceResult<Vec<Comment>> {
        let (board, _) = self.board.load().await?;
        Ok(board.task(column_id, task_id)?.comments_chronological())
    }

    /// Uploads a file and attaches it to a task.
    ///
    /// The blob is deleted again when the attachment cannot be recorded.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task does not exist, or a storage
    /// error when the upload fails.
    pub async fn add_attachment(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        upload: AttachmentUpload,
        actor: &UserRef,
    ) -> BoardServiceResult<Attachment> {
        self.ensure_task(column_id, task_id).await?;
        let path = self.upload_path(task_id, None, &upload.name)?;
        let attachment = self.upload(path.clone(), upload).await?;
        let outcome = self
            .mutate_task("add_attachment", column_id, task_id, actor, |task| {
                task.add_attachment(attachment.clone());
                Ok(())
            })
            .await;
        self.discard_on_error(outcome, path).await?;
        info!(task_id = %task_id, path = %attachment.path, size = attachment.size, "added attachment");
        Ok(attachment)
    }

    /// Deletes an attachment's blob, then removes it from the task.
    ///
    /// The record is updated even when storage refuses the delete; the
    /// failure is reported in the returned [`CleanupReport`].
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the task or attachment does not exist.
    pub async fn delete_attachment(
        &self,
        column_id: &ColumnId,
        task_id: TaskId,
        path: &BlobPath,
        actor: &UserRef,
    ) -> BoardServiceResult<CleanupReport> {
        let (board, _) = self.board.load().await?;
        if board.task(column_id, task_id)?.attachment(path).is_none() {
            return Err(BoardServiceError::Domain(
                BoardDomainError::AttachmentNotFound {
                    task_id,
                    path: path.to_string(),
                },
            ));
        }
        let report = release_blobs(&*self.storage, vec![path.clone()]).await;
        self.mutate_task("delete_attachment", column_id, task_id, actor, |task| {
            task.remove_attachment(path)
        })
        .await?;
        info!(task_id = %task_id, path = %path, "deleted attachment");
        Ok(report)
    }

    async fn mutate_task<T, F>(
        &self,
        operation: &'static str,
        column_id: &ColumnId,
        task_id: TaskId,
        actor: &UserRef,
        mut mutate: F,
    ) -> BoardServiceResult<T>
    where
        F: FnMut(&mut Task) -> Result<T, BoardDomainError> + Send,
        T: Send,
    {
        self.board
            .transact(operation, |board| {
                let task = board.task_mut(column_id, task_id)?;
                let outcome = mutate(task)?;
                task.touch(actor, &*self.clock);
                Ok(outcome)
            })
            .await
    }

    async fn ensure_task(&self, column_id: &ColumnId, task_id: TaskId) -> BoardServiceResult<()> {
        let (board, _) = self.board.load().await?;
        board.task(column_id, task_id)?;
        Ok(())
    }

    fn upload_path(
        &self,
        task_id: TaskId,
        scope: Option<&str>,
        file_name: &str,
    ) -> BoardServiceResult<BlobPath> {
        let prefix = &self.board.config().attachment_prefix;
        let object = format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));
        let raw = match scope {
            Some(scope) => format!("{prefix}/{task_id}/{scope}/{object}"),
            None => format!("{prefix}/{task_id}/{object}"),
        };
        Ok(BlobPath::new(raw)?)
    }

    async fn upload(
        &self,
        path: BlobPath,
        upload: AttachmentUpload,
    ) -> BoardServiceResult<Attachment> {
        let mut attachment = Attachment::from_upload(&upload, path, String::new(), self.clock.utc());
        attachment.url = self
            .storage
            .upload(&attachment.path, upload.bytes, &upload.content_type)
            .await?
            .into_inner();
        Ok(attachment)
    }

    async fn discard_on_error<T>(
        &self,
        outcome: BoardServiceResult<T>,
        path: BlobPath,
    ) -> BoardServiceResult<T> {
        if outcome.is_err() {
            warn!(path = %path, "record update failed after upload, discarding blob");
            release_blobs(&*self.storage, vec![path]).await;
        }
        outcome
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_owned()
    } else {
        cleaned
    }
}
