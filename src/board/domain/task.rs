//! Task aggregate and its request types.

use super::{
    Attachment, BlobPath, BoardDomainError, ColumnId, Comment, CommentMessage, NewComment,
    Reporter, ReporterPatch, Subtask, SubtaskId, TaskId, UserRef,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Start and end of the period a task is due in.
///
/// Stored as a two-element `[start, end]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueWindow(DateTime<Utc>, DateTime<Utc>);

impl DueWindow {
    /// Creates a window from explicit bounds.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self(start, end)
    }

    /// Creates a window of `length` beginning at `start`.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>, length: TimeDelta) -> Self {
        Self(start, start + length)
    }

    /// Returns the start of the window.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns the end of the window.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.1
    }
}

/// Trims a label and rejects blank ones.
///
/// # Errors
///
/// Returns [`BoardDomainError::EmptyLabel`] when nothing remains after
/// trimming.
pub fn normalize_label(label: &str) -> Result<String, BoardDomainError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(BoardDomainError::EmptyLabel);
    }
    Ok(trimmed.to_owned())
}

fn normalize_task_name(name: &str) -> Result<String, BoardDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BoardDomainError::EmptyTaskName);
    }
    Ok(trimmed.to_owned())
}

fn normalize_labels(labels: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    labels
        .into_iter()
        .filter_map(|label| normalize_label(&label).ok())
        .collect()
}

/// Keeps the first occurrence of each user id.
fn dedupe_users(users: Vec<UserRef>) -> Vec<UserRef> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .filter(|user| seen.insert(user.id.clone()))
        .collect()
}

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    name: String,
    description: Option<String>,
    priority: Option<Priority>,
    due: Option<DueWindow>,
    labels: Vec<String>,
    assignees: Vec<UserRef>,
    reporter: Option<Reporter>,
}

impl NewTask {
    /// Creates a request with the required task name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            priority: None,
            due: None,
            labels: Vec::new(),
            assignees: Vec::new(),
            reporter: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the due window.
    #[must_use]
    pub fn with_due(mut self, due: DueWindow) -> Self {
        self.due = Some(due);
        self
    }

    /// Sets the initial labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Sets the initial assignees.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = UserRef>) -> Self {
        self.assignees = assignees.into_iter().collect();
        self
    }

    /// Supplies a full reporter profile instead of deriving it from the actor.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }
}

/// Partial task update; `None` fields are left unchanged.
///
/// The reporter is merged field by field rather than replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement priority.
    pub priority: Option<Priority>,
    /// Replacement due window.
    pub due: Option<DueWindow>,
    /// Replacement label set.
    pub labels: Option<BTreeSet<String>>,
    /// Replacement assignee set.
    pub assignee: Option<Vec<UserRef>>,
    /// Reporter fields to merge.
    pub reporter: Option<ReporterPatch>,
}

impl TaskPatch {
    /// Sets the replacement name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the replacement description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the replacement priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the replacement due window.
    #[must_use]
    pub fn with_due(mut self, due: DueWindow) -> Self {
        self.due = Some(due);
        self
    }

    /// Sets the replacement assignees.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = UserRef>) -> Self {
        self.assignee = Some(assignees.into_iter().collect());
        self
    }

    /// Sets reporter fields to merge.
    #[must_use]
    pub fn with_reporter(mut self, reporter: ReporterPatch) -> Self {
        self.reporter = Some(reporter);
        self
    }
}

/// A unit of work on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    status: ColumnId,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Priority,
    due: DueWindow,
    #[serde(default)]
    labels: BTreeSet<String>,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    assignee: Vec<UserRef>,
    #[serde(default)]
    subtasks: Vec<Subtask>,
    reporter: Reporter,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: String,
    updated_by: String,
    /// Fields written by other clients that this crate does not model.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Task {
    /// Materializes a new task in `column_id`, applying every default.
    ///
    /// Missing priority becomes [`Priority::Medium`]; a missing due window
    /// starts now and lasts `due_window`; a missing reporter is derived from
    /// `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyTaskName`] when the name is blank.
    pub fn create(
        request: NewTask,
        column_id: ColumnId,
        actor: &UserRef,
        due_window: TimeDelta,
        clock: &impl Clock,
    ) -> Result<Self, BoardDomainError> {
        let name = normalize_task_name(&request.name)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            status: column_id,
            name,
            description: request.description.unwrap_or_default(),
            priority: request.priority.unwrap_or_default(),
            due: request
                .due
                .unwrap_or_else(|| DueWindow::starting_at(timestamp, due_window)),
            labels: normalize_labels(request.labels),
            comments: Vec::new(),
            attachments: Vec::new(),
            assignee: dedupe_users(request.assignees),
            subtasks: Vec::new(),
            reporter: request.reporter.unwrap_or_else(|| Reporter::from(actor)),
            created_at: timestamp,
            updated_at: timestamp,
            created_by: actor.id.clone(),
            updated_by: actor.id.clone(),
            extra: Map::new(),
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the identifier of the owning column.
    #[must_use]
    pub const fn status(&self) -> &ColumnId {
        &self.status
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the due window.
    #[must_use]
    pub const fn due(&self) -> DueWindow {
        self.due
    }

    /// Returns the attached labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns comments in persisted order.
    ///
    /// Persisted order is not guaranteed to be chronological; use
    /// [`Task::comments_chronological`] for display.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Returns comments sorted by creation time, oldest first.
    #[must_use]
    pub fn comments_chronological(&self) -> Vec<Comment> {
        let mut sorted = self.comments.clone();
        sorted.sort_by_key(|comment| comment.created_at);
        sorted
    }

    /// Returns the attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns the assignees.
    #[must_use]
    pub fn assignee(&self) -> &[UserRef] {
        &self.assignee
    }

    /// Returns the subtasks.
    #[must_use]
    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    /// Returns the reporter snapshot.
    #[must_use]
    pub const fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the id of the creating user.
    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Returns the id of the last modifying user.
    #[must_use]
    pub fn updated_by(&self) -> &str {
        &self.updated_by
    }

    /// Returns storage paths of every blob owned by this task.
    ///
    /// Covers attachments and images posted as comments.
    #[must_use]
    pub fn owned_blob_paths(&self) -> Vec<BlobPath> {
        let comment_images = self.comments.iter().filter_map(|comment| match &comment.message {
            CommentMessage::Image { attachment } => Some(attachment.path.clone()),
            CommentMessage::Text { .. } => None,
        });
        self.attachments
            .iter()
            .map(|attachment| attachment.path.clone())
            .chain(comment_images)
            .collect()
    }

    /// Merges the populated fields of `patch` into this task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyTaskName`] when the patch blanks the
    /// name; the task is left untouched in that case.
    pub fn apply_patch(&mut self, patch: TaskPatch) -> Result<(), BoardDomainError> {
        let name = patch
            .name
            .as_deref()
            .map(normalize_task_name)
            .transpose()?;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due) = patch.due {
            self.due = due;
        }
        if let Some(labels) = patch.labels {
            self.labels = normalize_labels(labels);
        }
        if let Some(assignee) = patch.assignee {
            self.assignee = dedupe_users(assignee);
        }
        if let Some(reporter) = patch.reporter {
            self.reporter.apply(reporter);
        }
        Ok(())
    }

    /// Appends a subtask.
    pub fn add_subtask(&mut self, subtask: Subtask) {
        self.subtasks.push(subtask);
    }

    /// Flips the completion flag of a subtask and returns its new state.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::SubtaskNotFound`] when absent.
    pub fn toggle_subtask(&mut self, subtask_id: SubtaskId) -> Result<Subtask, BoardDomainError> {
        let task_id = self.id;
        let subtask = self
            .subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id)
            .ok_or(BoardDomainError::SubtaskNotFound {
                task_id,
                subtask_id,
            })?;
        subtask.completed = !subtask.completed;
        Ok(subtask.clone())
    }

    /// Removes a subtask.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::SubtaskNotFound`] when absent.
    pub fn remove_subtask(&mut self, subtask_id: SubtaskId) -> Result<Subtask, BoardDomainError> {
        let position = self
            .subtasks
            .iter()
            .position(|subtask| subtask.id == subtask_id)
            .ok_or(BoardDomainError::SubtaskNotFound {
                task_id: self.id,
                subtask_id,
            })?;
        Ok(self.subtasks.remove(position))
    }

    /// Adds a label; returns `false` when it was already attached.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyLabel`] for a blank label.
    pub fn add_label(&mut self, label: &str) -> Result<bool, BoardDomainError> {
        Ok(self.labels.insert(normalize_label(label)?))
    }

    /// Removes a label; returns `false` when it was not attached.
    pub fn remove_label(&mut self, label: &str) -> bool {
        self.labels.remove(label.trim())
    }

    /// Appends a comment authored by `author`.
    ///
    /// A reply target is resolved against this task's comments and copied
    /// into the new comment.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::CommentNotFound`] when the reply target is
    /// not on this task, or [`BoardDomainError::EmptyCommentMessage`] for
    /// blank text.
    pub fn add_comment(
        &mut self,
        request: NewComment,
        author: &UserRef,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, BoardDomainError> {
        let reply_to = request
            .reply_to
            .map(|comment_id| {
                self.comments
                    .iter()
                    .find(|comment| comment.id == comment_id)
                    .map(Comment::as_reply_target)
                    .ok_or(BoardDomainError::CommentNotFound {
                        task_id: self.id,
                        comment_id,
                    })
            })
            .transpose()?;
        let comment = Comment::new(request.message, author, reply_to, created_at)?;
        self.comments.push(comment.clone());
        Ok(comment)
    }

    /// Appends an attachment record.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Removes the attachment stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::AttachmentNotFound`] when absent.
    pub fn remove_attachment(&mut self, path: &BlobPath) -> Result<Attachment, BoardDomainError> {
        let position = self
            .attachments
            .iter()
            .position(|attachment| attachment.path == *path)
            .ok_or_else(|| BoardDomainError::AttachmentNotFound {
                task_id: self.id,
                path: path.to_string(),
            })?;
        Ok(self.attachments.remove(position))
    }

    /// Finds the attachment stored at `path`.
    #[must_use]
    pub fn attachment(&self, path: &BlobPath) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.path == *path)
    }

    /// Records `actor` as the latest modifier at the current clock time.
    pub fn touch(&mut self, actor: &UserRef, clock: &impl Clock) {
        self.updated_at = clock.utc();
        actor.id.clone_into(&mut self.updated_by);
    }

    /// Points the task at the column that now holds it.
    pub(crate) fn set_status(&mut self, column_id: ColumnId) {
        self.status = column_id;
    }
}
