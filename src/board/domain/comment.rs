//! Append-only task comments.

use super::{Attachment, BoardDomainError, CommentId, UserRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommentMessage {
    /// Plain text.
    Text {
        /// Comment text.
        text: String,
    },
    /// An uploaded image.
    Image {
        /// Stored image file.
        attachment: Attachment,
    },
}

impl CommentMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Shallow copy of the comment being replied to.
///
/// This is a snapshot, not a live reference: later changes to the original
/// are not reflected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTo {
    /// Identifier of the original comment.
    pub comment_id: CommentId,
    /// Author of the original comment.
    pub user: UserRef,
    /// Body of the original comment.
    pub message: CommentMessage,
}

/// A comment on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Comment body.
    pub message: CommentMessage,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Author.
    pub user: UserRef,
    /// Snapshot of the comment this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
}

impl Comment {
    /// Creates a comment authored by `author` at `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyCommentMessage`] for blank text.
    pub fn new(
        message: CommentMessage,
        author: &UserRef,
        reply_to: Option<ReplyTo>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BoardDomainError> {
        let message = match message {
            CommentMessage::Text { text } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(BoardDomainError::EmptyCommentMessage);
                }
                CommentMessage::text(trimmed)
            }
            image @ CommentMessage::Image { .. } => image,
        };
        Ok(Self {
            id: CommentId::new(),
            message,
            created_at,
            user: author.clone(),
            reply_to,
        })
    }

    /// Returns the reply snapshot of this comment.
    #[must_use]
    pub fn as_reply_target(&self) -> ReplyTo {
        ReplyTo {
            comment_id: self.id,
            user: self.user.clone(),
            message: self.message.clone(),
        }
    }
}

/// Request payload for posting a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Comment body.
    pub message: CommentMessage,
    /// Comment being replied to, if any.
    pub reply_to: Option<CommentId>,
}

impl NewComment {
    /// Creates a text comment request.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message: CommentMessage::text(text),
            reply_to: None,
        }
    }

    /// Marks the comment as a reply to an earlier comment on the same task.
    #[must_use]
    pub fn replying_to(mut self, comment_id: CommentId) -> Self {
        self.reply_to = Some(comment_id);
        self
    }
}
