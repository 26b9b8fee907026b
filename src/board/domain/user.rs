//! User references embedded in board documents.

use serde::{Deserialize, Serialize};

/// Opaque reference to a user as supplied by the identity provider.
///
/// Used for the acting user of every operation, task assignees, comment
/// authors, and subtask owners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// Stable user identifier.
    pub id: String,
    /// Name shown in the UI.
    pub display_name: String,
    /// Avatar URL, if the user has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserRef {
    /// Creates a user reference without an avatar.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            photo_url: None,
        }
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_photo_url(mut self, photo_url: impl Into<String>) -> Self {
        self.photo_url = Some(photo_url.into());
        self
    }
}

/// Snapshot of the user who created a task, captured once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    /// User identifier.
    pub id: String,
    /// Display name at creation time.
    pub name: String,
    /// Avatar URL at creation time.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Role name.
    #[serde(default)]
    pub role: Option<String>,
    /// Numeric role rank.
    #[serde(default)]
    pub role_level: Option<u32>,
    /// Whether the account was verified.
    #[serde(default)]
    pub verified: bool,
}

impl From<&UserRef> for Reporter {
    fn from(user: &UserRef) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name.clone(),
            avatar: user.photo_url.clone(),
            email: None,
            role: None,
            role_level: None,
            verified: false,
        }
    }
}

/// Field-wise update of a [`Reporter`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReporterPatch {
    /// Replacement display name.
    pub name: Option<String>,
    /// Replacement avatar URL.
    pub avatar: Option<String>,
    /// Replacement email.
    pub email: Option<String>,
    /// Replacement role.
    pub role: Option<String>,
    /// Replacement role rank.
    pub role_level: Option<u32>,
    /// Replacement verification flag.
    pub verified: Option<bool>,
}

impl Reporter {
    /// Merges the populated fields of `patch` into this snapshot.
    pub fn apply(&mut self, patch: ReporterPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = Some(avatar);
        }
        if let Some(email) = patch.email {
            self.email = Some(email);
        }
        if let Some(role) = patch.role {
            self.role = Some(role);
        }
        if let Some(role_level) = patch.role_level {
            self.role_level = Some(role_level);
        }
        if let Some(verified) = patch.verified {
            self.verified = verified;
        }
    }
}
