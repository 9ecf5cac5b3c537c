use serde::{Deserialize, Serialize};
use std::fmt;

/// A note as mirrored from the backend.
///
/// The backend keys notes by `_id` (Mongo style); `id` is accepted as well.
/// Fields we don't model are kept in `extra` and echoed back on update.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Note {
    #[cfg(test)]
    pub(crate) fn new(id: &str, title: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            updated_at: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Authenticated identity held for the duration of a login.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize, Clone)]
pub(crate) struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub(crate) struct NoteBody<'a> {
    pub title: &'a str,
    pub content: &'a str,
}
