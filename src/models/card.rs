//! Card models

use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub label: Option<String>,
    pub due_date: Option<String>,
    pub current_state: Option<String>,
    pub created_at: Option<String>,
    pub assigned_user: Option<User>,
    #[serde(default)]
    pub comments: Vec<String>,
    /// Activity log, newest last.
    #[serde(default)]
    pub state_history: Vec<String>,
}

/// Reference to the owning list in `POST /cards`.
#[derive(Debug, Serialize)]
pub struct ListRef {
    pub id: i64,
}

/// Body of `POST /cards`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard<'a> {
    pub title: &'a str,
    pub label: &'a str,
    pub current_state: &'a str,
    pub list: ListRef,
}

/// Body of `PUT /cards/{id}/update-metadata`; only present keys are applied.
#[derive(Debug, Default, Serialize)]
pub struct CardMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'a str>,
}

impl CardMetadata<'_> {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.label.is_none()
    }
}
