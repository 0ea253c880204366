//! Board and list models

use serde::{Deserialize, Serialize};

use super::Card;

/// A board. `GET /boards` returns boards without `lists`; `GET /boards/{id}`
/// nests the lists and their cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

/// A column on a board ("To Do", "In Progress", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// Body of `POST /boards`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoard<'a> {
    pub name: &'a str,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<&'a str>,
}

/// Body of `PUT /boards/{id}`. The server overwrites owner fields too, so
/// callers pass the current values through.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate<'a> {
    pub name: &'a str,
    pub owner_id: Option<&'a str>,
    pub owner_name: Option<&'a str>,
}

/// Body of `POST /lists/{boardId}` and `PUT /lists/{id}`.
#[derive(Debug, Serialize)]
pub struct ListName<'a> {
    pub name: &'a str,
}

impl Board {
    /// Public boards, and private boards owned by `user_id`.
    pub fn visible_to(&self, user_id: Option<&str>) -> bool {
        !self.is_private || (user_id.is_some() && self.owner_id.as_deref() == user_id)
    }

    /// Find a list on this board by name, case-insensitively.
    pub fn list_named(&self, name: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// The list that currently holds `card_id`.
    pub fn list_of_card(&self, card_id: i64) -> Option<&TaskList> {
        self.lists
            .iter()
            .find(|l| l.cards.iter().any(|c| c.id == card_id))
    }
}
