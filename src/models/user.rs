//! User-related models

use serde::{Deserialize, Serialize};

/// User as returned by `/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Cached copy of the signed-in user. Best-effort, never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    /// Profile derived from the login email when the server does not send one.
    pub fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: None,
            name,
            email: email.to_string(),
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let email = user.email.unwrap_or_default();
        let name = user
            .name
            .unwrap_or_else(|| UserProfile::from_email(&email).name);
        Self {
            id: Some(user.id),
            name,
            email,
        }
    }
}

/// Body of `PUT /users/{id}`.
#[derive(Debug, Default, Serialize)]
pub struct UserUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}
