//! User registry endpoints

use super::client::{ApiClient, ApiError, ApiRequest};
use crate::models::{User, UserUpdate};

impl ApiClient {
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.fetch(&ApiRequest::get("/users")).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.fetch(&ApiRequest::get(format!("/users/{}", id))).await
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate<'_>) -> Result<User, ApiError> {
        let req = ApiRequest::put(format!("/users/{}", id)).json(update)?;
        self.fetch(&req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::harness;

    #[tokio::test]
    async fn test_update_user_sends_only_changes() {
        let h = harness().await;
        h.server.on(
            "PUT",
            "/users/user_1",
            200,
            r#"{"id":"user_1","name":"Ada L","email":"ada@example.com"}"#,
        );

        let update = UserUpdate {
            name: Some("Ada L"),
            email: None,
        };
        let user = h.client.update_user("user_1", &update).await.unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada L"));
        assert_eq!(
            h.server.hits("PUT", "/users/user_1")[0].json(),
            serde_json::json!({ "name": "Ada L" })
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let h = harness().await;
        let err = h.client.get_user("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
