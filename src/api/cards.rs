//! Card endpoints: creation, movement, assignment, metadata and history

use super::client::{ApiClient, ApiError, ApiRequest};
use crate::models::{Card, CardMetadata, ListRef, NewCard, TaskList};

/// New cards always start in this state; the server rejects other lists.
pub const INITIAL_STATE: &str = "To Do";
pub const DEFAULT_LABEL: &str = "Default";

impl ApiClient {
    pub async fn list_cards(&self) -> Result<Vec<Card>, ApiError> {
        self.fetch(&ApiRequest::get("/cards")).await
    }

    pub async fn get_card(&self, id: i64) -> Result<Card, ApiError> {
        self.fetch(&ApiRequest::get(format!("/cards/{}", id))).await
    }

    pub async fn create_card(
        &self,
        list_id: i64,
        title: &str,
        label: Option<&str>,
    ) -> Result<Card, ApiError> {
        let body = NewCard {
            title,
            label: label.unwrap_or(DEFAULT_LABEL),
            current_state: INITIAL_STATE,
            list: ListRef { id: list_id },
        };
        self.fetch(&ApiRequest::post("/cards").json(&body)?).await
    }

    pub async fn delete_card(&self, id: i64) -> Result<(), ApiError> {
        self.send(&ApiRequest::delete(format!("/cards/{}", id)))
            .await
            .map(|_| ())
    }

    /// Set the card's workflow state. Returns the server's message.
    pub async fn transition_card(&self, id: i64, new_state: &str) -> Result<String, ApiError> {
        let req = ApiRequest::put(format!("/cards/{}/transition", id)).query("newState", new_state);
        self.fetch_text(&req).await
    }

    /// Move the card to another list without changing its state.
    pub async fn move_card(&self, id: i64, list_id: i64) -> Result<String, ApiError> {
        let req = ApiRequest::put(format!("/cards/{}/move", id)).query("listId", list_id);
        self.fetch_text(&req).await
    }

    /// Drag-and-drop: move into `target`, then take the list's name as state.
    pub async fn drop_card(&self, id: i64, target: &TaskList) -> Result<(), ApiError> {
        self.move_card(id, target.id).await?;
        self.transition_card(id, &target.name).await?;
        Ok(())
    }

    /// Assign to `user_id`, or unassign with `None`.
    pub async fn assign_card(&self, id: i64, user_id: Option<&str>) -> Result<String, ApiError> {
        let mut req = ApiRequest::put(format!("/cards/{}/assign", id));
        if let Some(user_id) = user_id {
            req = req.query("userId", user_id);
        }
        self.fetch_text(&req).await
    }

    /// Activity log entries, oldest first.
    pub async fn card_history(&self, id: i64) -> Result<Vec<String>, ApiError> {
        self.fetch(&ApiRequest::get(format!("/cards/{}/history", id)))
            .await
    }

    pub async fn update_card_metadata(
        &self,
        id: i64,
        metadata: &CardMetadata<'_>,
    ) -> Result<Card, ApiError> {
        let req = ApiRequest::put(format!("/cards/{}/update-metadata", id)).json(metadata)?;
        self.fetch(&req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::harness;

    #[tokio::test]
    async fn test_list_cards() {
        let h = harness().await;
        h.server.on(
            "GET",
            "/cards",
            200,
            r#"[{"id":1,"title":"a","currentState":"To Do"},{"id":2,"title":"b"}]"#,
        );

        let cards = h.client.list_cards().await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].current_state.as_deref(), Some(INITIAL_STATE));
        assert!(cards[1].current_state.is_none());
    }

    #[tokio::test]
    async fn test_drop_card_moves_then_transitions() {
        let h = harness().await;
        h.server.on("PUT", "/cards/5/move", 200, "Card moved successfully!");
        h.server.on("PUT", "/cards/5/transition", 200, "Card state updated successfully!");

        let target = TaskList {
            id: 2,
            name: "In Progress".into(),
            cards: vec![],
        };
        h.client.drop_card(5, &target).await.unwrap();

        let puts: Vec<_> = h
            .server
            .requests()
            .into_iter()
            .filter(|r| r.method == "PUT")
            .map(|r| r.target)
            .collect();
        assert_eq!(
            puts,
            vec![
                "/cards/5/move?listId=2".to_string(),
                "/cards/5/transition?newState=In+Progress".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_move_skips_transition() {
        let h = harness().await;
        h.server.on("PUT", "/cards/5/move", 500, "List not found with id: 99");

        let target = TaskList {
            id: 99,
            name: "Gone".into(),
            cards: vec![],
        };
        assert!(h.client.drop_card(5, &target).await.is_err());
        assert!(h.server.hits("PUT", "/cards/5/transition").is_empty());
    }

    #[tokio::test]
    async fn test_assign_and_unassign() {
        let h = harness().await;
        h.server.on("PUT", "/cards/8/assign", 200, "User assignment updated.");

        h.client.assign_card(8, Some("user_2")).await.unwrap();
        h.client.assign_card(8, None).await.unwrap();

        let hits = h.server.hits("PUT", "/cards/8/assign");
        assert_eq!(hits[0].target, "/cards/8/assign?userId=user_2");
        assert_eq!(hits[1].target, "/cards/8/assign");
    }

    #[tokio::test]
    async fn test_create_card_defaults() {
        let h = harness().await;
        h.server.on("POST", "/cards", 200, r#"{"id":31,"title":"Triage","currentState":"To Do"}"#);

        let card = h.client.create_card(4, "Triage", None).await.unwrap();
        assert_eq!(card.current_state.as_deref(), Some(INITIAL_STATE));
        assert_eq!(
            h.server.hits("POST", "/cards")[0].json(),
            serde_json::json!({
                "title": "Triage",
                "label": "Default",
                "currentState": "To Do",
                "list": { "id": 4 }
            })
        );
    }

    #[tokio::test]
    async fn test_history_and_metadata() {
        let h = harness().await;
        h.server.on(
            "GET",
            "/cards/3/history",
            200,
            r#"["Created in To Do at 2025-09-01T10:00","Assigned to Ada at 2025-09-01T11:00"]"#,
        );
        h.server.on("PUT", "/cards/3/update-metadata", 200, r#"{"id":3,"title":"T","label":"Bug"}"#);

        let history = h.client.card_history(3).await.unwrap();
        assert_eq!(history.len(), 2);

        let meta = CardMetadata {
            title: None,
            label: Some("Bug"),
        };
        let card = h.client.update_card_metadata(3, &meta).await.unwrap();
        assert_eq!(card.label.as_deref(), Some("Bug"));
        assert_eq!(
            h.server.hits("PUT", "/cards/3/update-metadata")[0].json(),
            serde_json::json!({ "label": "Bug" })
        );
    }
}
