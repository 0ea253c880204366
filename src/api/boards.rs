//! Board endpoints

use super::client::{ApiClient, ApiError, ApiRequest};
use crate::models::{Board, BoardUpdate, NewBoard};

impl ApiClient {
    /// Boards visible to the caller (`GET /boards`).
    pub async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
        self.fetch(&ApiRequest::get("/boards")).await
    }

    /// Boards owned by the caller (`GET /boards/me`).
    pub async fn my_boards(&self) -> Result<Vec<Board>, ApiError> {
        self.fetch(&ApiRequest::get("/boards/me")).await
    }

    /// Board with its lists and cards.
    pub async fn get_board(&self, id: i64) -> Result<Board, ApiError> {
        self.fetch(&ApiRequest::get(format!("/boards/{}", id))).await
    }

    /// The server creates the default lists ("To Do" .. "Done") itself.
    pub async fn create_board(
        &self,
        name: &str,
        is_private: bool,
        owner_name: Option<&str>,
    ) -> Result<Board, ApiError> {
        let body = NewBoard {
            name,
            is_private,
            owner_name,
        };
        self.fetch(&ApiRequest::post("/boards").json(&body)?).await
    }

    /// Rename a board, carrying its owner fields through unchanged.
    pub async fn rename_board(&self, board: &Board, name: &str) -> Result<Board, ApiError> {
        let body = BoardUpdate {
            name,
            owner_id: board.owner_id.as_deref(),
            owner_name: board.owner_name.as_deref(),
        };
        self.fetch(&ApiRequest::put(format!("/boards/{}", board.id)).json(&body)?)
            .await
    }

    pub async fn delete_board(&self, id: i64) -> Result<(), ApiError> {
        self.send(&ApiRequest::delete(format!("/boards/{}", id)))
            .await
            .map(|_| ())
    }
}
