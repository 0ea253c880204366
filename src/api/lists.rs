//! List (column) endpoints

use super::client::{ApiClient, ApiError, ApiRequest};
use crate::models::{ListName, TaskList};

impl ApiClient {
    pub async fn list_lists(&self) -> Result<Vec<TaskList>, ApiError> {
        self.fetch(&ApiRequest::get("/lists")).await
    }

    pub async fn get_list(&self, id: i64) -> Result<TaskList, ApiError> {
        self.fetch(&ApiRequest::get(format!("/lists/{}", id))).await
    }

    pub async fn create_list(&self, board_id: i64, name: &str) -> Result<TaskList, ApiError> {
        let req = ApiRequest::post(format!("/lists/{}", board_id)).json(&ListName { name })?;
        self.fetch(&req).await
    }

    pub async fn rename_list(&self, id: i64, name: &str) -> Result<TaskList, ApiError> {
        let req = ApiRequest::put(format!("/lists/{}", id)).json(&ListName { name })?;
        self.fetch(&req).await
    }

    pub async fn delete_list(&self, id: i64) -> Result<(), ApiError> {
        self.send(&ApiRequest::delete(format!("/lists/{}", id)))
            .await
            .map(|_| ())
    }
}
