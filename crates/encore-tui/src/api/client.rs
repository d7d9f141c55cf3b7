use anyhow::Result;
use encore_shared::{
    api::{CreateCustomFieldRequest, SetCustomFieldValueRequest, TaskListParams, UpdateTaskRequest},
    CustomFieldDefinition, Project, Task, UserRef,
};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use super::auth::AuthToken;

#[derive(Debug, serde::Deserialize)]
#[allow(dead_code)] // Pagination fields for future use
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Access forbidden")]
    Forbidden,
    #[error("Resource not found")]
    NotFound,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<AuthToken>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Load the bearer token from disk
    pub fn load_token(&mut self) -> Result<bool> {
        self.token = AuthToken::load()?;
        Ok(self.token.is_some())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.token.as_ref().map(|t| t.user_id)
    }

    /// Build URL for endpoint
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn auth_header(&self) -> Result<String, ApiError> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {}", t.access_token))
            .ok_or(ApiError::Unauthorized)
    }

    async fn authed_get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        self.client
            .get(self.url(path))
            .header("Authorization", self.auth_header()?)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    async fn authed_post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ApiError> {
        self.client
            .post(self.url(path))
            .header("Authorization", self.auth_header()?)
            .json(body)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    async fn authed_patch<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ApiError> {
        self.client
            .patch(self.url(path))
            .header("Authorization", self.auth_header()?)
            .json(body)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    async fn authed_put<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ApiError> {
        self.client
            .put(self.url(path))
            .header("Authorization", self.auth_header()?)
            .json(body)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    /// Handle API response
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                response.json().await.map_err(ApiError::Network)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let text = response.text().await.unwrap_or_default();
                Err(ApiError::Validation(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ApiError::Server(format!("{}: {}", status, text)))
            }
        }
    }

    /// Handle empty response
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let text = response.text().await.unwrap_or_default();
                Err(ApiError::Validation(text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ApiError::Server(format!("{}: {}", status, text)))
            }
        }
    }

    // ============ Projects ============

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let response = self.authed_get("/projects").await?;
        self.handle_response(response).await
    }

    pub async fn list_members(&self, project_id: Uuid) -> Result<Vec<UserRef>, ApiError> {
        let response = self
            .authed_get(&format!("/projects/{}/members", project_id))
            .await?;
        self.handle_response(response).await
    }

    // ============ Tasks ============

    pub async fn list_tasks(
        &self,
        project_id: Uuid,
        params: &TaskListParams,
    ) -> Result<TaskListResponse, ApiError> {
        let mut path = format!("/projects/{}/tasks", project_id);
        let query = query_string(params);
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }

        let response = self.authed_get(&path).await?;
        self.handle_response(response).await
    }

    pub async fn update_task(
        &self,
        task_id: Uuid,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        let response = self
            .authed_patch(&format!("/tasks/{}", task_id), request)
            .await?;
        self.handle_response(response).await
    }

    pub async fn set_custom_field_value(
        &self,
        task_id: Uuid,
        field_id: i64,
        value: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        let request = SetCustomFieldValueRequest { value };
        let response = self
            .authed_put(
                &format!("/tasks/{}/custom-fields/{}", task_id, field_id),
                &request,
            )
            .await?;
        self.handle_empty_response(response).await
    }

    // ============ Custom fields ============

    pub async fn list_custom_fields(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<CustomFieldDefinition>, ApiError> {
        let response = self
            .authed_get(&format!("/projects/{}/custom-fields", project_id))
            .await?;
        self.handle_response(response).await
    }

    pub async fn create_custom_field(
        &self,
        project_id: Uuid,
        request: &CreateCustomFieldRequest,
    ) -> Result<CustomFieldDefinition, ApiError> {
        let response = self
            .authed_post(&format!("/projects/{}/custom-fields", project_id), request)
            .await?;
        self.handle_response(response).await
    }
}

fn query_string(params: &TaskListParams) -> String {
    let mut pairs: Vec<String> = Vec::new();

    if let Some(status) = params.status {
        pairs.push(format!("status={}", status.code()));
    }
    if let Some(priority) = params.priority {
        pairs.push(format!("priority={}", priority.rank()));
    }
    if let Some(task_type) = params.task_type {
        pairs.push(format!("task_type={}", task_type.code()));
    }
    if let Some(assigned_to) = params.assigned_to {
        pairs.push(format!("assigned_to={}", assigned_to));
    }
    if let Some(due_before) = params.due_before {
        pairs.push(format!("due_before={}", due_before));
    }
    if let Some(due_after) = params.due_after {
        pairs.push(format!("due_after={}", due_after));
    }
    if let Some(q) = &params.q {
        pairs.push(format!("q={}", urlencoding::encode(q)));
    }
    if let Some(page) = params.page {
        pairs.push(format!("page={}", page));
    }
    if let Some(limit) = params.limit {
        pairs.push(format!("limit={}", limit));
    }

    pairs.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_encodes_search_text() {
        let params = TaskListParams {
            q: Some("tour & travel".to_string()),
            page: Some(2),
            ..Default::default()
        };
        assert_eq!(query_string(&params), "q=tour%20%26%20travel&page=2");
    }

    #[test]
    fn empty_params_produce_no_query() {
        assert_eq!(query_string(&TaskListParams::default()), "");
    }
}
