use std::time::Duration;

use client_logging::{client_debug, client_warn};
use listing_core::{
    AuthUser, Dictionaries, FavoritesPage, FilterOptions, JobRequest, ObjectPage, ObjectView,
    Task, TasksPage,
};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::{ApiError, FailureKind};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1/";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Every backend call the client makes.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Returns the issued session token.
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError>;
    async fn register(&self, email: &str, password: &str) -> Result<String, ApiError>;
    /// Resolves the current credential to a user.
    async fn validate(&self) -> Result<AuthUser, ApiError>;
    async fn tasks(&self, page: u32, per_page: u32) -> Result<TasksPage, ApiError>;
    async fn task(&self, id: &str) -> Result<Task, ApiError>;
    /// Queues a job and returns the id of the created task.
    async fn start_job(&self, job: &JobRequest) -> Result<String, ApiError>;
    async fn favorite_ids(&self) -> Result<Vec<String>, ApiError>;
    async fn favorites(&self, page: u32, limit: u32) -> Result<FavoritesPage, ApiError>;
    async fn add_favorite(&self, object_id: &str) -> Result<(), ApiError>;
    async fn remove_favorite(&self, object_id: &str) -> Result<(), ApiError>;
    async fn dictionaries(&self) -> Result<Dictionaries, ApiError>;
    async fn filter_options(&self, query: &str) -> Result<FilterOptions, ApiError>;
    async fn listings(&self, query: &str) -> Result<ObjectPage, ApiError>;
    async fn object(&self, id: &str) -> Result<ObjectView, ApiError>;
}

/// REST client for the listing backend.
///
/// The credential is optional; calls that need it fail with [`FailureKind::Unauthorized`]
/// when the backend refuses them.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    stream_http: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct JobAccepted {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct RawTasksPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    page: u32,
    #[serde(default, alias = "perPage")]
    per_page: u32,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings, token: Option<String>) -> Result<Self, ApiError> {
        let base = parse_base(&settings.api_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        // The stream stays open indefinitely, so only the connect phase is bounded.
        let stream_http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base,
            http,
            stream_http,
            token: token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Same client with a different credential.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.trim().is_empty()),
            ..self.clone()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, path: &str, query: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        match query.map(|query| query.trim_start_matches('?')) {
            Some(query) if !query.is_empty() => url.set_query(Some(query)),
            _ => url.set_query(None),
        }
        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, query)?;
        client_debug!("GET {url}");
        let response = self.send(self.http.get(url)).await?;
        Self::read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, None)?;
        client_debug!("POST {url}");
        let response = self.send(self.http.post(url).json(body)).await?;
        Self::read_json(response).await
    }

    /// Opens the server-sent task stream and checks the response status.
    pub(crate) async fn open_task_stream(&self) -> Result<Response, ApiError> {
        let url = self.endpoint("tasks/subscribe", None)?;
        client_debug!("Opening task stream at {url}");
        let builder = self.stream_http.get(url).header(ACCEPT, "text/event-stream");
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await
    }
}

#[async_trait::async_trait]
impl Backend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = Credentials {
            email,
            password,
            role: None,
        };
        let response: TokenResponse = self.post_json("auth/login", &body).await?;
        Ok(response.token)
    }

    async fn register(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = Credentials {
            email,
            password,
            role: Some("user"),
        };
        let response: TokenResponse = self.post_json("auth/register", &body).await?;
        Ok(response.token)
    }

    async fn validate(&self) -> Result<AuthUser, ApiError> {
        self.get_json("auth/validate", None).await
    }

    async fn tasks(&self, page: u32, per_page: u32) -> Result<TasksPage, ApiError> {
        let query = format!("page={page}&perPage={per_page}");
        let raw: RawTasksPage = self.get_json("tasks", Some(&query)).await?;

        let mut data = Vec::with_capacity(raw.data.len());
        for value in raw.data {
            match serde_json::from_value::<Task>(value) {
                Ok(task) => match task.validate() {
                    Ok(()) => data.push(task),
                    Err(err) => client_warn!("Skipping task from listing: {err}"),
                },
                Err(err) => client_warn!("Skipping unreadable task from listing: {err}"),
            }
        }
        Ok(TasksPage {
            data,
            total: raw.total,
            page: raw.page,
            per_page: raw.per_page,
        })
    }

    async fn task(&self, id: &str) -> Result<Task, ApiError> {
        let url = self.endpoint(&format!("tasks/{}", path_segment(id)), None)?;
        let response = self.send(self.http.get(url)).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let raw = String::from_utf8_lossy(&bytes);
        Task::from_json(&raw).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    async fn start_job(&self, job: &JobRequest) -> Result<String, ApiError> {
        let (path, body) = match job {
            JobRequest::FindNew {
                categories,
                regions,
            } => (
                "actualize/new-objects",
                json!({ "categories": categories, "regions": regions }),
            ),
            JobRequest::ActualizeActive { category, limit } => (
                "actualize/active",
                json!({ "category": category, "limit_per_category": limit }),
            ),
            JobRequest::ActualizeArchived { category, limit } => (
                "actualize/archived",
                json!({ "category": category, "limit_per_category": limit }),
            ),
            JobRequest::ActualizeObject { object_id } => (
                "actualize/object",
                json!({ "master_object_id": object_id }),
            ),
        };
        let accepted: JobAccepted = self.post_json(path, &body).await?;
        Ok(accepted.task_id)
    }

    async fn favorite_ids(&self) -> Result<Vec<String>, ApiError> {
        let ids: Option<Vec<String>> = self.get_json("favorites/ids", None).await?;
        Ok(ids.unwrap_or_default())
    }

    async fn favorites(&self, page: u32, limit: u32) -> Result<FavoritesPage, ApiError> {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let query = format!("limit={limit}&offset={offset}");
        self.get_json("favorites", Some(&query)).await
    }

    async fn add_favorite(&self, object_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint("favorites", None)?;
        let body = json!({ "master_object_id": object_id });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn remove_favorite(&self, object_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("favorites/{}", path_segment(object_id)), None)?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn dictionaries(&self) -> Result<Dictionaries, ApiError> {
        self.get_json("dictionaries", Some("names=categories,regions,deal_types"))
            .await
    }

    async fn filter_options(&self, query: &str) -> Result<FilterOptions, ApiError> {
        self.get_json("filters/options", Some(query)).await
    }

    async fn listings(&self, query: &str) -> Result<ObjectPage, ApiError> {
        self.get_json("objects", Some(query)).await
    }

    async fn object(&self, id: &str) -> Result<ObjectView, ApiError> {
        let url = self.endpoint(&format!("objects/{}", path_segment(id)), None)?;
        let response = self.send(self.http.get(url)).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let raw = String::from_utf8_lossy(&bytes);
        ObjectView::from_json(&raw).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }
}

fn parse_base(raw: &str) -> Result<Url, ApiError> {
    let mut base =
        Url::parse(raw.trim()).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
    if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
        return Err(ApiError::new(
            FailureKind::InvalidUrl,
            format!("{raw} is not an http(s) base url"),
        ));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    Ok(base)
}

fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Unauthorized,
        other => FailureKind::HttpStatus(other.as_u16()),
    };
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::new(kind, error_message(status, &body)))
}

/// Backend errors carry `{"error": "..."}`; anything else falls back to the status line.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string())
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let settings = ClientSettings {
            api_url: "http://localhost:5000/api/v1".to_string(),
            ..ClientSettings::default()
        };
        let client = ApiClient::new(&settings, None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/api/v1/");
        assert_eq!(
            client.endpoint("tasks", Some("?page=1")).unwrap().as_str(),
            "http://localhost:5000/api/v1/tasks?page=1"
        );
        assert_eq!(
            client.endpoint("/objects", Some("")).unwrap().as_str(),
            "http://localhost:5000/api/v1/objects"
        );
    }

    #[test]
    fn non_http_base_is_rejected() {
        let settings = ClientSettings {
            api_url: "mailto:admin@example.com".to_string(),
            ..ClientSettings::default()
        };
        let err = ApiClient::new(&settings, None).unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let client = ApiClient::new(&ClientSettings::default(), Some("  ".to_string())).unwrap();
        assert_eq!(client.token(), None);
        assert_eq!(client.with_token(Some("abc".to_string())).token(), Some("abc"));
    }

    #[test]
    fn error_body_message_is_preferred() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"category is required"}"#),
            "category is required"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "502 Bad Gateway"
        );
    }

    #[test]
    fn ids_are_escaped_as_path_segments() {
        assert_eq!(path_segment("obj 1/2"), "obj%201%2F2");
    }
}
