use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taxdesk_core::{ChatAnswer, JobId, JobResource};
use taxdesk_logging::desk_debug;

use crate::{FailureKind, FetchError};

/// Reads one resource by id. `Ok(None)` means the backend has no such id;
/// `Err` is a hard failure (network, auth, server).
///
/// Implementations must be stateless enough to serve several watch sessions
/// at once.
#[async_trait::async_trait]
pub trait ResourceFetcher<T>: Send + Sync {
    async fn fetch(&self, token: &str, id: &JobId) -> Result<Option<JobResource<T>>, FetchError>;
}

/// Posts a new question and returns the freshly created chat job.
#[async_trait::async_trait]
pub trait ChatSubmitter: Send + Sync {
    async fn create_chat(
        &self,
        token: &str,
        message: &str,
    ) -> Result<JobResource<ChatAnswer>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRecord {
    id: String,
    response: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl ChatRecord {
    fn into_resource(self) -> Result<JobResource<ChatAnswer>, FetchError> {
        let id = JobId::new(self.id)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        let resource = match self.response {
            Some(text) => JobResource::resolved(id, ChatAnswer::new(text)),
            None => JobResource::pending(id),
        };
        Ok(resource.with_timestamps(self.created_at, self.updated_at))
    }
}

#[derive(Debug, Serialize)]
struct CreateChatRequest<'a> {
    message: &'a str,
}

/// REST client for the chat endpoints (`GET /chats/{id}`, `POST /chats`).
#[derive(Debug, Clone)]
pub struct ChatApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ChatApi {
    pub fn new(settings: ApiSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub async fn get_chat(
        &self,
        token: &str,
        id: &JobId,
    ) -> Result<Option<JobResource<ChatAnswer>>, FetchError> {
        let url = self.chats_url(Some(id))?;
        desk_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        read_envelope::<ChatRecord>(response)
            .await?
            .map(ChatRecord::into_resource)
            .transpose()
    }

    pub async fn create_chat(
        &self,
        token: &str,
        message: &str,
    ) -> Result<JobResource<ChatAnswer>, FetchError> {
        let url = self.chats_url(None)?;
        let body = serde_json::to_string(&CreateChatRequest { message })
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        desk_debug!("POST {} message_len={}", url, message.len());
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match read_envelope::<ChatRecord>(response).await? {
            Some(record) => record.into_resource(),
            None => Err(FetchError::new(
                FailureKind::Decode,
                "create chat response carried no data",
            )),
        }
    }

    fn chats_url(&self, id: Option<&JobId>) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.settings.base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                FetchError::new(FailureKind::InvalidUrl, "base url cannot carry a path")
            })?;
            segments.pop_if_empty().push("chats");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ResourceFetcher<ChatAnswer> for ChatApi {
    async fn fetch(
        &self,
        token: &str,
        id: &JobId,
    ) -> Result<Option<JobResource<ChatAnswer>>, FetchError> {
        self.get_chat(token, id).await
    }
}

#[async_trait::async_trait]
impl ChatSubmitter for ChatApi {
    async fn create_chat(
        &self,
        token: &str,
        message: &str,
    ) -> Result<JobResource<ChatAnswer>, FetchError> {
        ChatApi::create_chat(self, token, message).await
    }
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Option<T>, FetchError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::new(FailureKind::Unauthorized, status.to_string()));
    }

    let body = response.text().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.error)
            .map(|error| error.message)
            .unwrap_or_else(|| status.to_string());
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            message,
        ));
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)
        .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
    if let Some(error) = envelope.error {
        return Err(FetchError::new(FailureKind::Api, error.message));
    }
    Ok(envelope.data)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
