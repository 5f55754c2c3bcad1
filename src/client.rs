//! HTTP client for a running photo server.
//!
//! Used by the CLI's `upload`, `list` and `delete` commands. Uploads go through
//! the [`PhotoSink`] implementation so the pipeline does not care whether it
//! is talking to a server or to local storage.

use crate::types::{PageRequest, Photo, PhotoPage};
use crate::upload::{PhotoSink, SubmitError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Status { status, .. } => Some(*status),
        }
    }
}

impl From<ClientError> for SubmitError {
    fn from(e: ClientError) -> Self {
        let status = e.status();
        let message = match e {
            ClientError::Status { message, .. } => message,
            other => other.to_string(),
        };
        SubmitError { status, message }
    }
}

/// Error body returned by the server on failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    deleted: String,
}

#[derive(Debug, Clone)]
pub struct HttpPhotoClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPhotoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list(&self, request: PageRequest) -> Result<PhotoPage, ClientError> {
        let response = self
            .client
            .get(self.url("/photos"))
            .query(&[("page", request.page), ("limit", request.limit)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn upload(&self, photo: &Photo) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/photos"))
            .json(&json!({ "action": "upload", "photo": photo }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Delete by id, returning the id the server reports as deleted.
    pub async fn delete(&self, id: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url("/photos"))
            .json(&json!({ "action": "delete", "photo": { "id": id } }))
            .send()
            .await?;
        let body: DeleteResponse = check(response).await?.json().await?;
        Ok(body.deleted)
    }
}

/// Turn a non-2xx response into [`ClientError::Status`], keeping the server's
/// error message when it sent one.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            error,
            details: Some(details),
        }) => format!("{error} ({details})"),
        Ok(ErrorBody { error, .. }) => error,
        Err(_) if text.is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => text,
    };
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PhotoSink for HttpPhotoClient {
    async fn submit(&self, photo: &Photo) -> Result<(), SubmitError> {
        self.upload(photo).await.map_err(SubmitError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpPhotoClient::new("http://localhost:8787/");
        assert_eq!(client.url("/photos"), "http://localhost:8787/photos");
    }

    #[test]
    fn status_error_converts_to_submit_error() {
        let err = ClientError::Status {
            status: 409,
            message: "Photo list changed concurrently".into(),
        };
        let submit = SubmitError::from(err);
        assert_eq!(submit.status, Some(409));
        assert_eq!(submit.to_string(), "HTTP 409: Photo list changed concurrently");
    }
}
