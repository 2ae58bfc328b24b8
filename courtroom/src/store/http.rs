//! HTTP client for the `/api/messages` CRUD endpoints

use super::{MessageStore, StoreError, StoreResult};
use crate::message::{CreatedRecord, Message, MessageId, MessagePatch, NewMessage};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by the store (`{"error": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Message store backed by the CRUD HTTP API
pub struct HttpMessageStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMessageStore {
    /// Create a client for the store rooted at `base_url`
    /// (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/api/messages", self.base_url)
    }

    fn record_url(&self, id: MessageId) -> String {
        format!("{}/api/messages/{}", self.base_url, id)
    }

    /// Turn a non-success response into a `StoreError`
    async fn check(response: reqwest::Response, id: Option<MessageId>) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound(id));
            }
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn create(&self, message: &NewMessage) -> StoreResult<CreatedRecord> {
        let response = self
            .client
            .post(self.collection_url())
            .json(message)
            .send()
            .await?;
        let created = Self::check(response, None).await?.json().await?;
        Ok(created)
    }

    async fn update(&self, id: MessageId, patch: &MessagePatch) -> StoreResult<()> {
        let response = self
            .client
            .put(self.record_url(id))
            .json(patch)
            .send()
            .await?;
        Self::check(response, Some(id)).await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Message>> {
        let response = self.client.get(self.collection_url()).send().await?;
        let messages = Self::check(response, None).await?.json().await?;
        Ok(messages)
    }

    async fn get(&self, id: MessageId) -> StoreResult<Message> {
        let response = self.client.get(self.record_url(id)).send().await?;
        let message = Self::check(response, Some(id)).await?.json().await?;
        Ok(message)
    }

    async fn delete(&self, id: MessageId) -> StoreResult<()> {
        let response = self.client.delete(self.record_url(id)).send().await?;
        Self::check(response, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Category, MessageStatus};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_store(server: &MockServer) -> HttpMessageStore {
        HttpMessageStore::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn record_json(id: i64, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "category": "Agile",
            "text": "Fix alt in img1",
            "status": status,
            "escalatable": true,
            "lawBroken": null,
            "reason": null,
            "createdAt": "2025-03-01T10:00:00.000Z",
            "updatedAt": "2025-03-01T10:00:00.000Z"
        })
    }

    #[tokio::test]
    async fn test_create_posts_camel_case_body() {
        let server = MockServer::start().await;
        let draft = NewMessage {
            category: Category::Agile,
            text: "Fix alt in img1".to_string(),
            status: MessageStatus::Normal,
            escalatable: true,
            law_broken: Some("Disability Act".to_string()),
            reason: Some("Missing alt text impacts accessibility".to_string()),
        };

        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .and(body_json(serde_json::json!({
                "category": "Agile",
                "text": "Fix alt in img1",
                "status": "normal",
                "escalatable": true,
                "lawBroken": "Disability Act",
                "reason": "Missing alt text impacts accessibility"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(record_json(41, "normal")))
            .mount(&server)
            .await;

        let created = test_store(&server).create(&draft).await.unwrap();
        assert_eq!(created.id, 41);
    }

    #[tokio::test]
    async fn test_update_sends_partial_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/messages/5"))
            .and(body_json(serde_json::json!({ "status": "resolved" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json(5, "resolved")))
            .expect(1)
            .mount(&server)
            .await;

        test_store(&server)
            .update(5, &MessagePatch::status(MessageStatus::Resolved))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_parses_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([record_json(2, "denied"), record_json(1, "fined")])),
            )
            .mount(&server)
            .await;

        let list = test_store(&server).list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].status, MessageStatus::Denied);
        assert_eq!(list[1].status, MessageStatus::Fined);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/99"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "Not found" })),
            )
            .mount(&server)
            .await;

        let err = test_store(&server).get(99).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "category and text are required" })),
            )
            .mount(&server)
            .await;

        let draft = NewMessage {
            category: Category::Boss,
            text: String::new(),
            status: MessageStatus::Normal,
            escalatable: false,
            law_broken: None,
            reason: None,
        };
        match test_store(&server).create(&draft).await.unwrap_err() {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "category and text are required");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = HttpMessageStore::new("http://localhost:3000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(store.base_url(), "http://localhost:3000");
        assert_eq!(store.record_url(3), "http://localhost:3000/api/messages/3");
    }
}
