//! Notion API client: creates one page per relayed message in a database.

use reqwest::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

const NOTION_API_BASE: &str = "https://api.notion.com";
/// Required by the Notion API on every request.
pub const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("NOTION_API_TOKEN is not set")]
    MissingToken,
    #[error("NOTION_DB_ID is not set")]
    MissingDatabaseId,
    #[error("notion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notion api error: {status} {body}")]
    Api { status: StatusCode, body: String },
    #[error("notion api error: {status} (failed to read response body: {source})")]
    UnreadableBody {
        status: StatusCode,
        source: reqwest::Error,
    },
}

impl NotionError {
    /// True when the call was not attempted because configuration is missing.
    pub fn is_config(&self) -> bool {
        matches!(self, NotionError::MissingToken | NotionError::MissingDatabaseId)
    }
}

/// POST /v1/pages body: a page under a database with a single title property.
#[derive(Debug, Serialize)]
pub struct CreatePageRequest {
    pub parent: DatabaseParent,
    pub properties: BTreeMap<String, TitleProperty>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseParent {
    pub database_id: String,
}

#[derive(Debug, Serialize)]
pub struct TitleProperty {
    pub title: Vec<RichText>,
}

#[derive(Debug, Serialize)]
pub struct RichText {
    pub text: TextContent,
}

#[derive(Debug, Serialize)]
pub struct TextContent {
    pub content: String,
}

impl CreatePageRequest {
    pub fn new(database_id: &str, title_property: &str, text: &str) -> Self {
        let title = TitleProperty {
            title: vec![RichText {
                text: TextContent {
                    content: text.to_string(),
                },
            }],
        };
        Self {
            parent: DatabaseParent {
                database_id: database_id.to_string(),
            },
            properties: BTreeMap::from([(title_property.to_string(), title)]),
        }
    }
}

/// Client for the Notion API bound to one target database.
#[derive(Clone)]
pub struct NotionClient {
    token: Option<String>,
    database_id: Option<String>,
    title_property: String,
    base_url: String,
    client: reqwest::Client,
}

impl NotionClient {
    pub fn new(
        token: Option<String>,
        database_id: Option<String>,
        title_property: String,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| NOTION_API_BASE.to_string());
        Self {
            token,
            database_id,
            title_property,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// POST /v1/pages: add `text` as the title of a new page in the configured database.
    /// Only 200 and 201 count as success.
    pub async fn create_page(&self, text: &str) -> Result<(), NotionError> {
        let token = self.token.as_ref().ok_or(NotionError::MissingToken)?;
        let database_id = self
            .database_id
            .as_ref()
            .ok_or(NotionError::MissingDatabaseId)?;
        let url = format!("{}/v1/pages", self.base_url);
        let body = CreatePageRequest::new(database_id, &self.title_property, text);
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(match res.text().await {
                Ok(body) => NotionError::Api { status, body },
                Err(source) => NotionError::UnreadableBody { status, source },
            });
        }
        log::info!("notion: added page to {}: {}", database_id, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NotionClient {
        NotionClient::new(
            Some("secret_test".into()),
            Some("db-123".into()),
            "テーマ".into(),
            Some(server.uri()),
        )
    }

    #[test]
    fn payload_shape() {
        let req = CreatePageRequest::new("db-123", "テーマ", "a \"quoted\"\nline");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "parent": { "database_id": "db-123" },
                "properties": {
                    "テーマ": { "title": [ { "text": { "content": "a \"quoted\"\nline" } } ] }
                }
            })
        );
    }

    #[tokio::test]
    async fn creates_page_with_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .and(header("Authorization", "Bearer secret_test"))
            .and(header("Content-Type", "application/json"))
            .and(header("Notion-Version", "2022-06-28"))
            .and(body_json(serde_json::json!({
                "parent": { "database_id": "db-123" },
                "properties": { "テーマ": { "title": [ { "text": { "content": "hello" } } ] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "page", "id": "p1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).create_page("hello").await.unwrap();
    }

    #[tokio::test]
    async fn created_status_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        client_for(&server).create_page("hello").await.unwrap();
    }

    #[tokio::test]
    async fn other_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"object":"error","code":"validation_error"}"#),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).create_page("hello").await.unwrap_err();
        match err {
            NotionError::Api { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("validation_error"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    /// Answers one request with a 500 whose Content-Length promises more bytes than are sent.
    async fn truncated_error_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 4096];
            // Read the whole request (headers plus Content-Length body) before answering.
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                if let Some(end) = req.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&req[..end]).to_string();
                    let len = head
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            if k.eq_ignore_ascii_case("content-length") {
                                v.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if req.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            sock.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
            )
            .await
            .unwrap();
            sock.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn unreadable_error_body_is_reported() {
        let base = truncated_error_server().await;
        let client = NotionClient::new(
            Some("secret_test".into()),
            Some("db-123".into()),
            "テーマ".into(),
            Some(base),
        );
        let err = client.create_page("hello").await.unwrap_err();
        assert!(err.to_string().contains("failed to read response body"));
        match err {
            NotionError::UnreadableBody { status, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected UnreadableBody, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn accepted_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let err = client_for(&server).create_page("hello").await.unwrap_err();
        assert!(matches!(err, NotionError::Api { .. }));
    }

    #[tokio::test]
    async fn missing_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = NotionClient::new(None, Some("db".into()), "テーマ".into(), Some(server.uri()));
        let err = client.create_page("hello").await.unwrap_err();
        assert!(matches!(err, NotionError::MissingToken));
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn missing_database_id_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = NotionClient::new(Some("t".into()), None, "テーマ".into(), Some(server.uri()));
        let err = client.create_page("hello").await.unwrap_err();
        assert!(matches!(err, NotionError::MissingDatabaseId));
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn token_checked_before_database_id() {
        let client = NotionClient::new(None, None, "テーマ".into(), None);
        let err = client.create_page("hello").await.unwrap_err();
        assert!(matches!(err, NotionError::MissingToken));
    }
}
