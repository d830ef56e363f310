use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::models::{HelixResponse, HelixStream, HelixUser};
use crate::error::PlatformError;

pub const DEFAULT_HELIX_BASE_URL: &str = "https://api.twitch.tv";

/// App credentials for the Helix API.
#[derive(Clone)]
pub struct HelixCredentials {
    pub client_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for HelixCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelixCredentials")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Minimal Twitch Helix client.
///
/// Safe to share between tasks; every call is an independent request.
#[derive(Debug, Clone)]
pub struct TwitchHelix {
    client: Client,
    credentials: HelixCredentials,
    base_url: String,
}

impl TwitchHelix {
    pub fn new(client: Client, credentials: HelixCredentials) -> Result<Self, PlatformError> {
        if credentials.client_id.trim().is_empty() {
            return Err(PlatformError::MissingCredentials("client id"));
        }
        if credentials.access_token.trim().is_empty() {
            return Err(PlatformError::MissingCredentials("access token"));
        }
        Ok(Self {
            client,
            credentials,
            base_url: DEFAULT_HELIX_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn bearer(&self) -> String {
        let token = self.credentials.access_token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        format!("Bearer {token}")
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, PlatformError> {
        let url = format!("{}/helix/{}", self.base_url, endpoint);
        trace!(%url, ?query, "helix request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Client-Id", &self.credentials.client_id)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: HelixResponse<T> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }

    /// Current stream of `login`, or `None` when the channel is offline.
    pub async fn get_stream(&self, login: &str) -> Result<Option<HelixStream>, PlatformError> {
        let streams = self
            .get_data::<HelixStream>("streams", &[("user_login", login)])
            .await?;
        debug!(login, live = !streams.is_empty(), "helix stream lookup");
        Ok(streams.into_iter().next())
    }

    /// User profile of `login`, or `None` when no such account exists.
    pub async fn get_user(&self, login: &str) -> Result<Option<HelixUser>, PlatformError> {
        let users = self
            .get_data::<HelixUser>("users", &[("login", login)])
            .await?;
        Ok(users.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::create_client_builder;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> Client {
        create_client_builder(None).build().unwrap()
    }

    fn helix(server: &MockServer) -> TwitchHelix {
        TwitchHelix::new(
            test_client(),
            HelixCredentials {
                client_id: "cid".to_string(),
                access_token: "token".to_string(),
            },
        )
        .unwrap()
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn live_stream_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/streams"))
            .and(query_param("user_login", "alice"))
            .and(header("Client-Id", "cid"))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "1",
                    "user_id": "42",
                    "user_login": "alice",
                    "user_name": "Alice",
                    "game_name": "Chess",
                    "title": "blitz",
                    "viewer_count": 12,
                    "started_at": "2024-05-01T12:00:00Z",
                    "thumbnail_url": "https://cdn/{width}x{height}.jpg"
                }],
                "pagination": {}
            })))
            .mount(&server)
            .await;

        let stream = helix(&server).get_stream("alice").await.unwrap().unwrap();
        assert_eq!(stream.user_name, "Alice");
        assert_eq!(stream.viewer_count, 12);
    }

    #[tokio::test]
    async fn offline_stream_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/streams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        assert!(helix(&server).get_stream("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/streams"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = helix(&server).get_stream("bob").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/users"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = helix(&server).get_user("bob").await.unwrap_err();
        assert!(matches!(err, PlatformError::JsonError(_)));
    }

    #[tokio::test]
    async fn user_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helix/users"))
            .and(query_param("login", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "42",
                    "login": "alice",
                    "display_name": "Alice",
                    "profile_image_url": "https://cdn/alice-profile_image-300x300.png"
                }]
            })))
            .mount(&server)
            .await;

        let user = helix(&server).get_user("alice").await.unwrap().unwrap();
        assert_eq!(user.display_name, "Alice");
        assert!(user.profile_image_url.ends_with("300x300.png"));
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = TwitchHelix::new(
            test_client(),
            HelixCredentials {
                client_id: String::new(),
                access_token: "t".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, PlatformError::MissingCredentials("client id")));
    }

    #[test]
    fn bearer_prefix_is_not_doubled() {
        let client = TwitchHelix::new(
            test_client(),
            HelixCredentials {
                client_id: "cid".to_string(),
                access_token: "Bearer abc".to_string(),
            },
        )
        .unwrap();
        assert_eq!(client.bearer(), "Bearer abc");
    }
}
