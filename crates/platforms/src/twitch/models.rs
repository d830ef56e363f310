use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope every Helix endpoint wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
pub struct HelixResponse<T> {
    pub data: Vec<T>,
}

/// A live stream as returned by `GET /helix/streams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelixStream {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail_url: String,
}

impl HelixStream {
    /// Game name, or `None` when the broadcaster has not set one.
    pub fn game(&self) -> Option<&str> {
        Some(self.game_name.as_str()).filter(|g| !g.is_empty())
    }
}

/// A user as returned by `GET /helix/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stream_payload() {
        let body = r#"{
            "data": [{
                "id": "40952121085",
                "user_id": "101051819",
                "user_login": "afro",
                "user_name": "Afro",
                "game_id": "32982",
                "game_name": "Grand Theft Auto V",
                "type": "live",
                "title": "Jacob: Digital Den Laptops & Routers",
                "tags": ["English"],
                "viewer_count": 1490,
                "started_at": "2021-03-10T03:18:11Z",
                "language": "en",
                "thumbnail_url": "https://static-cdn.jtvnw.net/previews-ttv/live_user_afro-{width}x{height}.jpg",
                "is_mature": false
            }],
            "pagination": {}
        }"#;

        let response: HelixResponse<HelixStream> = serde_json::from_str(body).unwrap();
        let stream = &response.data[0];
        assert_eq!(stream.user_login, "afro");
        assert_eq!(stream.viewer_count, 1490);
        assert_eq!(stream.game(), Some("Grand Theft Auto V"));
        assert_eq!(stream.started_at.timestamp(), 1615346291);
    }

    #[test]
    fn empty_game_is_none() {
        let body = r#"{"data":[{"id":"1","user_id":"2","user_login":"a","user_name":"A",
            "game_name":"","title":"t","viewer_count":0,"started_at":"2024-01-01T00:00:00Z",
            "thumbnail_url":""}]}"#;
        let response: HelixResponse<HelixStream> = serde_json::from_str(body).unwrap();
        assert_eq!(response.data[0].game(), None);
    }

    #[test]
    fn offline_is_empty_data() {
        let response: HelixResponse<HelixStream> =
            serde_json::from_str(r#"{"data":[],"pagination":{}}"#).unwrap();
        assert!(response.data.is_empty());
    }
}
