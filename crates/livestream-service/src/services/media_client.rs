//! Media server admin API client.
//!
//! Calls the media server's Twirp RoomService with a self-issued Host token.
//! Endpoints are tried strictly in order (primary, then fallback); the first
//! 2xx response with a decodable body wins. When every endpoint fails the
//! caller gets an empty listing with `status: "error"` rather than an error.
//!
//! # Security
//!
//! - Admin tokens are minted per call and never logged
//! - Upstream error details are logged, not returned to clients

use crate::auth::AccessTokenIssuer;
use crate::errors::LsError;
use crate::models::{EndpointCheck, ListingStatus, ParticipantListing, RoomListing};
use crate::observability::metrics;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, instrument, warn};

/// Message returned when no media server endpoint could be reached.
pub const UNAVAILABLE_MESSAGE: &str = "Could not connect to media server";

const ROOM_SERVICE_PATH: &str = "twirp/livekit.RoomService";

/// Connect timeout applied to every attempt.
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct ListRoomsResponse {
    #[serde(default)]
    rooms: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ListParticipantsResponse {
    #[serde(default)]
    participants: Vec<serde_json::Value>,
}

/// Why a single endpoint attempt failed.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(reqwest::Error),
}

/// HTTP client for the media server admin API.
#[derive(Clone)]
pub struct MediaServerClient {
    client: Client,

    /// Base URLs in attempt order; the first is the primary.
    endpoints: Vec<String>,

    issuer: AccessTokenIssuer,
}

impl MediaServerClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `LsError::Internal` if the HTTP client cannot be built.
    pub fn new(
        endpoints: Vec<String>,
        request_timeout: Duration,
        issuer: AccessTokenIssuer,
    ) -> Result<Self, LsError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(request_timeout))
            .build()
            .map_err(|e| {
                error!(target: "ls.services.media", error = %e, "Failed to build HTTP client");
                LsError::Internal
            })?;

        Ok(Self {
            client,
            endpoints,
            issuer,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// List active rooms.
    #[instrument(skip_all, name = "ls.media.list_rooms")]
    pub async fn list_rooms(&self) -> RoomListing {
        let token = match self.issuer.admin_token(None) {
            Ok(token) => token,
            Err(e) => {
                error!(target: "ls.services.media", error = %e, "Failed to issue admin token");
                return room_listing_error();
            }
        };

        let body = serde_json::json!({});
        for (index, base) in self.endpoints.iter().enumerate() {
            match self
                .attempt::<ListRoomsResponse>("list_rooms", index, base, "ListRooms", &body, &token)
                .await
            {
                Ok(resp) => {
                    return RoomListing {
                        rooms: resp.rooms,
                        server_url: Some(base.clone()),
                        status: ListingStatus::Success,
                        message: None,
                    }
                }
                Err(e) => {
                    warn!(
                        target: "ls.services.media",
                        endpoint = endpoint_label(index),
                        error = %e,
                        "ListRooms failed, trying next endpoint"
                    );
                }
            }
        }

        error!(target: "ls.services.media", "ListRooms failed on all media endpoints");
        room_listing_error()
    }

    /// List participants in `room`.
    #[instrument(skip_all, name = "ls.media.list_participants", fields(room = %room))]
    pub async fn list_participants(&self, room: &str) -> ParticipantListing {
        let token = match self.issuer.admin_token(Some(room)) {
            Ok(token) => token,
            Err(e) => {
                error!(target: "ls.services.media", error = %e, "Failed to issue admin token");
                return participant_listing_error(room);
            }
        };

        let body = serde_json::json!({ "room": room });
        for (index, base) in self.endpoints.iter().enumerate() {
            match self
                .attempt::<ListParticipantsResponse>(
                    "list_participants",
                    index,
                    base,
                    "ListParticipants",
                    &body,
                    &token,
                )
                .await
            {
                Ok(resp) => {
                    return ParticipantListing {
                        participants: resp.participants,
                        room_name: room.to_string(),
                        server_url: Some(base.clone()),
                        status: ListingStatus::Success,
                        message: None,
                    }
                }
                Err(e) => {
                    warn!(
                        target: "ls.services.media",
                        endpoint = endpoint_label(index),
                        error = %e,
                        "ListParticipants failed, trying next endpoint"
                    );
                }
            }
        }

        error!(target: "ls.services.media", "ListParticipants failed on all media endpoints");
        participant_listing_error(room)
    }

    /// Probe every endpoint with `GET {base}/`.
    ///
    /// 200, 401 and 404 all prove the server is listening.
    #[instrument(skip_all, name = "ls.media.test_connection")]
    pub async fn test_connection(&self) -> BTreeMap<String, EndpointCheck> {
        let mut results = BTreeMap::new();

        for (index, base) in self.endpoints.iter().enumerate() {
            let url = format!("{}/", base.trim_end_matches('/'));
            let start = Instant::now();

            let check = match self.client.get(&url).send().await {
                Ok(response) => {
                    let code = response.status().as_u16();
                    let connected = matches!(code, 200 | 401 | 404);
                    EndpointCheck {
                        status: if connected { "connected" } else { "failed" }.to_string(),
                        url: base.clone(),
                        response_code: Some(code),
                        error: None,
                    }
                }
                Err(e) => EndpointCheck {
                    status: "failed".to_string(),
                    url: base.clone(),
                    response_code: None,
                    error: Some(e.to_string()),
                },
            };

            let status = if check.status == "connected" {
                "success"
            } else {
                "error"
            };
            metrics::record_media_request(
                "test_connection",
                endpoint_label(index),
                status,
                start.elapsed(),
            );

            results.insert(endpoint_label(index).to_string(), check);
        }

        results
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        operation: &str,
        index: usize,
        base: &str,
        method: &str,
        body: &serde_json::Value,
        token: &str,
    ) -> Result<T, AttemptError> {
        let start = Instant::now();
        let result = self.call(base, method, body, token).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_media_request(operation, endpoint_label(index), status, start.elapsed());

        result
    }

    async fn call<T: DeserializeOwned>(
        &self,
        base: &str,
        method: &str,
        body: &serde_json::Value,
        token: &str,
    ) -> Result<T, AttemptError> {
        let url = format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            ROOM_SERVICE_PATH,
            method
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        response.json::<T>().await.map_err(AttemptError::Decode)
    }
}

fn endpoint_label(index: usize) -> &'static str {
    if index == 0 {
        "primary"
    } else {
        "fallback"
    }
}

fn room_listing_error() -> RoomListing {
    RoomListing {
        rooms: Vec::new(),
        server_url: None,
        status: ListingStatus::Error,
        message: Some(UNAVAILABLE_MESSAGE.to_string()),
    }
}

fn participant_listing_error(room: &str) -> ParticipantListing {
    ParticipantListing {
        participants: Vec::new(),
        room_name: room.to_string(),
        server_url: None,
        status: ListingStatus::Error,
        message: Some(UNAVAILABLE_MESSAGE.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Port 1 is never listening in test environments.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

    fn issuer() -> AccessTokenIssuer {
        AccessTokenIssuer::new(
            "APIunitkey".to_string(),
            SecretString::from("unit-test-media-secret"),
            3600,
        )
    }

    fn client(endpoints: Vec<String>) -> MediaServerClient {
        MediaServerClient::new(endpoints, Duration::from_secs(2), issuer()).unwrap()
    }

    #[tokio::test]
    async fn test_list_rooms_primary_success() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.RoomService/ListRooms"))
            .and(header_regex("authorization", "^Bearer .+"))
            .and(body_json(json!({})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rooms": [{"name": "r1"}]})),
            )
            .expect(1)
            .mount(&primary)
            .await;

        let listing = client(vec![primary.uri()]).list_rooms().await;

        assert_eq!(listing.status, ListingStatus::Success);
        assert_eq!(listing.rooms, vec![json!({"name": "r1"})]);
        assert_eq!(listing.server_url, Some(primary.uri()));
        assert!(listing.message.is_none());
    }

    #[tokio::test]
    async fn test_list_rooms_fallback_not_called_when_primary_succeeds() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rooms": []})))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rooms": []})))
            .expect(0)
            .mount(&fallback)
            .await;

        let listing = client(vec![primary.uri(), fallback.uri()])
            .list_rooms()
            .await;
        assert_eq!(listing.status, ListingStatus::Success);
    }

    #[tokio::test]
    async fn test_list_rooms_primary_error_status_uses_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.RoomService/ListRooms"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rooms": [{"name": "r2"}]})),
            )
            .expect(1)
            .mount(&fallback)
            .await;

        let listing = client(vec![primary.uri(), fallback.uri()])
            .list_rooms()
            .await;

        assert_eq!(listing.status, ListingStatus::Success);
        assert_eq!(listing.rooms, vec![json!({"name": "r2"})]);
        assert_eq!(listing.server_url, Some(fallback.uri()));
    }

    #[tokio::test]
    async fn test_list_rooms_unreachable_primary_uses_fallback() {
        let fallback = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rooms": []})))
            .mount(&fallback)
            .await;

        let listing = client(vec![DEAD_ENDPOINT.to_string(), fallback.uri()])
            .list_rooms()
            .await;

        assert_eq!(listing.status, ListingStatus::Success);
        assert_eq!(listing.server_url, Some(fallback.uri()));
    }

    #[tokio::test]
    async fn test_list_rooms_primary_timeout_uses_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"rooms": [{"name": "too-late"}]}))
                    .set_delay(Duration::from_secs(5)),
            )
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.RoomService/ListRooms"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rooms": [{"name": "r2"}]})),
            )
            .expect(1)
            .mount(&fallback)
            .await;

        let client = MediaServerClient::new(
            vec![primary.uri(), fallback.uri()],
            Duration::from_millis(200),
            issuer(),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let listing = client.list_rooms().await;

        assert_eq!(listing.status, ListingStatus::Success);
        assert_eq!(listing.rooms, vec![json!({"name": "r2"})]);
        assert_eq!(listing.server_url, Some(fallback.uri()));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_list_participants_both_time_out() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        for server in [&primary, &fallback] {
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"participants": []}))
                        .set_delay(Duration::from_secs(5)),
                )
                .mount(server)
                .await;
        }

        let client = MediaServerClient::new(
            vec![primary.uri(), fallback.uri()],
            Duration::from_millis(200),
            issuer(),
        )
        .unwrap();

        let listing = client.list_participants("slow-room").await;

        assert_eq!(listing.status, ListingStatus::Error);
        assert!(listing.participants.is_empty());
        assert_eq!(listing.room_name, "slow-room");
        assert_eq!(listing.message.as_deref(), Some(UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn test_list_rooms_undecodable_body_uses_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rooms": []})))
            .expect(1)
            .mount(&fallback)
            .await;

        let listing = client(vec![primary.uri(), fallback.uri()])
            .list_rooms()
            .await;
        assert_eq!(listing.server_url, Some(fallback.uri()));
    }

    #[tokio::test]
    async fn test_list_rooms_all_endpoints_fail() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&primary)
            .await;

        let listing = client(vec![primary.uri(), DEAD_ENDPOINT.to_string()])
            .list_rooms()
            .await;

        assert_eq!(listing.status, ListingStatus::Error);
        assert!(listing.rooms.is_empty());
        assert!(listing.server_url.is_none());
        assert_eq!(listing.message.as_deref(), Some(UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn test_list_rooms_missing_rooms_field_is_empty() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&primary)
            .await;

        let listing = client(vec![primary.uri()]).list_rooms().await;
        assert_eq!(listing.status, ListingStatus::Success);
        assert!(listing.rooms.is_empty());
    }

    #[tokio::test]
    async fn test_admin_token_is_host_token_for_room() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.RoomService/ListParticipants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"participants": []})))
            .mount(&primary)
            .await;

        client(vec![primary.uri()]).list_participants("r1").await;

        let requests = primary.received_requests().await.unwrap();
        let request = requests.first().expect("one request");
        let auth = request
            .headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        let token = auth.strip_prefix("Bearer ").unwrap();

        let claims = issuer().decode(token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.room, "r1");
        assert!(claims.video.room_admin);
    }

    #[tokio::test]
    async fn test_list_participants_success() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.RoomService/ListParticipants"))
            .and(body_json(json!({"room": "r1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"participants": [{"identity": "alice"}]})),
            )
            .expect(1)
            .mount(&primary)
            .await;

        let listing = client(vec![primary.uri()]).list_participants("r1").await;

        assert_eq!(listing.status, ListingStatus::Success);
        assert_eq!(listing.room_name, "r1");
        assert_eq!(listing.participants, vec![json!({"identity": "alice"})]);
    }

    #[tokio::test]
    async fn test_list_participants_all_fail() {
        let listing = client(vec![DEAD_ENDPOINT.to_string()])
            .list_participants("r1")
            .await;

        assert_eq!(listing.status, ListingStatus::Error);
        assert_eq!(listing.room_name, "r1");
        assert!(listing.participants.is_empty());
        assert_eq!(listing.message.as_deref(), Some(UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn test_connection_status_codes() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&fallback)
            .await;

        let results = client(vec![primary.uri(), fallback.uri()])
            .test_connection()
            .await;

        let primary_check = results.get("primary").unwrap();
        assert_eq!(primary_check.status, "connected");
        assert_eq!(primary_check.response_code, Some(404));

        let fallback_check = results.get("fallback").unwrap();
        assert_eq!(fallback_check.status, "failed");
        assert_eq!(fallback_check.response_code, Some(502));
    }

    #[tokio::test]
    async fn test_connection_transport_error_reported() {
        let results = client(vec![DEAD_ENDPOINT.to_string()])
            .test_connection()
            .await;

        let check = results.get("primary").unwrap();
        assert_eq!(check.status, "failed");
        assert!(check.response_code.is_none());
        assert!(check.error.is_some());
    }

    #[test]
    fn test_endpoint_labels() {
        assert_eq!(endpoint_label(0), "primary");
        assert_eq!(endpoint_label(1), "fallback");
    }
}
