//! Test server harness for E2E testing
//!
//! Provides `TestLsServer` for spawning real livestream server instances in
//! tests. Datastore, cache and disk probes are mocks; the media server is
//! whatever URL the test supplies (typically a `wiremock::MockServer`).

use common::secret::SecretString;
use livestream_service::auth::service_token::RECOGNIZED_SERVICE;
use livestream_service::auth::{AccessTokenIssuer, ServiceTokenVerifier};
use livestream_service::config::Config;
use livestream_service::observability::metrics::init_metrics_recorder;
use livestream_service::routes::{self, AppState};
use livestream_service::services::health::mock::{MockCache, MockDatastore, MockDisk};
use livestream_service::services::health::DiskProbe;
use livestream_service::services::{HealthReporter, MediaServerClient};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const TEST_MEDIA_API_KEY: &str = "APItestharness";
pub const TEST_MEDIA_API_SECRET: &str = "test-harness-media-secret-0123456789";
pub const TEST_SERVICE_SECRET: &str = "test-harness-service-secret-0123456789";
pub const TEST_MEDIA_WS_URL: &str = "ws://media.test:7880";

/// A media endpoint that refuses connections.
pub const UNREACHABLE_MEDIA_URL: &str = "http://127.0.0.1:1";

/// Options for [`TestLsServer::spawn_with`].
pub struct TestLsServerOptions {
    pub media_http_url: String,
    pub media_fallback_url: Option<String>,
    pub require_service_auth: bool,
    pub datastore: MockDatastore,
    pub cache: MockCache,
    pub disk: Option<MockDisk>,
}

impl Default for TestLsServerOptions {
    fn default() -> Self {
        Self {
            media_http_url: UNREACHABLE_MEDIA_URL.to_string(),
            media_fallback_url: None,
            require_service_auth: false,
            datastore: MockDatastore::healthy(),
            cache: MockCache::healthy(),
            disk: Some(MockDisk::with_free_percent(50.0)),
        }
    }
}

/// Test harness for spawning the livestream server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_rooms_fallback() -> Result<()> {
///     let media = wiremock::MockServer::start().await;
///     let server = TestLsServer::spawn_with(TestLsServerOptions {
///         media_http_url: media.uri(),
///         ..Default::default()
///     })
///     .await?;
///     Ok(())
/// }
/// ```
pub struct TestLsServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestLsServer {
    /// Spawn a server with healthy mock probes and an unreachable media server.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(TestLsServerOptions::default()).await
    }

    /// Spawn a server with the given options.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and runs in
    /// the background until the harness is dropped.
    pub async fn spawn_with(options: TestLsServerOptions) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("REDIS_URL".to_string(), "redis://127.0.0.1:6379".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "MEDIA_API_KEY".to_string(),
                TEST_MEDIA_API_KEY.to_string(),
            ),
            (
                "MEDIA_API_SECRET".to_string(),
                TEST_MEDIA_API_SECRET.to_string(),
            ),
            (
                "SERVICE_SECRET_KEY".to_string(),
                TEST_SERVICE_SECRET.to_string(),
            ),
            ("MEDIA_WS_URL".to_string(), TEST_MEDIA_WS_URL.to_string()),
            ("MEDIA_HTTP_URL".to_string(), options.media_http_url),
            ("MEDIA_REQUEST_TIMEOUT_SECONDS".to_string(), "5".to_string()),
            (
                "REQUIRE_SERVICE_AUTH".to_string(),
                options.require_service_auth.to_string(),
            ),
            ("ENVIRONMENT".to_string(), "test".to_string()),
        ]);
        if let Some(fallback) = options.media_fallback_url {
            vars.insert("MEDIA_FALLBACK_URL".to_string(), fallback);
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let issuer = AccessTokenIssuer::from_config(&config);
        let verifier = ServiceTokenVerifier::new(
            config.service_secret_key.clone(),
            Duration::from_secs(config.jwt_clock_skew_seconds.unsigned_abs()),
        );
        let media = MediaServerClient::new(
            config.media_endpoints(),
            Duration::from_secs(config.media_request_timeout_seconds),
            issuer.clone(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create media client: {}", e))?;

        let health = HealthReporter::new(
            Arc::new(options.datastore),
            Arc::new(options.cache),
            options.disk.map(|d| Arc::new(d) as Arc<dyn DiskProbe>),
            config.environment.clone(),
        );

        let state = Arc::new(AppState {
            config: config.clone(),
            issuer,
            verifier,
            media,
            health,
        });

        // The global recorder can be installed only once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestLsServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Issuer sharing the harness's media credentials, for decoding tokens.
pub fn test_issuer() -> AccessTokenIssuer {
    AccessTokenIssuer::new(
        TEST_MEDIA_API_KEY.to_string(),
        SecretString::from(TEST_MEDIA_API_SECRET),
        86_400,
    )
}

/// Verifier sharing the harness's service secret.
pub fn test_verifier() -> ServiceTokenVerifier {
    ServiceTokenVerifier::new(
        SecretString::from(TEST_SERVICE_SECRET),
        Duration::from_secs(300),
    )
}

/// `Authorization` header value carrying a valid token for `service_name`.
pub fn service_auth_header(service_name: &str) -> String {
    let token = test_verifier()
        .mint(service_name)
        .expect("minting a test service token should succeed");
    format!("Service {token}")
}

/// `Authorization` header value for the recognized peer service.
pub fn main_app_auth_header() -> String {
    service_auth_header(RECOGNIZED_SERVICE)
}
