//! Dependency health reporting.
//!
//! The reporter runs three probes and folds them into a [`HealthReport`]:
//!
//! - datastore (`SELECT 1`): failure makes the service `unhealthy`
//! - cache (`SET`/`GET`/`DEL` of a unique key): failure makes it `warning`
//! - disk free space: informational only, never changes the overall status
//!
//! Probes are trait objects so tests can run without PostgreSQL or Redis.
//! Probe errors are captured into the report; nothing here returns an error.
//! Datastore and cache probes are time-boxed, and a probe that runs out of
//! time reports `"timeout"`.

use crate::models::{HealthReport, HealthStatus, ServiceHealth};
use crate::observability::metrics;
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{error, instrument, warn};

/// TTL for the cache probe key, so an interrupted probe cleans up after itself.
const CACHE_PROBE_TTL_SECS: u64 = 10;

/// Free space ratio at or below which the disk reports `warning`.
const DISK_WARNING_PERCENT: f64 = 10.0;

/// Upper bound on a single datastore or cache probe. Must stay well below the
/// router's request timeout so a hung dependency still yields a JSON report.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-attempt connect and response timeout for the Redis connection.
const REDIS_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Reconnect attempts made by the Redis connection manager after a drop.
const REDIS_RECONNECT_RETRIES: usize = 1;

// =============================================================================
// Probe traits
// =============================================================================

/// Round-trip check against the primary datastore.
#[async_trait]
pub trait DatastoreProbe: Send + Sync {
    async fn ping(&self) -> Result<(), String>;
}

/// Write/read/delete check against the cache.
#[async_trait]
pub trait CacheProbe: Send + Sync {
    async fn round_trip(&self) -> Result<(), String>;
}

/// Free space check for the local filesystem.
#[async_trait]
pub trait DiskProbe: Send + Sync {
    /// Percentage of free space, 0.0 to 100.0.
    async fn free_space_percent(&self) -> Result<f64, String>;
}

// =============================================================================
// Production probes
// =============================================================================

/// PostgreSQL probe.
pub struct PgDatastoreProbe {
    pool: PgPool,
}

impl PgDatastoreProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatastoreProbe for PgDatastoreProbe {
    async fn ping(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Redis probe.
///
/// The connection is established on first use so the service can start and
/// report `warning` while Redis is down. After that a [`ConnectionManager`]
/// owns it and reconnects in the background when the socket drops.
pub struct RedisCacheProbe {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCacheProbe {
    /// # Errors
    ///
    /// Returns an error if `redis_url` cannot be parsed.
    pub fn new(redis_url: &str) -> Result<Self, String> {
        // Do NOT log redis_url as it may contain credentials
        let client = redis::Client::open(redis_url).map_err(|e| {
            error!(target: "ls.health", error = %e, "Failed to open Redis client");
            format!("Failed to open Redis client: {e}")
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, String> {
        self.connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(REDIS_RECONNECT_RETRIES)
                    .set_connection_timeout(REDIS_IO_TIMEOUT)
                    .set_response_timeout(REDIS_IO_TIMEOUT);

                ConnectionManager::new_with_config(self.client.clone(), config)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl CacheProbe for RedisCacheProbe {
    async fn round_trip(&self) -> Result<(), String> {
        let mut conn = self.connection().await?;
        let key = format!("health_check_{}", uuid::Uuid::new_v4());

        conn.set_ex::<_, _, ()>(&key, "ok", CACHE_PROBE_TTL_SECS)
            .await
            .map_err(|e| e.to_string())?;

        // The key is deleted whatever the read-back returned.
        let value: Result<Option<String>, _> = conn.get(&key).await;
        let deleted: Result<(), _> = conn.del(&key).await;

        let value = value.map_err(|e| e.to_string())?;
        deleted.map_err(|e| e.to_string())?;

        match value.as_deref() {
            Some("ok") => Ok(()),
            _ => Err("Cache read-back mismatch".to_string()),
        }
    }
}

/// Disk probe backed by `sysinfo`.
pub struct SysinfoDiskProbe {
    path: PathBuf,
}

impl SysinfoDiskProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DiskProbe for SysinfoDiskProbe {
    async fn free_space_percent(&self) -> Result<f64, String> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || disk_free_percent(&path))
            .await
            .map_err(|e| format!("Disk probe task failed: {e}"))?
    }
}

/// Free space of the disk whose mount point is the longest prefix of `path`.
fn disk_free_percent(path: &Path) -> Result<f64, String> {
    let disks = sysinfo::Disks::new_with_refreshed_list();

    let disk = disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .ok_or_else(|| format!("No disk found for path {}", path.display()))?;

    let total = disk.total_space();
    if total == 0 {
        return Err("Disk reports zero total space".to_string());
    }

    Ok(disk.available_space() as f64 / total as f64 * 100.0)
}

// =============================================================================
// Reporter
// =============================================================================

/// Builds health reports from the configured probes.
#[derive(Clone)]
pub struct HealthReporter {
    datastore: Arc<dyn DatastoreProbe>,
    cache: Arc<dyn CacheProbe>,
    disk: Option<Arc<dyn DiskProbe>>,
    environment: String,
    probe_timeout: Duration,
}

impl HealthReporter {
    pub fn new(
        datastore: Arc<dyn DatastoreProbe>,
        cache: Arc<dyn CacheProbe>,
        disk: Option<Arc<dyn DiskProbe>>,
        environment: String,
    ) -> Self {
        Self {
            datastore,
            cache,
            disk,
            environment,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the per-probe time limit.
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Run all probes and build a report.
    #[instrument(skip_all, name = "ls.health.report")]
    pub async fn report(&self) -> HealthReport {
        let start = Instant::now();
        let mut services = BTreeMap::new();

        let (db_result, db_elapsed) =
            timed(bounded(self.probe_timeout, self.datastore.ping())).await;
        let db_ok = db_result.is_ok();
        if let Err(e) = &db_result {
            warn!(target: "ls.health", error = %e, "Database health check failed");
        }
        services.insert(
            "database".to_string(),
            probe_health(db_result, db_elapsed),
        );

        let (cache_result, cache_elapsed) =
            timed(bounded(self.probe_timeout, self.cache.round_trip())).await;
        let cache_ok = cache_result.is_ok();
        if let Err(e) = &cache_result {
            warn!(target: "ls.health", error = %e, "Cache health check failed");
        }
        services.insert(
            "redis".to_string(),
            probe_health(cache_result, cache_elapsed),
        );

        if let Some(disk) = &self.disk {
            services.insert("disk".to_string(), disk_health(disk.free_space_percent().await));
        }

        let status = overall_status(db_ok, cache_ok);
        metrics::record_health_check(status.as_str());

        HealthReport {
            status,
            timestamp: chrono::Utc::now().timestamp(),
            services,
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: self.environment.clone(),
            response_time: format_millis(start.elapsed()),
        }
    }

    /// Datastore-only readiness check.
    pub async fn readiness(&self) -> Result<(), String> {
        bounded(self.probe_timeout, self.datastore.ping()).await
    }
}

/// Overall status from the datastore and cache probe results.
pub fn overall_status(datastore_ok: bool, cache_ok: bool) -> HealthStatus {
    match (datastore_ok, cache_ok) {
        (false, _) => HealthStatus::Unhealthy,
        (true, false) => HealthStatus::Warning,
        (true, true) => HealthStatus::Healthy,
    }
}

async fn bounded<F>(limit: Duration, probe: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    tokio::time::timeout(limit, probe)
        .await
        .unwrap_or_else(|_| Err("timeout".to_string()))
}

async fn timed<F, T>(fut: F) -> (T, Duration)
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    (out, start.elapsed())
}

fn probe_health(result: Result<(), String>, elapsed: Duration) -> ServiceHealth {
    match result {
        Ok(()) => ServiceHealth {
            status: HealthStatus::Healthy,
            response_time: Some(format_millis(elapsed)),
            error: None,
            free_space_percent: None,
        },
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            response_time: None,
            error: Some(e),
            free_space_percent: None,
        },
    }
}

fn disk_health(result: Result<f64, String>) -> ServiceHealth {
    match result {
        Ok(percent) => ServiceHealth {
            status: if percent > DISK_WARNING_PERCENT {
                HealthStatus::Healthy
            } else {
                HealthStatus::Warning
            },
            response_time: None,
            error: None,
            free_space_percent: Some((percent * 100.0).round() / 100.0),
        },
        Err(e) => ServiceHealth {
            status: HealthStatus::Unknown,
            response_time: None,
            error: Some(e),
            free_space_percent: None,
        },
    }
}

fn format_millis(elapsed: Duration) -> String {
    format!("{:.2}ms", elapsed.as_secs_f64() * 1000.0)
}

/// Mock probes for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock datastore probe.
    pub struct MockDatastore {
        error: Option<String>,
        hang: bool,
        call_count: AtomicUsize,
    }

    impl MockDatastore {
        pub fn healthy() -> Self {
            Self {
                error: None,
                hang: false,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: &str) -> Self {
            Self {
                error: Some(error.to_string()),
                hang: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Never completes, like a dependency that accepts and stays silent.
        pub fn hanging() -> Self {
            Self {
                error: None,
                hang: true,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatastoreProbe for MockDatastore {
        async fn ping(&self) -> Result<(), String> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    /// Mock cache probe.
    pub struct MockCache {
        error: Option<String>,
        hang: bool,
        call_count: AtomicUsize,
    }

    impl MockCache {
        pub fn healthy() -> Self {
            Self {
                error: None,
                hang: false,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: &str) -> Self {
            Self {
                error: Some(error.to_string()),
                hang: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Never completes, like a dependency that accepts and stays silent.
        pub fn hanging() -> Self {
            Self {
                error: None,
                hang: true,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CacheProbe for MockCache {
        async fn round_trip(&self) -> Result<(), String> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    /// Mock disk probe returning a fixed result.
    pub struct MockDisk {
        result: Result<f64, String>,
    }

    impl MockDisk {
        pub fn with_free_percent(percent: f64) -> Self {
            Self {
                result: Ok(percent),
            }
        }

        pub fn failing(error: &str) -> Self {
            Self {
                result: Err(error.to_string()),
            }
        }
    }

    #[async_trait]
    impl DiskProbe for MockDisk {
        async fn free_space_percent(&self) -> Result<f64, String> {
            self.result.clone()
        }
    }

    /// Reporter wired to the given mock probes.
    pub fn reporter(
        datastore: MockDatastore,
        cache: MockCache,
        disk: Option<MockDisk>,
    ) -> HealthReporter {
        HealthReporter::new(
            Arc::new(datastore),
            Arc::new(cache),
            disk.map(|d| Arc::new(d) as Arc<dyn DiskProbe>),
            "test".to_string(),
        )
    }
}
