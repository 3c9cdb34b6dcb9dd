//! Operational Telemetry
//!
//! Read-only dashboard data: platform health and active session counts,
//! with a fixed-interval poller for the back-office health view. Polling
//! here is display plumbing, not a correctness mechanism.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::{decode, ApiClient, ApiResult};

const HEALTH_PATH: &str = "/system-health";
const SESSIONS_PATH: &str = "/sessions/active";

/// Platform health as reported by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,

    #[serde(default)]
    pub uptime_seconds: u64,

    /// Per-component status strings (database, queue, judge workers, ...)
    #[serde(default)]
    pub components: HashMap<String, String>,
}

impl SystemHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") || self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Currently active platform sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveSessions {
    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub sessions: Vec<ActiveSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// One polled round of telemetry
#[derive(Debug, Clone)]
pub struct OpsSnapshot {
    pub health: SystemHealth,
    pub active_sessions: ActiveSessions,
    pub fetched_at: DateTime<Utc>,
}

/// Fixed-interval telemetry poller.
pub struct HealthMonitor {
    client: Arc<ApiClient>,
    interval_secs: u64,
    running: Arc<RwLock<bool>>,
    latest: Arc<RwLock<Option<OpsSnapshot>>>,
}

impl HealthMonitor {
    pub fn new(client: Arc<ApiClient>, interval_secs: u64) -> Self {
        Self {
            client,
            interval_secs: interval_secs.max(1),
            running: Arc::new(RwLock::new(false)),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn system_health(&self) -> ApiResult<SystemHealth> {
        decode(self.client.get(HEALTH_PATH).await?)
    }

    pub async fn active_sessions(&self) -> ApiResult<ActiveSessions> {
        decode(self.client.get(SESSIONS_PATH).await?)
    }

    /// Fetch both telemetry endpoints once
    pub async fn snapshot(&self) -> ApiResult<OpsSnapshot> {
        let health = self.system_health().await?;
        let active_sessions = self.active_sessions().await?;
        Ok(OpsSnapshot {
            health,
            active_sessions,
            fetched_at: Utc::now(),
        })
    }

    /// Last successfully polled snapshot
    pub async fn latest(&self) -> Option<OpsSnapshot> {
        self.latest.read().await.clone()
    }

    /// Start the polling background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = self.clone();

        tokio::spawn(async move {
            *monitor.running.write().await = true;

            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(monitor.interval_secs));

            loop {
                interval.tick().await;

                if !*monitor.running.read().await {
                    break;
                }

                match monitor.snapshot().await {
                    Ok(snapshot) => {
                        tracing::debug!(
                            status = %snapshot.health.status,
                            active = snapshot.active_sessions.count,
                            "Telemetry refreshed"
                        );
                        *monitor.latest.write().await = Some(snapshot);
                    }
                    Err(e) => {
                        tracing::warn!("Telemetry poll failed: {}", e);
                    }
                }
            }
        })
    }

    /// Stop the polling task at its next tick
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClientConfig;
    use crate::session::{MemorySessionStore, SessionStore};
    use serde_json::json;
    use wiremock::matchers::{method as http_method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn monitor_for(server: &MockServer) -> HealthMonitor {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        store.set_access_token("tok").await.unwrap();
        let client = Arc::new(ApiClient::new(
            ApiClientConfig {
                base_url: format!("{}/api", server.uri()),
                request_timeout_ms: 5_000,
            },
            store,
        ));
        HealthMonitor::new(client, 1)
    }

    async fn mount_telemetry(server: &MockServer) {
        Mock::given(http_method("GET"))
            .and(url_path("/api/system-health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "uptime_seconds": 3600,
                "components": {"database": "ok", "judge": "degraded"}
            })))
            .mount(server)
            .await;

        Mock::given(http_method("GET"))
            .and(url_path("/api/sessions/active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "sessions": [
                    {"username": "ada"},
                    {"username": "grace", "ip": "10.0.0.7"}
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_snapshot_combines_both_endpoints() {
        let server = MockServer::start().await;
        mount_telemetry(&server).await;

        let monitor = monitor_for(&server).await;
        let snapshot = monitor.snapshot().await.unwrap();

        assert!(snapshot.health.is_healthy());
        assert_eq!(snapshot.health.components["judge"], "degraded");
        assert_eq!(snapshot.active_sessions.count, 2);
        assert_eq!(snapshot.active_sessions.sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_poller_caches_latest_snapshot() {
        let server = MockServer::start().await;
        mount_telemetry(&server).await;

        let monitor = Arc::new(monitor_for(&server).await);
        let handle = monitor.clone().start();

        // First tick fires immediately
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(monitor.latest().await.is_some());

        monitor.stop().await;
        handle.abort();
    }
}
