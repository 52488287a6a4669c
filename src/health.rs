//! Background readiness polling behind the navbar health indicator.

use crate::client::{ApiClient, ApiResult, ReadinessStatus};
use crate::ui::view::{Panel, View};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// State of the health indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthIndicator {
    /// No readiness result yet.
    Checking,
    /// Ready with the vector store connected.
    Healthy,
    /// Reachable but not fully ready.
    Degraded,
    /// Readiness check failed.
    Unhealthy,
}

impl HealthIndicator {
    /// Map a readiness outcome onto an indicator state.
    pub fn from_readiness(result: &ApiResult<ReadinessStatus>) -> Self {
        match result {
            Ok(status) if status.is_fully_ready() => Self::Healthy,
            Ok(_) => Self::Degraded,
            Err(_) => Self::Unhealthy,
        }
    }

    /// Short label shown in the badge and console prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Run one readiness check and publish the resulting indicator to the badge panel.
pub async fn check_once(client: &ApiClient, view: &dyn View) -> HealthIndicator {
    let result = client.readiness_check().await;
    let indicator = HealthIndicator::from_readiness(&result);
    match &result {
        Ok(status) => tracing::debug!(
            status = %status.status,
            qdrant_connected = status.qdrant_connected,
            indicator = indicator.label(),
            "Readiness checked"
        ),
        Err(error) => tracing::warn!(%error, "Readiness check failed"),
    }
    view.replace(Panel::HealthBadge, indicator.label().to_string());
    indicator
}

/// Handle to the spawned readiness poller.
///
/// The task checks immediately, then once per interval, until [`HealthPoller::stop`] is called.
pub struct HealthPoller {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    indicator: watch::Receiver<HealthIndicator>,
}

impl HealthPoller {
    /// Spawn the poller on the current runtime.
    pub fn start(client: Arc<ApiClient>, view: Arc<dyn View>, every: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (indicator_tx, indicator_rx) = watch::channel(HealthIndicator::Checking);
        view.replace(Panel::HealthBadge, HealthIndicator::Checking.label().to_string());

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(interval_secs = every.as_secs_f64(), "Health poller started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let indicator = check_once(&client, view.as_ref()).await;
                        indicator_tx.send_replace(indicator);
                    }
                }
            }
            tracing::debug!("Health poller stopped");
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle,
            indicator: indicator_rx,
        }
    }

    /// Latest indicator state.
    pub fn indicator(&self) -> HealthIndicator {
        *self.indicator.borrow()
    }

    /// Subscribe to indicator changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthIndicator> {
        self.indicator.clone()
    }

    /// Stop polling and wait for the task to finish.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(error) = (&mut self.handle).await {
            tracing::warn!(%error, "Health poller task ended abnormally");
        }
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use crate::ui::view::PanelBoard;
    use httpmock::{Method::GET, MockServer};
    use reqwest::StatusCode;
    use serde_json::json;

    fn readiness(status: &str, connected: bool) -> ApiResult<ReadinessStatus> {
        Ok(serde_json::from_value(json!({ "status": status, "qdrant_connected": connected }))
            .expect("readiness"))
    }

    #[test]
    fn indicator_transitions() {
        assert_eq!(
            HealthIndicator::from_readiness(&readiness("ready", true)),
            HealthIndicator::Healthy
        );
        assert_eq!(
            HealthIndicator::from_readiness(&readiness("ready", false)),
            HealthIndicator::Degraded
        );
        assert_eq!(
            HealthIndicator::from_readiness(&readiness("starting", true)),
            HealthIndicator::Degraded
        );
        let failed: ApiResult<ReadinessStatus> = Err(ApiError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "down".into(),
        });
        assert_eq!(
            HealthIndicator::from_readiness(&failed),
            HealthIndicator::Unhealthy
        );
    }

    #[tokio::test]
    async fn poller_checks_immediately_and_repeats_until_stopped() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/health/ready");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "status": "ready", "qdrant_connected": true }));
            })
            .await;

        let client =
            Arc::new(ApiClient::new(&server.base_url(), Duration::from_secs(5)).expect("client"));
        let board = Arc::new(PanelBoard::new());
        let poller = HealthPoller::start(client, board.clone(), Duration::from_millis(100));
        assert_eq!(board.history(Panel::HealthBadge)[0], "checking");

        let mut updates = poller.subscribe();
        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("first check in time")
            .expect("poller alive");
        assert_eq!(poller.indicator(), HealthIndicator::Healthy);

        tokio::time::sleep(Duration::from_millis(350)).await;
        poller.stop().await;

        let hits = mock.hits_async().await;
        assert!(hits >= 2, "expected repeated checks, got {hits}");

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(mock.hits_async().await, hits, "no checks after stop");
        assert_eq!(board.content(Panel::HealthBadge), "healthy");
    }
}
