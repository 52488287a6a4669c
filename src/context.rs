//! Explicitly constructed application context shared by every UI binding.

use crate::client::{ApiClient, ApiResult};
use crate::config::Config;
use crate::health::{HealthIndicator, HealthPoller};
use crate::ui::view::View;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the API client, the configuration, the view and the health poller lifecycle.
///
/// Build it once at start-up and hand it to the controller; nothing in the crate keeps a global
/// client or poll handle.
pub struct AppContext {
    client: Arc<ApiClient>,
    config: Config,
    view: Arc<dyn View>,
    poller: Mutex<Option<HealthPoller>>,
}

impl AppContext {
    /// Build a context from configuration.
    pub fn new(config: Config, view: Arc<dyn View>) -> ApiResult<Self> {
        let client = ApiClient::new(&config.api_url, config.request_timeout)?;
        Ok(Self::with_client(config, Arc::new(client), view))
    }

    /// Build a context around an existing client.
    pub fn with_client(config: Config, client: Arc<ApiClient>, view: Arc<dyn View>) -> Self {
        Self {
            client,
            config,
            view,
            poller: Mutex::new(None),
        }
    }

    /// Shared API client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// View receiving panel updates.
    pub fn view(&self) -> &dyn View {
        self.view.as_ref()
    }

    /// Start the readiness poller. Does nothing when it is already running.
    pub async fn start_health_poll(&self) {
        let mut slot = self.poller.lock().await;
        if slot.is_some() {
            return;
        }
        *slot = Some(HealthPoller::start(
            self.client.clone(),
            self.view.clone(),
            self.config.health_interval,
        ));
    }

    /// Stop the readiness poller and wait for it to wind down.
    pub async fn stop_health_poll(&self) {
        let poller = self.poller.lock().await.take();
        if let Some(poller) = poller {
            poller.stop().await;
        }
    }

    /// Latest indicator, or `None` when the poller is not running.
    pub async fn health_indicator(&self) -> Option<HealthIndicator> {
        self.poller
            .lock()
            .await
            .as_ref()
            .map(HealthPoller::indicator)
    }
}
