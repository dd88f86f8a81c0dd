use api_client::ApiClient;
use cache::{CachePolicy, HttpFetcher, ResponseCache};
use clock::ClockService;
use connectivity::{Connectivity, ConnectivityMonitor};
use database::Database;
use eyre::{Context, Result};
use queue::EventQueue;
use settings::Settings;
use std::sync::Arc;
use sync::SyncCoordinator;

pub mod api_client;
pub mod cache;
pub mod clock;
pub mod connectivity;
pub mod database;
pub mod error;
pub mod queue;
pub mod settings;
pub mod sync;

/// Everything a terminal needs, wired against one local database and one server.
pub struct Station {
    pub settings: Settings,
    pub database: Database,
    pub api: ApiClient,
    pub queue: EventQueue,
    pub monitor: Arc<ConnectivityMonitor>,
    pub coordinator: SyncCoordinator,
    pub cache: ResponseCache,
    pub clock: ClockService,
}

impl Station {
    /// Starts offline. Nothing talks to the server until the first probe.
    pub async fn open(settings: Settings) -> Result<Self> {
        let database = Database::new(&settings.db_path)
            .await
            .wrap_err_with(|| format!("Failed to open database {}", settings.db_path))?;

        let api = ApiClient::new(&settings.server_address, settings.sync_timeout())?;
        let queue = EventQueue::new(&database);
        let monitor = Arc::new(ConnectivityMonitor::new(Connectivity::Offline));
        let coordinator = SyncCoordinator::new(queue.clone(), api.clone(), monitor.clone());

        let fetcher = Arc::new(HttpFetcher::new(settings.sync_timeout())?);
        let cache = ResponseCache::new(&database, CachePolicy::from_settings(&settings)?, fetcher);
        cache.activate().await?;

        let clock = ClockService::new(api.clone(), queue.clone(), monitor.clone());

        Ok(Self {
            settings,
            database,
            api,
            queue,
            monitor,
            coordinator,
            cache,
            clock,
        })
    }

    /// Drains the queue in the background on every offline to online transition.
    pub fn enable_auto_sync(&self) {
        let coordinator = self.coordinator.clone();
        self.monitor.on_online(move || coordinator.trigger());
    }

    pub async fn probe(&self) -> Connectivity {
        self.monitor.probe(&self.api).await
    }
}
