/// Injectable time source.
pub mod clock;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::survivor_store::SurvivorStore,
    error::ServiceError,
    services::{
        notifications::{NotificationSink, SseNotificationSink},
        retry::RetryPolicy,
        survivor_core::{CoreDeps, SurvivorCore},
    },
};

pub use self::sse::SseHub;
use self::clock::{Clock, SystemClock};

/// Handle shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 64;

/// Central application state: the installed store, the public event hub and configuration.
pub struct AppState {
    store: RwLock<Option<Arc<dyn SurvivorStore>>>,
    public_sse: Arc<SseHub>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`AppState::new`] with an explicit clock.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let public_sse = Arc::new(SseHub::new(PUBLIC_SSE_CAPACITY));
        Arc::new(Self {
            store: RwLock::new(None),
            notifier: Arc::new(SseNotificationSink::new(public_sse.clone())),
            public_sse,
            clock,
            degraded: degraded_tx,
            config,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn SurvivorStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store or [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn SurvivorStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn SurvivorStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Survivor engine bound to the installed store.
    pub async fn core(&self) -> Result<SurvivorCore, ServiceError> {
        let store = self.require_store().await?;
        Ok(SurvivorCore::new(CoreDeps {
            store,
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
            retry: RetryPolicy::from(self.config.conflict_retry.clone()),
            default_tie_policy: self.config.default_tie_policy,
        }))
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Time source shared with the engine.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
