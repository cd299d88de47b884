//! Canonical monitor collection
//!
//! `MonitorStore` is the seam to whatever persists monitors; `InMemoryMonitorRegistry` keeps
//! them behind a single `RwLock` so every mutation is one critical section and readers only
//! ever see whole entries.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    clock::Clock,
    domain::monitor::{Monitor, MonitorConfig, MonitorId, MonitorState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("monitor {0} not found")]
    NotFound(MonitorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted;

#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn create(&self, config: MonitorConfig) -> MonitorId;
    async fn get(&self, id: MonitorId) -> Result<Monitor, RegistryError>;
    async fn list(&self) -> Vec<Monitor>;
    async fn toggle(&self, id: MonitorId) -> Result<MonitorState, RegistryError>;
    async fn delete(&self, id: MonitorId) -> Result<Deleted, RegistryError>;
}

#[derive(Debug, Default)]
struct RegistryInner {
    last_id: u64,
    monitors: BTreeMap<MonitorId, Monitor>,
}

pub struct InMemoryMonitorRegistry {
    clock: Arc<dyn Clock>,
    inner: RwLock<RegistryInner>,
}

impl InMemoryMonitorRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(RegistryInner::default()),
        }
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorRegistry {
    async fn create(&self, config: MonitorConfig) -> MonitorId {
        let mut inner = self.inner.write().await;
        // ids are never handed out twice, even after a delete
        inner.last_id += 1;
        let id = MonitorId(inner.last_id);
        let kind = config.kind();

        inner.monitors.insert(
            id,
            Monitor {
                id,
                config,
                enabled: true,
                created_at: self.clock.now(),
            },
        );

        info!(monitor_id = %id, kind = %kind, "monitor created");
        id
    }

    async fn get(&self, id: MonitorId) -> Result<Monitor, RegistryError> {
        self.inner
            .read()
            .await
            .monitors
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    async fn list(&self) -> Vec<Monitor> {
        self.inner.read().await.monitors.values().cloned().collect()
    }

    async fn toggle(&self, id: MonitorId) -> Result<MonitorState, RegistryError> {
        let mut inner = self.inner.write().await;
        let monitor = inner
            .monitors
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;

        monitor.enabled = !monitor.enabled;
        let state = monitor.state();
        info!(monitor_id = %id, enabled = monitor.enabled, "monitor toggled");
        Ok(state)
    }

    async fn delete(&self, id: MonitorId) -> Result<Deleted, RegistryError> {
        let mut inner = self.inner.write().await;
        inner
            .monitors
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))?;

        info!(monitor_id = %id, "monitor deleted");
        Ok(Deleted)
    }
}
