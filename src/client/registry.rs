//! Process-wide registry of pools keyed by `PoolId` (spec §4.6: "a pool with
//! no connections for the same duration is deregistered and will be
//! transparently recreated on the next submission").
//!
//! Grounded on the `dashmap::DashMap` idiom this crate already uses for
//! `h2::multiplexer::Multiplexer`'s stream table — the same
//! concurrent-map-of-independent-entries shape fits a pool-id keyed
//! registry just as well.

use super::connection::Protocol;
use super::pool::{Connector, Pool, PoolId};
use crate::config::{H1Config, H2Config, PoolConfig};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct PoolRegistry {
    pools: DashMap<PoolId, Arc<Pool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing pool for `id`, or creates and registers one.
    /// Recreation after an idle deregistration (spec §4.6) is just this
    /// same path running again with the same id.
    pub fn get_or_create(
        &self,
        id: PoolId,
        connector: Arc<dyn Connector>,
        protocol: Protocol,
        config: PoolConfig,
        h1_config: H1Config,
        h2_config: H2Config,
    ) -> Arc<Pool> {
        self.pools
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Pool::new(id, connector, protocol, config, h1_config, h2_config)))
            .clone()
    }

    pub fn get(&self, id: &PoolId) -> Option<Arc<Pool>> {
        self.pools.get(id).map(|p| p.clone())
    }

    /// Deregisters any pool currently holding zero connections, the other
    /// half of spec §4.6's idle-pool lifecycle (the live half being
    /// `Pool::drop_dead_slots`, already swept lazily on each submission).
    pub async fn sweep_empty(&self) {
        let mut empty = Vec::new();
        for entry in self.pools.iter() {
            if entry.value().is_idle().await {
                empty.push(entry.key().clone());
            }
        }
        for id in empty {
            self.pools.remove(&id);
        }
    }

    /// Gracefully shuts down every registered pool (spec §4.6 `shutdown`).
    pub async fn shutdown_all(&self) {
        let pools: Vec<Arc<Pool>> = self.pools.iter().map(|e| e.value().clone()).collect();
        for pool in pools {
            pool.shutdown().await;
        }
        self.pools.clear();
    }
}
