//! In-memory counter store.
//!
//! Counts live as long as the store object does; nothing is written to
//! disk. This is the default backend when no external service is configured.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::store::{CounterStore, RobotInfo, Stores};

/// In-memory implementation of CounterStore.
///
/// Uses a HashMap behind an RwLock: counting takes the write lock, listing
/// copies the whole map under the read lock.
pub struct MemoryStore {
    data: RwLock<HashMap<String, u64>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct identifiers counted so far.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if nothing has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn count(&self, identifier: &str) -> Result<()> {
        let mut data = self.data.write();
        *data.entry(identifier.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RobotInfo>> {
        let data = self.data.read();
        Ok(data
            .iter()
            .map(|(user_agent, seen)| RobotInfo::new(user_agent.clone(), *seen))
            .collect())
    }
}

impl Stores {
    /// Two fresh in-memory stores.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }
}
