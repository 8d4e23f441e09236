//! In-memory table of known service nodes.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use xchain_consensus::Hash256;
use xchain_primitives::{OutPoint, Transaction};

use crate::keys::KeyId;
use crate::ping::ServiceNodePing;
use crate::servicenode::{ServiceNode, ValidationError};

/// Registry of validated service nodes keyed by identity. Validation runs
/// on the candidate outside the lock; only the post-validation merge takes
/// it, so pings for the same identity are applied one writer at a time.
#[derive(Debug, Default)]
pub struct ServiceNodeRegistry {
    nodes: Mutex<HashMap<KeyId, ServiceNode>>,
}

impl ServiceNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a registration (stale check on) and merges it into the
    /// table. A rejected record leaves the table untouched.
    pub fn register<L, B>(
        &self,
        node: ServiceNode,
        lookup_output: L,
        is_anchor_valid: B,
    ) -> Result<(), ValidationError>
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
        B: Fn(u32, &Hash256, bool) -> bool,
    {
        if let Err(err) = node.validate(&lookup_output, &is_anchor_valid, true) {
            log_rejection("registration", &node.key_id(), err);
            return Err(err);
        }
        if let Ok(mut nodes) = self.nodes.lock() {
            nodes.insert(node.key_id(), node);
        }
        Ok(())
    }

    /// Validates a ping and merges its embedded snapshot into the canonical
    /// entry: anchor, config, and last-seen time are refreshed. A rejected
    /// ping's decode-time state never reaches the table.
    pub fn process_ping<L, B>(
        &self,
        ping: &ServiceNodePing,
        lookup_output: L,
        is_anchor_valid: B,
    ) -> Result<(), ValidationError>
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
        B: Fn(u32, &Hash256, bool) -> bool,
    {
        if let Err(err) = ping.validate(&lookup_output, &is_anchor_valid) {
            log_rejection("ping", &ping.key_id(), err);
            return Err(err);
        }
        if let Ok(mut nodes) = self.nodes.lock() {
            let entry = nodes
                .entry(ping.key_id())
                .or_insert_with(|| ping.node().clone());
            entry.set_ping_anchor(ping.anchor_height(), *ping.anchor_hash());
            entry.set_config(ping.config());
            entry.update_ping();
        }
        Ok(())
    }

    pub fn get(&self, key: &KeyId) -> Option<ServiceNode> {
        self.nodes
            .lock()
            .ok()
            .and_then(|nodes| nodes.get(key).cloned())
    }

    pub fn contains(&self, key: &KeyId) -> bool {
        self.nodes
            .lock()
            .map(|nodes| nodes.contains_key(key))
            .unwrap_or(false)
    }

    pub fn list(&self) -> Vec<ServiceNode> {
        self.nodes
            .lock()
            .map(|nodes| nodes.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.nodes.lock().map(|nodes| nodes.len()).unwrap_or(0)
    }

    pub fn remove(&self, key: &KeyId) {
        if let Ok(mut nodes) = self.nodes.lock() {
            nodes.remove(key);
        }
    }

    pub fn reset(&self) {
        if let Ok(mut nodes) = self.nodes.lock() {
            nodes.clear();
        }
    }
}

fn log_rejection(kind: &str, key: &KeyId, err: ValidationError) {
    match err {
        // Possible forged or duplicated collateral; keep these loud.
        ValidationError::Collateral(_) | ValidationError::InvalidIdentity => {
            warn!("rejected service node {kind} for {:02x?}: {err}", key.0);
        }
        _ => {
            debug!("discarded service node {kind} for {:02x?}: {err}", key.0);
        }
    }
}
