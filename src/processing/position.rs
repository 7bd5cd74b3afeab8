//! Single current-position record

use serde::Serialize;
use std::sync::RwLock;

use crate::core::{now_ms, Fix, PositionSource, PositionState};

/// Freshness of the latest fix as shown to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// No fix received yet
    Waiting,
    /// Latest fix is within the staleness threshold
    Live,
    /// Latest fix is older than the staleness threshold
    Stale,
}

impl LinkStatus {
    pub fn evaluate(last_update: Option<u64>, now_ms: u64, stale_after_ms: u64) -> Self {
        match last_update {
            None => LinkStatus::Waiting,
            Some(t) if now_ms.saturating_sub(t) > stale_after_ms => LinkStatus::Stale,
            Some(_) => LinkStatus::Live,
        }
    }
}

/// Holds the latest accepted fix.
///
/// Every fix is accepted and replaces the previous one (last received wins,
/// no ordering check). Readers always see a whole record.
#[derive(Debug, Default)]
pub struct PositionStore {
    current: RwLock<Option<PositionState>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a fix, stamping it with the current time
    pub fn ingest(&self, fix: Fix, source: PositionSource) -> PositionState {
        self.ingest_at(fix, source, now_ms())
    }

    /// Accept a fix received at `received_ms`
    pub fn ingest_at(&self, fix: Fix, source: PositionSource, received_ms: u64) -> PositionState {
        let state = PositionState::from_fix(fix, source, received_ms);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(state.clone());
        state
    }

    /// Latest state, `None` until the first fix
    pub fn current(&self) -> Option<PositionState> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last_update(&self) -> Option<u64> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|state| state.last_update)
    }

    pub fn link_status(&self, now_ms: u64, stale_after_ms: u64) -> LinkStatus {
        LinkStatus::evaluate(self.last_update(), now_ms, stale_after_ms)
    }
}
