//! Survey reference mark registry

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::{now_ms, Mark};
use crate::storage::{load_json, save_json, Storage, MARKS_KEY};
use crate::validation::{TrackerError, TrackerResult};

/// Persisted registry layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkSnapshot {
    #[serde(default)]
    pub marks: Vec<Mark>,
    #[serde(rename = "markCounter", default)]
    pub mark_counter: u32,
}

/// Mark creation request as received from an operator
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarkRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub h_acc: Option<f64>,
    pub label: Option<String>,
}

impl MarkRequest {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Default::default()
        }
    }
}

/// Ordered mark collection with a monotonic id counter.
///
/// Every mutation writes the full registry before returning. A failed write
/// is logged and the in-memory change is kept.
pub struct MarkRegistry {
    marks: Vec<Mark>,
    counter: u32,
    storage: Arc<dyn Storage>,
}

impl MarkRegistry {
    /// Load the registry persisted in `storage`, or start empty
    pub fn open(storage: Arc<dyn Storage>) -> TrackerResult<Self> {
        let snapshot: MarkSnapshot = load_json(storage.as_ref(), MARKS_KEY)?.unwrap_or_default();
        let highest = snapshot.marks.iter().map(|m| m.id).max().unwrap_or(0);
        Ok(Self {
            counter: snapshot.mark_counter.max(highest),
            marks: snapshot.marks,
            storage,
        })
    }

    pub fn list(&self) -> &[Mark] {
        &self.marks
    }

    pub fn get(&self, id: u32) -> Option<&Mark> {
        self.marks.iter().find(|m| m.id == id)
    }

    /// Last id handed out; the next mark gets `counter() + 1`
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn create(&mut self, request: MarkRequest) -> TrackerResult<Mark> {
        let latitude = Self::coordinate(request.latitude, "latitude")?;
        let longitude = Self::coordinate(request.longitude, "longitude")?;

        self.counter += 1;
        let id = self.counter;
        let mark = Mark {
            id,
            label: Self::label_or_default(request.label.as_deref(), id),
            latitude,
            longitude,
            h_acc: request.h_acc,
            created_at: now_ms(),
        };
        self.marks.push(mark.clone());
        self.persist();

        info!(id, label = %mark.label, latitude, longitude, "mark created");
        Ok(mark)
    }

    pub fn delete(&mut self, id: u32) -> TrackerResult<()> {
        let index = self
            .marks
            .iter()
            .position(|m| m.id == id)
            .ok_or(TrackerError::NotFound { id })?;
        self.marks.remove(index);
        self.persist();

        info!(id, "mark deleted");
        Ok(())
    }

    pub fn update(&mut self, id: u32, label: &str) -> TrackerResult<Mark> {
        let mark = self
            .marks
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(TrackerError::NotFound { id })?;
        mark.label = Self::label_or_default(Some(label), id);
        let updated = mark.clone();
        self.persist();

        info!(id, label = %updated.label, "mark relabelled");
        Ok(updated)
    }

    /// Remove every mark and restart ids at 1; returns how many were removed
    pub fn clear_all(&mut self) -> usize {
        let count = self.marks.len();
        self.marks.clear();
        self.counter = 0;
        self.persist();

        info!(count, "marks cleared");
        count
    }

    pub fn snapshot(&self) -> MarkSnapshot {
        MarkSnapshot {
            marks: self.marks.clone(),
            mark_counter: self.counter,
        }
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.storage.as_ref(), MARKS_KEY, &self.snapshot()) {
            error!(error = %e, "failed to persist marks");
        }
    }

    fn coordinate(value: Option<f64>, field: &str) -> TrackerResult<f64> {
        match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(_) => Err(TrackerError::Validation {
                field: field.to_string(),
                reason: "not a finite number".to_string(),
            }),
            None => Err(TrackerError::missing(field)),
        }
    }

    fn label_or_default(label: Option<&str>, id: u32) -> String {
        match label.map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => format!("RM_{}", id),
        }
    }
}
