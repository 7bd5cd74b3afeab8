//! Decimated trail recording
//!
//! Three trails grow together from accepted fixes: the antenna track
//! (piloting), the nozzle-tip track (suction) and one tailings-zone polygon
//! per admitted sample. A sample is admitted only when it lies at least
//! `min_distance_m` from the last admitted piloting point.

use serde::{Deserialize, Serialize};

use crate::algorithms::{haversine_m, Pose, VehicleGeometry};
use crate::core::{Fix, HeadingAngle, LonLat, Polygon, DEFAULT_MIN_TRAIL_DISTANCE_M};

/// Persisted trail layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailSnapshot {
    #[serde(default)]
    pub piloting: Vec<LonLat>,
    #[serde(default)]
    pub suction: Vec<LonLat>,
    #[serde(default)]
    pub tailings: Vec<Polygon>,
}

/// Outcome of offering a fix to the recorder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// First point, or far enough from the prior point
    Admitted { distance_m: Option<f64> },
    /// Too close to the prior point
    Discarded { distance_m: f64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<LonLat> },
    Polygon { coordinates: Polygon },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    pub trail: &'static str,
}

/// GeoJSON feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl Feature {
    fn new(trail: &'static str, geometry: Geometry) -> Self {
        Self {
            kind: "Feature",
            geometry,
            properties: FeatureProperties { trail },
        }
    }
}

/// GeoJSON feature collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

/// Raw trails plus render-ready artifacts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailExport {
    /// The three sequences in their persisted layout
    pub raw: TrailSnapshot,
    /// Antenna track, present once two points exist
    pub piloting_line: Option<Feature>,
    /// Nozzle-tip track, present once two points exist
    pub suction_line: Option<Feature>,
    /// One polygon feature per admitted sample
    pub tailings: FeatureCollection,
}

/// Trail recorder state
#[derive(Debug, Clone)]
pub struct TrailRecorder {
    trails: TrailSnapshot,
    geometry: VehicleGeometry,
    min_distance_m: f64,
    /// Set on every change not yet handed to the flusher
    dirty: bool,
}

impl Default for TrailRecorder {
    fn default() -> Self {
        Self::new(VehicleGeometry::default(), DEFAULT_MIN_TRAIL_DISTANCE_M)
    }
}

impl TrailRecorder {
    pub fn new(geometry: VehicleGeometry, min_distance_m: f64) -> Self {
        Self {
            trails: TrailSnapshot::default(),
            geometry,
            min_distance_m,
            dirty: false,
        }
    }

    /// Resume from a persisted snapshot; its last piloting point becomes the prior point
    pub fn restore(&mut self, snapshot: TrailSnapshot) {
        self.trails = snapshot;
        self.dirty = false;
    }

    pub fn min_distance_m(&self) -> f64 {
        self.min_distance_m
    }

    /// Offer a trustworthy fix taken at `heading`
    pub fn on_fix(&mut self, fix: &Fix, heading: HeadingAngle) -> Admission {
        let distance_m = self
            .trails
            .piloting
            .last()
            .map(|prior| haversine_m(prior[1], prior[0], fix.latitude, fix.longitude));

        if let Some(d) = distance_m {
            if d < self.min_distance_m {
                return Admission::Discarded { distance_m: d };
            }
        }

        let pose = Pose::new(fix.latitude, fix.longitude, heading.degrees());
        let suction = self.geometry.suction_tip(&pose);
        let tailings = vec![self.geometry.tailings_zone(&pose)];

        self.trails.piloting.push([fix.longitude, fix.latitude]);
        self.trails.suction.push(suction);
        self.trails.tailings.push(tailings);
        self.dirty = true;

        Admission::Admitted { distance_m }
    }

    /// Number of admitted samples
    pub fn len(&self) -> usize {
        self.trails.piloting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.piloting.is_empty()
    }

    pub fn snapshot(&self) -> TrailSnapshot {
        self.trails.clone()
    }

    pub fn export(&self) -> TrailExport {
        let line = |trail: &'static str, points: &Vec<LonLat>| {
            (points.len() >= 2).then(|| {
                Feature::new(
                    trail,
                    Geometry::LineString {
                        coordinates: points.clone(),
                    },
                )
            })
        };

        TrailExport {
            piloting_line: line("piloting", &self.trails.piloting),
            suction_line: line("suction", &self.trails.suction),
            tailings: FeatureCollection {
                kind: "FeatureCollection",
                features: self
                    .trails
                    .tailings
                    .iter()
                    .map(|polygon| {
                        Feature::new(
                            "tailings",
                            Geometry::Polygon {
                                coordinates: polygon.clone(),
                            },
                        )
                    })
                    .collect(),
            },
            raw: self.trails.clone(),
        }
    }

    /// Hand the current trails to the flusher if anything changed since the last call
    pub fn take_dirty(&mut self) -> Option<TrailSnapshot> {
        if self.dirty {
            self.dirty = false;
            Some(self.trails.clone())
        } else {
            None
        }
    }

    /// Re-arm the flusher after a failed write
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Drop all trails; the caller removes the persisted copy
    pub fn clear(&mut self) {
        self.trails = TrailSnapshot::default();
        self.dirty = false;
    }
}
