//! Core data types for the tracking engine

use crate::api::types::{TrackerError, TrackerResult};
use nalgebra::Vector2;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a point, rejecting NaN and infinite components.
    ///
    /// No range check is applied: finite out-of-range degrees are stored as given.
    pub fn checked(lat: f64, lng: f64) -> TrackerResult<Self> {
        if lat.is_finite() && lng.is_finite() {
            Ok(Self { lat, lng })
        } else {
            Err(TrackerError::NonFinitePosition { latitude: lat, longitude: lng })
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.lat, self.lng)
    }

    pub fn from_vector(v: Vector2<f64>) -> Self {
        Self { lat: v.x, lng: v.y }
    }

    /// Planar (lat/lng) Euclidean distance in degrees
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Stable identifier of a tracked vehicle.
///
/// Upstream feeds send either integers or strings; both normalise to the same
/// textual key so `12` and `"12"` address one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId(id)
    }
}

impl From<&EntityId> for EntityId {
    fn from(id: &EntityId) -> Self {
        id.clone()
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => EntityId::from(n),
            RawId::Text(s) => EntityId(s),
        })
    }
}

/// Optional per-vehicle attributes carried alongside the position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Estimated minutes to arrival
    pub eta_minutes: Option<u32>,
    /// Heading in degrees
    pub heading: Option<f64>,
    /// Speed as reported upstream
    pub speed: Option<f64>,
    /// Source timestamp (seconds since epoch)
    pub source_timestamp: Option<f64>,
}

impl EntityMetadata {
    /// Shallow merge: fields present in `newer` win, absent ones are kept.
    pub fn merge(&mut self, newer: &EntityMetadata) {
        if newer.eta_minutes.is_some() {
            self.eta_minutes = newer.eta_minutes;
        }
        if newer.heading.is_some() {
            self.heading = newer.heading;
        }
        if newer.speed.is_some() {
            self.speed = newer.speed;
        }
        if newer.source_timestamp.is_some() {
            self.source_timestamp = newer.source_timestamp;
        }
    }
}

/// Last known authoritative record for a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: GeoPoint,
    pub label: Option<String>,
    pub metadata: EntityMetadata,
}

impl Entity {
    /// Merge an update over this record; new values win, absent fields stay.
    pub fn merge(&mut self, update: &EntityUpdate) {
        self.position = update.position;
        if update.label.is_some() {
            self.label = update.label.clone();
        }
        self.metadata.merge(&update.metadata);
    }
}

/// A report about one vehicle from any source.
///
/// Every source reports coordinates; label and metadata are partial.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    pub id: EntityId,
    pub position: GeoPoint,
    pub label: Option<String>,
    pub metadata: EntityMetadata,
}

impl EntityUpdate {
    pub fn new(id: impl Into<EntityId>, position: GeoPoint) -> Self {
        Self {
            id: id.into(),
            position,
            label: None,
            metadata: EntityMetadata::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: EntityMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl From<Entity> for EntityUpdate {
    fn from(entity: Entity) -> Self {
        EntityUpdate {
            id: entity.id,
            position: entity.position,
            label: entity.label,
            metadata: entity.metadata,
        }
    }
}

impl From<EntityUpdate> for Entity {
    fn from(update: EntityUpdate) -> Self {
        Entity {
            id: update.id,
            position: update.position,
            label: update.label,
            metadata: update.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_rejects_non_finite() {
        assert!(GeoPoint::checked(f64::NAN, 1.0).is_err());
        assert!(GeoPoint::checked(1.0, f64::INFINITY).is_err());

        // Out of range but finite is stored as-is
        let p = GeoPoint::checked(123.0, -400.0).unwrap();
        assert_eq!(p, GeoPoint::new(123.0, -400.0));
    }

    #[test]
    fn test_distance() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_entity_id_accepts_number_or_string() {
        let from_int: EntityId = serde_json::from_str("12").unwrap();
        let from_text: EntityId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(from_int, from_text);
        assert_eq!(from_int.as_str(), "12");
    }

    #[test]
    fn test_entity_merge_keeps_unspecified_fields() {
        let mut entity: Entity = EntityUpdate::new("7", GeoPoint::new(1.0, 1.0))
            .with_label("KA-34")
            .with_metadata(EntityMetadata { eta_minutes: Some(5), ..Default::default() })
            .into();

        let update = EntityUpdate::new("7", GeoPoint::new(2.0, 2.0))
            .with_metadata(EntityMetadata { speed: Some(30.0), ..Default::default() });
        entity.merge(&update);

        assert_eq!(entity.position, GeoPoint::new(2.0, 2.0));
        assert_eq!(entity.label.as_deref(), Some("KA-34"));
        assert_eq!(entity.metadata.eta_minutes, Some(5));
        assert_eq!(entity.metadata.speed, Some(30.0));
    }
}
