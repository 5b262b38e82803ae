//! Decoding of upstream push events and poll snapshots
//!
//! Push events arrive as server-sent-event frames whose data is a JSON
//! envelope `{"type": "position", "payload": {...}}`. Snapshots are a JSON
//! array of the same payload objects.

use crate::api::types::{TrackerError, TrackerResult};
use crate::core::{EntityId, EntityMetadata, EntityUpdate, GeoPoint, POLL_PLACEHOLDER_ETA_MINUTES};
use serde::{Deserialize, Serialize};

/// One vehicle report as sent by the upstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPayload {
    pub bus_id: EntityId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Push event envelope
#[derive(Debug, Clone, Deserialize)]
struct StreamEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Converts raw upstream text into entity updates
#[derive(Debug, Clone)]
pub struct FeedParser {
    strict_validation: bool,
}

impl FeedParser {
    /// Create a parser that skips individual bad snapshot items
    pub fn new() -> Self {
        Self { strict_validation: false }
    }

    /// Enable or disable strict validation.
    ///
    /// When strict, one malformed item rejects a whole snapshot.
    pub fn set_strict_validation(&mut self, strict: bool) {
        self.strict_validation = strict;
    }

    pub fn is_strict(&self) -> bool {
        self.strict_validation
    }

    /// Decode one push frame.
    ///
    /// Returns `Ok(None)` for frames that carry no position: SSE comments
    /// (`:ok`, `:keepalive`), blank frames and other event types.
    pub fn parse_stream_frame(&self, frame: &str) -> TrackerResult<Option<EntityUpdate>> {
        let frame = frame.trim();
        if frame.is_empty() || frame.starts_with(':') {
            return Ok(None);
        }
        let data = frame.strip_prefix("data:").map(str::trim_start).unwrap_or(frame);

        let envelope: StreamEnvelope = serde_json::from_str(data).map_err(|e| TrackerError::Decode {
            details: format!("stream envelope: {}", e),
        })?;
        if envelope.kind != "position" {
            return Ok(None);
        }

        let payload = envelope.payload.ok_or_else(|| TrackerError::Decode {
            details: "position event without payload".to_string(),
        })?;
        let payload: PositionPayload =
            serde_json::from_value(payload).map_err(|e| TrackerError::Decode {
                details: format!("position payload: {}", e),
            })?;

        payload.into_update(None).map(Some)
    }

    /// Decode a snapshot body into updates, in snapshot order.
    ///
    /// Each item receives the placeholder ETA used by the list view.
    pub fn parse_snapshot(&self, body: &str) -> TrackerResult<Vec<EntityUpdate>> {
        if body.trim().is_empty() {
            return Err(TrackerError::Decode { details: "empty snapshot body".to_string() });
        }

        let items: Vec<serde_json::Value> =
            serde_json::from_str(body).map_err(|e| TrackerError::Decode {
                details: format!("snapshot: {}", e),
            })?;

        let mut updates = Vec::with_capacity(items.len());
        for item in items {
            let decoded = serde_json::from_value::<PositionPayload>(item)
                .map_err(|e| TrackerError::Decode { details: format!("snapshot item: {}", e) })
                .and_then(|p| p.into_update(Some(POLL_PLACEHOLDER_ETA_MINUTES)));

            match decoded {
                Ok(update) => updates.push(update),
                Err(e) if self.strict_validation => return Err(e),
                Err(e) => tracing::debug!(error = %e, "skipping snapshot item"),
            }
        }
        Ok(updates)
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionPayload {
    /// Validate coordinates and build an update labelled with the bus id
    pub fn into_update(self, eta_minutes: Option<u32>) -> TrackerResult<EntityUpdate> {
        let position = GeoPoint::checked(self.latitude, self.longitude)?;
        let label = self.bus_id.to_string();
        Ok(EntityUpdate::new(self.bus_id, position)
            .with_label(label)
            .with_metadata(EntityMetadata {
                eta_minutes,
                heading: self.heading,
                speed: self.speed,
                source_timestamp: self.timestamp,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_frame() {
        let parser = FeedParser::new();
        let frame = r#"data: {"type":"position","payload":{"bus_id":12,"latitude":17.385,"longitude":78.486,"heading":90.0,"speed":null,"timestamp":1700000000.5}}"#;

        let update = parser.parse_stream_frame(frame).unwrap().unwrap();
        assert_eq!(update.id, EntityId::from("12"));
        assert_eq!(update.position, GeoPoint::new(17.385, 78.486));
        assert_eq!(update.label.as_deref(), Some("12"));
        assert_eq!(update.metadata.heading, Some(90.0));
        assert_eq!(update.metadata.speed, None);
        assert_eq!(update.metadata.source_timestamp, Some(1700000000.5));
        assert_eq!(update.metadata.eta_minutes, None);
    }

    #[test]
    fn test_bare_json_frame_accepted() {
        let parser = FeedParser::new();
        let frame = r#"{"type":"position","payload":{"bus_id":"KA-01","latitude":1.0,"longitude":2.0}}"#;
        let update = parser.parse_stream_frame(frame).unwrap().unwrap();
        assert_eq!(update.id.as_str(), "KA-01");
    }

    #[test]
    fn test_comments_and_other_types_ignored() {
        let parser = FeedParser::new();
        assert_eq!(parser.parse_stream_frame(":ok").unwrap(), None);
        assert_eq!(parser.parse_stream_frame(":keepalive 1700000000").unwrap(), None);
        assert_eq!(parser.parse_stream_frame("   ").unwrap(), None);
        assert_eq!(parser.parse_stream_frame(r#"data: {"type":"heartbeat"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_frame_is_decode_error() {
        let parser = FeedParser::new();
        assert!(matches!(parser.parse_stream_frame("data: {oops"), Err(TrackerError::Decode { .. })));
        assert!(matches!(
            parser.parse_stream_frame(r#"{"type":"position"}"#),
            Err(TrackerError::Decode { .. })
        ));
        assert!(matches!(
            parser.parse_stream_frame(r#"{"type":"position","payload":{"bus_id":1,"latitude":"x","longitude":2}}"#),
            Err(TrackerError::Decode { .. })
        ));
    }

    #[test]
    fn test_snapshot_sets_placeholder_eta_and_keeps_order() {
        let parser = FeedParser::new();
        let body = r#"[
            {"bus_id": 2, "latitude": 2.0, "longitude": 2.0},
            {"bus_id": 1, "latitude": 1.0, "longitude": 1.0}
        ]"#;
        let updates = parser.parse_snapshot(body).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].id.as_str(), "2");
        assert_eq!(updates[1].metadata.eta_minutes, Some(5));
    }

    #[test]
    fn test_snapshot_bad_item_skipped_unless_strict() {
        let body = r#"[
            {"bus_id": 1, "latitude": 1.0, "longitude": 1.0},
            {"bus_id": 2, "latitude": "north"}
        ]"#;

        let lenient = FeedParser::new();
        assert_eq!(lenient.parse_snapshot(body).unwrap().len(), 1);

        let mut strict = FeedParser::new();
        strict.set_strict_validation(true);
        assert!(strict.parse_snapshot(body).is_err());
    }

    #[test]
    fn test_empty_snapshot_body_rejected() {
        let parser = FeedParser::new();
        assert!(parser.parse_snapshot("").is_err());
        assert_eq!(parser.parse_snapshot("[]").unwrap().len(), 0);
    }

    #[test]
    fn test_non_finite_payload_rejected() {
        let payload = PositionPayload {
            bus_id: "1".into(),
            latitude: f64::NAN,
            longitude: 0.0,
            heading: None,
            speed: None,
            timestamp: None,
        };
        assert!(matches!(
            payload.into_update(None),
            Err(TrackerError::NonFinitePosition { .. })
        ));
    }
}
