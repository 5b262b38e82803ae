//! Naive arrival estimates for a stop
//!
//! Distance is the flat lat/lng hypotenuse scaled by a fixed kilometres-per-
//! degree factor, divided by an assumed average speed. Good enough for an
//! arrivals list; not a routing engine.

use crate::core::{Entity, EntityId, GeoPoint};
use crate::utils::config::EtaConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A bus stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub position: GeoPoint,
}

impl Stop {
    pub fn new(name: impl Into<String>, position: GeoPoint) -> Self {
        Self { name: name.into(), position }
    }
}

/// One row of an arrivals board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub entity: EntityId,
    pub label: Option<String>,
    pub eta_minutes: u32,
}

/// Minutes from `from` to `to`, never less than one
pub fn estimate_eta_minutes(from: GeoPoint, to: GeoPoint, config: &EtaConfig) -> u32 {
    let distance_km = from.distance_to(&to) * config.km_per_degree;
    let minutes = (distance_km / config.average_speed_kmh * 60.0).round();
    if minutes.is_finite() && minutes > 1.0 {
        minutes.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

/// Soonest arrivals at `stop`, using the rendered position when known and
/// the raw registry position otherwise.
///
/// Ties keep registry order.
pub fn arrivals_for_stop(
    entities: &[Entity],
    rendered: &HashMap<EntityId, GeoPoint>,
    stop: &Stop,
    config: &EtaConfig,
) -> Vec<Arrival> {
    let mut board: Vec<Arrival> = entities
        .iter()
        .map(|entity| {
            let position = rendered.get(&entity.id).copied().unwrap_or(entity.position);
            Arrival {
                entity: entity.id.clone(),
                label: entity.label.clone(),
                eta_minutes: estimate_eta_minutes(position, stop.position, config),
            }
        })
        .collect();

    board.sort_by_key(|a| a.eta_minutes);
    board.truncate(config.max_arrivals);
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityUpdate;

    #[test]
    fn test_eta_formula() {
        let config = EtaConfig::default();
        // 0.1 degree ~ 11.1 km at 25 km/h ~ 26.6 min
        let eta = estimate_eta_minutes(GeoPoint::new(15.0, 76.0), GeoPoint::new(15.1, 76.0), &config);
        assert_eq!(eta, 27);
    }

    #[test]
    fn test_eta_never_below_one_minute() {
        let config = EtaConfig::default();
        let here = GeoPoint::new(15.15, 76.93);
        assert_eq!(estimate_eta_minutes(here, here, &config), 1);
    }

    #[test]
    fn test_board_sorted_truncated_and_prefers_rendered() {
        let config = EtaConfig { max_arrivals: 2, ..EtaConfig::default() };
        let stop = Stop::new("Royal circle", GeoPoint::new(15.1490, 76.9280));

        let entities: Vec<Entity> = vec![
            EntityUpdate::new("far", GeoPoint::new(15.30, 76.93)).into(),
            EntityUpdate::new("near", GeoPoint::new(15.16, 76.93)).into(),
            EntityUpdate::new("moved", GeoPoint::new(15.50, 76.93)).into(),
        ];
        let mut rendered = HashMap::new();
        // Rendered position wins over the stale raw one
        rendered.insert(EntityId::from("moved"), GeoPoint::new(15.1490, 76.9280));

        let board = arrivals_for_stop(&entities, &rendered, &stop, &config);
        let ids: Vec<&str> = board.iter().map(|a| a.entity.as_str()).collect();
        assert_eq!(ids, vec!["moved", "near"]);
        assert_eq!(board[0].eta_minutes, 1);
    }
}
