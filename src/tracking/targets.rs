//! Most recently asserted position per vehicle

use crate::core::{EntityId, GeoPoint};
use crate::utils::config::UpdateOrdering;
use std::collections::HashMap;

/// Stored convergence target
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetEntry {
    pub position: GeoPoint,
    /// Upstream timestamp of the write, when the source provided one
    pub source_timestamp: Option<f64>,
}

/// Outcome of a target write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetWrite {
    /// First target ever recorded for this vehicle
    Created,
    /// Previous target overwritten
    Replaced,
    /// Refused: older than the stored write (timestamp ordering only)
    Stale,
}

impl TargetWrite {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, TargetWrite::Stale)
    }
}

/// Map of vehicle to current convergence target
#[derive(Debug, Default, Clone)]
pub struct TargetStore {
    targets: HashMap<EntityId, TargetEntry>,
    ordering: UpdateOrdering,
}

impl TargetStore {
    pub fn new(ordering: UpdateOrdering) -> Self {
        Self { targets: HashMap::new(), ordering }
    }

    pub fn ordering(&self) -> UpdateOrdering {
        self.ordering
    }

    pub fn set_ordering(&mut self, ordering: UpdateOrdering) {
        self.ordering = ordering;
    }

    /// Record `position` as the target for `id`.
    ///
    /// With [`UpdateOrdering::LastWriteWins`] this always overwrites. With
    /// [`UpdateOrdering::NewestTimestampWins`] a write is refused only when both
    /// it and the stored entry carry timestamps and it is strictly older.
    pub fn assert_target(
        &mut self,
        id: &EntityId,
        position: GeoPoint,
        source_timestamp: Option<f64>,
    ) -> TargetWrite {
        let entry = TargetEntry { position, source_timestamp };
        match self.targets.get_mut(id) {
            None => {
                self.targets.insert(id.clone(), entry);
                TargetWrite::Created
            }
            Some(existing) => {
                if self.ordering == UpdateOrdering::NewestTimestampWins {
                    if let (Some(stored), Some(incoming)) =
                        (existing.source_timestamp, source_timestamp)
                    {
                        if incoming < stored {
                            return TargetWrite::Stale;
                        }
                    }
                }
                *existing = entry;
                TargetWrite::Replaced
            }
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<GeoPoint> {
        self.targets.get(id).map(|e| e.position)
    }

    /// Owned copy of every target, safe to hold across later writes
    pub fn all_targets(&self) -> HashMap<EntityId, GeoPoint> {
        self.targets.iter().map(|(id, e)| (id.clone(), e.position)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, GeoPoint)> {
        self.targets.iter().map(|(id, e)| (id, e.position))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut store = TargetStore::new(UpdateOrdering::LastWriteWins);
        let id = EntityId::from("12");

        assert_eq!(store.assert_target(&id, GeoPoint::new(1.0, 1.0), Some(100.0)), TargetWrite::Created);
        // Older timestamp still wins in the default mode
        assert_eq!(store.assert_target(&id, GeoPoint::new(2.0, 2.0), Some(50.0)), TargetWrite::Replaced);
        assert_eq!(store.get(&id), Some(GeoPoint::new(2.0, 2.0)));
    }

    #[test]
    fn test_newest_timestamp_wins_rejects_older() {
        let mut store = TargetStore::new(UpdateOrdering::NewestTimestampWins);
        let id = EntityId::from("12");

        store.assert_target(&id, GeoPoint::new(1.0, 1.0), Some(100.0));
        assert_eq!(store.assert_target(&id, GeoPoint::new(2.0, 2.0), Some(50.0)), TargetWrite::Stale);
        assert_eq!(store.get(&id), Some(GeoPoint::new(1.0, 1.0)));

        // Untimestamped writes are not comparable and are applied
        assert_eq!(store.assert_target(&id, GeoPoint::new(3.0, 3.0), None), TargetWrite::Replaced);
        // Equal timestamps are applied in arrival order
        store.assert_target(&id, GeoPoint::new(4.0, 4.0), Some(200.0));
        assert!(store.assert_target(&id, GeoPoint::new(5.0, 5.0), Some(200.0)).is_accepted());
        assert_eq!(store.get(&id), Some(GeoPoint::new(5.0, 5.0)));
    }

    #[test]
    fn test_all_targets_is_a_detached_snapshot() {
        let mut store = TargetStore::default();
        let id = EntityId::from("a");
        store.assert_target(&id, GeoPoint::new(1.0, 1.0), None);

        let snapshot = store.all_targets();
        store.assert_target(&id, GeoPoint::new(9.0, 9.0), None);

        assert_eq!(snapshot.get(&id), Some(&GeoPoint::new(1.0, 1.0)));
        assert_eq!(store.get(&id), Some(GeoPoint::new(9.0, 9.0)));
    }
}
