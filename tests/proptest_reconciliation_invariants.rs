//! Property-based invariant tests for position reconciliation.
//!
//! 1. A single vehicle converges exactly onto its target within the
//!    geometric frame bound
//! 2. Each frame moves strictly toward the target and never past it
//! 3. Any interleaving of writes and frames ends with every marker on its target
//! 4. Re-asserting converged targets schedules nothing
//! 5. Track playback asserts every point once and completes once, however
//!    the clock is advanced
//! 6. Timestamp-ordered mode keeps the newest report regardless of arrival order

use busline_tracker::core::EntityMetadata;
use busline_tracker::{
    EntityId, EntityUpdate, GeoPoint, TrackerConfig, TrackingEngine, UpdateOrdering,
};
use proptest::prelude::*;
use std::time::Duration;

const EPSILON: f64 = 0.00001;

// ── Strategies ──────────────────────────────────────────────────────────

fn point_strategy() -> impl Strategy<Value = GeoPoint> {
    (14.0f64..16.0, 76.0f64..78.0).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
}

fn fraction_strategy() -> impl Strategy<Value = f64> {
    0.05f64..0.95
}

#[derive(Debug, Clone)]
enum Op {
    Write(u8, GeoPoint),
    Frame,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..5, point_strategy()).prop_map(|(id, p)| Op::Write(id, p)),
        Just(Op::Frame),
    ]
}

fn engine_with(fraction: f64) -> TrackingEngine {
    let config = TrackerConfig {
        convergence_fraction: fraction,
        convergence_epsilon: EPSILON,
        ..TrackerConfig::default()
    };
    TrackingEngine::new(config).unwrap()
}

fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    a.distance_to(&b)
}

/// Frames needed to close `d` down to epsilon, plus the final snap frame
fn frame_bound(d: f64, fraction: f64) -> usize {
    if d <= EPSILON {
        return 1;
    }
    let moving = ((EPSILON / d).ln() / (1.0 - fraction).ln()).ceil() as usize;
    moving + 1
}

// ═══════════════════════════════════════════════════════════════════════
// 1-2. Convergence and monotonic approach
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn converges_exactly_within_bound(
        start in point_strategy(),
        target in point_strategy(),
        fraction in fraction_strategy(),
    ) {
        let mut engine = engine_with(fraction);
        let id = EntityId::from("bus");
        engine.assert_target(&id, start).unwrap();
        engine.assert_target(&id, target).unwrap();

        let bound = frame_bound(distance(start, target), fraction) + 2;
        let mut frames = 0;
        while engine.wants_frame() {
            engine.on_animation_frame();
            frames += 1;
            prop_assert!(frames <= bound, "{} frames exceeds bound {}", frames, bound);
        }
        prop_assert_eq!(engine.rendered_position(&id), Some(target));
    }

    #[test]
    fn every_frame_approaches_without_overshoot(
        start in point_strategy(),
        target in point_strategy(),
        fraction in fraction_strategy(),
    ) {
        let mut engine = engine_with(fraction);
        let id = EntityId::from("bus");
        engine.assert_target(&id, start).unwrap();
        engine.assert_target(&id, target).unwrap();

        let total = distance(start, target);
        let mut previous = total;
        while engine.wants_frame() {
            engine.on_animation_frame();
            let rendered = engine.rendered_position(&id).unwrap();
            let remaining = distance(rendered, target);
            prop_assert!(remaining <= previous);
            // Still on the segment between start and target
            prop_assert!((distance(start, rendered) + remaining - total).abs() < 1e-9);
            previous = remaining;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3-4. Arbitrary interleavings settle; idempotent re-assertion
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn interleaved_writes_settle_on_targets(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut engine = engine_with(0.25);
        for op in &ops {
            match op {
                Op::Write(id, p) => {
                    engine.assert_target(&EntityId::from(id.to_string()), *p).unwrap();
                }
                Op::Frame => {
                    engine.on_animation_frame();
                }
            }
        }

        let mut frames = 0;
        while engine.wants_frame() {
            engine.on_animation_frame();
            frames += 1;
            prop_assert!(frames < 500);
        }

        let rendered = engine.rendered_positions();
        for (id, target) in engine.all_targets() {
            prop_assert_eq!(rendered.get(&id).copied(), Some(target));
        }
    }

    #[test]
    fn reasserting_converged_targets_is_idle(points in proptest::collection::vec(point_strategy(), 1..8)) {
        let mut engine = engine_with(0.5);
        for (i, p) in points.iter().enumerate() {
            engine.assert_target(&EntityId::from(i.to_string()), GeoPoint::new(0.0, 0.0)).unwrap();
            engine.assert_target(&EntityId::from(i.to_string()), *p).unwrap();
        }
        while engine.wants_frame() {
            engine.on_animation_frame();
        }

        for (id, target) in engine.all_targets() {
            engine.assert_target(&id, target).unwrap();
        }
        prop_assert!(!engine.wants_frame());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 5. Track playback
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn track_asserts_each_point_and_completes_once(
        path in proptest::collection::vec(point_strategy(), 1..20),
        steps in proptest::collection::vec(1u64..400, 1..200),
    ) {
        let tick = 100u64;
        let config = TrackerConfig { track_tick_interval_ms: tick, ..TrackerConfig::default() };
        let mut engine = TrackingEngine::new(config).unwrap();
        let id = EntityId::from("sim");
        let n = path.len() as u64;

        engine.start_track(&id, path.clone(), Duration::ZERO).unwrap();

        let mut now = 0u64;
        for step in steps {
            now += step;
            engine.advance(Duration::from_millis(now));
            let completed = engine.stats().tracks_completed;
            if now < n * tick {
                prop_assert_eq!(completed, 0);
                let played = (now / tick + 1).min(n);
                prop_assert_eq!(engine.stats().targets_accepted, played);
            } else {
                prop_assert_eq!(completed, 1);
            }
        }

        engine.advance(Duration::from_millis(now + n * tick + 1));
        prop_assert_eq!(engine.stats().targets_accepted, n);
        prop_assert_eq!(engine.stats().tracks_completed, 1);
        prop_assert_eq!(engine.active_timer_count(), 0);
        prop_assert_eq!(engine.target(&id), path.last().copied());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 6. Timestamp ordering
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn newest_timestamp_wins_in_ordered_mode(
        reports in proptest::collection::vec((0u16..50, point_strategy()), 1..30),
    ) {
        let config = TrackerConfig {
            update_ordering: UpdateOrdering::NewestTimestampWins,
            ..TrackerConfig::default()
        };
        let mut engine = TrackingEngine::new(config).unwrap();
        let id = EntityId::from("ordered");

        for (ts, p) in &reports {
            let update = EntityUpdate::new(id.clone(), *p).with_metadata(EntityMetadata {
                source_timestamp: Some(*ts as f64),
                ..EntityMetadata::default()
            });
            engine.apply_stream_update(update).unwrap();
        }

        let newest = reports.iter().map(|(ts, _)| *ts).max().unwrap();
        let expected = reports.iter().rev().find(|(ts, _)| *ts == newest).map(|(_, p)| *p);
        prop_assert_eq!(engine.target(&id), expected);
        prop_assert_eq!(engine.entity(&id).map(|e| e.position), expected);
    }
}
