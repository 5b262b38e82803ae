//! Pre-authored demo tracks for simulated playback
//!
//! A hand-made road-like loop between SP circle and Royal circle (Bellary).
//! Points are dense so interpolated playback looks continuous.

use crate::core::GeoPoint;

/// Name of the track used when a vehicle has no dedicated one
pub const DEFAULT_TRACK: &str = "default";

const SP_CIRCLE_LOOP: [GeoPoint; 30] = [
    // SP circle
    GeoPoint::new(15.1510, 76.9300),
    GeoPoint::new(15.1508, 76.9298),
    GeoPoint::new(15.1506, 76.9296),
    GeoPoint::new(15.1504, 76.9294),
    GeoPoint::new(15.1502, 76.9292),
    GeoPoint::new(15.1500, 76.9290),
    GeoPoint::new(15.1498, 76.9288),
    GeoPoint::new(15.1496, 76.9286),
    GeoPoint::new(15.1494, 76.9284),
    GeoPoint::new(15.1492, 76.9282),
    // Royal circle
    GeoPoint::new(15.1490, 76.9280),
    GeoPoint::new(15.1489, 76.9278),
    GeoPoint::new(15.1488, 76.9276),
    GeoPoint::new(15.1487, 76.9274),
    GeoPoint::new(15.1486, 76.9272),
    GeoPoint::new(15.1486, 76.9270),
    // back toward SP circle on a parallel road
    GeoPoint::new(15.1490, 76.9276),
    GeoPoint::new(15.1494, 76.9280),
    GeoPoint::new(15.1498, 76.9284),
    GeoPoint::new(15.1502, 76.9288),
    GeoPoint::new(15.1506, 76.9292),
    GeoPoint::new(15.1509, 76.9296),
    GeoPoint::new(15.1511, 76.9299),
    GeoPoint::new(15.1510, 76.9300),
    // small loop
    GeoPoint::new(15.1512, 76.9303),
    GeoPoint::new(15.1514, 76.9306),
    GeoPoint::new(15.1516, 76.9305),
    GeoPoint::new(15.1515, 76.9302),
    GeoPoint::new(15.1513, 76.9301),
    GeoPoint::new(15.1510, 76.9300),
];

/// Index of the Royal circle stop within the loop
const ROYAL_CIRCLE_INDEX: usize = 10;

/// Names of every built-in track
pub fn demo_track_names() -> &'static [&'static str] {
    &[DEFAULT_TRACK, "royal-express"]
}

/// Look up a built-in track by name, falling back to the default loop
pub fn demo_track(name: &str) -> Vec<GeoPoint> {
    match name {
        "royal-express" => SP_CIRCLE_LOOP[..=ROYAL_CIRCLE_INDEX].to_vec(),
        _ => SP_CIRCLE_LOOP.to_vec(),
    }
}
