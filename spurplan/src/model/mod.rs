pub mod catalog;
pub mod geometry;
pub mod tracks;

use self::geometry::Vec2;
use self::tracks::TrackSystem;

/// The baseboard a plan is built on, either a rectangle or a polygon.
#[derive(Debug,Clone,Default)]
pub struct GroundPlate {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub polygon: Vec<Vec2>,
}

/// Everything one interpretation pass produces. A reload throws the whole
/// plan away and builds a fresh one.
#[derive(Debug)]
pub struct Plan {
    pub tracks: TrackSystem,
    pub grounds: Vec<GroundPlate>,
}

impl Plan {
    pub fn new() -> Plan {
        Plan {
            tracks: TrackSystem::new(),
            grounds: Vec::new(),
        }
    }
}
