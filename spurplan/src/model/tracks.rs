//! The mutable track graph. Tracks live in per-layer arenas and are
//! addressed by index handles, so the connection graph may contain cycles
//! while ownership stays acyclic.

use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::errors::Location;
use super::geometry::{TrackGeometry, TrackLocation};

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash)]
pub struct LayerRef(pub usize);

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash)]
pub struct TrackRef {
    pub layer: LayerRef,
    pub index: usize,
}

/// One end (or branch) of a track.
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash)]
pub struct ConnRef {
    pub track: TrackRef,
    pub point: usize,
}

#[derive(Debug,Clone,Default)]
pub struct TrackConnection {
    /// Symmetric, non-owning. If `None`, the track ends here.
    pub opposite: Option<ConnRef>,
    /// Marks placed exactly at this point, as indices into the system's
    /// mark arena.
    pub marks: SmallVec<[usize; 1]>,
}

#[derive(Debug,Clone)]
pub struct Track {
    pub layer: LayerRef,
    pub id: u32,
    pub geometry: Rc<TrackGeometry>,
    pub source_location: Location,
    /// Set exactly once, by an anchor or by propagation.
    pub location: Option<TrackLocation>,
    pub selected_option: usize,
    pub marks: SmallVec<[usize; 2]>,
    connections: SmallVec<[TrackConnection; 4]>,
    reversed: bool,
    tag: u64,
}

impl Track {
    pub fn connection(&self, point: usize) -> &TrackConnection {
        &self.connections[point]
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn reverse(&mut self) {
        self.reversed = !self.reversed;
    }

    /// The point a chain enters this track through, honoring the selected
    /// turnout option and the reversed flag.
    pub fn first_point(&self) -> usize {
        let option = self.geometry.turnout_options[self.selected_option];
        if self.reversed { option.to } else { option.from }
    }

    /// The point a chain leaves this track through.
    pub fn second_point(&self) -> usize {
        let option = self.geometry.turnout_options[self.selected_option];
        if self.reversed { option.from } else { option.to }
    }
}

/// A named point on a track, either at a connection or at a fractional
/// position along the track. Named marks splice independently written
/// sequences; the empty name is anonymous and never registered.
#[derive(Debug,Clone)]
pub struct TrackMark {
    pub name: String,
    /// 0 = first connection point, 1 = second, values between are
    /// proportional positions. Only meaningful when `connection` is None.
    pub position: f32,
    pub track: TrackRef,
    pub connection: Option<ConnRef>,
}

#[derive(Debug)]
pub struct TrackLayer {
    pub name: String,
    pub color: String,
    pub tracks: Vec<Track>,
}

/// The whole plan being built. Also carries the build-session counters
/// (track ids, traversal epoch) so repeated builds never share state.
#[derive(Debug)]
pub struct TrackSystem {
    pub layers: Vec<TrackLayer>,
    layer_names: HashMap<String, LayerRef>,
    marks: Vec<TrackMark>,
    mark_names: HashMap<String, usize>,
    next_track_id: u32,
    epoch: u64,
}

impl TrackSystem {
    pub fn new() -> TrackSystem {
        let mut ts = TrackSystem {
            layers: Vec::new(),
            layer_names: HashMap::new(),
            marks: Vec::new(),
            mark_names: HashMap::new(),
            next_track_id: 0,
            epoch: 0,
        };
        // The default layer always exists.
        ts.add_layer("", "").ok();
        ts
    }

    pub fn add_layer(&mut self, name: &str, color: &str) -> Result<LayerRef, ()> {
        if self.layer_names.contains_key(name) {
            return Err(());
        }
        let r = LayerRef(self.layers.len());
        self.layers.push(TrackLayer {
            name: name.to_string(),
            color: color.to_string(),
            tracks: Vec::new(),
        });
        self.layer_names.insert(name.to_string(), r);
        Ok(r)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<LayerRef> {
        self.layer_names.get(name).cloned()
    }

    pub fn default_layer(&self) -> LayerRef {
        LayerRef(0)
    }

    pub fn layer(&self, r: LayerRef) -> &TrackLayer {
        &self.layers[r.0]
    }

    pub fn new_track(&mut self, layer: LayerRef, geometry: Rc<TrackGeometry>,
                     reversed: bool, source_location: Location) -> TrackRef {
        self.next_track_id += 1;
        let mut connections = SmallVec::new();
        for _ in 0..geometry.connection_count() {
            connections.push(TrackConnection::default());
        }
        let track = Track {
            layer: layer,
            id: self.next_track_id,
            geometry: geometry,
            source_location: source_location,
            location: None,
            selected_option: 0,
            marks: SmallVec::new(),
            connections: connections,
            reversed: reversed,
            tag: 0,
        };
        let index = self.layers[layer.0].tracks.len();
        self.layers[layer.0].tracks.push(track);
        TrackRef { layer: layer, index: index }
    }

    pub fn track(&self, r: TrackRef) -> &Track {
        &self.layers[r.layer.0].tracks[r.index]
    }

    pub fn track_mut(&mut self, r: TrackRef) -> &mut Track {
        &mut self.layers[r.layer.0].tracks[r.index]
    }

    pub fn connection(&self, c: ConnRef) -> &TrackConnection {
        self.track(c.track).connection(c.point)
    }

    pub fn is_connected(&self, c: ConnRef) -> bool {
        self.connection(c).opposite.is_some()
    }

    pub fn first_connection(&self, t: TrackRef) -> ConnRef {
        ConnRef { track: t, point: self.track(t).first_point() }
    }

    pub fn second_connection(&self, t: TrackRef) -> ConnRef {
        ConnRef { track: t, point: self.track(t).second_point() }
    }

    /// Joins two connections symmetrically. Re-connecting the same pair is
    /// a no-op; a different partner on either side is an error.
    pub fn connect(&mut self, a: ConnRef, b: ConnRef) -> Result<(), ()> {
        let a_opp = self.connection(a).opposite;
        if let Some(existing) = a_opp {
            return if existing == b { Ok(()) } else { Err(()) };
        }
        let b_opp = self.connection(b).opposite;
        if let Some(existing) = b_opp {
            return if existing == a { Ok(()) } else { Err(()) };
        }
        self.track_mut(a.track).connections[a.point].opposite = Some(b);
        self.track_mut(b.track).connections[b.point].opposite = Some(a);
        Ok(())
    }

    /// Returns false if a location has already been set; the old value is
    /// kept in that case.
    pub fn set_location(&mut self, t: TrackRef, location: TrackLocation) -> bool {
        let track = self.track_mut(t);
        if track.location.is_some() {
            return false;
        }
        track.location = Some(location);
        true
    }

    /// Starts a fresh traversal pass; all tags from earlier epochs become
    /// stale at once.
    pub fn new_epoch(&mut self) {
        self.epoch += 1;
    }

    pub fn tag(&mut self, t: TrackRef) {
        let epoch = self.epoch;
        self.track_mut(t).tag = epoch;
    }

    pub fn is_tagged(&self, t: TrackRef) -> bool {
        self.track(t).tag == self.epoch
    }

    /// Places a named mark at a connection. Fails if the name is taken.
    pub fn add_mark_at(&mut self, c: ConnRef, name: &str) -> Result<usize, ()> {
        if !name.is_empty() && self.mark_names.contains_key(name) {
            return Err(());
        }
        let index = self.marks.len();
        self.marks.push(TrackMark {
            name: name.to_string(),
            position: 0.0,
            track: c.track,
            connection: Some(c),
        });
        self.track_mut(c.track).connections[c.point].marks.push(index);
        self.track_mut(c.track).marks.push(index);
        if !name.is_empty() {
            self.mark_names.insert(name.to_string(), index);
        }
        Ok(index)
    }

    pub fn mark(&self, name: &str) -> Option<&TrackMark> {
        self.mark_names.get(name).map(|&i| &self.marks[i])
    }

    pub fn marks(&self) -> &[TrackMark] {
        &self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::Catalog;

    fn system_with_tracks(n: usize) -> (TrackSystem, Vec<TrackRef>) {
        let catalog = Catalog::standard();
        let geo = catalog.get("G1").unwrap().geometry.clone();
        let mut ts = TrackSystem::new();
        let layer = ts.default_layer();
        let tracks = (0..n)
            .map(|_| ts.new_track(layer, geo.clone(), false, Location::default()))
            .collect();
        (ts, tracks)
    }

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let (mut ts, t) = system_with_tracks(3);
        let a = ts.second_connection(t[0]);
        let b = ts.first_connection(t[1]);
        assert!(ts.connect(a, b).is_ok());
        assert_eq!(ts.connection(a).opposite, Some(b));
        assert_eq!(ts.connection(b).opposite, Some(a));
        // Same pair again: no-op.
        assert!(ts.connect(a, b).is_ok());
        assert!(ts.connect(b, a).is_ok());
        // A different partner is rejected.
        let c = ts.first_connection(t[2]);
        assert!(ts.connect(a, c).is_err());
        assert!(ts.connect(c, a).is_err());
        assert_eq!(ts.connection(a).opposite, Some(b));
    }

    #[test]
    fn location_is_set_once() {
        let (mut ts, t) = system_with_tracks(1);
        let geo = ts.track(t[0]).geometry.clone();
        let loc = crate::model::geometry::TrackLocation::at_connection(
            &geo.connection_points[0],
            crate::model::geometry::Vec3(1.0, 2.0, 0.0), 90.0);
        assert!(ts.set_location(t[0], loc));
        let other = crate::model::geometry::TrackLocation::at_connection(
            &geo.connection_points[0],
            crate::model::geometry::Vec3(9.0, 9.0, 0.0), 0.0);
        assert!(!ts.set_location(t[0], other));
        assert_eq!(ts.track(t[0]).location, Some(loc));
    }

    #[test]
    fn epoch_tags_expire() {
        let (mut ts, t) = system_with_tracks(1);
        ts.new_epoch();
        assert!(!ts.is_tagged(t[0]));
        ts.tag(t[0]);
        assert!(ts.is_tagged(t[0]));
        ts.new_epoch();
        assert!(!ts.is_tagged(t[0]));
    }

    #[test]
    fn mark_names_are_unique() {
        let (mut ts, t) = system_with_tracks(2);
        let a = ts.first_connection(t[0]);
        let b = ts.first_connection(t[1]);
        assert!(ts.add_mark_at(a, "A").is_ok());
        assert!(ts.add_mark_at(b, "A").is_err());
        // Anonymous marks never collide.
        assert!(ts.add_mark_at(a, "").is_ok());
        assert!(ts.add_mark_at(b, "").is_ok());
        assert_eq!(ts.mark("A").unwrap().connection, Some(a));
    }

    #[test]
    fn duplicate_layer_rejected() {
        let mut ts = TrackSystem::new();
        assert!(ts.add_layer("mountain", "#888").is_ok());
        assert!(ts.add_layer("mountain", "#999").is_err());
        assert!(ts.layer_by_name("mountain").is_some());
        assert!(ts.layer_by_name("").is_some());
    }

    #[test]
    fn reversed_track_swaps_first_and_second() {
        let (mut ts, t) = system_with_tracks(1);
        assert_eq!(ts.first_connection(t[0]).point, 0);
        assert_eq!(ts.second_connection(t[0]).point, 1);
        ts.track_mut(t[0]).reverse();
        assert_eq!(ts.first_connection(t[0]).point, 1);
        assert_eq!(ts.second_connection(t[0]).point, 0);
    }
}
