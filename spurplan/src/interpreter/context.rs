//! Evaluation contexts. A block body is processed with its context on top
//! of the evaluation stack; closing the context turns the collected
//! elements into model objects. Contexts live in an arena owned by the
//! interpreter so closed children stay readable for their parents.

use std::collections::HashMap;

use crate::errors::Location;
use crate::model::GroundPlate;
use crate::model::geometry::Vec3;
use crate::model::tracks::{ConnRef, LayerRef, TrackRef};

use super::value::Value;

/// The six branch slots a turnout block can fill. `back*` branches feed
/// into the turnout against the chain's travel direction.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum BranchKind {
    Left,
    Right,
    Straight,
    BackLeft,
    BackRight,
    BackStraight,
}

impl BranchKind {
    pub fn from_name(name: &str) -> Option<BranchKind> {
        match name {
            "left" => Some(BranchKind::Left),
            "right" => Some(BranchKind::Right),
            "straight" => Some(BranchKind::Straight),
            "backleft" => Some(BranchKind::BackLeft),
            "backright" => Some(BranchKind::BackRight),
            "backstraight" => Some(BranchKind::BackStraight),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BranchKind::Left => "left",
            BranchKind::Right => "right",
            BranchKind::Straight => "straight",
            BranchKind::BackLeft => "backleft",
            BranchKind::BackRight => "backright",
            BranchKind::BackStraight => "backstraight",
        }
    }
}

/// One item collected by a tracks body, spliced in order at close time.
#[derive(Debug)]
pub enum Element {
    Track(TrackRef, Location),
    /// A closed nested sequence, represented by its open ends.
    Sequence {
        first: Option<ConnRef>,
        last: Option<ConnRef>,
        location: Location,
    },
    /// A position given by `@(x, y, z, angle)`, applied to the previous
    /// track or stashed for the next one.
    Anchor(Vec3, f64, Location),
    Mark(String, Location),
}

#[derive(Debug)]
pub struct GroundContext {
    pub plate: GroundPlate,
    pub location: Location,
}

#[derive(Debug)]
pub struct LayerContext {
    pub name: String,
    pub color: String,
    pub location: Location,
}

#[derive(Debug)]
pub struct TracksContext {
    /// Target layer for new tracks; `layer("...")` switches it mid-body.
    pub layer: LayerRef,
    pub params: HashMap<String, Value>,
    /// Set when this sequence is a branch of an enclosing turnout block.
    pub branch: Option<BranchKind>,
    pub elements: Vec<Element>,
    /// Open ends after close, for splicing into the parent.
    pub first: Option<ConnRef>,
    pub last: Option<ConnRef>,
    pub closed: bool,
    pub location: Location,
}

impl TracksContext {
    pub fn new(layer: LayerRef, params: HashMap<String, Value>,
               location: Location) -> TracksContext {
        TracksContext {
            layer: layer,
            params: params,
            branch: None,
            elements: Vec::new(),
            first: None,
            last: None,
            closed: false,
            location: location,
        }
    }

    pub fn branch(layer: LayerRef, kind: BranchKind, location: Location) -> TracksContext {
        let mut tc = TracksContext::new(layer, HashMap::new(), location);
        tc.branch = Some(kind);
        tc
    }
}

#[derive(Debug)]
pub struct TurnoutContext {
    pub track: TrackRef,
    pub layer: LayerRef,
    /// Arena indices of closed branch sequences, indexed by `BranchKind`.
    pub branches: [Option<usize>; 6],
    pub closed: bool,
    pub location: Location,
}

impl TurnoutContext {
    pub fn new(track: TrackRef, layer: LayerRef, location: Location) -> TurnoutContext {
        TurnoutContext {
            track: track,
            layer: layer,
            branches: [None; 6],
            closed: false,
            location: location,
        }
    }
}

/// Plain values that travel as contexts so the processing dispatch stays
/// uniform.
#[derive(Debug)]
pub enum ValueContext {
    Track(TrackRef),
    Anchor(Vec3, f64),
}

#[derive(Debug)]
pub enum Context {
    Global,
    Ground(GroundContext),
    Layer(LayerContext),
    Tracks(TracksContext),
    Turnout(TurnoutContext),
    Value(ValueContext),
}
