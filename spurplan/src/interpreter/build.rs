//! Turns closed contexts into track-graph mutations: splicing sequences,
//! applying anchors, registering marks and wiring turnout branches.

use std::mem;

use crate::errors::{Error, ErrorCode, Location};
use crate::model::geometry::{normalize_angle, TrackLocation, Vec3};
use crate::model::tracks::{ConnRef, TrackRef};

use super::Interpreter;
use super::context::{BranchKind, Context, Element};

/// `Some` when the branch slot is filled; the inner pair is the branch
/// sequence's open entry and exit.
type BranchEnds = Option<(Option<ConnRef>, Option<ConnRef>)>;

impl<'a> Interpreter<'a> {
    /// Closing is idempotent; bare turnouts are closed when they are
    /// processed, block headers when their body ends.
    pub(crate) fn close_context(&mut self, idx: usize) -> Result<(), Error> {
        match self.contexts[idx] {
            Context::Tracks(ref tc) if !tc.closed => self.close_tracks(idx),
            Context::Turnout(ref t) if !t.closed => self.close_turnout(idx),
            _ => Ok(()),
        }
    }

    /// Splices the collected elements in order: tracks chain exit-to-entry,
    /// anchors bind to the neighboring track, marks name (or join) open
    /// connections. The open ends are left in the context for the parent.
    fn close_tracks(&mut self, idx: usize) -> Result<(), Error> {
        let elements = match self.contexts[idx] {
            Context::Tracks(ref mut tc) => {
                tc.closed = true;
                mem::replace(&mut tc.elements, Vec::new())
            }
            _ => return Ok(()),
        };
        let mut first: Option<ConnRef> = None;
        let mut last: Option<ConnRef> = None;
        let mut pending_anchor: Option<(Vec3, f64, Location)> = None;
        let mut pending_marks: Vec<(String, Location)> = Vec::new();
        for element in elements {
            match element {
                Element::Track(track, location) => {
                    let entry = self.system.first_connection(track);
                    if let Some((pos, angle, aloc)) = pending_anchor.take() {
                        self.anchor_track(track, entry.point, pos, angle, aloc);
                    }
                    for (name, mloc) in pending_marks.drain(..) {
                        self.attach_mark(entry, &name, mloc)?;
                    }
                    if let Some(prev) = last {
                        if self.system.connect(prev, entry).is_err() {
                            return Err(self.log.log(ErrorCode::TrackConnectedTwice, location));
                        }
                    } else if first.is_none() {
                        first = Some(entry);
                    }
                    last = Some(self.system.second_connection(track));
                }
                Element::Sequence { first: sub_first, last: sub_last, location } => {
                    if let Some(entry) = sub_first {
                        if let Some((pos, angle, aloc)) = pending_anchor.take() {
                            self.anchor_track(entry.track, entry.point, pos, angle, aloc);
                        }
                        for (name, mloc) in pending_marks.drain(..) {
                            self.attach_mark(entry, &name, mloc)?;
                        }
                        if let Some(prev) = last {
                            if self.system.connect(prev, entry).is_err() {
                                return Err(self.log.log(ErrorCode::TrackConnectedTwice,
                                                        location));
                            }
                        } else if first.is_none() {
                            first = Some(entry);
                        }
                    }
                    if let Some(exit) = sub_last {
                        last = Some(exit);
                    }
                }
                Element::Anchor(pos, angle, location) => match last {
                    // A trailing anchor positions the previous track by its
                    // exit; the angle still describes the travel direction,
                    // so it is turned around before matching the entry
                    // heading of the connection point.
                    Some(c) => {
                        self.anchor_track(c.track, c.point, pos,
                                          normalize_angle(angle + 180.0), location);
                    }
                    None => pending_anchor = Some((pos, angle, location)),
                },
                Element::Mark(name, location) => match last {
                    Some(c) => self.attach_mark(c, &name, location)?,
                    None => pending_marks.push((name, location)),
                },
            }
        }
        if let Context::Tracks(ref mut tc) = self.contexts[idx] {
            tc.first = first;
            tc.last = last;
        }
        Ok(())
    }

    fn anchor_track(&mut self, track: TrackRef, point: usize, pos: Vec3,
                    angle: f64, location: Location) {
        let geo = self.system.track(track).geometry.clone();
        let loc = TrackLocation::at_connection(&geo.connection_points[point], pos, angle);
        if self.system.set_location(track, loc) {
            self.anchored.push(track);
        } else {
            self.log.log(ErrorCode::TrackPositionedTwice, location);
        }
    }

    /// Registers a mark name at a connection. A name seen a second time on
    /// two open connections joins them instead, which is how independently
    /// written sequences splice.
    pub(crate) fn attach_mark(&mut self, c: ConnRef, name: &str,
                              location: Location) -> Result<(), Error> {
        if name.is_empty() {
            self.system.add_mark_at(c, "").ok();
            return Ok(());
        }
        let existing = self.system.mark(name).and_then(|m| m.connection);
        if let Some(mc) = existing {
            if mc == c {
                return Ok(());
            }
            if self.system.connect(mc, c).is_err() {
                return Err(self.log.log(
                    ErrorCode::TrackMarkDefinedTwice(name.to_string()), location));
            }
            return Ok(());
        }
        if self.system.add_mark_at(c, name).is_err() {
            return Err(self.log.log(
                ErrorCode::TrackMarkDefinedTwice(name.to_string()), location));
        }
        Ok(())
    }

    fn close_turnout(&mut self, idx: usize) -> Result<(), Error> {
        let (track, branches, location) = match self.contexts[idx] {
            Context::Turnout(ref mut t) => {
                t.closed = true;
                (t.track, t.branches, t.location)
            }
            _ => return Ok(()),
        };
        let left = self.branch_ends(branches[BranchKind::Left as usize]);
        let right = self.branch_ends(branches[BranchKind::Right as usize]);
        let straight = self.branch_ends(branches[BranchKind::Straight as usize]);
        let backleft = self.branch_ends(branches[BranchKind::BackLeft as usize]);
        let backright = self.branch_ends(branches[BranchKind::BackRight as usize]);
        let backstraight = self.branch_ends(branches[BranchKind::BackStraight as usize]);
        let geo = self.system.track(track).geometry.clone();
        match (geo.incoming_count, geo.outgoing_count) {
            (1, 2) => self.wire_ordinary(track, left, right, straight,
                                         backleft, backright, backstraight, location),
            (2, 2) => self.wire_crossing(track, geo.turnout_options.len(),
                                         left, right, straight,
                                         backleft, backright, backstraight, location),
            (1, 3) => self.wire_three_way(track, left, right, straight,
                                          backleft, backright, backstraight, location),
            _ => Err(self.log.log(
                ErrorCode::Internal(format!("track {} cannot take branches", geo.name)),
                location)),
        }
    }

    fn branch_ends(&self, idx: Option<usize>) -> BranchEnds {
        idx.map(|i| match self.contexts[i] {
            Context::Tracks(ref tc) => (tc.first, tc.last),
            _ => (None, None),
        })
    }

    /// Ordinary turnout, one incoming and two outgoing points. The single
    /// branch occupies one outgoing point; the chain continues through the
    /// remaining free one, so the selected option is found by its `to`
    /// point rather than by the branch side.
    fn wire_ordinary(&mut self, track: TrackRef,
                     left: BranchEnds, right: BranchEnds, straight: BranchEnds,
                     backleft: BranchEnds, backright: BranchEnds,
                     backstraight: BranchEnds, location: Location) -> Result<(), Error> {
        if straight.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("straight"), location));
        }
        if backstraight.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("backstraight"), location));
        }
        let count = [&left, &right, &backleft, &backright]
            .iter().filter(|b| b.is_some()).count();
        if count > 1 {
            return Err(self.log.log(ErrorCode::NoFreeTurnoutConnection, location));
        }
        let through;
        if let Some((entry, _)) = left {
            self.connect_branch(entry, track, 1, location)?;
            through = 2;
        } else if let Some((entry, _)) = right {
            self.connect_branch(entry, track, 2, location)?;
            through = 1;
        } else if let Some((_, exit)) = backright {
            // The chain passes the turnout backwards, entering through the
            // free outgoing point and leaving through point 0.
            self.system.track_mut(track).reverse();
            self.connect_branch(exit, track, 1, location)?;
            through = 2;
        } else if let Some((_, exit)) = backleft {
            self.system.track_mut(track).reverse();
            self.connect_branch(exit, track, 2, location)?;
            through = 1;
        } else {
            // No branches: keep the default through path.
            return Ok(());
        }
        self.select_option(track, 0, through, location)
    }

    /// Crossings and double slips, two incoming and two outgoing points.
    /// Forward branches occupy outgoing points, back branches feed the
    /// incoming ones; the chain runs through the two free corners.
    fn wire_crossing(&mut self, track: TrackRef, options: usize,
                     left: BranchEnds, right: BranchEnds, straight: BranchEnds,
                     backleft: BranchEnds, backright: BranchEnds,
                     backstraight: BranchEnds, location: Location) -> Result<(), Error> {
        if straight.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("straight"), location));
        }
        if backstraight.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("backstraight"), location));
        }
        if let Some((entry, _)) = left {
            self.connect_branch(entry, track, 2, location)?;
        }
        if let Some((entry, _)) = right {
            self.connect_branch(entry, track, 3, location)?;
        }
        if let Some((_, exit)) = backright {
            self.connect_branch(exit, track, 0, location)?;
        }
        if let Some((_, exit)) = backleft {
            self.connect_branch(exit, track, 1, location)?;
        }
        if options == 4 {
            // A double slip can route any free incoming point to any free
            // outgoing one.
            let from = if backright.is_none() {
                0
            } else if backleft.is_none() {
                1
            } else {
                return Err(self.log.log(ErrorCode::NoFreeTurnoutConnection, location));
            };
            let to = if left.is_none() {
                2
            } else if right.is_none() {
                3
            } else {
                return Err(self.log.log(ErrorCode::NoFreeTurnoutConnection, location));
            };
            return self.select_option(track, from, to, location);
        }
        // A plain crossing only connects opposite corners; both ends of the
        // unused diagonal may carry branches.
        if backright.is_none() && left.is_none() {
            self.select_option(track, 0, 2, location)
        } else if backleft.is_none() && right.is_none() {
            self.select_option(track, 1, 3, location)
        } else {
            Err(self.log.log(ErrorCode::NoFreeTurnoutConnection, location))
        }
    }

    /// Three-way turnout, one incoming and three outgoing points. Only
    /// forward branches make sense here; the chain takes the lowest free
    /// outgoing point.
    fn wire_three_way(&mut self, track: TrackRef,
                      left: BranchEnds, right: BranchEnds, straight: BranchEnds,
                      backleft: BranchEnds, backright: BranchEnds,
                      backstraight: BranchEnds, location: Location) -> Result<(), Error> {
        if backleft.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("backleft"), location));
        }
        if backright.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("backright"), location));
        }
        if backstraight.is_some() {
            return Err(self.log.log(ErrorCode::IllegalTurnoutBranch("backstraight"), location));
        }
        let mut used = [false; 4];
        if let Some((entry, _)) = left {
            self.connect_branch(entry, track, 1, location)?;
            used[1] = true;
        }
        if let Some((entry, _)) = straight {
            self.connect_branch(entry, track, 2, location)?;
            used[2] = true;
        }
        if let Some((entry, _)) = right {
            self.connect_branch(entry, track, 3, location)?;
            used[3] = true;
        }
        match (1..4).find(|&p| !used[p]) {
            Some(free) => self.select_option(track, 0, free, location),
            None => Err(self.log.log(ErrorCode::NoFreeTurnoutConnection, location)),
        }
    }

    fn connect_branch(&mut self, end: Option<ConnRef>, track: TrackRef,
                      point: usize, location: Location) -> Result<(), Error> {
        let end = match end {
            Some(end) => end,
            // An empty branch block still reserves the point.
            None => return Ok(()),
        };
        let p = ConnRef { track: track, point: point };
        if self.system.connect(end, p).is_err() {
            return Err(self.log.log(ErrorCode::TrackConnectedTwice, location));
        }
        Ok(())
    }

    fn select_option(&mut self, track: TrackRef, from: usize, to: usize,
                     location: Location) -> Result<(), Error> {
        let geo = self.system.track(track).geometry.clone();
        match geo.turnout_options.iter().position(|o| o.from == from && o.to == to) {
            Some(i) => {
                self.system.track_mut(track).selected_option = i;
                Ok(())
            }
            None => Err(self.log.log(
                ErrorCode::Internal(format!("no option {} to {} on {}", from, to, geo.name)),
                location)),
        }
    }
}
