//! The standard track-piece library. Geometries are built once at startup
//! and shared read-only between all tracks of the same type.
//!
//! Local coordinates: a piece sits with its entry point at the origin and
//! extends towards positive y at rotation 0. Connection point positions
//! point from the connection towards the track center; point 0 is the
//! incoming end, outgoing points follow clock-wise (the leftmost outgoing
//! path is point 1). Turnout option 0 is always the default through path.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::rc::Rc;

use smallvec::SmallVec;

use super::geometry::{GeometryPath, GeometryPoint, TrackGeometry, TurnoutOption, Vec2};

/// How to instantiate one named catalog entry. Left-hand curves reuse the
/// right-hand geometry with the connect order reversed.
#[derive(Debug,Clone)]
pub struct TrackFactory {
    pub geometry: Rc<TrackGeometry>,
    pub reversed: bool,
}

#[derive(Debug)]
pub struct Catalog {
    factories: HashMap<String, TrackFactory>,
}

fn point(angle: f64, x: f64, y: f64) -> GeometryPoint {
    GeometryPoint::new(angle, Vec2(x, y))
}

fn geometry(name: &str, paths: Vec<GeometryPath>, points: Vec<GeometryPoint>,
            options: Vec<TurnoutOption>, incoming: usize, outgoing: usize) -> Rc<TrackGeometry> {
    Rc::new(TrackGeometry {
        name: name.to_string(),
        paths: paths,
        connection_points: SmallVec::from_vec(points),
        turnout_options: SmallVec::from_vec(options),
        incoming_count: incoming,
        outgoing_count: outgoing,
    })
}

fn straight_geometry(name: &str, len: f64) -> Rc<TrackGeometry> {
    geometry(name,
             vec![GeometryPath::Line { size: len, anchor: point(0.0, 0.0, 0.0) }],
             vec![point(0.0, 0.0, 0.0), point(180.0, 0.0, -len)],
             vec![TurnoutOption { from: 0, to: 1 }],
             1, 1)
}

/// A curve bending to the right over `angle` degrees.
fn curve_geometry(name: &str, radius: f64, angle: f64) -> Rc<TrackGeometry> {
    let rad = angle * PI / 180.0;
    geometry(name,
             vec![GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(0.0, 0.0, 0.0) }],
             vec![point(0.0, 0.0, 0.0),
                  point(180.0 + angle,
                        radius * (1.0 - rad.cos()), -radius * rad.sin())],
             vec![TurnoutOption { from: 0, to: 1 }],
             1, 1)
}

/// Ordinary right-hand turnout: straight leg plus a curve diverging to the
/// right. The straight leg is the leftmost outgoing point.
fn turnout_right_geometry(name: &str, leg: f64, radius: f64, angle: f64) -> Rc<TrackGeometry> {
    let rad = angle * PI / 180.0;
    geometry(name,
             vec![GeometryPath::Line { size: leg, anchor: point(0.0, 0.0, 0.0) },
                  GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(0.0, 0.0, 0.0) }],
             vec![point(0.0, 0.0, 0.0),
                  point(180.0, 0.0, -leg),
                  point(180.0 + angle,
                        radius * (1.0 - rad.cos()), -radius * rad.sin())],
             vec![TurnoutOption { from: 0, to: 1 }, TurnoutOption { from: 0, to: 2 }],
             1, 2)
}

/// Ordinary left-hand turnout. The curve is the leftmost outgoing point;
/// left-hand arcs are drawn anchored at their far end, like the right-hand
/// arc they mirror.
fn turnout_left_geometry(name: &str, leg: f64, radius: f64, angle: f64) -> Rc<TrackGeometry> {
    let rad = angle * PI / 180.0;
    let dx = radius * (1.0 - rad.cos());
    let dy = radius * rad.sin();
    geometry(name,
             vec![GeometryPath::Line { size: leg, anchor: point(0.0, 0.0, 0.0) },
                  GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(180.0 - angle, dx, dy) }],
             vec![point(0.0, 0.0, 0.0),
                  point(180.0 - angle, -dx, -dy),
                  point(180.0, 0.0, -leg)],
             vec![TurnoutOption { from: 0, to: 2 }, TurnoutOption { from: 0, to: 1 }],
             1, 2)
}

/// Curved right-hand turnout: both branches curve, the outer one beyond a
/// short straight lead-in.
fn curved_turnout_right_geometry(name: &str, radius: f64, angle: f64, lead: f64) -> Rc<TrackGeometry> {
    let rad = angle * PI / 180.0;
    let dx = radius * (1.0 - rad.cos());
    let dy = radius * rad.sin();
    geometry(name,
             vec![GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(0.0, 0.0, 0.0) },
                  GeometryPath::Line { size: lead, anchor: point(0.0, 0.0, 0.0) },
                  GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(0.0, 0.0, lead) }],
             vec![point(0.0, 0.0, 0.0),
                  point(180.0 + angle, dx, -dy - lead),
                  point(180.0 + angle, dx, -dy)],
             vec![TurnoutOption { from: 0, to: 2 }, TurnoutOption { from: 0, to: 1 }],
             1, 2)
}

fn curved_turnout_left_geometry(name: &str, radius: f64, angle: f64, lead: f64) -> Rc<TrackGeometry> {
    let rad = angle * PI / 180.0;
    let dx = radius * (1.0 - rad.cos());
    let dy = radius * rad.sin();
    geometry(name,
             vec![GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(180.0 - angle, dx, dy + lead) },
                  GeometryPath::Line { size: lead, anchor: point(0.0, 0.0, 0.0) },
                  GeometryPath::Arc { track_angle: angle, radius: radius,
                                      anchor: point(180.0 - angle, dx, dy) }],
             vec![point(0.0, 0.0, 0.0),
                  point(180.0 - angle, -dx, -dy),
                  point(180.0 - angle, -dx, -dy - lead)],
             vec![TurnoutOption { from: 0, to: 2 }, TurnoutOption { from: 0, to: 1 }],
             1, 2)
}

/// Crossing geometry: a straight and a diagonal straight crossing at its
/// middle. Points 0 (diagonal) and 1 (straight) are incoming, 2 (diagonal)
/// and 3 (straight) are outgoing. Used for both the switching double slip
/// (four options) and the plain crossing (two options).
fn crossing_geometry(name: &str, len: f64, angle: f64,
                     options: Vec<TurnoutOption>) -> Rc<TrackGeometry> {
    let rad = angle * PI / 180.0;
    let half = len / 2.0;
    let dx = half * rad.sin();
    let dy = half * (1.0 - rad.cos());
    geometry(name,
             vec![GeometryPath::Line { size: len, anchor: point(0.0, 0.0, 0.0) },
                  GeometryPath::Line { size: len, anchor: point(360.0 - angle, -dx, dy) }],
             vec![point(360.0 - angle, dx, -dy),
                  point(0.0, 0.0, 0.0),
                  point(180.0 - angle, -dx, -(len - dy)),
                  point(180.0, 0.0, -len)],
             options,
             2, 2)
}

fn double_slip_options() -> Vec<TurnoutOption> {
    vec![TurnoutOption { from: 0, to: 2 },
         TurnoutOption { from: 0, to: 3 },
         TurnoutOption { from: 1, to: 2 },
         TurnoutOption { from: 1, to: 3 }]
}

fn crossing_options() -> Vec<TurnoutOption> {
    vec![TurnoutOption { from: 0, to: 2 },
         TurnoutOption { from: 1, to: 3 }]
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog { factories: HashMap::new() }
    }

    pub fn register(&mut self, name: &str, geometry: Rc<TrackGeometry>, reversed: bool) {
        self.factories.insert(name.to_string(), TrackFactory {
            geometry: geometry,
            reversed: reversed,
        });
    }

    pub fn get(&self, name: &str) -> Option<&TrackFactory> {
        self.factories.get(name)
    }

    /// Registers a curve under "R<name>" (right-hand) and "L<name>"
    /// (left-hand, same geometry connected in reverse).
    pub fn register_curve(&mut self, name: &str, radius: f64, angle: f64) {
        let geo = curve_geometry(name, radius, angle);
        self.register(&format!("R{}", name), geo.clone(), false);
        self.register(&format!("L{}", name), geo, true);
    }

    /// The built-in piece library.
    pub fn standard() -> Catalog {
        let mut c = Catalog::new();

        // Straights, including the short filler pieces.
        c.register("D2", straight_geometry("D2", 2.5), false);
        c.register("D8", straight_geometry("D8", 8.0), false);
        c.register("G025", straight_geometry("G025", 57.5), false);
        c.register("G05", straight_geometry("G05", 115.0), false);
        c.register("G1", straight_geometry("G1", 230.0), false);
        c.register("G4", straight_geometry("G4", 230.0 * 4.0), false);
        c.register("DG1", straight_geometry("DG1", 119.0), false);

        // The standard curve radii.
        c.register_curve("5", 542.8, 30.0);
        c.register_curve("6", 604.4, 30.0);
        c.register_curve("9", 826.4, 15.0);
        c.register_curve("10", 888.0, 15.0);
        c.register_curve("20", 1962.0, 5.0);
        // Flex-track replacement curves in 5 degree steps.
        for i in 5..41 {
            let radius = if i <= 7 {
                542.8 + (i - 5) as f64 * 61.6
            } else {
                888.0 + (i - 10) as f64 * 61.6
            };
            c.register_curve(&format!("C{}", i), radius, 5.0);
        }

        // Ordinary turnouts.
        c.register("WR15", turnout_right_geometry("WR15", 230.0, 888.0, 15.0), false);
        c.register("WL15", turnout_left_geometry("WL15", 230.0, 888.0, 15.0), false);
        c.register("WR10", turnout_right_geometry("WR10", 345.0, 1946.0, 10.0), false);
        c.register("WL10", turnout_left_geometry("WL10", 345.0, 1946.0, 10.0), false);

        // Curved turnouts.
        c.register("BWR5", curved_turnout_right_geometry("BWR5", 542.8, 30.0, 61.0), false);
        c.register("BWL5", curved_turnout_left_geometry("BWL5", 542.8, 30.0, 61.0), false);
        c.register("BWR9", curved_turnout_right_geometry("BWR9", 826.4, 30.0, 61.0), false);
        c.register("BWL9", curved_turnout_left_geometry("BWL9", 826.4, 30.0, 61.0), false);

        // Crossings: the double slips switch, the plain crossing does not.
        c.register("DKW15", crossing_geometry("DKW15", 230.0, 15.0, double_slip_options()), false);
        c.register("DKW10", crossing_geometry("DKW10", 345.0, 10.0, double_slip_options()), false);
        c.register("K15", crossing_geometry("K15", 230.0, 15.0, crossing_options()), false);

        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geometry::{TrackLocation, Vec3};

    #[test]
    fn standard_names_resolve() {
        let c = Catalog::standard();
        for name in &["G1", "G4", "R6", "L6", "WR15", "WL15", "DKW15", "K15",
                      "RC40", "LC40"] {
            assert!(c.get(name).is_some(), "{} missing", name);
        }
        assert!(c.get("XYZZY").is_none());
        assert!(c.get("L6").unwrap().reversed);
        assert!(!c.get("R6").unwrap().reversed);
        assert!(c.get("LC40").unwrap().reversed);
    }

    #[test]
    fn point_ordering_incoming_then_outgoing() {
        let c = Catalog::standard();
        for name in &["G1", "R6", "WR15", "WL15", "DKW15", "K15"] {
            let geo = &c.get(name).unwrap().geometry;
            assert_eq!(geo.incoming_count + geo.outgoing_count,
                       geo.connection_count(), "{}", name);
            for option in &geo.turnout_options {
                assert!(option.from < geo.connection_count());
                assert!(option.to < geo.connection_count());
            }
        }
    }

    #[test]
    fn default_option_is_the_straight_leg() {
        let c = Catalog::standard();
        for name in &["WR15", "WL15", "WR10", "WL10"] {
            let geo = &c.get(name).unwrap().geometry;
            let through = geo.turnout_options[0];
            // The default through path ends at a point facing straight back.
            assert_eq!(geo.connection_points[through.to].angle, 180.0, "{}", name);
        }
    }

    #[test]
    fn curve_connects_back_to_itself() {
        // Two R6 pieces in sequence must share the same turning circle.
        let c = Catalog::standard();
        let geo = c.get("R6").unwrap().geometry.clone();
        let loc = TrackLocation::at_connection(&geo.connection_points[0],
                                               Vec3(0.0, 0.0, 0.0), 0.0);
        let (pos, heading) = loc.connection(1, &geo);
        assert!((heading - 30.0).abs() < 1e-9);
        let loc2 = TrackLocation::at_connection(&geo.connection_points[0], pos, heading);
        let (pos2, heading2) = loc2.connection(1, &geo);
        assert!((heading2 - 60.0).abs() < 1e-9);
        // Both exits stay on the circle of radius 604.4 around (-604.4, 0).
        for p in &[pos, pos2] {
            let dx = p.0 + 604.4;
            let dy = p.1;
            assert!(((dx * dx + dy * dy).sqrt() - 604.4).abs() < 1e-6);
        }
    }

    #[test]
    fn turnout_straight_and_branch_diverge() {
        let c = Catalog::standard();
        let geo = c.get("WR15").unwrap().geometry.clone();
        let loc = TrackLocation::at_connection(&geo.connection_points[0],
                                               Vec3(0.0, 0.0, 0.0), 0.0);
        let (straight, h1) = loc.connection(1, &geo);
        let (branch, h2) = loc.connection(2, &geo);
        assert!((straight.0).abs() < 1e-9);
        assert!((straight.1 - 230.0).abs() < 1e-9);
        assert!((h1 - 0.0).abs() < 1e-9);
        assert!((h2 - 15.0).abs() < 1e-9);
        // The branch diverges to the other side of the straight leg.
        assert!(branch.0 < -1.0);
    }
}
