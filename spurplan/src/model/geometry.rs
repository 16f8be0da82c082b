//! Rigid 2D transforms for track pieces. Lengths are in millimeters,
//! headings in degrees measured clock-wise from the positive x axis.

use smallvec::SmallVec;

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Vec2(pub f64, pub f64);

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Vec3(pub f64, pub f64, pub f64);

impl Vec2 {
    pub fn invert(self) -> Vec2 {
        Vec2(-self.0, -self.1)
    }

    /// Rotates the vector by `r` degrees clock-wise.
    pub fn rotate(self, r: f64) -> Vec2 {
        let rad = -r * ::std::f64::consts::PI / 180.0;
        let cos = rad.cos();
        let sin = rad.sin();
        Vec2(self.0 * cos + self.1 * sin, -self.0 * sin + self.1 * cos)
    }
}

impl Vec3 {
    pub fn add2(self, v: Vec2) -> Vec3 {
        Vec3(self.0 + v.0, self.1 + v.1, self.2)
    }
}

/// Returns an angle in the range [0,360).
pub fn normalize_angle(mut a: f64) -> f64 {
    while a < 0.0 {
        a += 360.0;
    }
    while a >= 360.0 {
        a -= 360.0;
    }
    a
}

/// A point relative to the center and orientation of a track.
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct GeometryPoint {
    /// Entry heading in degrees relative to the orientation of the track.
    pub angle: f64,
    /// Vector in mm pointing from the point to the center of the track.
    pub position: Vec2,
}

impl GeometryPoint {
    pub fn new(angle: f64, position: Vec2) -> GeometryPoint {
        GeometryPoint { angle: angle, position: position }
    }
}

/// A drawable piece of a track shape, anchored at a local point+heading.
#[derive(Debug,Clone,Copy)]
pub enum GeometryPath {
    Line { size: f64, anchor: GeometryPoint },
    Arc { track_angle: f64, radius: f64, anchor: GeometryPoint },
}

/// One way to traverse a track, from one connection point to another.
/// A plain track has one option; turnouts and crossings have several.
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct TurnoutOption {
    pub from: usize,
    pub to: usize,
}

/// Immutable shape description shared by all tracks of one catalog type.
///
/// `connection_points` holds the incoming points first, then the outgoing
/// points, sorted clock-wise; for an ordinary turnout that makes point 1
/// the leftmost outgoing path.
#[derive(Debug,Clone)]
pub struct TrackGeometry {
    pub name: String,
    pub paths: Vec<GeometryPath>,
    pub connection_points: SmallVec<[GeometryPoint; 4]>,
    pub turnout_options: SmallVec<[TurnoutOption; 4]>,
    pub incoming_count: usize,
    pub outgoing_count: usize,
}

impl TrackGeometry {
    pub fn connection_count(&self) -> usize {
        self.connection_points.len()
    }
}

/// Absolute placement of a track.
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct TrackLocation {
    /// Vector from the origin to the center of the track, in mm.
    pub center: Vec3,
    /// Degrees in [0,360), clock-wise from the positive x axis.
    pub rotation: f64,
    /// Incline in percent of the track length.
    pub incline: f64,
}

impl TrackLocation {
    /// Places a track so that the given connection point sits at `pos` with
    /// entry heading `angle`.
    pub fn at_connection(point: &GeometryPoint, pos: Vec3, angle: f64) -> TrackLocation {
        let r = angle - point.angle;
        let c = point.position.rotate(r);
        TrackLocation {
            center: Vec3(pos.0 + c.0, pos.1 + c.1, pos.2),
            rotation: normalize_angle(r),
            incline: 0.0,
        }
    }

    /// The absolute position and outward-projected heading of one of the
    /// track's connection points, suitable for seeding a neighbor track.
    pub fn connection(&self, index: usize, geometry: &TrackGeometry) -> (Vec3, f64) {
        let c = &geometry.connection_points[index];
        let angle = normalize_angle(self.rotation + c.angle + 180.0);
        let pos = self.center.add2(c.position.invert().rotate(self.rotation));
        (pos, angle)
    }

    /// The heading of a connection point itself (where a train leaving the
    /// track through this point is headed).
    pub fn connection_heading(&self, index: usize, geometry: &TrackGeometry) -> f64 {
        normalize_angle(self.rotation + geometry.connection_points[index].angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn rotate_clockwise() {
        let v = Vec2(1.0, 0.0).rotate(90.0);
        assert_close(v.0, 0.0);
        assert_close(v.1, 1.0);
        let v = Vec2(0.0, 1.0).rotate(90.0);
        assert_close(v.0, -1.0);
        assert_close(v.1, 0.0);
        let v = Vec2(3.0, 4.0).rotate(360.0);
        assert_close(v.0, 3.0);
        assert_close(v.1, 4.0);
    }

    #[test]
    fn normalize_angle_range() {
        assert_close(normalize_angle(0.0), 0.0);
        assert_close(normalize_angle(360.0), 0.0);
        assert_close(normalize_angle(-90.0), 270.0);
        assert_close(normalize_angle(725.0), 5.0);
    }

    fn straight(len: f64) -> TrackGeometry {
        let mut points = SmallVec::new();
        points.push(GeometryPoint::new(0.0, Vec2(0.0, 0.0)));
        points.push(GeometryPoint::new(180.0, Vec2(0.0, -len)));
        let mut options = SmallVec::new();
        options.push(TurnoutOption { from: 0, to: 1 });
        TrackGeometry {
            name: "S".to_string(),
            paths: vec![GeometryPath::Line {
                size: len,
                anchor: GeometryPoint::new(0.0, Vec2(0.0, 0.0)),
            }],
            connection_points: points,
            turnout_options: options,
            incoming_count: 1,
            outgoing_count: 1,
        }
    }

    #[test]
    fn straight_projects_forward() {
        let geo = straight(230.0);
        let loc = TrackLocation::at_connection(&geo.connection_points[0],
                                               Vec3(0.0, 0.0, 0.0), 0.0);
        assert_eq!(loc.center, Vec3(0.0, 0.0, 0.0));
        assert_close(loc.rotation, 0.0);
        let (pos, heading) = loc.connection(1, &geo);
        assert_close(pos.0, 0.0);
        assert_close(pos.1, 230.0);
        // A neighbor seeded here enters with heading 0 again.
        assert_close(heading, 0.0);
        // The point's own heading faces outward.
        assert_close(loc.connection_heading(1, &geo), 180.0);
    }

    #[test]
    fn anchored_location_keeps_heading() {
        let geo = straight(230.0);
        let loc = TrackLocation::at_connection(&geo.connection_points[0],
                                               Vec3(100.0, 100.0, 0.0), 90.0);
        assert_eq!(loc.center, Vec3(100.0, 100.0, 0.0));
        assert_close(loc.rotation, 90.0);
    }
}
