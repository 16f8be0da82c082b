//! Flattens a positioned plan into drawable shapes. Coordinates are world
//! millimeters; arc angles are polar degrees around the arc center, with
//! the sweep following the track's turning angle.

use crate::model::{GroundPlate, Plan};
use crate::model::geometry::{normalize_angle, GeometryPath, Vec2, Vec3};
use crate::model::tracks::{ConnRef, LayerRef, TrackRef};

/// Half-width of the tick drawn across a track joint.
const DELIMITER_SIZE: f64 = 30.0;

#[derive(Debug,Clone,PartialEq)]
pub enum Shape {
    Line { from: Vec2, to: Vec2 },
    Arc { center: Vec2, radius: f64, start: f64, sweep: f64 },
    /// A tick across the rails at a connection point.
    Delimiter { from: Vec2, to: Vec2 },
}

#[derive(Debug,Clone)]
pub struct CanvasTrack {
    pub id: u32,
    pub shapes: Vec<Shape>,
}

#[derive(Debug,Clone)]
pub struct CanvasLayer {
    pub name: String,
    pub color: String,
    pub tracks: Vec<CanvasTrack>,
}

#[derive(Debug,Clone)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub grounds: Vec<GroundPlate>,
    pub layers: Vec<CanvasLayer>,
}

fn heading_vector(angle: f64) -> Vec2 {
    let rad = angle * ::std::f64::consts::PI / 180.0;
    Vec2(rad.cos(), rad.sin())
}

fn flat(v: Vec3) -> Vec2 {
    Vec2(v.0, v.1)
}

fn add(a: Vec2, b: Vec2) -> Vec2 {
    Vec2(a.0 + b.0, a.1 + b.1)
}

fn scale(v: Vec2, f: f64) -> Vec2 {
    Vec2(v.0 * f, v.1 * f)
}

/// Renders every positioned track. Joints shared by two tracks are drawn
/// once; the traversal epoch marks which side already drew its delimiter.
pub fn render(plan: &mut Plan) -> Canvas {
    let mut width = 0.0f64;
    let mut height = 0.0f64;
    for g in &plan.grounds {
        width = width.max(g.left + g.width);
        height = height.max(g.top + g.height);
        for p in &g.polygon {
            width = width.max(p.0);
            height = height.max(p.1);
        }
    }

    plan.tracks.new_epoch();
    let mut layers = Vec::with_capacity(plan.tracks.layers.len());
    for layer_index in 0..plan.tracks.layers.len() {
        let mut tracks = Vec::new();
        for index in 0..plan.tracks.layers[layer_index].tracks.len() {
            let here = TrackRef { layer: LayerRef(layer_index), index: index };
            let (id, geometry, location) = {
                let track = plan.tracks.track(here);
                match track.location {
                    Some(l) => (track.id, track.geometry.clone(), l),
                    None => continue,
                }
            };
            let mut shapes = Vec::new();
            let origin = flat(location.center);

            for path in &geometry.paths {
                match *path {
                    GeometryPath::Line { size, anchor } => {
                        let from = add(origin, anchor.position.rotate(location.rotation));
                        let heading = location.rotation + anchor.angle;
                        let to = add(from, Vec2(0.0, size).rotate(heading));
                        shapes.push(Shape::Line { from: from, to: to });
                    }
                    GeometryPath::Arc { track_angle, radius, anchor } => {
                        let from = add(origin, anchor.position.rotate(location.rotation));
                        let heading = normalize_angle(location.rotation + anchor.angle);
                        // The polar angle of the start point around the
                        // turning center equals the start heading.
                        let center = add(from, scale(heading_vector(heading), -radius));
                        shapes.push(Shape::Arc {
                            center: center,
                            radius: radius,
                            start: heading,
                            sweep: track_angle,
                        });
                    }
                }
            }

            for point in 0..geometry.connection_points.len() {
                let opposite = plan.tracks
                    .connection(ConnRef { track: here, point: point })
                    .opposite;
                if let Some(o) = opposite {
                    if plan.tracks.is_tagged(o.track) {
                        continue;
                    }
                }
                let (pos, _) = location.connection(point, &geometry);
                let heading = location.connection_heading(point, &geometry);
                let across = heading_vector(heading);
                shapes.push(Shape::Delimiter {
                    from: add(flat(pos), scale(across, -DELIMITER_SIZE / 2.0)),
                    to: add(flat(pos), scale(across, DELIMITER_SIZE / 2.0)),
                });
            }

            tracks.push(CanvasTrack { id: id, shapes: shapes });
            plan.tracks.tag(here);
        }
        let layer = &plan.tracks.layers[layer_index];
        layers.push(CanvasLayer {
            name: layer.name.clone(),
            color: layer.color.clone(),
            tracks: tracks,
        });
    }

    Canvas {
        width: width,
        height: height,
        grounds: plan.grounds.clone(),
        layers: layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorLog;
    use crate::input::parse;
    use crate::interpreter::interpret;
    use crate::model::catalog::Catalog;

    fn canvas_for(source: &str) -> Canvas {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let ast = parse(file, source, &mut log);
        let catalog = Catalog::standard();
        let mut plan = interpret(&ast, &catalog, &mut log);
        assert!(!log.has_errors(), "{:?}", log.errors());
        render(&mut plan)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn straight_track_renders_a_line() {
        let canvas = canvas_for("tracks {\n @(100 mm, 100 mm, 0 mm, 0 deg)\n G1\n}\n");
        let track = &canvas.layers[0].tracks[0];
        let line = track.shapes.iter().find(|s| match **s {
            Shape::Line { .. } => true,
            _ => false,
        }).expect("line shape");
        match *line {
            Shape::Line { from, to } => {
                assert_close(from.0, 100.0);
                assert_close(from.1, 100.0);
                assert_close(to.0, 100.0);
                assert_close(to.1, 330.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn curve_renders_an_arc_around_its_turning_center() {
        let canvas = canvas_for("tracks {\n @(0 mm, 0 mm, 0 mm, 0 deg)\n R6\n}\n");
        let track = &canvas.layers[0].tracks[0];
        let arc = track.shapes.iter().find(|s| match **s {
            Shape::Arc { .. } => true,
            _ => false,
        }).expect("arc shape");
        match *arc {
            Shape::Arc { center, radius, start, sweep } => {
                assert_close(center.0, -604.4);
                assert_close(center.1, 0.0);
                assert_close(radius, 604.4);
                assert_close(start, 0.0);
                assert_close(sweep, 30.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn joints_are_drawn_once() {
        let canvas = canvas_for("tracks {\n @(0 mm, 0 mm, 0 mm, 0 deg)\n G1\n G1\n}\n");
        let delimiters: usize = canvas.layers[0].tracks.iter()
            .map(|t| t.shapes.iter().filter(|s| match **s {
                Shape::Delimiter { .. } => true,
                _ => false,
            }).count())
            .sum();
        // Two free ends plus one shared joint.
        assert_eq!(delimiters, 3);
    }

    #[test]
    fn ground_plates_size_the_canvas() {
        let canvas = canvas_for(
            "ground {\n top(10 cm)\n left(0 mm)\n width(470 cm)\n height(194 cm)\n}\n");
        assert_close(canvas.width, 4700.0);
        assert_close(canvas.height, 2040.0);
        assert_eq!(canvas.grounds.len(), 1);
    }

    #[test]
    fn unpositioned_tracks_are_skipped() {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let ast = parse(file, "tracks {\n G1\n}\n", &mut log);
        let catalog = Catalog::standard();
        let mut plan = interpret(&ast, &catalog, &mut log);
        let canvas = render(&mut plan);
        assert!(canvas.layers[0].tracks.is_empty());
    }
}
