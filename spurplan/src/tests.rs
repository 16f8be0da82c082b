//! End-to-end tests running full plan sources through parsing, evaluation,
//! positioning and rendering.

use std::collections::HashMap;

use maplit::hashmap;

use crate::errors::{ErrorKind, ErrorLog};
use crate::output::Canvas;
use crate::output::canvas::Shape;
use crate::output::canvas_json;

fn compile(source: &str) -> (Canvas, ErrorLog) {
    let mut log = ErrorLog::new();
    let canvas = crate::build_source("plan.fv", source, &mut log);
    (canvas, log)
}

fn compile_ok(source: &str) -> Canvas {
    let (canvas, log) = compile(source);
    assert!(!log.has_errors(), "{:?}", log.errors());
    canvas
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
}

const STATION: &str = r##"
ground {
    top(0 mm)
    left(0 mm)
    width(470 cm)
    height(194 cm)
}

layer hills {
    color("#885511")
}

tracks {
    "Einfahrt"
    @(1200 mm, 100 mm, 0 mm, 0 deg)
    G1
    WL15 {
        left {
            R6
            G1
            "Abstellgleis"
        }
    }
    2 * G1
    "Ausfahrt"
}

tracks {
    "Abstellgleis"
    layer("hills")
    G05
}
"##;

#[test]
fn station_plan_compiles_and_renders() {
    let canvas = compile_ok(STATION);
    assert_close(canvas.width, 4700.0);
    assert_close(canvas.height, 1940.0);
    let counts: HashMap<String, usize> = canvas.layers.iter()
        .map(|l| (l.name.clone(), l.tracks.len()))
        .collect();
    let expected = hashmap!{
        "".to_string() => 6,
        "hills".to_string() => 1,
    };
    assert_eq!(counts, expected);
}

#[test]
fn station_plan_serializes() {
    let canvas = compile_ok(STATION);
    let doc = canvas_json(&canvas);
    assert_eq!(doc["layers"].as_array().map(|l| l.len()), Some(2));
    assert_eq!(doc["grounds"][0]["width"], json!(4700.0));
    let name = doc["layers"][1]["name"].as_str();
    assert_eq!(name, Some("hills"));
}

#[test]
fn anchored_chain_extends_along_its_heading() {
    let canvas = compile_ok(
        "tracks {\n @(120 mm, 120 mm, 0 mm, 180 deg)\n G1\n G1\n}\n");
    let second = &canvas.layers[0].tracks[1];
    let line = second.shapes.iter().find_map(|s| match *s {
        Shape::Line { from, to } => Some((from, to)),
        _ => None,
    }).expect("line shape");
    // Heading 180 runs towards negative y.
    assert_close((line.0).0, 120.0);
    assert_close((line.0).1, -110.0);
    assert_close((line.1).1, -340.0);
}

#[test]
fn turnout_siding_renders_every_piece() {
    let canvas = compile_ok(
        "tracks {\n @(0 mm, 0 mm, 0 mm, 0 deg)\n G1\n WR15 { right { R6 G1 } }\n G1\n}\n");
    assert_eq!(canvas.layers[0].tracks.len(), 5);
    for track in &canvas.layers[0].tracks {
        assert!(!track.shapes.is_empty());
    }
}

#[test]
fn mark_spliced_plans_share_one_drawing() {
    let canvas = compile_ok(
        "tracks {\n @(0 mm, 0 mm, 0 mm, 0 deg)\n G1\n \"J\"\n}\n\
         tracks {\n \"J\"\n G1\n}\n");
    assert_eq!(canvas.layers[0].tracks.len(), 2);
    let delimiters: usize = canvas.layers[0].tracks.iter()
        .map(|t| t.shapes.iter().filter(|s| match **s {
            Shape::Delimiter { .. } => true,
            _ => false,
        }).count())
        .sum();
    // The spliced joint is drawn once, the free ends once each.
    assert_eq!(delimiters, 3);
}

#[test]
fn diagnostics_keep_their_locations() {
    let (_, log) = compile("tracks {\n G1\n XYZZY\n}\n");
    assert!(log.has_errors());
    let error = &log.errors()[0];
    assert_eq!(error.location.line, 3);
    assert_eq!(error.code.kind(), ErrorKind::Semantic);
    assert!(format!("{}", error).contains("XYZZY"));
}

#[test]
fn broken_statement_does_not_hide_the_rest() {
    let (canvas, log) = compile(
        "tracks {\n G1 (\n}\n\ntracks {\n @(0 mm, 0 mm, 0 mm, 0 deg)\n G1\n}\n");
    assert!(log.has_errors());
    assert_eq!(canvas.layers[0].tracks.len(), 1);
}
