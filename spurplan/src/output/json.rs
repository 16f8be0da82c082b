//! JSON document for the HTML viewer.

use super::canvas::{Canvas, Shape};

fn shape_json(shape: &Shape) -> serde_json::Value {
    match *shape {
        Shape::Line { from, to } => json!({
            "type": "line",
            "from": [from.0, from.1],
            "to": [to.0, to.1],
        }),
        Shape::Arc { center, radius, start, sweep } => json!({
            "type": "arc",
            "center": [center.0, center.1],
            "radius": radius,
            "start": start,
            "sweep": sweep,
        }),
        Shape::Delimiter { from, to } => json!({
            "type": "delimiter",
            "from": [from.0, from.1],
            "to": [to.0, to.1],
        }),
    }
}

pub fn canvas_json(canvas: &Canvas) -> serde_json::Value {
    let grounds = canvas.grounds.iter().map(|g| json!({
        "top": g.top,
        "left": g.left,
        "width": g.width,
        "height": g.height,
        "polygon": g.polygon.iter().map(|p| json!([p.0, p.1])).collect::<Vec<_>>(),
    })).collect::<Vec<_>>();

    let layers = canvas.layers.iter().map(|layer| json!({
        "name": layer.name,
        "color": layer.color,
        "tracks": layer.tracks.iter().map(|track| json!({
            "id": track.id,
            "shapes": track.shapes.iter().map(shape_json).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    })).collect::<Vec<_>>();

    json!({
        "width": canvas.width,
        "height": canvas.height,
        "grounds": grounds,
        "layers": layers,
    })
}
