pub mod canvas;
pub mod json;

pub use self::canvas::{render, Canvas};
pub use self::json::canvas_json;
