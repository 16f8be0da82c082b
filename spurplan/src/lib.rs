//! Compiler for a model railway track plan language: parses plan sources,
//! builds the track graph, propagates positions from anchors and renders
//! the result to a drawable canvas.

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate serde_json;

pub mod errors;
pub mod input;
pub mod interpreter;
pub mod model;
pub mod output;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

pub type AppResult<T> = Result<T, failure::Error>;

/// Runs the whole pipeline on one source text. Diagnostics accumulate in
/// the log; a canvas is returned even when errors were found so a viewer
/// can keep showing the healthy parts of the plan.
pub fn build_source(path: &str, source: &str, log: &mut errors::ErrorLog) -> output::Canvas {
    let file = log.add_file(path);
    let ast = input::parse(file, source, log);
    let catalog = model::catalog::Catalog::standard();
    let mut plan = interpreter::interpret(&ast, &catalog, log);
    output::render(&mut plan)
}

pub fn build_file(path: &Path, log: &mut errors::ErrorLog) -> AppResult<output::Canvas> {
    let source = fs::read_to_string(path)?;
    Ok(build_source(&path.to_string_lossy(), &source, log))
}
