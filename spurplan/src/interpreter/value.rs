//! Runtime values. Functions do not capture environments; a function value
//! is a builtin identity plus the arena index of the context it was looked
//! up in.

#[derive(Debug,Clone,PartialEq)]
pub enum Builtin {
    GroundTop,
    GroundLeft,
    GroundWidth,
    GroundHeight,
    GroundPolygon,
    LayerColor,
    /// `layer("...")` inside a tracks body, switching the target layer.
    TracksLayer,
    /// `@(x, y, z, angle)`.
    Anchor,
    /// A catalog piece, instantiated once per expansion.
    TrackPiece(String),
    /// A named tracks statement, instantiated fresh per reference.
    Sequence(usize),
}

#[derive(Debug,Clone,PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    Vector(Vec<Value>),
    Func(Builtin, usize),
    /// Index into the interpreter's context arena.
    Context(usize),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match *self {
            Value::Number(n) => n != 0.0,
            Value::Str(ref s) => !s.is_empty(),
            Value::Vector(ref v) => !v.is_empty(),
            Value::Func(_, _) | Value::Context(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Number(0.0).truthy());
        assert!(Value::Number(-1.0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("x".to_string()).truthy());
        assert!(!Value::Vector(Vec::new()).truthy());
        assert!(Value::Context(0).truthy());
    }
}
