//! Evaluates a parsed plan file into a track system. Statements run in
//! three passes: named sequences are registered first, then layers and
//! ground plates, then the track statements themselves. Positions are
//! propagated from the anchored tracks afterwards.

pub mod value;
pub mod context;
mod build;

use std::collections::HashMap;
use std::mem;

use log::debug;

use crate::errors::{Error, ErrorCode, ErrorLog, Location};
use crate::input::ast::{BinaryOp, Expression, File, Statement, Unit};
use crate::model::{GroundPlate, Plan};
use crate::model::catalog::Catalog;
use crate::model::geometry::{TrackLocation, Vec2, Vec3};
use crate::model::tracks::{ConnRef, LayerRef, TrackRef, TrackSystem};

use self::context::{BranchKind, Context, Element, GroundContext, LayerContext,
                    TracksContext, TurnoutContext, ValueContext};
use self::value::{Builtin, Value};

/// Builds a plan from a parsed file. Diagnostics go to the log; the
/// returned plan holds whatever could still be built.
pub fn interpret(file: &File, catalog: &Catalog, log: &mut ErrorLog) -> Plan {
    let mut interpreter = Interpreter::new(catalog, log);
    interpreter.run(file);
    Plan {
        tracks: interpreter.system,
        grounds: interpreter.grounds,
    }
}

#[derive(Debug,Clone)]
struct SequenceDef {
    parameters: Vec<String>,
    body: Vec<Expression>,
}

pub struct Interpreter<'a> {
    log: &'a mut ErrorLog,
    catalog: &'a Catalog,
    system: TrackSystem,
    grounds: Vec<GroundPlate>,
    contexts: Vec<Context>,
    stack: Vec<usize>,
    sequences: Vec<SequenceDef>,
    identifiers: HashMap<String, usize>,
    /// Tracks positioned by an anchor, the seeds of propagation.
    anchored: Vec<TrackRef>,
}

fn unit_scale(unit: Unit) -> f64 {
    match unit {
        Unit::Mm | Unit::Deg => 1.0,
        Unit::Cm => 10.0,
        Unit::M => 1000.0,
    }
}

impl<'a> Interpreter<'a> {
    fn new(catalog: &'a Catalog, log: &'a mut ErrorLog) -> Interpreter<'a> {
        Interpreter {
            log: log,
            catalog: catalog,
            system: TrackSystem::new(),
            grounds: Vec::new(),
            contexts: vec![Context::Global],
            stack: vec![0],
            sequences: Vec::new(),
            identifiers: HashMap::new(),
            anchored: Vec::new(),
        }
    }

    fn run(&mut self, file: &File) {
        // Pass 1: register named sequences so references work regardless of
        // statement order.
        for statement in &file.statements {
            if let Statement::Tracks { name: Some(ref name), ref parameters,
                                       ref body, location } = *statement {
                if self.identifiers.contains_key(name) {
                    self.log.log(ErrorCode::DuplicateIdentifier(name.clone()), location);
                    continue;
                }
                let index = self.sequences.len();
                self.sequences.push(SequenceDef {
                    parameters: parameters.clone(),
                    body: body.clone(),
                });
                self.identifiers.insert(name.clone(), index);
            }
        }
        // Pass 2: layers and ground plates.
        for statement in &file.statements {
            match *statement {
                Statement::Layer { ref name, ref body, location } => {
                    self.run_layer(name, body, location);
                }
                Statement::Ground { ref body, location } => {
                    self.run_ground(body, location);
                }
                Statement::Tracks { .. } => {}
            }
        }
        // Pass 3: the anonymous track statements. Named sequences only run
        // when referenced.
        for statement in &file.statements {
            if let Statement::Tracks { name: None, ref body, location, .. } = *statement {
                let _ = self.run_tracks(body, location);
            }
        }
        self.propagate();
        self.check_positions();
    }

    fn run_layer(&mut self, name: &str, body: &[Expression], location: Location) {
        let idx = self.new_context(Context::Layer(LayerContext {
            name: name.to_string(),
            color: String::new(),
            location: location,
        }));
        self.stack.push(idx);
        let _ = self.process_body(body);
        self.stack.pop();
        let color = match self.contexts[idx] {
            Context::Layer(ref l) => l.color.clone(),
            _ => String::new(),
        };
        if self.system.add_layer(name, &color).is_err() {
            self.log.log(ErrorCode::DuplicateLayer(name.to_string()), location);
        }
    }

    fn run_ground(&mut self, body: &[Expression], location: Location) {
        let idx = self.new_context(Context::Ground(GroundContext {
            plate: GroundPlate::default(),
            location: location,
        }));
        self.stack.push(idx);
        let _ = self.process_body(body);
        self.stack.pop();
        if let Context::Ground(ref g) = self.contexts[idx] {
            self.grounds.push(g.plate.clone());
        }
    }

    fn run_tracks(&mut self, body: &[Expression], location: Location) -> Result<(), Error> {
        let layer = self.system.default_layer();
        let idx = self.new_context(Context::Tracks(
            TracksContext::new(layer, HashMap::new(), location)));
        self.stack.push(idx);
        let result = self.process_body(body);
        self.stack.pop();
        result?;
        self.close_context(idx)
    }

    fn new_context(&mut self, context: Context) -> usize {
        self.contexts.push(context);
        self.contexts.len() - 1
    }

    fn process_body(&mut self, body: &[Expression]) -> Result<(), Error> {
        for expr in body {
            let value = self.eval(expr)?;
            self.process_value(value, expr.location())?;
        }
        Ok(())
    }

    /// Feeds an evaluated statement value into the context on top of the
    /// stack. Bare functions expand with no arguments first.
    fn process_value(&mut self, value: Option<Value>, location: Location) -> Result<(), Error> {
        let value = match value {
            Some(v) => v,
            None => return Ok(()),
        };
        let value = match value {
            Value::Func(builtin, ctx) => match self.apply(builtin, ctx, Vec::new(), location)? {
                Some(v) => v,
                None => return Ok(()),
            },
            v => v,
        };
        let top = *self.stack.last().expect("context stack never empty");
        match value {
            Value::Str(s) => match self.contexts[top] {
                Context::Tracks(ref mut tc) => {
                    tc.elements.push(Element::Mark(s, location));
                    Ok(())
                }
                _ => Err(self.log.log(ErrorCode::IllegalInThisContext, location)),
            },
            Value::Context(idx) => {
                self.close_context(idx)?;
                self.process_context(top, idx, location)
            }
            _ => Err(self.log.log(ErrorCode::IllegalInThisContext, location)),
        }
    }

    fn process_context(&mut self, top: usize, idx: usize,
                       location: Location) -> Result<(), Error> {
        enum Child {
            Track(TrackRef),
            Anchor(Vec3, f64),
            Sequence(Option<ConnRef>, Option<ConnRef>, Option<BranchKind>),
            Other,
        }
        let child = match self.contexts[idx] {
            Context::Value(ValueContext::Track(track)) => Child::Track(track),
            Context::Value(ValueContext::Anchor(pos, angle)) => Child::Anchor(pos, angle),
            Context::Turnout(ref t) => Child::Track(t.track),
            Context::Tracks(ref tc) => Child::Sequence(tc.first, tc.last, tc.branch),
            _ => Child::Other,
        };
        match self.contexts[top] {
            Context::Tracks(ref mut tc) => match child {
                Child::Track(track) => {
                    tc.elements.push(Element::Track(track, location));
                    Ok(())
                }
                Child::Anchor(pos, angle) => {
                    tc.elements.push(Element::Anchor(pos, angle, location));
                    Ok(())
                }
                Child::Sequence(first, last, None) => {
                    tc.elements.push(Element::Sequence {
                        first: first,
                        last: last,
                        location: location,
                    });
                    Ok(())
                }
                _ => Err(self.log.log(ErrorCode::IllegalInThisContext, location)),
            },
            Context::Turnout(ref mut t) => match child {
                Child::Sequence(_, _, Some(kind)) => {
                    let slot = &mut t.branches[kind as usize];
                    if slot.is_some() {
                        return Err(self.log.log(
                            ErrorCode::IllegalTurnoutBranch(kind.name()), location));
                    }
                    *slot = Some(idx);
                    Ok(())
                }
                _ => Err(self.log.log(ErrorCode::IllegalInThisContext, location)),
            },
            _ => Err(self.log.log(ErrorCode::IllegalInThisContext, location)),
        }
    }

    fn eval(&mut self, expr: &Expression) -> Result<Option<Value>, Error> {
        match *expr {
            Expression::Identifier { ref name, location } => {
                self.lookup(name, location).map(Some)
            }
            Expression::Number { value, .. } => Ok(Some(Value::Number(value))),
            Expression::Str { ref value, .. } => Ok(Some(Value::Str(value.clone()))),
            Expression::Vector { ref values, .. } => {
                let mut out = Vec::with_capacity(values.len());
                for v in values {
                    out.push(self.eval_value(v)?);
                }
                Ok(Some(Value::Vector(out)))
            }
            Expression::Dimension { ref value, unit, location } => {
                let v = self.eval_value(value)?;
                let f = self.to_float(v, location)?;
                Ok(Some(Value::Number(f * unit_scale(unit))))
            }
            Expression::Call { ref func, ref args, location } => {
                let f = self.eval(func)?;
                match f {
                    Some(Value::Func(builtin, ctx)) => {
                        let mut values = Vec::with_capacity(args.len());
                        for arg in args {
                            values.push(self.eval_value(arg)?);
                        }
                        self.apply(builtin, ctx, values, location)
                    }
                    _ => Err(self.log.log(ErrorCode::NotAFunction, location)),
                }
            }
            Expression::Binary { op, ref left, ref right, location } => {
                self.eval_binary(op, left, right, location)
            }
            Expression::Block { ref header, ref body, location } => {
                let h = self.eval(header)?;
                let h = match h {
                    Some(Value::Func(builtin, ctx)) => {
                        self.apply(builtin, ctx, Vec::new(), location)?
                    }
                    h => h,
                };
                let idx = match h {
                    Some(Value::Context(idx)) => idx,
                    _ => return Err(self.log.log(ErrorCode::TypeMismatch, location)),
                };
                self.stack.push(idx);
                let result = self.process_body(body);
                self.stack.pop();
                result?;
                self.close_context(idx)?;
                Ok(Some(Value::Context(idx)))
            }
        }
    }

    fn eval_value(&mut self, expr: &Expression) -> Result<Value, Error> {
        match self.eval(expr)? {
            Some(v) => Ok(v),
            None => Err(self.log.log(ErrorCode::TypeMismatch, expr.location())),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expression, right: &Expression,
                   location: Location) -> Result<Option<Value>, Error> {
        if op == BinaryOp::And || op == BinaryOp::Or {
            let l = self.eval_value(left)?.truthy();
            let result = match (op, l) {
                (BinaryOp::And, false) => false,
                (BinaryOp::Or, true) => true,
                _ => self.eval_value(right)?.truthy(),
            };
            return Ok(Some(Value::Number(if result { 1.0 } else { 0.0 })));
        }
        let lv = self.eval_value(left)?;
        if op == BinaryOp::Mul {
            // `n * <piece>` is a repetition: the right side is re-evaluated
            // and processed n times.
            if let Value::Number(n) = lv {
                match self.eval(right)? {
                    Some(v @ Value::Func(_, _)) | Some(v @ Value::Context(_)) => {
                        return self.repeat(n, v, right, location);
                    }
                    Some(rv) => {
                        let r = self.to_float(rv, location)?;
                        return Ok(Some(Value::Number(n * r)));
                    }
                    None => return Err(self.log.log(ErrorCode::TypeMismatch, location)),
                }
            }
        }
        let rv = self.eval_value(right)?;
        let result = match op {
            BinaryOp::Add => match (lv, rv) {
                (Value::Str(l), r) => {
                    let r = self.to_text(r, location)?;
                    Value::Str(format!("{}{}", l, r))
                }
                (l, Value::Str(r)) => {
                    let l = self.to_text(l, location)?;
                    Value::Str(format!("{}{}", l, r))
                }
                (l, r) => {
                    Value::Number(self.to_float(l, location)? + self.to_float(r, location)?)
                }
            },
            BinaryOp::Sub => Value::Number(self.to_float(lv, location)?
                                           - self.to_float(rv, location)?),
            BinaryOp::Mul => Value::Number(self.to_float(lv, location)?
                                           * self.to_float(rv, location)?),
            BinaryOp::Div => Value::Number(self.to_float(lv, location)?
                                           / self.to_float(rv, location)?),
            BinaryOp::Rem => Value::Number(self.to_float(lv, location)?
                                           % self.to_float(rv, location)?),
            BinaryOp::Eq | BinaryOp::Ne => {
                let equal = match (lv, rv) {
                    (Value::Str(l), Value::Str(r)) => l == r,
                    (l, r) => {
                        self.to_float(l, location)? == self.to_float(r, location)?
                    }
                };
                let result = if op == BinaryOp::Eq { equal } else { !equal };
                Value::Number(if result { 1.0 } else { 0.0 })
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let l = self.to_float(lv, location)?;
                let r = self.to_float(rv, location)?;
                let result = match op {
                    BinaryOp::Lt => l < r,
                    BinaryOp::Le => l <= r,
                    BinaryOp::Gt => l > r,
                    _ => l >= r,
                };
                Value::Number(if result { 1.0 } else { 0.0 })
            }
            BinaryOp::And | BinaryOp::Or => unreachable!(),
        };
        Ok(Some(result))
    }

    fn repeat(&mut self, n: f64, first: Value, expr: &Expression,
              location: Location) -> Result<Option<Value>, Error> {
        if n < 0.0 || n.fract() != 0.0 {
            return Err(self.log.log(ErrorCode::TypeMismatch, location));
        }
        let count = n as usize;
        if count > 0 {
            self.process_value(Some(first), location)?;
            for _ in 1..count {
                let v = self.eval(expr)?;
                self.process_value(v, location)?;
            }
        }
        Ok(None)
    }

    /// Walks the context stack top-down. Unresolved names inside a tracks
    /// body read as track types, elsewhere as plain identifiers.
    fn lookup(&mut self, name: &str, location: Location) -> Result<Value, Error> {
        enum Hit {
            Value(Value),
            Func(Builtin, usize),
            Branch(BranchKind, LayerRef),
        }
        let mut in_tracks = false;
        let mut hit = None;
        for sp in (0..self.stack.len()).rev() {
            let idx = self.stack[sp];
            hit = match self.contexts[idx] {
                Context::Tracks(ref tc) => {
                    in_tracks = true;
                    if let Some(v) = tc.params.get(name) {
                        Some(Hit::Value(v.clone()))
                    } else if name == "layer" {
                        Some(Hit::Func(Builtin::TracksLayer, idx))
                    } else if name == "@" {
                        Some(Hit::Func(Builtin::Anchor, idx))
                    } else if let Some(&seq) = self.identifiers.get(name) {
                        Some(Hit::Func(Builtin::Sequence(seq), idx))
                    } else if self.catalog.get(name).is_some() {
                        Some(Hit::Func(Builtin::TrackPiece(name.to_string()), idx))
                    } else {
                        None
                    }
                }
                Context::Turnout(ref t) => {
                    BranchKind::from_name(name).map(|kind| Hit::Branch(kind, t.layer))
                }
                Context::Ground(_) => match name {
                    "top" => Some(Hit::Func(Builtin::GroundTop, idx)),
                    "left" => Some(Hit::Func(Builtin::GroundLeft, idx)),
                    "width" => Some(Hit::Func(Builtin::GroundWidth, idx)),
                    "height" => Some(Hit::Func(Builtin::GroundHeight, idx)),
                    "polygon" => Some(Hit::Func(Builtin::GroundPolygon, idx)),
                    _ => None,
                },
                Context::Layer(_) => {
                    if name == "color" {
                        Some(Hit::Func(Builtin::LayerColor, idx))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if hit.is_some() {
                break;
            }
        }
        match hit {
            Some(Hit::Value(v)) => Ok(v),
            Some(Hit::Func(builtin, idx)) => Ok(Value::Func(builtin, idx)),
            Some(Hit::Branch(kind, layer)) => {
                let idx = self.new_context(Context::Tracks(
                    TracksContext::branch(layer, kind, location)));
                Ok(Value::Context(idx))
            }
            None => {
                let code = if in_tracks {
                    ErrorCode::UnknownTrackType(name.to_string())
                } else {
                    ErrorCode::UnknownIdentifier(name.to_string())
                };
                Err(self.log.log(code, location))
            }
        }
    }

    fn apply(&mut self, builtin: Builtin, ctx: usize, args: Vec<Value>,
             location: Location) -> Result<Option<Value>, Error> {
        match builtin {
            Builtin::GroundTop => {
                let v = self.single_float(args, location)?;
                if let Context::Ground(ref mut g) = self.contexts[ctx] {
                    g.plate.top = v;
                }
                Ok(None)
            }
            Builtin::GroundLeft => {
                let v = self.single_float(args, location)?;
                if let Context::Ground(ref mut g) = self.contexts[ctx] {
                    g.plate.left = v;
                }
                Ok(None)
            }
            Builtin::GroundWidth => {
                let v = self.single_float(args, location)?;
                if let Context::Ground(ref mut g) = self.contexts[ctx] {
                    g.plate.width = v;
                }
                Ok(None)
            }
            Builtin::GroundHeight => {
                let v = self.single_float(args, location)?;
                if let Context::Ground(ref mut g) = self.contexts[ctx] {
                    g.plate.height = v;
                }
                Ok(None)
            }
            Builtin::GroundPolygon => {
                if args.len() < 3 {
                    return Err(self.log.log(ErrorCode::ArgumentCountMismatch(3), location));
                }
                let mut polygon = Vec::with_capacity(args.len());
                for arg in args {
                    let pair = match arg {
                        Value::Vector(ref v) if v.len() == 2 => v.clone(),
                        _ => return Err(self.log.log(ErrorCode::TypeMismatch, location)),
                    };
                    let x = self.to_float(pair[0].clone(), location)?;
                    let y = self.to_float(pair[1].clone(), location)?;
                    polygon.push(Vec2(x, y));
                }
                if let Context::Ground(ref mut g) = self.contexts[ctx] {
                    g.plate.polygon = polygon;
                }
                Ok(None)
            }
            Builtin::LayerColor => {
                let v = self.single_text(args, location)?;
                if let Context::Layer(ref mut l) = self.contexts[ctx] {
                    l.color = v;
                }
                Ok(None)
            }
            Builtin::TracksLayer => {
                let name = self.single_text(args, location)?;
                let layer = match self.system.layer_by_name(&name) {
                    Some(layer) => layer,
                    None => return Err(self.log.log(
                        ErrorCode::UnknownLayer(name), location)),
                };
                if let Context::Tracks(ref mut tc) = self.contexts[ctx] {
                    tc.layer = layer;
                }
                Ok(None)
            }
            Builtin::Anchor => {
                if args.len() != 4 {
                    return Err(self.log.log(ErrorCode::ArgumentCountMismatch(4), location));
                }
                let mut f = [0.0; 4];
                for (i, arg) in args.into_iter().enumerate() {
                    f[i] = self.to_float(arg, location)?;
                }
                let idx = self.new_context(Context::Value(
                    ValueContext::Anchor(Vec3(f[0], f[1], f[2]), f[3])));
                Ok(Some(Value::Context(idx)))
            }
            Builtin::TrackPiece(name) => {
                if !args.is_empty() {
                    return Err(self.log.log(ErrorCode::ArgumentCountMismatch(0), location));
                }
                let catalog = self.catalog;
                let factory = match catalog.get(&name) {
                    Some(f) => f,
                    None => return Err(self.log.log(
                        ErrorCode::Internal(format!("track type {} disappeared", name)),
                        location)),
                };
                let layer = match self.contexts[ctx] {
                    Context::Tracks(ref tc) => tc.layer,
                    _ => self.system.default_layer(),
                };
                let track = self.system.new_track(layer, factory.geometry.clone(),
                                                  factory.reversed, location);
                let context = if factory.geometry.connection_count() > 2 {
                    Context::Turnout(TurnoutContext::new(track, layer, location))
                } else {
                    Context::Value(ValueContext::Track(track))
                };
                let idx = self.new_context(context);
                Ok(Some(Value::Context(idx)))
            }
            Builtin::Sequence(index) => {
                let def = self.sequences[index].clone();
                if args.len() != def.parameters.len() {
                    return Err(self.log.log(
                        ErrorCode::ArgumentCountMismatch(def.parameters.len()), location));
                }
                let layer = match self.contexts[ctx] {
                    Context::Tracks(ref tc) => tc.layer,
                    _ => self.system.default_layer(),
                };
                let mut params = HashMap::new();
                for (name, value) in def.parameters.iter().zip(args) {
                    params.insert(name.clone(), value);
                }
                let idx = self.new_context(Context::Tracks(
                    TracksContext::new(layer, params, location)));
                self.stack.push(idx);
                let result = self.process_body(&def.body);
                self.stack.pop();
                result?;
                self.close_context(idx)?;
                Ok(Some(Value::Context(idx)))
            }
        }
    }

    fn single_float(&mut self, mut args: Vec<Value>, location: Location) -> Result<f64, Error> {
        if args.len() != 1 {
            return Err(self.log.log(ErrorCode::ArgumentCountMismatch(1), location));
        }
        let v = args.pop().expect("length checked");
        self.to_float(v, location)
    }

    fn single_text(&mut self, mut args: Vec<Value>, location: Location) -> Result<String, Error> {
        if args.len() != 1 {
            return Err(self.log.log(ErrorCode::ArgumentCountMismatch(1), location));
        }
        let v = args.pop().expect("length checked");
        self.to_text(v, location)
    }

    fn to_float(&mut self, value: Value, location: Location) -> Result<f64, Error> {
        match value {
            Value::Number(n) => Ok(n),
            Value::Func(builtin, ctx) => match self.apply(builtin, ctx, Vec::new(), location)? {
                Some(v) => self.to_float(v, location),
                None => Err(self.log.log(ErrorCode::TypeMismatch, location)),
            },
            _ => Err(self.log.log(ErrorCode::TypeMismatch, location)),
        }
    }

    fn to_text(&mut self, value: Value, location: Location) -> Result<String, Error> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Number(n) => Ok(format!("{}", n)),
            Value::Func(builtin, ctx) => match self.apply(builtin, ctx, Vec::new(), location)? {
                Some(v) => self.to_text(v, location),
                None => Err(self.log.log(ErrorCode::TypeMismatch, location)),
            },
            _ => Err(self.log.log(ErrorCode::TypeMismatch, location)),
        }
    }

    /// Floods locations outward from every anchored track. The traversal
    /// epoch keeps circles from looping; a flood stops at tracks an earlier
    /// pass already positioned.
    fn propagate(&mut self) {
        let anchored = mem::replace(&mut self.anchored, Vec::new());
        debug!("propagating positions from {} anchored tracks", anchored.len());
        for &root in &anchored {
            self.system.new_epoch();
            self.system.tag(root);
            let mut pending = vec![root];
            while let Some(track) = pending.pop() {
                let loc = match self.system.track(track).location {
                    Some(loc) => loc,
                    None => continue,
                };
                let geo = self.system.track(track).geometry.clone();
                for point in 0..geo.connection_count() {
                    let c = ConnRef { track: track, point: point };
                    let opposite = match self.system.connection(c).opposite {
                        Some(o) => o,
                        None => continue,
                    };
                    if self.system.is_tagged(opposite.track) {
                        continue;
                    }
                    self.system.tag(opposite.track);
                    let (pos, angle) = loc.connection(point, &geo);
                    let ngeo = self.system.track(opposite.track).geometry.clone();
                    let nloc = TrackLocation::at_connection(
                        &ngeo.connection_points[opposite.point], pos, angle);
                    if self.system.set_location(opposite.track, nloc) {
                        pending.push(opposite.track);
                    } else {
                        let source = self.system.track(opposite.track).source_location;
                        self.log.log(ErrorCode::TrackPositionedTwice, source);
                    }
                }
            }
        }
    }

    fn check_positions(&mut self) {
        for layer in &self.system.layers {
            if let Some(track) = layer.tracks.iter().find(|t| t.location.is_none()) {
                self.log.log(ErrorCode::TracksWithoutPosition(layer.name.clone()),
                             track.source_location);
            }
        }
    }
}
