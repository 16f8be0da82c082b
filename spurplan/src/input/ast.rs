use crate::errors::Location;

/// Millimeters and degrees are the canonical units; the others are scaled
/// away at evaluation time.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Unit {
    Mm,
    Cm,
    M,
    Deg,
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug,Clone)]
pub enum Expression {
    Identifier { name: String, location: Location },
    Number { value: f64, location: Location },
    Str { value: String, location: Location },
    Vector { values: Vec<Expression>, location: Location },
    Call { func: Box<Expression>, args: Vec<Expression>, location: Location },
    Binary { op: BinaryOp, left: Box<Expression>, right: Box<Expression>, location: Location },
    Dimension { value: Box<Expression>, unit: Unit, location: Location },
    /// An expression followed by a nested statement list, e.g. a turnout
    /// with branch blocks.
    Block { header: Box<Expression>, body: Vec<Expression>, location: Location },
}

impl Expression {
    pub fn location(&self) -> Location {
        match *self {
            Expression::Identifier { location, .. } => location,
            Expression::Number { location, .. } => location,
            Expression::Str { location, .. } => location,
            Expression::Vector { location, .. } => location,
            Expression::Call { location, .. } => location,
            Expression::Binary { location, .. } => location,
            Expression::Dimension { location, .. } => location,
            Expression::Block { location, .. } => location,
        }
    }
}

#[derive(Debug,Clone)]
pub enum Statement {
    Tracks {
        name: Option<String>,
        parameters: Vec<String>,
        body: Vec<Expression>,
        location: Location,
    },
    Layer {
        name: String,
        body: Vec<Expression>,
        location: Location,
    },
    Ground {
        body: Vec<Expression>,
        location: Location,
    },
}

impl Statement {
    pub fn location(&self) -> Location {
        match *self {
            Statement::Tracks { location, .. } => location,
            Statement::Layer { location, .. } => location,
            Statement::Ground { location, .. } => location,
        }
    }
}

#[derive(Debug,Clone,Default)]
pub struct File {
    pub statements: Vec<Statement>,
}
