pub mod ast;
pub mod lexer;
pub mod parser;

pub use self::ast::{BinaryOp, Expression, File, Statement, Unit};
pub use self::parser::parse;
