//! Recursive-descent parser for the track-plan language. Syntax errors
//! abandon the enclosing top-level statement and resynchronize to the next
//! one, so independent statements still get checked in a single pass.

use crate::errors::{ErrorCode, ErrorLog, Location};
use super::ast::{BinaryOp, Expression, File, Statement};
use super::lexer::{lex, Tok, Token};

type Parse<T> = Result<T, ()>;

pub fn parse(file: usize, input: &str, log: &mut ErrorLog) -> File {
    let tokens = lex(file, input, log);
    let mut p = Parser { tokens: tokens, pos: 0, log: log };
    p.parse_file()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    log: &'a mut ErrorLog,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn optional(&mut self, tok: &Tok) -> bool {
        if &self.peek().tok == tok {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, tok: Tok) -> Parse<Token> {
        let t = self.advance();
        if t.tok == tok {
            return Ok(t);
        }
        self.log.log(ErrorCode::ExpectedToken(t.tok.describe(), tok.describe()),
                     t.location);
        Err(())
    }

    fn expect_identifier(&mut self) -> Parse<(String, Location)> {
        let t = self.advance();
        match t.tok {
            Tok::Identifier(name) => Ok((name, t.location)),
            other => {
                self.log.log(ErrorCode::ExpectedToken(other.describe(),
                                                      "identifier".to_string()),
                             t.location);
                Err(())
            }
        }
    }

    fn skip_newlines(&mut self) {
        while self.optional(&Tok::Newline) {}
    }

    fn parse_file(&mut self) -> File {
        let mut file = File::default();
        loop {
            self.skip_newlines();
            let t = self.advance();
            let result = match t.tok {
                Tok::Eof => break,
                Tok::Identifier(ref name) if name == "tracks" => {
                    self.parse_tracks(t.location)
                }
                Tok::Identifier(ref name) if name == "layer" => {
                    self.parse_layer(t.location)
                }
                Tok::Identifier(ref name) if name == "ground" => {
                    self.parse_ground(t.location)
                }
                other => {
                    self.log.log(ErrorCode::UnknownDirective(other.describe()),
                                 t.location);
                    Err(())
                }
            };
            match result {
                Ok(statement) => file.statements.push(statement),
                Err(()) => self.recover(),
            }
        }
        file
    }

    /// Skips forward to the next top-level keyword at brace depth zero.
    fn recover(&mut self) {
        let mut depth = 0i32;
        loop {
            match self.peek().tok {
                Tok::Eof => return,
                Tok::OpenBrace => depth += 1,
                Tok::CloseBrace => depth -= 1,
                Tok::Identifier(ref name) if depth <= 0 => match name.as_str() {
                    "tracks" | "layer" | "ground" => return,
                    _ => {}
                },
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_tracks(&mut self, location: Location) -> Parse<Statement> {
        let mut name = None;
        let mut parameters = Vec::new();
        if let Tok::Identifier(_) = self.peek().tok {
            let (n, _) = self.expect_identifier()?;
            name = Some(n);
            if self.optional(&Tok::OpenParen) {
                loop {
                    if self.optional(&Tok::CloseParen) {
                        break;
                    }
                    if !parameters.is_empty() {
                        self.expect(Tok::Comma)?;
                    }
                    let (p, _) = self.expect_identifier()?;
                    parameters.push(p);
                }
            }
        }
        self.expect(Tok::OpenBrace)?;
        let body = self.parse_body()?;
        Ok(Statement::Tracks {
            name: name,
            parameters: parameters,
            body: body,
            location: location,
        })
    }

    fn parse_layer(&mut self, location: Location) -> Parse<Statement> {
        let (name, _) = self.expect_identifier()?;
        self.expect(Tok::OpenBrace)?;
        let body = self.parse_body()?;
        Ok(Statement::Layer { name: name, body: body, location: location })
    }

    fn parse_ground(&mut self, location: Location) -> Parse<Statement> {
        self.expect(Tok::OpenBrace)?;
        let body = self.parse_body()?;
        Ok(Statement::Ground { body: body, location: location })
    }

    fn parse_body(&mut self) -> Parse<Vec<Expression>> {
        let mut expressions = Vec::new();
        loop {
            self.skip_newlines();
            if self.optional(&Tok::CloseBrace) {
                break;
            }
            if self.peek().tok == Tok::Eof {
                let loc = self.peek().location;
                self.log.log(ErrorCode::UnexpectedEof, loc);
                return Err(());
            }
            let mut expr = self.parse_expression()?;
            if self.optional(&Tok::OpenBrace) {
                let location = expr.location();
                let body = self.parse_body()?;
                expr = Expression::Block {
                    header: Box::new(expr),
                    body: body,
                    location: location,
                };
            }
            expressions.push(expr);
        }
        Ok(expressions)
    }

    fn parse_expression(&mut self) -> Parse<Expression> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().tok {
                Tok::AndAnd => BinaryOp::And,
                Tok::OrOr => BinaryOp::Or,
                _ => return Ok(left),
            };
            let location = self.advance().location;
            let right = self.parse_comparison()?;
            left = Expression::Binary {
                op: op,
                left: Box::new(left),
                right: Box::new(right),
                location: location,
            };
        }
    }

    fn parse_comparison(&mut self) -> Parse<Expression> {
        let left = self.parse_additive()?;
        let op = match self.peek().tok {
            Tok::Equal => BinaryOp::Eq,
            Tok::NotEqual => BinaryOp::Ne,
            Tok::Less => BinaryOp::Lt,
            Tok::LessEq => BinaryOp::Le,
            Tok::Greater => BinaryOp::Gt,
            Tok::GreaterEq => BinaryOp::Ge,
            _ => return Ok(left),
        };
        let location = self.advance().location;
        let right = self.parse_additive()?;
        Ok(Expression::Binary {
            op: op,
            left: Box::new(left),
            right: Box::new(right),
            location: location,
        })
    }

    fn parse_additive(&mut self) -> Parse<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().tok {
                Tok::Plus => BinaryOp::Add,
                Tok::Dash => BinaryOp::Sub,
                _ => return Ok(left),
            };
            let location = self.advance().location;
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op: op,
                left: Box::new(left),
                right: Box::new(right),
                location: location,
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Parse<Expression> {
        let mut left = self.parse_call()?;
        loop {
            let op = match self.peek().tok {
                Tok::Asterisk => BinaryOp::Mul,
                Tok::Slash => BinaryOp::Div,
                Tok::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            let location = self.advance().location;
            let right = self.parse_call()?;
            left = Expression::Binary {
                op: op,
                left: Box::new(left),
                right: Box::new(right),
                location: location,
            };
        }
    }

    fn parse_call(&mut self) -> Parse<Expression> {
        let expr = self.parse_simple()?;
        if self.optional(&Tok::OpenParen) {
            let location = expr.location();
            let mut args = Vec::new();
            loop {
                if self.optional(&Tok::CloseParen) {
                    break;
                }
                if !args.is_empty() {
                    self.expect(Tok::Comma)?;
                }
                args.push(self.parse_expression()?);
            }
            return Ok(Expression::Call {
                func: Box::new(expr),
                args: args,
                location: location,
            });
        }
        Ok(expr)
    }

    fn parse_simple(&mut self) -> Parse<Expression> {
        let t = self.advance();
        let (expr, unit_allowed) = match t.tok {
            Tok::Identifier(name) => {
                (Expression::Identifier { name: name, location: t.location }, true)
            }
            Tok::At => {
                (Expression::Identifier { name: "@".to_string(), location: t.location }, false)
            }
            Tok::Str(value) => {
                (Expression::Str { value: value, location: t.location }, false)
            }
            Tok::Number(value) => {
                (Expression::Number { value: value, location: t.location }, true)
            }
            Tok::Dash => {
                let n = self.advance();
                match n.tok {
                    Tok::Number(value) => {
                        (Expression::Number { value: -value, location: t.location }, true)
                    }
                    other => {
                        self.log.log(ErrorCode::ExpectedToken(other.describe(),
                                                              "number".to_string()),
                                     n.location);
                        return Err(());
                    }
                }
            }
            Tok::OpenParen => {
                let e = self.parse_expression()?;
                self.expect(Tok::CloseParen)?;
                (e, true)
            }
            Tok::OpenBracket => {
                let mut values = Vec::new();
                loop {
                    if self.optional(&Tok::CloseBracket) {
                        break;
                    }
                    if !values.is_empty() {
                        self.expect(Tok::Comma)?;
                    }
                    values.push(self.parse_expression()?);
                }
                (Expression::Vector { values: values, location: t.location }, false)
            }
            other => {
                self.log.log(ErrorCode::ExpectedToken(other.describe(),
                                                      "expression".to_string()),
                             t.location);
                return Err(());
            }
        };
        if unit_allowed {
            if let Tok::Unit(unit) = self.peek().tok {
                let location = self.advance().location;
                return Ok(Expression::Dimension {
                    value: Box::new(expr),
                    unit: unit,
                    location: location,
                });
            }
        }
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ast::Unit;

    fn parse_ok(input: &str) -> File {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let ast = parse(file, input, &mut log);
        assert!(!log.has_errors(), "{:?}", log.errors());
        ast
    }

    #[test]
    fn parse_sample_plan() {
        let ast = parse_ok(r#"
tracks {
    "Einfahrt"
    @(120 mm, 120 mm, 0 mm, 180 deg)
    G1
    G1
    3 * R6
    "Ausfahrt"
}

ground {
    top(0 mm)
    left(0 mm)
    width(470 cm)
    height(194 cm)
}"#);
        assert_eq!(ast.statements.len(), 2);
        match &ast.statements[0] {
            Statement::Tracks { name, body, .. } => {
                assert!(name.is_none());
                assert_eq!(body.len(), 6);
                match &body[4] {
                    Expression::Binary { op: BinaryOp::Mul, .. } => {}
                    other => panic!("expected repeat, got {:?}", other),
                }
            }
            other => panic!("expected tracks, got {:?}", other),
        }
    }

    #[test]
    fn parse_named_tracks_with_parameters() {
        let ast = parse_ok("tracks Spindel(radius, count) {\n count * radius\n}\n");
        match &ast.statements[0] {
            Statement::Tracks { name, parameters, .. } => {
                assert_eq!(name.as_ref().unwrap(), "Spindel");
                assert_eq!(parameters, &vec!["radius".to_string(), "count".to_string()]);
            }
            other => panic!("expected tracks, got {:?}", other),
        }
    }

    #[test]
    fn parse_turnout_branches() {
        let ast = parse_ok("tracks {\n G1\n WR15 { left { G1 G1 } }\n G1\n}\n");
        match &ast.statements[0] {
            Statement::Tracks { body, .. } => {
                assert_eq!(body.len(), 3);
                match &body[1] {
                    Expression::Block { header, body, .. } => {
                        match header.as_ref() {
                            Expression::Identifier { name, .. } => assert_eq!(name, "WR15"),
                            other => panic!("bad header {:?}", other),
                        }
                        assert_eq!(body.len(), 1);
                    }
                    other => panic!("expected block, got {:?}", other),
                }
            }
            other => panic!("expected tracks, got {:?}", other),
        }
    }

    #[test]
    fn parse_layer_and_units() {
        let ast = parse_ok("layer mountain {\n color(\"#885511\")\n}\n");
        match &ast.statements[0] {
            Statement::Layer { name, body, .. } => {
                assert_eq!(name, "mountain");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected layer, got {:?}", other),
        }
        let ast = parse_ok("ground {\n width(470 cm)\n}\n");
        match &ast.statements[0] {
            Statement::Ground { body, .. } => match &body[0] {
                Expression::Call { args, .. } => match &args[0] {
                    Expression::Dimension { unit, .. } => assert_eq!(*unit, Unit::Cm),
                    other => panic!("expected dimension, got {:?}", other),
                },
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected ground, got {:?}", other),
        }
    }

    #[test]
    fn recovery_keeps_later_statements() {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let ast = parse(file, "tracks {\n G1 ( \n}\n\nlayer hills {\n color(\"#123\")\n}\n",
                        &mut log);
        assert!(log.has_errors());
        assert_eq!(ast.statements.len(), 1);
        match &ast.statements[0] {
            Statement::Layer { name, .. } => assert_eq!(name, "hills"),
            other => panic!("expected layer, got {:?}", other),
        }
    }

    #[test]
    fn unknown_directive_is_reported_once() {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let ast = parse(file, "switchboard {\n something\n}\ntracks {\n G1\n}\n", &mut log);
        assert_eq!(log.errors().len(), 1);
        assert_eq!(ast.statements.len(), 1);
    }
}
