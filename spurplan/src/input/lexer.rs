use std::iter::Peekable;
use std::str::Chars;

use crate::errors::{ErrorCode, ErrorLog, Location};
use super::ast::Unit;

#[derive(Debug,Clone,PartialEq)]
pub enum Tok {
    Identifier(String),
    Str(String),
    Number(f64),
    Unit(Unit),
    At,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Asterisk,
    Slash,
    Percent,
    Plus,
    Dash,
    Equal,
    NotEqual,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Newline,
    Eof,
}

impl Tok {
    pub fn describe(&self) -> String {
        match *self {
            Tok::Identifier(ref s) => format!("identifier {}", s),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Number(_) => "number".to_string(),
            Tok::Unit(_) => "unit".to_string(),
            Tok::At => "@".to_string(),
            Tok::OpenParen => "(".to_string(),
            Tok::CloseParen => ")".to_string(),
            Tok::OpenBrace => "{".to_string(),
            Tok::CloseBrace => "}".to_string(),
            Tok::OpenBracket => "[".to_string(),
            Tok::CloseBracket => "]".to_string(),
            Tok::Comma => ",".to_string(),
            Tok::Asterisk => "*".to_string(),
            Tok::Slash => "/".to_string(),
            Tok::Percent => "%".to_string(),
            Tok::Plus => "+".to_string(),
            Tok::Dash => "-".to_string(),
            Tok::Equal => "==".to_string(),
            Tok::NotEqual => "!=".to_string(),
            Tok::Less => "<".to_string(),
            Tok::LessEq => "<=".to_string(),
            Tok::Greater => ">".to_string(),
            Tok::GreaterEq => ">=".to_string(),
            Tok::AndAnd => "&&".to_string(),
            Tok::OrOr => "||".to_string(),
            Tok::Newline => "newline".to_string(),
            Tok::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Debug,Clone,PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub location: Location,
}

struct Scanner<'a> {
    input: Peekable<Chars<'a>>,
    file: usize,
    line: u32,
    col: u32,
}

impl<'a> Scanner<'a> {
    fn location(&self) -> Location {
        Location::new(self.file, self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.input.next();
        match ch {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some(_) => {
                self.col += 1;
            }
            None => {}
        }
        ch
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().cloned()
    }

    fn consume_while<F>(&mut self, f: F) -> String
        where F: Fn(char) -> bool
    {
        let mut s = String::new();
        while let Some(ch) = self.peek() {
            if f(ch) {
                self.bump();
                s.push(ch);
            } else {
                break;
            }
        }
        s
    }
}

/// Turns the whole input into a token vector, logging lexical errors and
/// skipping the offending characters so the parser always sees a stream
/// that ends in `Eof`.
pub fn lex(file: usize, input: &str, log: &mut ErrorLog) -> Vec<Token> {
    let mut s = Scanner {
        input: input.chars().peekable(),
        file: file,
        line: 1,
        col: 1,
    };
    let mut tokens = Vec::new();
    loop {
        let loc = s.location();
        let ch = match s.peek() {
            Some(ch) => ch,
            None => break,
        };
        match ch {
            ' ' | '\t' | '\r' => {
                s.bump();
            }
            '\n' => {
                s.bump();
                tokens.push(Token { tok: Tok::Newline, location: loc });
            }
            x if x.is_ascii_digit() => {
                let num = s.consume_while(|a| a.is_ascii_digit() || a == '.');
                match num.parse::<f64>() {
                    Ok(v) => tokens.push(Token { tok: Tok::Number(v), location: loc }),
                    Err(_) => {
                        log.log(ErrorCode::IllegalNumber(num), loc);
                    }
                }
            }
            x if x.is_alphabetic() || x == '_' => {
                let word = s.consume_while(|a| a.is_alphanumeric() || a == '_');
                let tok = match word.as_str() {
                    "mm" => Tok::Unit(Unit::Mm),
                    "cm" => Tok::Unit(Unit::Cm),
                    "m" => Tok::Unit(Unit::M),
                    "deg" => Tok::Unit(Unit::Deg),
                    _ => Tok::Identifier(word),
                };
                tokens.push(Token { tok: tok, location: loc });
            }
            '"' => {
                s.bump();
                let mut value = String::new();
                let mut terminated = false;
                while let Some(ch) = s.bump() {
                    match ch {
                        '"' => {
                            terminated = true;
                            break;
                        }
                        '\n' => break,
                        '\\' => match s.bump() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(e) => value.push(e),
                            None => break,
                        },
                        _ => value.push(ch),
                    }
                }
                if terminated {
                    tokens.push(Token { tok: Tok::Str(value), location: loc });
                } else {
                    log.log(ErrorCode::IllegalString, loc);
                }
            }
            '`' => {
                s.bump();
                let value = s.consume_while(|a| a != '`');
                if s.bump().is_some() {
                    tokens.push(Token { tok: Tok::Str(value), location: loc });
                } else {
                    log.log(ErrorCode::IllegalString, loc);
                }
            }
            '/' => {
                s.bump();
                match s.peek() {
                    Some('/') => {
                        s.consume_while(|a| a != '\n');
                    }
                    Some('*') => {
                        s.bump();
                        loop {
                            match s.bump() {
                                Some('*') => {
                                    if s.peek() == Some('/') {
                                        s.bump();
                                        break;
                                    }
                                }
                                Some(_) => {}
                                None => break,
                            }
                        }
                    }
                    _ => tokens.push(Token { tok: Tok::Slash, location: loc }),
                }
            }
            '=' => {
                s.bump();
                if s.peek() == Some('=') {
                    s.bump();
                    tokens.push(Token { tok: Tok::Equal, location: loc });
                } else {
                    log.log(ErrorCode::IllegalCharacter("=".to_string()), loc);
                }
            }
            '!' => {
                s.bump();
                if s.peek() == Some('=') {
                    s.bump();
                    tokens.push(Token { tok: Tok::NotEqual, location: loc });
                } else {
                    log.log(ErrorCode::IllegalCharacter("!".to_string()), loc);
                }
            }
            '<' => {
                s.bump();
                if s.peek() == Some('=') {
                    s.bump();
                    tokens.push(Token { tok: Tok::LessEq, location: loc });
                } else {
                    tokens.push(Token { tok: Tok::Less, location: loc });
                }
            }
            '>' => {
                s.bump();
                if s.peek() == Some('=') {
                    s.bump();
                    tokens.push(Token { tok: Tok::GreaterEq, location: loc });
                } else {
                    tokens.push(Token { tok: Tok::Greater, location: loc });
                }
            }
            '&' => {
                s.bump();
                if s.peek() == Some('&') {
                    s.bump();
                    tokens.push(Token { tok: Tok::AndAnd, location: loc });
                } else {
                    log.log(ErrorCode::IllegalCharacter("&".to_string()), loc);
                }
            }
            '|' => {
                s.bump();
                if s.peek() == Some('|') {
                    s.bump();
                    tokens.push(Token { tok: Tok::OrOr, location: loc });
                } else {
                    log.log(ErrorCode::IllegalCharacter("|".to_string()), loc);
                }
            }
            _ => {
                s.bump();
                let tok = match ch {
                    '@' => Some(Tok::At),
                    '(' => Some(Tok::OpenParen),
                    ')' => Some(Tok::CloseParen),
                    '{' => Some(Tok::OpenBrace),
                    '}' => Some(Tok::CloseBrace),
                    '[' => Some(Tok::OpenBracket),
                    ']' => Some(Tok::CloseBracket),
                    ',' => Some(Tok::Comma),
                    '*' => Some(Tok::Asterisk),
                    '%' => Some(Tok::Percent),
                    '+' => Some(Tok::Plus),
                    '-' => Some(Tok::Dash),
                    _ => None,
                };
                match tok {
                    Some(t) => tokens.push(Token { tok: t, location: loc }),
                    None => {
                        log.log(ErrorCode::IllegalCharacter(ch.to_string()), loc);
                    }
                }
            }
        }
    }
    tokens.push(Token { tok: Tok::Eof, location: s.location() });
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<Tok> {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let tokens = lex(file, input, &mut log);
        assert!(!log.has_errors(), "{:?}", log.errors());
        tokens.into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn lex_tracks_header() {
        assert_eq!(toks("tracks {"),
                   vec![Tok::Identifier("tracks".to_string()), Tok::OpenBrace, Tok::Eof]);
    }

    #[test]
    fn lex_anchor_with_units() {
        assert_eq!(toks("@(120 mm, 2 cm, 0 m, 180 deg)"),
                   vec![Tok::At, Tok::OpenParen,
                        Tok::Number(120.0), Tok::Unit(Unit::Mm), Tok::Comma,
                        Tok::Number(2.0), Tok::Unit(Unit::Cm), Tok::Comma,
                        Tok::Number(0.0), Tok::Unit(Unit::M), Tok::Comma,
                        Tok::Number(180.0), Tok::Unit(Unit::Deg),
                        Tok::CloseParen, Tok::Eof]);
    }

    #[test]
    fn lex_strings_and_comments() {
        assert_eq!(toks("\"Einfahrt\" // rest of line\n`raw` /* block */ G1"),
                   vec![Tok::Str("Einfahrt".to_string()), Tok::Newline,
                        Tok::Str("raw".to_string()),
                        Tok::Identifier("G1".to_string()), Tok::Eof]);
    }

    #[test]
    fn lex_reports_bad_characters() {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let tokens = lex(file, "G1 ? G1", &mut log);
        assert!(log.has_errors());
        // The bad character is skipped, the rest of the stream survives.
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn lex_tracks_line_numbers() {
        let mut log = ErrorLog::new();
        let file = log.add_file("test");
        let tokens = lex(file, "G1\n  G05", &mut log);
        assert_eq!(tokens[0].location.line, 1);
        assert_eq!(tokens[2].location.line, 2);
        assert_eq!(tokens[2].location.col, 3);
    }
}
