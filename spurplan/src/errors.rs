use std::fmt;

/// Position of a token or statement in a source file. Files are identified
/// by the index assigned by `ErrorLog::add_file`.
#[derive(Debug,Clone,Copy,PartialEq,Default)]
pub struct Location {
    pub file: usize,
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(file: usize, line: u32, col: u32) -> Location {
        Location { file: file, line: line, col: col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Positioning,
    Internal,
}

#[derive(Debug,Clone,PartialEq)]
pub enum ErrorCode {
    // Lexer
    IllegalNumber(String),
    IllegalCharacter(String),
    IllegalString,
    // Parser
    ExpectedToken(String, String),
    UnexpectedEof,
    UnknownDirective(String),
    // Evaluation
    UnknownIdentifier(String),
    NotAFunction,
    ArgumentCountMismatch(usize),
    TypeMismatch,
    IllegalInThisContext,
    UnknownTrackType(String),
    UnknownLayer(String),
    DuplicateLayer(String),
    DuplicateIdentifier(String),
    // Track building
    TrackConnectedTwice,
    TrackMarkDefinedTwice(String),
    IllegalTurnoutBranch(&'static str),
    NoFreeTurnoutConnection,
    // Positioning
    TrackPositionedTwice,
    TracksWithoutPosition(String),
    // Broken invariants that abort the current build only
    Internal(String),
}

impl ErrorCode {
    pub fn kind(&self) -> ErrorKind {
        use self::ErrorCode::*;
        match *self {
            IllegalNumber(_) | IllegalCharacter(_) | IllegalString
            | ExpectedToken(_, _) | UnexpectedEof | UnknownDirective(_) => ErrorKind::Syntax,
            TrackPositionedTwice | TracksWithoutPosition(_) => ErrorKind::Positioning,
            Internal(_) => ErrorKind::Internal,
            _ => ErrorKind::Semantic,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ErrorCode::*;
        match *self {
            IllegalNumber(ref s) => write!(f, "Illegal number {}", s),
            IllegalCharacter(ref s) => write!(f, "Illegal character {}", s),
            IllegalString => write!(f, "Illegal string literal"),
            ExpectedToken(ref got, ref want) => write!(f, "Expected {}, got {}", want, got),
            UnexpectedEof => write!(f, "Unexpected end of file"),
            UnknownDirective(ref s) => write!(f, "Unknown directive {}", s),
            UnknownIdentifier(ref s) => write!(f, "Unknown identifier {}", s),
            NotAFunction => write!(f, "Expression cannot be called"),
            ArgumentCountMismatch(n) => write!(f, "Expected {} arguments", n),
            TypeMismatch => write!(f, "Type mismatch"),
            IllegalInThisContext => write!(f, "Value is not allowed in this context"),
            UnknownTrackType(ref s) => write!(f, "Unknown track type {}", s),
            UnknownLayer(ref s) => write!(f, "Unknown layer {}", s),
            DuplicateLayer(ref s) => write!(f, "Layer {} defined twice", s),
            DuplicateIdentifier(ref s) => write!(f, "Identifier {} defined twice", s),
            TrackConnectedTwice => write!(f, "Track connection is already connected"),
            TrackMarkDefinedTwice(ref s) => write!(f, "Track mark {} defined twice", s),
            IllegalTurnoutBranch(name) => write!(f, "Branch {} is not available on this turnout", name),
            NoFreeTurnoutConnection => write!(f, "No free connection left on turnout"),
            TrackPositionedTwice => write!(f, "Track has been positioned twice"),
            TracksWithoutPosition(ref layer) if layer.is_empty() => {
                write!(f, "Tracks without position")
            }
            TracksWithoutPosition(ref layer) => {
                write!(f, "Tracks without position in layer {}", layer)
            }
            Internal(ref s) => write!(f, "Internal error: {}", s),
        }
    }
}

#[derive(Debug,Clone,PartialEq,Fail)]
#[fail(display = "{}: {}", location, code)]
pub struct Error {
    pub code: ErrorCode,
    pub location: Location,
}

#[derive(Debug,Clone)]
pub struct SourceFile {
    pub path: String,
}

/// Collects diagnostics across the whole pipeline. One failing statement
/// does not stop independent statements from being checked, so the log can
/// hold several errors after a single pass.
#[derive(Debug)]
pub struct ErrorLog {
    errors: Vec<Error>,
    warnings: Vec<Error>,
    files: Vec<SourceFile>,
}

impl ErrorLog {
    pub fn new() -> ErrorLog {
        ErrorLog {
            errors: Vec::new(),
            warnings: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn add_file(&mut self, path: &str) -> usize {
        self.files.push(SourceFile { path: path.to_string() });
        self.files.len() - 1
    }

    pub fn file(&self, id: usize) -> Option<&SourceFile> {
        self.files.get(id)
    }

    /// Records the error and hands it back so call sites can both log and
    /// abort the enclosing block with `return Err(..)`.
    pub fn log(&mut self, code: ErrorCode, location: Location) -> Error {
        let err = Error { code: code, location: location };
        self.errors.push(err.clone());
        err
    }

    pub fn warn(&mut self, code: ErrorCode, location: Location) {
        self.warnings.push(Error { code: code, location: location });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    pub fn print(&self) {
        for e in &self.errors {
            let path = self.files.get(e.location.file).map(|f| f.path.as_str()).unwrap_or("?");
            eprintln!("{}:{}: error: {}", path, e.location, e.code);
        }
        for w in &self.warnings {
            let path = self.files.get(w.location.file).map(|f| f.path.as_str()).unwrap_or("?");
            eprintln!("{}:{}: warning: {}", path, w.location, w.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_collects_and_classifies() {
        let mut log = ErrorLog::new();
        let file = log.add_file("plan.fv");
        assert!(!log.has_errors());
        log.log(ErrorCode::UnknownTrackType("XYZZY".to_string()),
                Location::new(file, 3, 5));
        log.log(ErrorCode::TrackPositionedTwice, Location::new(file, 7, 1));
        assert!(log.has_errors());
        assert_eq!(log.errors().len(), 2);
        assert_eq!(log.errors()[0].code.kind(), ErrorKind::Semantic);
        assert_eq!(log.errors()[1].code.kind(), ErrorKind::Positioning);
    }

    #[test]
    fn error_display_includes_location() {
        let err = Error {
            code: ErrorCode::UnknownLayer("mountain".to_string()),
            location: Location::new(0, 12, 4),
        };
        assert_eq!(format!("{}", err), "12:4: Unknown layer mountain");
    }
}
