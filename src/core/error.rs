use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Syntax,
    InvalidArgument,
    InsufficientData,

    // Builder limits
    TokenTooLong,
    PayloadTooLong,

    // Wire receive validation
    InvalidLexeme,
    InvalidPositionCount,
    MisorderedPositions,
    InvalidVectorSize,

    // Position codec
    ValueOutOfRange,

    // Stored buffers
    CorruptVector,
    CorruptLegacyVector,
    LegacyFormat,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("config error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
