use serde_json::Error as JsonError;
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
    process::ExitStatus,
    time::Duration,
};

#[derive(Debug)]
pub enum G2pError {
    Io(IoError),
    Json(JsonError),
    AnyHow(anyhow::Error),
    UnknownDictionary(String),
    UnknownModel(String),
    ToolFailed { program: String, status: ExitStatus },
    ToolTimeout { program: String, after: Duration },
    Common(String),
}

impl Error for G2pError {}

impl Display for G2pError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Io(e) => Display::fmt(e, f),
            Self::Json(e) => Display::fmt(e, f),
            Self::AnyHow(e) => Display::fmt(e, f),
            Self::UnknownDictionary(id) => write!(f, "Missing dictionary id {}", id),
            Self::UnknownModel(id) => write!(f, "Missing G2P model {}", id),
            Self::ToolFailed { program, status } => write!(f, "{} failed: {}", program, status),
            Self::ToolTimeout { program, after } => {
                write!(f, "{} timed out after {:?}", program, after)
            }
            Self::Common(e) => Display::fmt(e, f),
        }
    }
}

impl From<IoError> for G2pError {
    fn from(value: IoError) -> Self {
        Self::Io(value)
    }
}

impl From<JsonError> for G2pError {
    fn from(value: JsonError) -> Self {
        Self::Json(value)
    }
}

impl From<anyhow::Error> for G2pError {
    fn from(value: anyhow::Error) -> Self {
        Self::AnyHow(value)
    }
}

impl From<String> for G2pError {
    fn from(value: String) -> Self {
        Self::Common(value)
    }
}

impl From<&str> for G2pError {
    fn from(value: &str) -> Self {
        Self::Common(value.into())
    }
}

/// A single dictionary line that could not be indexed. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub dictionary_id: String,
    pub line: usize,
    pub reason: String,
}

impl Error for LineError {}

impl Display for LineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {} (line {})", self.dictionary_id, self.reason, self.line)
    }
}
