use std::path::PathBuf;

use thiserror::Error;

use crate::data::cursor::CursorError;
use crate::data::loop_file::LoopError;
use crate::data::res::ResError;
use crate::models::mef::MefError;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("Failed to decode model: {0}")]
    Mef(#[from] MefError),
    #[error("Failed to decode archive: {0}")]
    Res(#[from] ResError),
    #[error("Malformed container: {0}")]
    Loop(#[from] LoopError),
    #[error("Read past end of data: {0}")]
    Cursor(#[from] CursorError),
    #[cfg(feature = "json")]
    #[error("Error serializing or deserializing json: {err}")]
    SerdeJson {
        #[from]
        err: serde_json::Error,
    },
    #[error("Archive entry escapes the output directory: {0}")]
    UnsafeEntryPath(String),
    #[error("I/O error on {}: {err}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

impl ErrorKind {
    pub fn file_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        ErrorKind::FileIo {
            path: path.into(),
            err,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind }
    }
}

impl std::convert::From<MefError> for Error {
    fn from(x: MefError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<ResError> for Error {
    fn from(x: ResError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<LoopError> for Error {
    fn from(x: LoopError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<CursorError> for Error {
    fn from(x: CursorError) -> Error {
        Error { kind: x.into() }
    }
}

#[cfg(feature = "json")]
impl std::convert::From<serde_json::Error> for Error {
    fn from(x: serde_json::Error) -> Error {
        Error { kind: x.into() }
    }
}

pub type IResult<T> = Result<T, Error>;
