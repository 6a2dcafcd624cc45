//! Reader for `.res` resource archives.
//!
//! An archive is an `IRES` container whose chunks come in pairs: a `NAME`
//! chunk followed by the chunk it names. Archive identifiers are stored in
//! reading order, unlike models.

use thiserror::Error;
use tracing::{debug, trace};

use crate::data::cursor::CursorError;
use crate::data::loop_file::{Chunk, FourCC, LoopError, LoopFile};
use crate::data::parser_utils::null_terminated_lossy;

pub const IRES: FourCC = FourCC::new(b"IRES");
pub const NAME: FourCC = FourCC::new(b"NAME");
pub const BODY: FourCC = FourCC::new(b"BODY");
pub const CSTR: FourCC = FourCC::new(b"CSTR");
pub const PATH: FourCC = FourCC::new(b"PATH");

/// Prefix archives use for entries relative to the archive itself.
pub const LOCAL_PREFIX: &str = "LOCAL:";

#[derive(Debug, Error)]
pub enum ResError {
    #[error(transparent)]
    Loop(#[from] LoopError),
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("not a RES archive: container type is {0}")]
    NotAnArchive(FourCC),
    #[error("unsupported archive chunk {0}")]
    UnsupportedChunk(FourCC),
    #[error("archive lists {paths} paths for {entries} entries")]
    PathCountMismatch { paths: usize, entries: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResEntryKind {
    /// Opaque file contents.
    Body,
    /// A text string.
    CString,
}

#[derive(Debug, Clone)]
pub struct ResEntry<'a> {
    pub name: String,
    pub kind: ResEntryKind,
    pub data: &'a [u8],
}

impl ResEntry<'_> {
    /// Name with any [`LOCAL_PREFIX`] removed.
    pub fn file_name(&self) -> &str {
        self.name.strip_prefix(LOCAL_PREFIX).unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ResArchive<'a> {
    pub entries: Vec<ResEntry<'a>>,
    /// The `PATH` listing: the naming chunk's value followed by one path per entry.
    pub paths: Vec<String>,
}

fn chunk_text(chunk: &Chunk<'_>) -> String {
    null_terminated_lossy(chunk.payload)
}

impl<'a> ResArchive<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ResError> {
        let mut loop_file = LoopFile::from_bytes(data, false)?;
        if !loop_file.is_container_for(IRES) {
            return Err(ResError::NotAnArchive(loop_file.container_type));
        }

        let mut entries = Vec::new();
        let mut paths = Vec::new();
        while loop_file.has_remaining() {
            let name = chunk_text(&loop_file.expect_chunk(NAME)?);
            let chunk = loop_file.next_chunk()?;
            trace!(%name, ident = %chunk.ident(), size = chunk.len(), "archive entry");

            let kind = match chunk.ident() {
                BODY => ResEntryKind::Body,
                CSTR => ResEntryKind::CString,
                PATH => {
                    paths.push(name);
                    paths.extend(chunk_text(&chunk).split(';').map(str::to_owned));
                    continue;
                }
                other => return Err(ResError::UnsupportedChunk(other)),
            };
            entries.push(ResEntry {
                name,
                kind,
                data: chunk.payload,
            });
        }

        if !paths.is_empty() && paths.len() - 1 != entries.len() {
            return Err(ResError::PathCountMismatch {
                paths: paths.len() - 1,
                entries: entries.len(),
            });
        }

        debug!(entries = entries.len(), "parsed RES archive");
        Ok(ResArchive { entries, paths })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names and contents, with the `LOCAL:` prefix stripped.
    pub fn files(&self) -> impl Iterator<Item = (&str, &'a [u8])> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.file_name(), entry.data))
    }
}
