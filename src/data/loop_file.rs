//! Parser for ILFF chunk containers.
//!
//! Every IGI 2 asset in this family is framed the same way: a 16-byte root
//! header whose identifier is `ILFF`, a 4-byte container type tag, and then a
//! back-to-back run of chunks until the end of the file. Each chunk is a 16-byte
//! header followed by `data_size` payload bytes, after which the stream is padded
//! to the chunk's alignment:
//!
//! ```text
//! [ident: 4][data_size: u32][alignment: u32][next_offset: u32][payload ...][pad]
//! ```
//!
//! Model files store their chunk identifiers byte-reversed (`HSEM` on disk for
//! `MESH`); archives do not. Nothing in the bytes tells the two apart, so the
//! caller picks the flavor.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::data::cursor::{ByteCursor, CursorError};

/// A four character chunk or container identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    pub const fn reversed(self) -> Self {
        let [a, b, c, d] = self.0;
        Self([d, c, b, a])
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

impl PartialEq<str> for FourCC {
    fn eq(&self, other: &str) -> bool {
        self.0.as_slice() == other.as_bytes()
    }
}

impl PartialEq<&str> for FourCC {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// Identifier every container's root header must carry.
pub const ILFF: FourCC = FourCC::new(b"ILFF");

#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("invalid ILFF header, got {0}")]
    InvalidContainerHeader(FourCC),
    #[error("no chunks left in the container")]
    EmptyWorklist,
    #[error("expected chunk {expected}, got {}", describe_actual(.actual))]
    UnexpectedChunk {
        expected: FourCC,
        actual: Option<FourCC>,
    },
    #[error("found {count} chunks with the {ident} ident, expected at most one")]
    AmbiguousChunk { ident: FourCC, count: usize },
}

fn describe_actual(actual: &Option<FourCC>) -> String {
    match actual {
        Some(ident) => ident.to_string(),
        None => "end of container".to_owned(),
    }
}

/// The fixed 16-byte header preceding every chunk (and the container itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkHeader {
    pub ident: FourCC,
    pub data_size: u32,
    pub alignment: u32,
    /// Offset of the following chunk as recorded by the exporter. Not used for traversal.
    pub next_offset: u32,
}

impl ChunkHeader {
    pub const SIZE: usize = 16;

    pub fn read(cursor: &mut ByteCursor<'_>, flip_ident: bool) -> Result<Self, CursorError> {
        let ident = FourCC(cursor.read_tag()?);
        let ident = if flip_ident { ident.reversed() } else { ident };
        let data_size = cursor.read_u32()?;
        let alignment = cursor.read_u32()?;
        let next_offset = cursor.read_u32()?;
        Ok(ChunkHeader {
            ident,
            data_size,
            alignment,
            next_offset,
        })
    }
}

/// A chunk header together with its bounded payload.
#[derive(Debug, Clone)]
pub struct Chunk<'a> {
    pub header: ChunkHeader,
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn ident(&self) -> FourCC {
        self.header.ident
    }

    /// A fresh cursor over exactly this chunk's payload.
    pub fn cursor(&self) -> ByteCursor<'a> {
        ByteCursor::new(self.payload)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A parsed container: root header, type tag and the worklist of unconsumed chunks.
#[derive(Debug)]
pub struct LoopFile<'a> {
    pub root_header: ChunkHeader,
    pub container_type: FourCC,
    chunks: VecDeque<Chunk<'a>>,
}

impl<'a> LoopFile<'a> {
    /// Parse a whole container from `data`.
    pub fn from_bytes(data: &'a [u8], flip_ident: bool) -> Result<Self, LoopError> {
        Self::parse(&mut ByteCursor::new(data), flip_ident)
    }

    /// Parse a container, consuming the cursor to its end.
    ///
    /// The root header is never flipped; `flip_ident` only applies to the chunks.
    pub fn parse(cursor: &mut ByteCursor<'a>, flip_ident: bool) -> Result<Self, LoopError> {
        let root_header = ChunkHeader::read(cursor, false)?;
        if root_header.ident != ILFF {
            return Err(LoopError::InvalidContainerHeader(root_header.ident));
        }

        let container_type = FourCC(cursor.read_tag()?);

        let mut chunks = VecDeque::new();
        while cursor.has_remaining() {
            let offset = cursor.tell();
            let header = ChunkHeader::read(cursor, flip_ident)?;
            let payload = cursor.read_bytes(header.data_size as usize)?;
            cursor.align(header.alignment as usize);
            trace!(
                ident = %header.ident,
                offset,
                size = header.data_size,
                alignment = header.alignment,
                "parsed chunk"
            );
            chunks.push_back(Chunk { header, payload });
        }

        Ok(LoopFile {
            root_header,
            container_type,
            chunks,
        })
    }

    pub fn is_container_for(&self, container_type: FourCC) -> bool {
        self.container_type == container_type
    }

    /// Whether unconsumed chunks remain.
    pub fn has_remaining(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn remaining_len(&self) -> usize {
        self.chunks.len()
    }

    /// Iterate over the unconsumed chunks without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk<'a>> {
        self.chunks.iter()
    }

    /// Pop the first unconsumed chunk.
    pub fn next_chunk(&mut self) -> Result<Chunk<'a>, LoopError> {
        self.chunks.pop_front().ok_or(LoopError::EmptyWorklist)
    }

    /// Pop the first unconsumed chunk if it carries `ident`.
    ///
    /// On a mismatch (or an empty worklist) nothing is consumed.
    pub fn expect_chunk(&mut self, ident: FourCC) -> Result<Chunk<'a>, LoopError> {
        let actual = self.chunks.front().map(Chunk::ident);
        if actual != Some(ident) {
            return Err(LoopError::UnexpectedChunk {
                expected: ident,
                actual,
            });
        }
        self.next_chunk()
    }

    /// Look up the single unconsumed chunk carrying `ident` without consuming it.
    pub fn find_chunk(&self, ident: FourCC) -> Result<Option<&Chunk<'a>>, LoopError> {
        let mut matches = self.chunks.iter().filter(|chunk| chunk.ident() == ident);
        let first = matches.next();
        let extra = matches.count();
        if extra > 0 {
            return Err(LoopError::AmbiguousChunk {
                ident,
                count: extra + 1,
            });
        }
        Ok(first)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ContainerWriter;
    use super::*;

    fn sample_container(flip: bool) -> Vec<u8> {
        ContainerWriter::new(b"MEF ", flip)
            .chunk(b"MESH", &[1, 2, 3, 4, 5])
            .chunk_aligned(b"HIER", &[9; 7], 16)
            .chunk(b"BNAM", &[])
            .chunk_aligned(b"ATTA", &[7; 3], 0)
            .finish()
    }

    /// Write the parsed container back out: headers, payloads and zero padding.
    fn reemit(file: &LoopFile<'_>, flip: bool) -> Vec<u8> {
        let mut out = Vec::new();
        let root = &file.root_header;
        out.extend_from_slice(root.ident.as_bytes());
        for v in [root.data_size, root.alignment, root.next_offset] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(file.container_type.as_bytes());
        for chunk in file.iter() {
            let h = &chunk.header;
            let ident = if flip { h.ident.reversed() } else { h.ident };
            out.extend_from_slice(ident.as_bytes());
            for v in [h.data_size, h.alignment, h.next_offset] {
                out.extend_from_slice(&v.to_le_bytes());
            }
            out.extend_from_slice(chunk.payload);
            if h.alignment > 1 {
                out.resize(out.len().next_multiple_of(h.alignment as usize), 0);
            }
        }
        out
    }

    #[test]
    fn framing_reemits_identical_bytes() {
        for flip in [false, true] {
            let bytes = sample_container(flip);
            let file = LoopFile::from_bytes(&bytes, flip).unwrap();
            assert_eq!(file.remaining_len(), 4);
            assert_eq!(reemit(&file, flip), bytes);
        }
    }

    #[test]
    fn flipped_identifiers_are_reversed() {
        let bytes = sample_container(true);
        let file = LoopFile::from_bytes(&bytes, true).unwrap();
        assert!(file.is_container_for(FourCC::new(b"MEF ")));
        let idents: Vec<String> = file.iter().map(|c| c.ident().to_string()).collect();
        assert_eq!(idents, ["MESH", "HIER", "BNAM", "ATTA"]);

        let unflipped = LoopFile::from_bytes(&bytes, false).unwrap();
        assert_eq!(unflipped.iter().next().unwrap().ident(), "HSEM");
    }

    #[test]
    fn payloads_are_bounded() {
        let bytes = sample_container(false);
        let mut file = LoopFile::from_bytes(&bytes, false).unwrap();
        let mesh = file.next_chunk().unwrap();
        assert_eq!(mesh.payload, &[1, 2, 3, 4, 5]);
        let mut cursor = mesh.cursor();
        cursor.skip(4).unwrap();
        assert!(cursor.read_u16().is_err());
    }

    #[test]
    fn rejects_bad_root_ident() {
        let mut bytes = sample_container(false);
        bytes[0..4].copy_from_slice(b"FFLI");
        match LoopFile::from_bytes(&bytes, false) {
            Err(LoopError::InvalidContainerHeader(ident)) => assert_eq!(ident, "FFLI"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn oversized_payload_is_truncated_data() {
        let mut bytes = ContainerWriter::new(b"MEF ", false)
            .chunk(b"MESH", &[0; 8])
            .finish();
        // Claim a payload larger than the file.
        bytes[24..28].copy_from_slice(&64u32.to_le_bytes());
        assert!(matches!(
            LoopFile::from_bytes(&bytes, false),
            Err(LoopError::Cursor(CursorError::TruncatedData { need: 64, .. }))
        ));
    }

    #[test]
    fn expect_never_consumes_on_mismatch() {
        let bytes = sample_container(true);
        let mut file = LoopFile::from_bytes(&bytes, true).unwrap();

        match file.expect_chunk(FourCC::new(b"HIER")) {
            Err(LoopError::UnexpectedChunk { expected, actual }) => {
                assert_eq!(expected, "HIER");
                assert_eq!(actual, Some(FourCC::new(b"MESH")));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(file.remaining_len(), 4);
        assert_eq!(
            file.expect_chunk(FourCC::new(b"MESH")).unwrap().ident(),
            "MESH"
        );
        assert_eq!(file.remaining_len(), 3);
    }

    #[test]
    fn expect_on_empty_worklist() {
        let bytes = ContainerWriter::new(b"MEF ", true).finish();
        let mut file = LoopFile::from_bytes(&bytes, true).unwrap();
        assert!(!file.has_remaining());
        match file.expect_chunk(FourCC::new(b"BNAM")) {
            Err(LoopError::UnexpectedChunk { expected, actual }) => {
                assert_eq!(expected, "BNAM");
                assert_eq!(actual, None);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(file.next_chunk(), Err(LoopError::EmptyWorklist)));
    }

    #[test]
    fn find_is_idempotent_and_rejects_duplicates() {
        let bytes = ContainerWriter::new(b"IRES", false)
            .chunk(b"NAME", b"a")
            .chunk(b"BODY", &[1])
            .chunk(b"NAME", b"b")
            .finish();
        let file = LoopFile::from_bytes(&bytes, false).unwrap();

        let body = file.find_chunk(FourCC::new(b"BODY")).unwrap().unwrap();
        assert_eq!(body.payload, &[1]);
        assert!(file.find_chunk(FourCC::new(b"BODY")).unwrap().is_some());
        assert!(file.find_chunk(FourCC::new(b"PATH")).unwrap().is_none());
        assert_eq!(file.remaining_len(), 3);

        assert!(matches!(
            file.find_chunk(FourCC::new(b"NAME")),
            Err(LoopError::AmbiguousChunk { count: 2, .. })
        ));
    }

    #[test]
    fn ambiguity_is_positional_independent() {
        let bytes = ContainerWriter::new(b"IRES", false)
            .chunk(b"BODY", &[])
            .chunk(b"NAME", b"x")
            .chunk(b"PATH", &[])
            .chunk(b"BODY", &[])
            .finish();
        let file = LoopFile::from_bytes(&bytes, false).unwrap();
        assert!(matches!(
            file.find_chunk(FourCC::new(b"BODY")),
            Err(LoopError::AmbiguousChunk { count: 2, .. })
        ));
    }
}
