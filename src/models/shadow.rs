//! Shadow volume mesh: `SMES` followed by `SVTX`, `SFAC` and `EDGE`.

use winnow::Parser;
use winnow::binary::{le_u16, le_u32};

use crate::data::loop_file::{Chunk, FourCC, LoopFile};
use crate::data::parser_utils::{Vec3, WResult, parse_u16_array, parse_vec3};
use crate::models::mef::MefError;

pub const SMES: FourCC = FourCC::new(b"SMES");
pub const SVTX: FourCC = FourCC::new(b"SVTX");
pub const SFAC: FourCC = FourCC::new(b"SFAC");
pub const EDGE: FourCC = FourCC::new(b"EDGE");

pub const SHADOW_HEADER_SIZE: usize = 28;
pub const SHADOW_FACE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowMeshHeader {
    pub fields: [u32; 7],
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowFace {
    pub indices: [u16; 3],
    pub edge_flags: u16,
    pub normal: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowMesh {
    pub header: ShadowMeshHeader,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<ShadowFace>,
    pub edges: Vec<[u16; 2]>,
}

fn parse_shadow_header(input: &mut &[u8]) -> WResult<ShadowMeshHeader> {
    let mut fields = [0u32; 7];
    for value in &mut fields {
        *value = le_u32.parse_next(input)?;
    }
    Ok(ShadowMeshHeader { fields })
}

fn parse_shadow_face(input: &mut &[u8]) -> WResult<ShadowFace> {
    Ok(ShadowFace {
        indices: parse_u16_array::<3>(input)?,
        edge_flags: le_u16.parse_next(input)?,
        normal: parse_vec3(input)?,
    })
}

pub fn parse_shadow_mesh(
    header_chunk: &Chunk<'_>,
    loop_file: &mut LoopFile<'_>,
) -> Result<ShadowMesh, MefError> {
    let header = header_chunk
        .cursor()
        .read_record(SHADOW_HEADER_SIZE, parse_shadow_header)?;
    let vertices = loop_file
        .expect_chunk(SVTX)?
        .cursor()
        .read_remaining_records(12, parse_vec3)?;
    let faces = loop_file
        .expect_chunk(SFAC)?
        .cursor()
        .read_remaining_records(SHADOW_FACE_SIZE, parse_shadow_face)?;
    let edges = loop_file
        .expect_chunk(EDGE)?
        .cursor()
        .read_remaining_records(4, parse_u16_array::<2>)?;

    Ok(ShadowMesh {
        header,
        vertices,
        faces,
        edges,
    })
}
