//! Collision mesh: a `CMSH` header followed by `CVTX`, `CFCE`, `CMAT` and `CSPH`.

use winnow::Parser;
use winnow::binary::le_u32;

use crate::data::loop_file::{Chunk, FourCC, LoopFile};
use crate::data::parser_utils::{
    Sphere, Vec3, WResult, parse_sphere, parse_u16_array, parse_uv, parse_vec3,
};
use crate::models::mef::MefError;

pub const CMSH: FourCC = FourCC::new(b"CMSH");
pub const CVTX: FourCC = FourCC::new(b"CVTX");
pub const CFCE: FourCC = FourCC::new(b"CFCE");
pub const CMAT: FourCC = FourCC::new(b"CMAT");
pub const CSPH: FourCC = FourCC::new(b"CSPH");

pub const COLLISION_HEADER_SIZE: usize = 64;
pub const COLLISION_VERTEX_SIZE: usize = 20;
pub const COLLISION_FACE_SIZE: usize = 12;
pub const COLLISION_SPHERE_SIZE: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionMeshHeader {
    pub face_count: u32,
    pub vertex_count: u32,
    pub material_count: u32,
    pub sphere_count: u32,
    pub unknown: [u32; 12],
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionVertex {
    pub position: Vec3,
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionFace {
    pub indices: [u16; 3],
    pub flags: [u16; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionSphere {
    pub sphere: Sphere,
    pub unknown: [u16; 4],
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionMesh {
    pub header: CollisionMeshHeader,
    pub vertices: Vec<CollisionVertex>,
    pub faces: Vec<CollisionFace>,
    /// Raw `CMAT` payload; its record layout is not known.
    pub materials: Vec<u8>,
    pub spheres: Vec<CollisionSphere>,
}

fn parse_collision_header(input: &mut &[u8]) -> WResult<CollisionMeshHeader> {
    let face_count = le_u32.parse_next(input)?;
    let vertex_count = le_u32.parse_next(input)?;
    let material_count = le_u32.parse_next(input)?;
    let sphere_count = le_u32.parse_next(input)?;
    let mut unknown = [0u32; 12];
    for value in &mut unknown {
        *value = le_u32.parse_next(input)?;
    }
    Ok(CollisionMeshHeader {
        face_count,
        vertex_count,
        material_count,
        sphere_count,
        unknown,
    })
}

fn parse_collision_vertex(input: &mut &[u8]) -> WResult<CollisionVertex> {
    Ok(CollisionVertex {
        position: parse_vec3(input)?,
        uv: parse_uv(input)?,
    })
}

fn parse_collision_face(input: &mut &[u8]) -> WResult<CollisionFace> {
    Ok(CollisionFace {
        indices: parse_u16_array::<3>(input)?,
        flags: parse_u16_array::<3>(input)?,
    })
}

fn parse_collision_sphere(input: &mut &[u8]) -> WResult<CollisionSphere> {
    Ok(CollisionSphere {
        sphere: parse_sphere(input)?,
        unknown: parse_u16_array::<4>(input)?,
    })
}

/// Decode a collision mesh whose `CMSH` chunk has already been taken off the worklist.
pub fn parse_collision_mesh(
    header_chunk: &Chunk<'_>,
    loop_file: &mut LoopFile<'_>,
) -> Result<CollisionMesh, MefError> {
    let header = header_chunk
        .cursor()
        .read_record(COLLISION_HEADER_SIZE, parse_collision_header)?;

    let vertices = loop_file
        .expect_chunk(CVTX)?
        .cursor()
        .read_remaining_records(COLLISION_VERTEX_SIZE, parse_collision_vertex)?;
    let faces = loop_file
        .expect_chunk(CFCE)?
        .cursor()
        .read_remaining_records(COLLISION_FACE_SIZE, parse_collision_face)?;
    let materials = loop_file.expect_chunk(CMAT)?.payload.to_vec();
    let spheres = loop_file
        .expect_chunk(CSPH)?
        .cursor()
        .read_remaining_records(COLLISION_SPHERE_SIZE, parse_collision_sphere)?;

    Ok(CollisionMesh {
        header,
        vertices,
        faces,
        materials,
        spheres,
    })
}
