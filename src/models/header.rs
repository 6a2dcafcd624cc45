//! The `MESH` chunk: model-wide header carrying the model type and the counts
//! the other chunks are sized by.

use std::fmt;

use tracing::trace;
use variantly::Variantly;
use winnow::Parser;
use winnow::binary::{le_f32, le_i32, le_u16, le_u32};

use crate::data::cursor::CursorError;
use crate::data::loop_file::{Chunk, FourCC};
use crate::data::parser_utils::{Sphere, WResult, parse_sphere};
use crate::recognized::Recognized;

pub const MESH: FourCC = FourCC::new(b"MESH");

/// Size of the decoded part of a `MESH` payload.
pub const MESH_HEADER_SIZE: usize = 0xB0;

/// Selects the vertex and face group layouts of the render mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Variantly)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelType {
    StaticModel,
    SkinnedModel,
    /// Never shipped. Models carrying it cannot be decoded.
    Reserved,
    LightmappedModel,
}

impl TryFrom<u32> for ModelType {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ModelType::StaticModel),
            1 => Ok(ModelType::SkinnedModel),
            2 => Ok(ModelType::Reserved),
            3 => Ok(ModelType::LightmappedModel),
            other => Err(other),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelType::StaticModel => "static",
            ModelType::SkinnedModel => "skinned",
            ModelType::Reserved => "reserved",
            ModelType::LightmappedModel => "lightmapped",
        };
        f.write_str(name)
    }
}

/// Export time recorded by the tool that wrote the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.microsecond
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshInfo {
    pub face_count: u32,
    pub vertex_count: u32,
    pub buffer_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshHeader {
    pub version: f32,
    pub created: Timestamp,
    pub model_type: Recognized<ModelType>,
    pub reserved_24: [i32; 3],
    pub bounding_spheres: [Sphere; 3],
    pub render_mesh: MeshInfo,
    pub collision_mesh: MeshInfo,
    pub unknown_78: f32,
    pub unknown_7c: u16,
    pub attachment_count: u16,
    pub unknown_80: u16,
    pub unknown_82: u16,
    pub glow_count: u16,
    pub bone_count: u16,
    pub reserved_88: [u32; 10],
}

impl MeshHeader {
    pub fn parse(chunk: &Chunk<'_>) -> Result<Self, CursorError> {
        let mut cursor = chunk.cursor();
        let header = cursor.read_record(MESH_HEADER_SIZE, parse_mesh_header)?;
        if cursor.has_remaining() {
            trace!(extra = cursor.remaining(), "ignoring trailing MESH bytes");
        }
        Ok(header)
    }
}

fn parse_timestamp(input: &mut &[u8]) -> WResult<Timestamp> {
    Ok(Timestamp {
        year: le_u32.parse_next(input)?,
        month: le_u32.parse_next(input)?,
        day: le_u32.parse_next(input)?,
        hour: le_u32.parse_next(input)?,
        minute: le_u32.parse_next(input)?,
        second: le_u32.parse_next(input)?,
        microsecond: le_u32.parse_next(input)?,
    })
}

fn parse_mesh_info(input: &mut &[u8]) -> WResult<MeshInfo> {
    Ok(MeshInfo {
        face_count: le_u32.parse_next(input)?,
        vertex_count: le_u32.parse_next(input)?,
        buffer_size: le_u32.parse_next(input)?,
    })
}

pub fn parse_mesh_header(input: &mut &[u8]) -> WResult<MeshHeader> {
    let version = le_f32.parse_next(input)?;
    let created = parse_timestamp(input)?;
    let model_type = Recognized::from_raw(le_u32.parse_next(input)?);

    let mut reserved_24 = [0i32; 3];
    for value in &mut reserved_24 {
        *value = le_i32.parse_next(input)?;
    }

    let bounding_spheres = [
        parse_sphere(input)?,
        parse_sphere(input)?,
        parse_sphere(input)?,
    ];
    let render_mesh = parse_mesh_info(input)?;
    let collision_mesh = parse_mesh_info(input)?;

    let unknown_78 = le_f32.parse_next(input)?;
    let unknown_7c = le_u16.parse_next(input)?;
    let attachment_count = le_u16.parse_next(input)?;
    let unknown_80 = le_u16.parse_next(input)?;
    let unknown_82 = le_u16.parse_next(input)?;
    let glow_count = le_u16.parse_next(input)?;
    let bone_count = le_u16.parse_next(input)?;

    let mut reserved_88 = [0u32; 10];
    for value in &mut reserved_88 {
        *value = le_u32.parse_next(input)?;
    }

    Ok(MeshHeader {
        version,
        created,
        model_type,
        reserved_24,
        bounding_spheres,
        render_mesh,
        collision_mesh,
        unknown_78,
        unknown_7c,
        attachment_count,
        unknown_80,
        unknown_82,
        glow_count,
        bone_count,
        reserved_88,
    })
}
