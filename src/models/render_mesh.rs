//! Render mesh: the `RD3D` statistics chunk and the `FACE`, `REND` and `VRTX`
//! chunks that must follow it.
//!
//! Face group and vertex layouts depend on the model type from the `MESH`
//! header. The statistics record comes in three legacy shapes told apart only
//! by the payload length.

use tracing::debug;
use winnow::Parser;
use winnow::binary::{le_f32, le_i16, le_u8, le_u16};

use crate::data::cursor::CursorError;
use crate::data::loop_file::{Chunk, FourCC, LoopFile};
use crate::data::parser_utils::{Vec3, WResult, parse_u16_array, parse_uv, parse_vec3};
use crate::models::header::ModelType;
use crate::models::mef::MefError;
use crate::recognized::Recognized;

pub const RD3D: FourCC = FourCC::new(b"RD3D");
pub const FACE: FourCC = FourCC::new(b"FACE");
pub const REND: FourCC = FourCC::new(b"REND");
pub const VRTX: FourCC = FourCC::new(b"VRTX");

pub const FACE_SIZE: usize = 6;
pub const FACE_GROUP_SIZE: usize = 28;
pub const TEXTURED_FACE_GROUP_SIZE: usize = FACE_GROUP_SIZE + 12;
pub const STATIC_VERTEX_SIZE: usize = 32;
pub const SKINNED_VERTEX_SIZE: usize = 40;
pub const LIGHTMAPPED_VERTEX_SIZE: usize = 28;

/// Shape of the `RD3D` statistics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderStatLayout {
    /// Only the first eight words are mapped.
    Size36,
    /// Carries the bone related pair, no leading word.
    Size40,
    Size44,
}

impl RenderStatLayout {
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            36 => Some(RenderStatLayout::Size36),
            40 => Some(RenderStatLayout::Size40),
            44 => Some(RenderStatLayout::Size44),
            _ => None,
        }
    }

    pub const fn size(self) -> usize {
        match self {
            RenderStatLayout::Size36 => 36,
            RenderStatLayout::Size40 => 40,
            RenderStatLayout::Size44 => 44,
        }
    }
}

/// Render mesh statistics. Fields a layout does not carry are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderStat {
    pub layout: RenderStatLayout,
    pub unknown_00: u32,
    pub lightmap_count: u32,
    pub face_count: u32,
    pub face_group_count: u32,
    pub bone_related: [u32; 2],
    pub vertex_count: u32,
    pub unknown_14: u32,
    pub unknown_18: u32,
    pub unknown_1c: u32,
    pub unknown_20: u32,
    pub unknown_24: u32,
    pub unknown_28: u32,
}

impl RenderStat {
    pub fn parse(chunk: &Chunk<'_>) -> Result<Self, MefError> {
        let size = chunk.len();
        let layout = RenderStatLayout::from_size(size)
            .ok_or(MefError::UnknownMeshHeaderSize(size))?;
        let mut cursor = chunk.cursor();
        let mut next = || cursor.read_u32();

        // Struct literal fields are evaluated in source order, which is wire order here.
        let stat = match layout {
            RenderStatLayout::Size44 => RenderStat {
                layout,
                unknown_00: next()?,
                lightmap_count: next()?,
                face_count: next()?,
                face_group_count: next()?,
                bone_related: [0, 0],
                vertex_count: next()?,
                unknown_14: next()?,
                unknown_18: next()?,
                unknown_1c: next()?,
                unknown_20: next()?,
                unknown_24: next()?,
                unknown_28: next()?,
            },
            RenderStatLayout::Size40 => RenderStat {
                layout,
                unknown_00: 0,
                lightmap_count: next()?,
                face_count: next()?,
                face_group_count: next()?,
                bone_related: [next()?, next()?],
                vertex_count: next()?,
                unknown_14: next()?,
                unknown_18: next()?,
                unknown_1c: next()?,
                unknown_20: next()?,
                unknown_24: 0,
                unknown_28: 0,
            },
            RenderStatLayout::Size36 => RenderStat {
                layout,
                unknown_00: next()?,
                lightmap_count: 0,
                face_count: next()?,
                face_group_count: next()?,
                bone_related: [0, 0],
                vertex_count: next()?,
                unknown_14: next()?,
                unknown_18: next()?,
                unknown_1c: next()?,
                unknown_20: next()?,
                unknown_24: 0,
                unknown_28: 0,
            },
        };
        Ok(stat)
    }
}

/// Record layouts a model type selects for its render mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshLayout {
    Static,
    Skinned,
    Lightmapped,
}

impl MeshLayout {
    pub fn for_model_type(model_type: Recognized<ModelType>) -> Result<Self, MefError> {
        match model_type {
            Recognized::Known(ModelType::StaticModel) => Ok(MeshLayout::Static),
            Recognized::Known(ModelType::SkinnedModel) => Ok(MeshLayout::Skinned),
            Recognized::Known(ModelType::LightmappedModel) => Ok(MeshLayout::Lightmapped),
            Recognized::Known(ModelType::Reserved) | Recognized::Unknown(_) => {
                Err(MefError::UnsupportedModelType(model_type))
            }
        }
    }

    pub const fn vertex_size(self) -> usize {
        match self {
            MeshLayout::Static => STATIC_VERTEX_SIZE,
            MeshLayout::Skinned => SKINNED_VERTEX_SIZE,
            MeshLayout::Lightmapped => LIGHTMAPPED_VERTEX_SIZE,
        }
    }

    pub const fn face_group_size(self) -> usize {
        match self {
            MeshLayout::Static | MeshLayout::Skinned => TEXTURED_FACE_GROUP_SIZE,
            MeshLayout::Lightmapped => FACE_GROUP_SIZE,
        }
    }
}

/// A run of faces drawn with one material.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceGroup {
    pub color: [u8; 4],
    pub scaled_vertex_sum: Vec3,
    pub index_offset: u16,
    pub face_count: u16,
    pub vertex_offset: u16,
    pub vertex_count: u16,
    pub texture_indices: [i16; 2],
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TexturedFaceGroup {
    pub group: FaceGroup,
    pub bump_texture: i16,
    pub reflection_texture: i16,
    pub detail_texture: i16,
    pub texture_flags: u16,
    pub uv_scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FaceGroups {
    Textured(Vec<TexturedFaceGroup>),
    Lightmapped(Vec<FaceGroup>),
}

impl FaceGroups {
    pub fn len(&self) -> usize {
        match self {
            FaceGroups::Textured(groups) => groups.len(),
            FaceGroups::Lightmapped(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The base records, regardless of layout.
    pub fn base_groups(&self) -> Vec<&FaceGroup> {
        match self {
            FaceGroups::Textured(groups) => groups.iter().map(|g| &g.group).collect(),
            FaceGroups::Lightmapped(groups) => groups.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkinnedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: [f32; 2],
    pub bone_weight: f32,
    pub bone_index: u16,
    pub bone_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightmappedVertex {
    pub position: Vec3,
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexBuffer {
    Static(Vec<StaticVertex>),
    Skinned(Vec<SkinnedVertex>),
    Lightmapped(Vec<LightmappedVertex>),
}

impl VertexBuffer {
    pub fn len(&self) -> usize {
        match self {
            VertexBuffer::Static(v) => v.len(),
            VertexBuffer::Skinned(v) => v.len(),
            VertexBuffer::Lightmapped(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positions(&self) -> Vec<Vec3> {
        match self {
            VertexBuffer::Static(v) => v.iter().map(|v| v.position).collect(),
            VertexBuffer::Skinned(v) => v.iter().map(|v| v.position).collect(),
            VertexBuffer::Lightmapped(v) => v.iter().map(|v| v.position).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderMesh {
    pub stat: RenderStat,
    pub faces: Vec<[u16; 3]>,
    pub face_groups: FaceGroups,
    pub vertices: VertexBuffer,
}

fn parse_face_group(input: &mut &[u8]) -> WResult<FaceGroup> {
    let mut color = [0u8; 4];
    for channel in &mut color {
        *channel = le_u8.parse_next(input)?;
    }
    Ok(FaceGroup {
        color,
        scaled_vertex_sum: parse_vec3(input)?,
        index_offset: le_u16.parse_next(input)?,
        face_count: le_u16.parse_next(input)?,
        vertex_offset: le_u16.parse_next(input)?,
        vertex_count: le_u16.parse_next(input)?,
        texture_indices: [le_i16.parse_next(input)?, le_i16.parse_next(input)?],
    })
}

fn parse_textured_face_group(input: &mut &[u8]) -> WResult<TexturedFaceGroup> {
    Ok(TexturedFaceGroup {
        group: parse_face_group(input)?,
        bump_texture: le_i16.parse_next(input)?,
        reflection_texture: le_i16.parse_next(input)?,
        detail_texture: le_i16.parse_next(input)?,
        texture_flags: le_u16.parse_next(input)?,
        uv_scale: le_f32.parse_next(input)?,
    })
}

fn parse_static_vertex(input: &mut &[u8]) -> WResult<StaticVertex> {
    Ok(StaticVertex {
        position: parse_vec3(input)?,
        normal: parse_vec3(input)?,
        uv: parse_uv(input)?,
    })
}

fn parse_skinned_vertex(input: &mut &[u8]) -> WResult<SkinnedVertex> {
    Ok(SkinnedVertex {
        position: parse_vec3(input)?,
        normal: parse_vec3(input)?,
        uv: parse_uv(input)?,
        bone_weight: le_f32.parse_next(input)?,
        bone_index: le_u16.parse_next(input)?,
        bone_id: le_u16.parse_next(input)?,
    })
}

fn parse_lightmapped_vertex(input: &mut &[u8]) -> WResult<LightmappedVertex> {
    Ok(LightmappedVertex {
        position: parse_vec3(input)?,
        uv0: parse_uv(input)?,
        uv1: parse_uv(input)?,
    })
}

fn parse_face_groups(
    chunk: &Chunk<'_>,
    count: usize,
    layout: MeshLayout,
) -> Result<FaceGroups, CursorError> {
    let stride = layout.face_group_size();
    let mut cursor = chunk.cursor();
    let groups = match layout {
        MeshLayout::Static | MeshLayout::Skinned => {
            FaceGroups::Textured(cursor.read_records(count, stride, parse_textured_face_group)?)
        }
        MeshLayout::Lightmapped => {
            FaceGroups::Lightmapped(cursor.read_records(count, stride, parse_face_group)?)
        }
    };
    Ok(groups)
}

fn parse_vertices(chunk: &Chunk<'_>, layout: MeshLayout) -> Result<VertexBuffer, CursorError> {
    let stride = layout.vertex_size();
    let mut cursor = chunk.cursor();
    let vertices = match layout {
        MeshLayout::Static => {
            VertexBuffer::Static(cursor.read_remaining_records(stride, parse_static_vertex)?)
        }
        MeshLayout::Skinned => {
            VertexBuffer::Skinned(cursor.read_remaining_records(stride, parse_skinned_vertex)?)
        }
        MeshLayout::Lightmapped => {
            let vertices = cursor.read_remaining_records(stride, parse_lightmapped_vertex)?;
            VertexBuffer::Lightmapped(vertices)
        }
    };
    Ok(vertices)
}

/// Decode a render mesh whose `RD3D` chunk has already been taken off the worklist.
pub fn parse_render_mesh(
    stat_chunk: &Chunk<'_>,
    loop_file: &mut LoopFile<'_>,
    model_type: Recognized<ModelType>,
) -> Result<RenderMesh, MefError> {
    let stat = RenderStat::parse(stat_chunk)?;
    let layout = MeshLayout::for_model_type(model_type)?;

    let faces = loop_file
        .expect_chunk(FACE)?
        .cursor()
        .read_remaining_records(FACE_SIZE, parse_u16_array::<3>)?;

    let rend = loop_file.expect_chunk(REND)?;
    let face_groups = parse_face_groups(&rend, stat.face_group_count as usize, layout)?;

    let vrtx = loop_file.expect_chunk(VRTX)?;
    let vertices = parse_vertices(&vrtx, layout)?;

    if vertices.len() != stat.vertex_count as usize {
        debug!(
            declared = stat.vertex_count,
            actual = vertices.len(),
            "VRTX length disagrees with RD3D vertex count"
        );
    }

    Ok(RenderMesh {
        stat,
        faces,
        face_groups,
        vertices,
    })
}
