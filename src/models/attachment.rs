use winnow::Parser;
use winnow::binary::le_u32;

use crate::data::cursor::CursorError;
use crate::data::loop_file::{Chunk, FourCC};
use crate::data::parser_utils::{Vec3, WResult, parse_f32_array, parse_name, parse_vec3};

pub const ATTA: FourCC = FourCC::new(b"ATTA");

pub const ATTACHMENT_SIZE: usize = 72;

/// A named mount point (weapon, muzzle flash, ...) relative to a bone.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attachment {
    pub name: String,
    pub position: Vec3,
    /// Row-major 3x3 rotation matrix.
    pub rotation: [f32; 9],
    pub unknown: u32,
    pub bone_index: u32,
}

fn parse_attachment(input: &mut &[u8]) -> WResult<Attachment> {
    let name = parse_name(input)?;
    let position = parse_vec3(input)?;
    let rotation = parse_f32_array::<9>(input)?;
    let unknown = le_u32.parse_next(input)?;
    let bone_index = le_u32.parse_next(input)?;
    Ok(Attachment {
        name,
        position,
        rotation,
        unknown,
        bone_index,
    })
}

pub fn parse_attachments(chunk: &Chunk<'_>, count: usize) -> Result<Vec<Attachment>, CursorError> {
    chunk
        .cursor()
        .read_records(count, ATTACHMENT_SIZE, parse_attachment)
}
