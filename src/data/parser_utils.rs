//! Shared winnow-based record parsers used by the model and archive decoders.

use winnow::Parser;
use winnow::binary::{le_f32, le_u16};
use winnow::error::ContextError;
use winnow::token::take;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// Width of the fixed name fields used for bones and attachments.
pub const NAME_LEN: usize = 16;

/// A point or direction in model space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Decode a fixed-width text field: everything up to the first NUL, lossily as UTF-8.
pub fn null_terminated_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub fn parse_vec3(input: &mut &[u8]) -> WResult<Vec3> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    let z = le_f32.parse_next(input)?;
    Ok(Vec3 { x, y, z })
}

pub fn parse_uv(input: &mut &[u8]) -> WResult<[f32; 2]> {
    let u = le_f32.parse_next(input)?;
    let v = le_f32.parse_next(input)?;
    Ok([u, v])
}

pub fn parse_sphere(input: &mut &[u8]) -> WResult<Sphere> {
    let center = parse_vec3(input)?;
    let radius = le_f32.parse_next(input)?;
    Ok(Sphere { center, radius })
}

/// Parse a 16-byte NUL-padded name.
pub fn parse_name(input: &mut &[u8]) -> WResult<String> {
    let bytes: &[u8] = take(NAME_LEN).parse_next(input)?;
    Ok(null_terminated_lossy(bytes))
}

pub fn parse_f32_array<const N: usize>(input: &mut &[u8]) -> WResult<[f32; N]> {
    let mut out = [0f32; N];
    for value in &mut out {
        *value = le_f32.parse_next(input)?;
    }
    Ok(out)
}

pub fn parse_u16_array<const N: usize>(input: &mut &[u8]) -> WResult<[u16; N]> {
    let mut out = [0u16; N];
    for value in &mut out {
        *value = le_u16.parse_next(input)?;
    }
    Ok(out)
}
