//! Decoder for `.mef` model files.
//!
//! A model is an ILFF container with byte-reversed chunk identifiers. The
//! `MESH` header comes first and sizes most of what follows; mesh chunks pull
//! their mandatory companions off the worklist with
//! [`LoopFile::expect_chunk`] so ordering mistakes surface as errors instead
//! of misread data.

use std::fmt;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::data::cursor::{ByteCursor, CursorError};
use crate::data::loop_file::{FourCC, LoopError, LoopFile};
use crate::models::attachment::{ATTA, Attachment, parse_attachments};
use crate::models::collision::{CMSH, CollisionMesh, parse_collision_mesh};
use crate::models::header::{MESH, MeshHeader, ModelType};
use crate::models::hierarchy::{BNAM, Bone, HIER, parse_hierarchy};
use crate::models::render_mesh::{RD3D, RenderMesh, parse_render_mesh};
use crate::models::shadow::{SMES, ShadowMesh, parse_shadow_mesh};
use crate::recognized::Recognized;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeshKind {
    Render,
    Collision,
    Shadow,
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeshKind::Render => "render",
            MeshKind::Collision => "collision",
            MeshKind::Shadow => "shadow",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MefError {
    #[error(transparent)]
    Loop(#[from] LoopError),
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("{}", describe_missing_header(.chunk))]
    HeaderMissing { chunk: Option<FourCC> },
    #[error("render mesh statistics have unsupported size {0} (expected 36, 40 or 44 bytes)")]
    UnknownMeshHeaderSize(usize),
    #[error("unsupported model type {0}")]
    UnsupportedModelType(Recognized<ModelType>),
    #[error("model contains more than one {0} mesh")]
    DuplicateMesh(MeshKind),
    #[error("bone hierarchy declares {bone_count} bones but its child counts link {built}")]
    InconsistentHierarchy { bone_count: usize, built: usize },
}

fn describe_missing_header(chunk: &Option<FourCC>) -> String {
    match chunk {
        Some(ident) => format!("the MESH header must precede the {ident} chunk"),
        None => "the model has no MESH header".to_owned(),
    }
}

/// A fully decoded model. Owns everything it holds, so the input buffer may be
/// dropped once decoding returns.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MefModel {
    pub container_type: FourCC,
    pub header: MeshHeader,
    pub bones: Vec<Bone>,
    pub attachments: Vec<Attachment>,
    pub render_mesh: Option<RenderMesh>,
    pub collision_mesh: Option<CollisionMesh>,
    pub shadow_mesh: Option<ShadowMesh>,
}

pub fn parse_mef(data: &[u8]) -> Result<MefModel, MefError> {
    MefModel::decode(&mut ByteCursor::new(data))
}

impl MefModel {
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, MefError> {
        decode_model(cursor).inspect_err(|err| warn!(%err, "failed to decode MEF model"))
    }

    pub fn model_type(&self) -> Recognized<ModelType> {
        self.header.model_type
    }
}

fn require_header(header: Option<&MeshHeader>, chunk: FourCC) -> Result<&MeshHeader, MefError> {
    header.ok_or(MefError::HeaderMissing { chunk: Some(chunk) })
}

/// Checked before the mesh's companion chunks are consumed.
fn ensure_vacant<T>(slot: &Option<T>, kind: MeshKind) -> Result<(), MefError> {
    if slot.is_some() {
        return Err(MefError::DuplicateMesh(kind));
    }
    Ok(())
}

fn decode_model(cursor: &mut ByteCursor<'_>) -> Result<MefModel, MefError> {
    let mut loop_file = LoopFile::parse(cursor, true)?;

    let mut header: Option<MeshHeader> = None;
    let mut bones = Vec::new();
    let mut attachments = Vec::new();
    let mut render_mesh = None;
    let mut collision_mesh = None;
    let mut shadow_mesh = None;

    while loop_file.has_remaining() {
        let chunk = loop_file.next_chunk()?;
        let ident = chunk.ident();
        debug!(%ident, size = chunk.len(), "dispatching chunk");

        match ident {
            MESH => header = Some(MeshHeader::parse(&chunk)?),
            HIER => {
                let bone_count = require_header(header.as_ref(), ident)?.bone_count as usize;
                let names = loop_file.expect_chunk(BNAM)?;
                bones = parse_hierarchy(&chunk, &names, bone_count)?;
            }
            ATTA => {
                let count = require_header(header.as_ref(), ident)?.attachment_count as usize;
                attachments = parse_attachments(&chunk, count)?;
            }
            RD3D => {
                ensure_vacant(&render_mesh, MeshKind::Render)?;
                let model_type = require_header(header.as_ref(), ident)?.model_type;
                render_mesh = Some(parse_render_mesh(&chunk, &mut loop_file, model_type)?);
            }
            CMSH => {
                ensure_vacant(&collision_mesh, MeshKind::Collision)?;
                collision_mesh = Some(parse_collision_mesh(&chunk, &mut loop_file)?);
            }
            SMES => {
                ensure_vacant(&shadow_mesh, MeshKind::Shadow)?;
                shadow_mesh = Some(parse_shadow_mesh(&chunk, &mut loop_file)?);
            }
            _ if chunk.is_empty() => trace!(%ident, "skipping empty chunk"),
            _ => debug!(%ident, size = chunk.len(), "ignoring unrecognized chunk"),
        }
    }

    let header = header.ok_or(MefError::HeaderMissing { chunk: None })?;

    Ok(MefModel {
        container_type: loop_file.container_type,
        header,
        bones,
        attachments,
        render_mesh,
        collision_mesh,
        shadow_mesh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loop_file::test_support::{ContainerWriter, Payload};
    use crate::data::parser_utils::Vec3;
    use crate::models::collision::test_support::write_collision_mesh;
    use crate::models::header::test_support::mesh_payload;
    use crate::models::render_mesh::test_support::{face_group, stat_payload};
    use crate::models::render_mesh::{FaceGroups, VertexBuffer};
    use crate::models::shadow::test_support::write_shadow_mesh;

    fn single_bone(model_type: u32) -> ContainerWriter {
        let hier = Payload::new().u8(0).zeros(3).f32s(&[0.0, 1.0, 2.0]).build();
        let bnam = Payload::new().name("root").build();
        ContainerWriter::new(b"MEF ", true)
            .chunk(b"MESH", &mesh_payload(model_type, 0, 1))
            .chunk(b"HIER", &hier)
            .chunk(b"BNAM", &bnam)
    }

    fn lightmapped_render_mesh(writer: ContainerWriter) -> ContainerWriter {
        let faces = Payload::new().u16(0).u16(1).u16(2).build();
        let vertices = Payload::new()
            .f32s(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .f32s(&[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0])
            .f32s(&[0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0])
            .build();
        writer
            .chunk(b"RD3D", &stat_payload(1, 1, 3))
            .chunk(b"FACE", &faces)
            .chunk(b"REND", &face_group(1, 3).build())
            .chunk(b"VRTX", &vertices)
    }

    #[test]
    fn minimal_model() {
        let bytes = single_bone(0).finish();
        let mut cursor = ByteCursor::new(&bytes);
        let model = MefModel::decode(&mut cursor).unwrap();

        assert!(!cursor.has_remaining());
        assert_eq!(model.container_type, "MEF ");
        assert_eq!(
            model.model_type(),
            Recognized::Known(ModelType::StaticModel)
        );
        assert_eq!(model.bones.len(), 1);
        assert_eq!(model.bones[0].name, "root");
        assert_eq!(model.bones[0].parent_index, -1);
        assert_eq!(model.bones[0].position, Vec3::new(0.0, 1.0, 2.0));
        assert!(model.attachments.is_empty());
        assert!(model.render_mesh.is_none());
        assert!(model.collision_mesh.is_none());
        assert!(model.shadow_mesh.is_none());
    }

    #[test]
    fn full_model() {
        let writer = lightmapped_render_mesh(single_bone(3));
        let writer = write_shadow_mesh(write_collision_mesh(writer));
        let model = parse_mef(&writer.finish()).unwrap();

        let render = model.render_mesh.unwrap();
        assert_eq!(render.faces, vec![[0, 1, 2]]);
        assert!(matches!(
            render.face_groups,
            FaceGroups::Lightmapped(ref g) if g.len() == 1
        ));
        assert!(matches!(
            render.vertices,
            VertexBuffer::Lightmapped(ref v) if v.len() == 3
        ));
        assert_eq!(model.collision_mesh.unwrap().faces.len(), 1);
        assert_eq!(model.shadow_mesh.unwrap().edges.len(), 3);
    }

    #[test]
    fn tolerates_unknown_chunks() {
        let bytes = single_bone(0)
            .chunk(b"GLOW", &[1, 2, 3, 4])
            .chunk(b"XTRA", &[])
            .finish();
        let model = parse_mef(&bytes).unwrap();
        assert_eq!(model.bones.len(), 1);
    }

    #[test]
    fn hierarchy_before_header() {
        let hier = Payload::new().u8(0).zeros(3).f32s(&[0.0; 3]).build();
        let bytes = ContainerWriter::new(b"MEF ", true)
            .chunk(b"HIER", &hier)
            .chunk(b"BNAM", &Payload::new().name("root").build())
            .chunk(b"MESH", &mesh_payload(0, 0, 1))
            .finish();
        match parse_mef(&bytes) {
            Err(MefError::HeaderMissing { chunk }) => assert_eq!(chunk, Some(HIER)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn attachments_before_header() {
        let bytes = ContainerWriter::new(b"MEF ", true)
            .chunk(b"ATTA", &[])
            .chunk(b"MESH", &mesh_payload(0, 0, 0))
            .finish();
        match parse_mef(&bytes) {
            Err(MefError::HeaderMissing { chunk }) => assert_eq!(chunk, Some(ATTA)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn render_mesh_before_header() {
        let writer = lightmapped_render_mesh(ContainerWriter::new(b"MEF ", true));
        let bytes = writer.chunk(b"MESH", &mesh_payload(3, 0, 0)).finish();
        match parse_mef(&bytes) {
            Err(MefError::HeaderMissing { chunk }) => assert_eq!(chunk, Some(RD3D)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn model_without_header() {
        let bytes = ContainerWriter::new(b"MEF ", true)
            .chunk(b"GLOW", &[0; 4])
            .finish();
        assert!(matches!(
            parse_mef(&bytes),
            Err(MefError::HeaderMissing { chunk: None })
        ));
    }

    #[test]
    fn second_render_mesh_is_rejected() {
        let writer = lightmapped_render_mesh(lightmapped_render_mesh(single_bone(3)));
        assert!(matches!(
            parse_mef(&writer.finish()),
            Err(MefError::DuplicateMesh(MeshKind::Render))
        ));
    }

    #[test]
    fn second_collision_mesh_is_rejected() {
        let writer = write_collision_mesh(write_collision_mesh(single_bone(0)));
        assert!(matches!(
            parse_mef(&writer.finish()),
            Err(MefError::DuplicateMesh(MeshKind::Collision))
        ));
    }

    #[test]
    fn second_shadow_mesh_is_rejected() {
        let writer = write_shadow_mesh(write_shadow_mesh(single_bone(0)));
        assert!(matches!(
            parse_mef(&writer.finish()),
            Err(MefError::DuplicateMesh(MeshKind::Shadow))
        ));
    }

    #[test]
    fn reserved_model_type_cannot_render() {
        let writer = lightmapped_render_mesh(single_bone(2));
        assert!(matches!(
            parse_mef(&writer.finish()),
            Err(MefError::UnsupportedModelType(Recognized::Known(ModelType::Reserved)))
        ));
    }

    #[test]
    fn names_chunk_is_mandatory() {
        let hier = Payload::new().u8(0).zeros(3).f32s(&[0.0; 3]).build();
        let bytes = ContainerWriter::new(b"MEF ", true)
            .chunk(b"MESH", &mesh_payload(0, 0, 1))
            .chunk(b"HIER", &hier)
            .finish();
        assert!(matches!(
            parse_mef(&bytes),
            Err(MefError::Loop(LoopError::UnexpectedChunk { actual: None, .. }))
        ));
    }

    #[test]
    fn unflipped_model_has_no_known_chunks() {
        let bytes = single_bone(0).finish();
        let container = LoopFile::from_bytes(&bytes, false).unwrap();
        assert!(container.iter().all(|c| c.ident() != MESH));
    }
}
