//! Loading IGI 2 assets from disk.
//!
//! Files are memory-mapped and decoded in place. Models own their data after
//! decoding, so the mapping is dropped before [`load_model`] returns.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::data::loop_file::{ChunkHeader, FourCC, LoopFile};
use crate::data::res::ResArchive;
use crate::error::ErrorKind;
use crate::models::header::ModelType;
use crate::models::mef::{MefModel, parse_mef};
use crate::recognized::Recognized;

/// Memory-map a whole file read-only.
pub fn map_file(path: &Path) -> Result<Mmap, ErrorKind> {
    let file = File::open(path).map_err(|err| ErrorKind::file_io(path, err))?;
    // Safety: the mapping is read-only and callers only hold it for the duration of a decode.
    let mmap = unsafe { MmapOptions::new().map(&file) };
    mmap.map_err(|err| ErrorKind::file_io(path, err))
}

pub fn load_model(path: &Path) -> Result<MefModel, ErrorKind> {
    let mmap = map_file(path)?;
    debug!(path = %path.display(), size = mmap.len(), "decoding model");
    Ok(parse_mef(&mmap[..])?)
}

/// Owned view of a container's framing, for inspection tools.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerSummary {
    pub root_header: ChunkHeader,
    pub container_type: FourCC,
    pub chunks: Vec<ChunkHeader>,
}

impl ContainerSummary {
    pub fn from_bytes(data: &[u8], flip_ident: bool) -> Result<Self, ErrorKind> {
        let file = LoopFile::from_bytes(data, flip_ident)?;
        Ok(ContainerSummary {
            root_header: file.root_header,
            container_type: file.container_type,
            chunks: file.iter().map(|chunk| chunk.header).collect(),
        })
    }
}

pub fn read_container(path: &Path, flip_ident: bool) -> Result<ContainerSummary, ErrorKind> {
    let mmap = map_file(path)?;
    ContainerSummary::from_bytes(&mmap[..], flip_ident)
}

/// Headline numbers of a decoded model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSummary {
    pub path: PathBuf,
    pub model_type: Recognized<ModelType>,
    pub version: f32,
    pub bones: usize,
    pub attachments: usize,
    pub render_vertices: Option<usize>,
    pub render_faces: Option<usize>,
    pub face_groups: Option<usize>,
    pub collision_faces: Option<usize>,
    pub shadow_faces: Option<usize>,
}

impl ModelSummary {
    pub fn new(path: &Path, model: &MefModel) -> Self {
        let render = model.render_mesh.as_ref();
        ModelSummary {
            path: path.to_owned(),
            model_type: model.model_type(),
            version: model.header.version,
            bones: model.bones.len(),
            attachments: model.attachments.len(),
            render_vertices: render.map(|mesh| mesh.vertices.len()),
            render_faces: render.map(|mesh| mesh.faces.len()),
            face_groups: render.map(|mesh| mesh.face_groups.len()),
            collision_faces: model.collision_mesh.as_ref().map(|mesh| mesh.faces.len()),
            shadow_faces: model.shadow_mesh.as_ref().map(|mesh| mesh.faces.len()),
        }
    }
}

/// Where an archive entry lands under `out_dir`.
///
/// Entry names may use either separator. Names that are absolute or climb
/// out of `out_dir` are rejected.
pub fn entry_output_path(out_dir: &Path, name: &str) -> Result<PathBuf, ErrorKind> {
    let normalized = name.replace('\\', "/");
    let relative = Path::new(&normalized);
    let is_safe = !normalized.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if !is_safe {
        return Err(ErrorKind::UnsafeEntryPath(name.to_owned()));
    }
    Ok(out_dir.join(relative))
}

/// Write every entry of a RES archive below `out_dir`. Returns the number of files written.
pub fn extract_archive(path: &Path, out_dir: &Path) -> Result<usize, ErrorKind> {
    let mmap = map_file(path)?;
    let archive = ResArchive::parse(&mmap[..])?;

    let mut written = 0;
    for (name, data) in archive.files() {
        let target = entry_output_path(out_dir, name)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| ErrorKind::file_io(parent, err))?;
        }
        fs::write(&target, data).map_err(|err| ErrorKind::file_io(&target, err))?;
        debug!(entry = name, size = data.len(), "extracted");
        written += 1;
    }
    Ok(written)
}
