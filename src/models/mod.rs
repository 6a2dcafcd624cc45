/// `ATTA` attachment points
pub mod attachment;
/// Collision mesh chunks
pub mod collision;
/// The `MESH` model header
pub mod header;
/// Bone tree reconstruction from `HIER`/`BNAM`
pub mod hierarchy;
/// Top-level `.mef` model decoder
pub mod mef;
/// Render mesh chunks and their model-type dependent layouts
pub mod render_mesh;
/// Shadow volume mesh chunks
pub mod shadow;

pub use mef::{MefError, MefModel, parse_mef};
