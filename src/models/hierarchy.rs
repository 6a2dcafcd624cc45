//! Bone hierarchy stored across the `HIER` and `BNAM` chunks.
//!
//! The hierarchy is flattened breadth-first: `HIER` holds one child count per
//! bone followed by the bone positions, and `BNAM` holds the names, all in the
//! same level order. Parent links are implied by that order and are rebuilt
//! here.

use std::collections::VecDeque;

use bon::Builder;
use itertools::izip;

use crate::data::loop_file::{Chunk, FourCC};
use crate::data::parser_utils::{NAME_LEN, Vec3, parse_name, parse_vec3};
use crate::models::mef::MefError;

pub const HIER: FourCC = FourCC::new(b"HIER");
pub const BNAM: FourCC = FourCC::new(b"BNAM");

/// Parent index of the root bone.
pub const ROOT_PARENT: i32 = -1;

#[derive(Debug, Clone, PartialEq, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bone {
    pub name: String,
    pub position: Vec3,
    /// Index into the bone list, or [`ROOT_PARENT`].
    pub parent_index: i32,
}

impl Bone {
    pub fn is_root(&self) -> bool {
        self.parent_index == ROOT_PARENT
    }
}

/// Decode `bone_count` bones from a `HIER` chunk and its `BNAM` companion.
pub fn parse_hierarchy(
    hier: &Chunk<'_>,
    names: &Chunk<'_>,
    bone_count: usize,
) -> Result<Vec<Bone>, MefError> {
    let mut cursor = hier.cursor();
    let child_counts = cursor.read_bytes(bone_count)?.iter().copied().collect();
    cursor.align(4);
    let positions = cursor.read_records(bone_count, 12, parse_vec3)?.into();
    let names = names
        .cursor()
        .read_records(bone_count, NAME_LEN, parse_name)?
        .into();

    rebuild_tree(child_counts, names, positions)
}

/// Turn level-ordered child counts, names and positions back into bones with parent links.
///
/// Output order matches the input order. Every child count must be backed by
/// remaining input, and every input must be claimed by some parent.
pub fn rebuild_tree(
    mut child_counts: VecDeque<u8>,
    mut names: VecDeque<String>,
    mut positions: VecDeque<Vec3>,
) -> Result<Vec<Bone>, MefError> {
    let bone_count = child_counts.len();
    let mut bones = Vec::with_capacity(bone_count);
    if names.len() != bone_count || positions.len() != bone_count {
        return Err(MefError::InconsistentHierarchy {
            bone_count,
            built: 0,
        });
    }

    let (Some(child_count), Some(name), Some(position)) = (
        child_counts.pop_front(),
        names.pop_front(),
        positions.pop_front(),
    ) else {
        return Ok(bones);
    };

    let mut queue = VecDeque::from([(ROOT_PARENT, name, position, child_count)]);
    while let Some((parent_index, name, position, child_count)) = queue.pop_front() {
        let index = bones.len() as i32;
        let bone = Bone::builder()
            .name(name)
            .position(position)
            .parent_index(parent_index)
            .build();
        bones.push(bone);

        let child_count = child_count as usize;
        if child_count > child_counts.len() {
            return Err(MefError::InconsistentHierarchy {
                bone_count,
                built: bones.len(),
            });
        }

        for (count, name, position) in izip!(
            child_counts.drain(..child_count),
            names.drain(..child_count),
            positions.drain(..child_count)
        ) {
            queue.push_back((index, name, position, count));
        }
    }

    if bones.len() != bone_count {
        return Err(MefError::InconsistentHierarchy {
            bone_count,
            built: bones.len(),
        });
    }

    Ok(bones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loop_file::LoopFile;
    use crate::data::loop_file::test_support::{ContainerWriter, Payload};

    fn tree(counts: &[u8], names: &[&str]) -> Result<Vec<Bone>, MefError> {
        let positions = (0..names.len())
            .map(|i| Vec3::new(i as f32, 0.0, 0.0))
            .collect();
        rebuild_tree(
            counts.iter().copied().collect(),
            names.iter().map(|n| n.to_string()).collect(),
            positions,
        )
    }

    fn parents(bones: &[Bone]) -> Vec<i32> {
        bones.iter().map(|b| b.parent_index).collect()
    }

    #[test]
    fn root_with_two_leaves() {
        let bones = tree(&[2, 0, 0], &["root", "a", "b"]).unwrap();
        assert_eq!(parents(&bones), [-1, 0, 0]);
        let names: Vec<_> = bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["root", "a", "b"]);
        assert!(bones[0].is_root());
        assert_eq!(bones[2].position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn deeper_tree_keeps_level_order() {
        // root -> (a, b); a -> (c, d); b -> (e); d -> (f)
        let names = ["root", "a", "b", "c", "d", "e", "f"];
        let bones = tree(&[2, 2, 1, 0, 1, 0, 0], &names).unwrap();
        assert_eq!(parents(&bones), [-1, 0, 0, 1, 1, 2, 4]);
    }

    #[test]
    fn no_bones() {
        assert!(tree(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn counts_claiming_missing_bones_fail() {
        assert!(matches!(
            tree(&[3, 0], &["root", "a"]),
            Err(MefError::InconsistentHierarchy {
                bone_count: 2,
                built: 1
            })
        ));
    }

    #[test]
    fn unclaimed_bones_fail() {
        assert!(matches!(
            tree(&[0, 0], &["root", "orphan"]),
            Err(MefError::InconsistentHierarchy {
                bone_count: 2,
                built: 1
            })
        ));
    }

    #[test]
    fn positions_follow_the_aligned_counts() {
        let hier = Payload::new()
            .u8(2)
            .u8(0)
            .u8(0)
            .u8(0xCD)
            .f32s(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0, -1.0, -2.0, -3.0])
            .build();
        let bnam = Payload::new()
            .name("Bip01")
            .name("Bip01 L")
            .name("Bip01 R")
            .build();
        let bytes = ContainerWriter::new(b"MEF ", true)
            .chunk(b"HIER", &hier)
            .chunk(b"BNAM", &bnam)
            .finish();
        let mut file = LoopFile::from_bytes(&bytes, true).unwrap();
        let hier = file.expect_chunk(HIER).unwrap();
        let bnam = file.expect_chunk(BNAM).unwrap();

        let bones = parse_hierarchy(&hier, &bnam, 3).unwrap();
        assert_eq!(parents(&bones), [-1, 0, 0]);
        assert_eq!(bones[1].name, "Bip01 L");
        assert_eq!(bones[1].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bones[2].position, Vec3::new(-1.0, -2.0, -3.0));
    }
}
