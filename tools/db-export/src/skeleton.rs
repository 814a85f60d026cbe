//! Skeleton encoder (`SKEL` chunk)
//!
//! Assigns each bone its palette index (enumeration order), computes the
//! axis-corrected inverse bind and parent-relative rest matrices, and builds
//! the [`BoneMap`] that mesh and animation encoding share.

use db_common::formats::{BoneRecord, Chunk, ChunkTag};
use glam::Mat4;
use hashbrown::HashMap;
use thiserror::Error;

use crate::axis::convert_matrix;
use crate::export::ExportWarning;
use crate::scene::Skeleton;

/// Bone indices are stored in one byte
pub const MAX_BONES: usize = 256;

/// Determinant below which a rest matrix is treated as singular
const SINGULAR_EPSILON: f32 = 1e-12;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SkeletonError {
    #[error("skeleton has {count} bones, maximum is 256")]
    TooManyBones { count: usize },

    #[error("bone '{bone}' has invalid parent index {parent}")]
    InvalidParent { bone: String, parent: usize },

    #[error("bone name '{0}' is used more than once")]
    DuplicateBone(String),
}

/// Bone name -> palette index
///
/// Built once by [`encode_skeleton`] and read by every later encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoneMap(HashMap<String, u8>);

impl BoneMap {
    pub fn get(&self, name: &str) -> Option<u8> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of [`encode_skeleton`]
#[derive(Debug, Clone)]
pub struct EncodedSkeleton {
    pub chunk: Chunk,
    pub bone_map: BoneMap,
    pub warnings: Vec<ExportWarning>,
}

/// Encode a skeleton into a `SKEL` chunk (130 bytes per bone)
pub fn encode_skeleton(skeleton: &Skeleton) -> Result<EncodedSkeleton, SkeletonError> {
    let bones = &skeleton.bones;
    if bones.len() > MAX_BONES {
        return Err(SkeletonError::TooManyBones { count: bones.len() });
    }

    let mut bone_map = HashMap::with_capacity(bones.len());
    for (i, bone) in bones.iter().enumerate() {
        if let Some(parent) = bone.parent.filter(|&p| p >= bones.len() || p == i) {
            return Err(SkeletonError::InvalidParent {
                bone: bone.name.clone(),
                parent,
            });
        }
        if bone_map.insert(bone.name.clone(), i as u8).is_some() {
            return Err(SkeletonError::DuplicateBone(bone.name.clone()));
        }
    }

    let mut warnings = Vec::new();
    if !is_preorder(skeleton) {
        warnings.push(ExportWarning::NonPreorderBones {
            skeleton: skeleton.name.clone(),
        });
    }

    let world: Vec<Mat4> = bones.iter().map(|b| convert_matrix(b.rest)).collect();
    let mut inverse = Vec::with_capacity(bones.len());
    for (bone, matrix) in bones.iter().zip(&world) {
        inverse.push(safe_inverse(matrix).unwrap_or_else(|| {
            warnings.push(ExportWarning::SingularRestMatrix {
                bone: bone.name.clone(),
            });
            Mat4::IDENTITY
        }));
    }

    let mut payload = Vec::with_capacity(bones.len() * BoneRecord::SIZE);
    for (i, bone) in bones.iter().enumerate() {
        let local_rest = match bone.parent {
            Some(parent) => inverse[parent] * world[i],
            None => world[i],
        };
        let record = BoneRecord::new(
            inverse[i],
            local_rest,
            i as u8,
            skeleton.child_count(i) as u8,
        );
        payload.extend_from_slice(&record.to_bytes());
    }

    tracing::debug!(
        "Encoded skeleton '{}': {} bones, {} bytes",
        skeleton.name,
        bones.len(),
        payload.len()
    );

    Ok(EncodedSkeleton {
        chunk: Chunk::new(ChunkTag::Skeleton, payload),
        bone_map: BoneMap(bone_map),
        warnings,
    })
}

fn safe_inverse(m: &Mat4) -> Option<Mat4> {
    let det = m.determinant();
    (det.is_finite() && det.abs() > SINGULAR_EPSILON).then(|| m.inverse())
}

/// Whether bones are listed parent-first in depth-first order
///
/// Runtimes rebuild the hierarchy from `child_count` assuming this order.
fn is_preorder(skeleton: &Skeleton) -> bool {
    let mut ancestors: Vec<usize> = Vec::new();
    for (i, bone) in skeleton.bones.iter().enumerate() {
        match bone.parent {
            None => ancestors.clear(),
            Some(parent) => {
                while ancestors.last().is_some_and(|&top| top != parent) {
                    ancestors.pop();
                }
                if ancestors.is_empty() {
                    return false;
                }
            }
        }
        ancestors.push(i);
    }
    true
}
