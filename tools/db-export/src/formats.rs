//! Container writer for `.dbm` / `.dba` files
//!
//! Re-exports the record layouts from db-common and assembles encoded chunks
//! behind the file header.

pub use db_common::formats::*;

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::animation::{BoneTracks, ReducedClip};
use crate::skeleton::BoneMap;

/// Write a complete mesh file
///
/// The optional `SKEL` chunk goes first, followed by one `MESH` chunk per mesh.
pub fn write_mesh_file<W: Write>(
    w: &mut W,
    skeleton: Option<&Chunk>,
    meshes: &[Chunk],
) -> Result<()> {
    w.write_all(&FileHeader::mesh().to_bytes())?;
    for chunk in skeleton.into_iter().chain(meshes) {
        chunk.write_to(w)?;
    }
    Ok(())
}

/// Encode a reduced clip as track chunks
///
/// Order: every bone's position track (bone index order), then every rotation
/// track, then every scale track. Bones without a palette index are skipped.
pub fn encode_tracks(clip: &ReducedClip, bone_map: &BoneMap) -> Vec<Chunk> {
    let mut bones: Vec<(u8, &BoneTracks)> = clip
        .tracks
        .iter()
        .filter_map(|(name, tracks)| bone_map.get(name).map(|index| (index, tracks)))
        .collect();
    bones.sort_by_key(|(index, _)| *index);

    let mut chunks = Vec::with_capacity(bones.len() * 3);

    for (index, tracks) in &bones {
        let keys: Vec<Vec3Key> = tracks
            .positions
            .iter()
            .map(|k| Vec3Key {
                time: k.time,
                value: k.value.to_array(),
            })
            .collect();
        chunks.push(vec3_chunk(*index, TrackBinding::Position, &keys));
    }

    for (index, tracks) in &bones {
        let keys: Vec<QuatKey> = tracks
            .rotations
            .iter()
            .map(|k| QuatKey {
                time: k.time,
                value: k.value.to_array(),
            })
            .collect();
        chunks.push(quat_chunk(*index, &keys));
    }

    for (index, tracks) in &bones {
        let keys: Vec<Vec3Key> = tracks
            .scales
            .iter()
            .map(|k| Vec3Key {
                time: k.time,
                value: k.value.to_array(),
            })
            .collect();
        chunks.push(vec3_chunk(*index, TrackBinding::Scale, &keys));
    }

    chunks
}

fn vec3_chunk(bone_index: u8, binding: TrackBinding, keys: &[Vec3Key]) -> Chunk {
    let header = TrackHeader::new(bone_index as u32, binding, keys.len() as u32);
    let mut payload = Vec::with_capacity(header.payload_size());
    payload.extend_from_slice(&header.to_bytes());
    for key in keys {
        payload.extend_from_slice(&key.to_bytes());
    }
    Chunk::new(ChunkTag::Vec3Track, payload)
}

fn quat_chunk(bone_index: u8, keys: &[QuatKey]) -> Chunk {
    let header = TrackHeader::new(bone_index as u32, TrackBinding::Rotation, keys.len() as u32);
    let mut payload = Vec::with_capacity(header.payload_size());
    payload.extend_from_slice(&header.to_bytes());
    for key in keys {
        payload.extend_from_slice(&key.to_bytes());
    }
    Chunk::new(ChunkTag::QuatTrack, payload)
}

/// Write a complete animation file for one clip
pub fn write_animation_file<W: Write>(
    w: &mut W,
    clip: &ReducedClip,
    bone_map: &BoneMap,
) -> Result<()> {
    w.write_all(&FileHeader::animation().to_bytes())?;
    for chunk in encode_tracks(clip, bone_map) {
        chunk.write_to(w)?;
    }
    Ok(())
}

/// `<dir>/<mesh stem>_<clip name>.dba`
///
/// Path separators in the clip name are replaced so the file stays next to
/// the mesh.
pub fn animation_file_name(mesh_path: &Path, clip_name: &str) -> PathBuf {
    let stem = mesh_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let clip: String = clip_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    mesh_path.with_file_name(format!("{stem}_{clip}.dba"))
}
