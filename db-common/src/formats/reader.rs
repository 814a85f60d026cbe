//! Chunk reader and whole-file decoders
//!
//! Used by the `inspect` command and round-trip tests. Unknown chunk tags are
//! skipped; known chunks must have a payload length matching their contents.

use thiserror::Error;

use super::serialization::read_array;
use super::{
    BoneRecord, ChunkHeader, ChunkTag, DBA_MAGIC, DBM_MAGIC, FORMAT_VERSION, FileHeader,
    MeshHeader, PackedVertex, QuatKey, TrackBinding, TrackHeader, Vec3Key,
};

/// Errors raised while decoding `.dbm` / `.dba` data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    #[error("file is shorter than its {0}-byte header")]
    TruncatedHeader(usize),

    #[error("chunk {tag} at offset {offset} runs past the end of the file")]
    TruncatedChunk { tag: ChunkTag, offset: usize },

    #[error("chunk {tag} has size {actual}, contents require {expected}")]
    ChunkLength {
        tag: ChunkTag,
        expected: usize,
        actual: usize,
    },

    #[error("unknown track binding id {0}")]
    UnknownBinding(u32),

    #[error("track binding {binding:?} is not valid in a {tag} chunk")]
    BindingMismatch { tag: ChunkTag, binding: TrackBinding },

    #[error("more than one SKEL chunk")]
    DuplicateSkeleton,
}

/// One framed chunk borrowed from the file buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    pub tag: ChunkTag,
    pub payload: &'a [u8],
    /// Offset of the chunk header within the file
    pub offset: usize,
}

/// Iterates the chunks following a file header
pub struct ChunkReader<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    /// Validate the file header against `magic` and position after it
    pub fn new(data: &'a [u8], magic: [u8; 4]) -> Result<Self, FormatError> {
        let header =
            FileHeader::from_bytes(data).ok_or(FormatError::TruncatedHeader(FileHeader::SIZE))?;
        if header.magic != magic {
            return Err(FormatError::BadMagic {
                expected: magic,
                found: header.magic,
            });
        }
        if header.version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(header.version));
        }
        Ok(Self {
            data,
            offset: FileHeader::SIZE,
            failed: false,
        })
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<RawChunk<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        let data = self.data;
        let offset = self.offset;
        let rest = &data[offset..];
        let Some(header) = ChunkHeader::from_bytes(rest) else {
            self.failed = true;
            let tag = if rest.len() >= 4 {
                ChunkTag::from_bytes([rest[0], rest[1], rest[2], rest[3]])
            } else {
                ChunkTag::Unknown([0; 4])
            };
            return Some(Err(FormatError::TruncatedChunk { tag, offset }));
        };

        let start = ChunkHeader::SIZE;
        let end = start + header.size as usize;
        if end > rest.len() {
            self.failed = true;
            return Some(Err(FormatError::TruncatedChunk {
                tag: header.tag,
                offset,
            }));
        }

        self.offset += end;
        Some(Ok(RawChunk {
            tag: header.tag,
            payload: &rest[start..end],
            offset,
        }))
    }
}

/// A decoded `MESH` chunk
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    pub header: MeshHeader,
    pub vertices: Vec<PackedVertex>,
}

impl MeshRecord {
    fn parse(payload: &[u8]) -> Result<Self, FormatError> {
        let header = MeshHeader::from_bytes(payload).ok_or(FormatError::ChunkLength {
            tag: ChunkTag::Mesh,
            expected: MeshHeader::SIZE,
            actual: payload.len(),
        })?;
        let expected = header.payload_size();
        if payload.len() != expected {
            return Err(FormatError::ChunkLength {
                tag: ChunkTag::Mesh,
                expected,
                actual: payload.len(),
            });
        }
        let vertices = read_array(&payload[MeshHeader::SIZE..], header.vertex_count()).ok_or(
            FormatError::ChunkLength {
                tag: ChunkTag::Mesh,
                expected,
                actual: payload.len(),
            },
        )?;
        Ok(Self { header, vertices })
    }
}

/// Decoded contents of a `.dbm` file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshFile {
    /// Bone palette in pre-order, if the file carries a `SKEL` chunk
    pub skeleton: Option<Vec<BoneRecord>>,
    pub meshes: Vec<MeshRecord>,
}

impl MeshFile {
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let mut file = Self::default();
        for chunk in ChunkReader::new(data, DBM_MAGIC)? {
            let chunk = chunk?;
            match chunk.tag {
                ChunkTag::Skeleton => {
                    if file.skeleton.is_some() {
                        return Err(FormatError::DuplicateSkeleton);
                    }
                    file.skeleton = Some(parse_bones(chunk.payload)?);
                }
                ChunkTag::Mesh => file.meshes.push(MeshRecord::parse(chunk.payload)?),
                _ => {}
            }
        }
        Ok(file)
    }

    /// Number of bones in the palette (0 without a skeleton)
    pub fn bone_count(&self) -> usize {
        self.skeleton.as_ref().map_or(0, Vec::len)
    }
}

fn parse_bones(payload: &[u8]) -> Result<Vec<BoneRecord>, FormatError> {
    let count = payload.len() / BoneRecord::SIZE;
    if payload.len() % BoneRecord::SIZE != 0 {
        return Err(FormatError::ChunkLength {
            tag: ChunkTag::Skeleton,
            expected: count * BoneRecord::SIZE,
            actual: payload.len(),
        });
    }
    // Length already checked, so this only fails on an impossible short read
    read_array(payload, count).ok_or(FormatError::ChunkLength {
        tag: ChunkTag::Skeleton,
        expected: count * BoneRecord::SIZE,
        actual: payload.len(),
    })
}

/// Keys of one decoded track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    Vec3(Vec<Vec3Key>),
    Quat(Vec<QuatKey>),
}

impl TrackValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Vec3(keys) => keys.len(),
            Self::Quat(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last key, if any
    pub fn last_time(&self) -> Option<f32> {
        match self {
            Self::Vec3(keys) => keys.last().map(|k| k.time),
            Self::Quat(keys) => keys.last().map(|k| k.time),
        }
    }
}

/// A decoded `VEC3` or `QUAT` chunk
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub bone_index: u32,
    pub binding: TrackBinding,
    pub values: TrackValues,
}

impl TrackRecord {
    fn parse(tag: ChunkTag, payload: &[u8]) -> Result<Self, FormatError> {
        if payload.len() < TrackHeader::SIZE {
            return Err(FormatError::ChunkLength {
                tag,
                expected: TrackHeader::SIZE,
                actual: payload.len(),
            });
        }
        let binding_id = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        let header =
            TrackHeader::from_bytes(payload).ok_or(FormatError::UnknownBinding(binding_id))?;
        if header.binding.chunk_tag() != tag {
            return Err(FormatError::BindingMismatch {
                tag,
                binding: header.binding,
            });
        }

        let expected = header.payload_size();
        let length_error = FormatError::ChunkLength {
            tag,
            expected,
            actual: payload.len(),
        };
        if payload.len() != expected {
            return Err(length_error);
        }

        let keys = &payload[TrackHeader::SIZE..];
        let count = header.key_count as usize;
        let values = match header.binding {
            TrackBinding::Rotation => {
                TrackValues::Quat(read_array(keys, count).ok_or(length_error)?)
            }
            TrackBinding::Position | TrackBinding::Scale => {
                TrackValues::Vec3(read_array(keys, count).ok_or(length_error)?)
            }
        };

        Ok(Self {
            bone_index: header.bone_index,
            binding: header.binding,
            values,
        })
    }
}

/// Decoded contents of a `.dba` file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationFile {
    /// Tracks in file order
    pub tracks: Vec<TrackRecord>,
}

impl AnimationFile {
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let mut file = Self::default();
        for chunk in ChunkReader::new(data, DBA_MAGIC)? {
            let chunk = chunk?;
            match chunk.tag {
                ChunkTag::Vec3Track | ChunkTag::QuatTrack => {
                    file.tracks.push(TrackRecord::parse(chunk.tag, chunk.payload)?)
                }
                _ => {}
            }
        }
        Ok(file)
    }

    /// Find the track driving `binding` of `bone_index`
    pub fn track(&self, bone_index: u32, binding: TrackBinding) -> Option<&TrackRecord> {
        self.tracks
            .iter()
            .find(|t| t.bone_index == bone_index && t.binding == binding)
    }

    /// Largest key time over all tracks
    pub fn duration(&self) -> f32 {
        self.tracks
            .iter()
            .filter_map(|t| t.values.last_time())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Chunk, MaterialRecord, encode_name};
    use glam::Mat4;
    use half::f16;

    fn file_with(header: FileHeader, chunks: &[Chunk]) -> Vec<u8> {
        let mut out = header.to_bytes().to_vec();
        for chunk in chunks {
            chunk.write_to(&mut out).unwrap();
        }
        out
    }

    fn triangle_mesh_chunk() -> Chunk {
        let header = MeshHeader {
            name: encode_name("Tri"),
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            material: MaterialRecord::default(),
            triangle_count: 1,
        };
        let vertex = PackedVertex {
            position: [f16::ZERO; 3],
            normal: [f16::ZERO, f16::ZERO, f16::ONE],
            color: [255; 4],
            uv: [f16::ZERO; 2],
            bone_weights: [0, 0],
            bone_indices: [0, 0],
        };
        let mut payload = header.to_bytes().to_vec();
        for _ in 0..3 {
            payload.extend_from_slice(&vertex.to_bytes());
        }
        Chunk::new(ChunkTag::Mesh, payload)
    }

    #[test]
    fn test_reads_mesh_file_and_skips_unknown_chunks() {
        let bone = BoneRecord::new(Mat4::IDENTITY, Mat4::IDENTITY, 0, 0);
        let data = file_with(
            FileHeader::mesh(),
            &[
                Chunk::new(ChunkTag::Skeleton, bone.to_bytes().to_vec()),
                Chunk::new(ChunkTag::Unknown(*b"XTRA"), vec![9; 5]),
                triangle_mesh_chunk(),
            ],
        );

        let file = MeshFile::from_bytes(&data).unwrap();
        assert_eq!(file.bone_count(), 1);
        assert_eq!(file.meshes.len(), 1);
        assert_eq!(file.meshes[0].header.name(), "Tri");
        assert_eq!(file.meshes[0].vertices.len(), 3);
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let data = FileHeader::animation().to_bytes();
        assert_eq!(
            MeshFile::from_bytes(&data),
            Err(FormatError::BadMagic {
                expected: DBM_MAGIC,
                found: DBA_MAGIC,
            })
        );
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut header = FileHeader::mesh();
        header.version = 2;
        assert_eq!(
            MeshFile::from_bytes(&header.to_bytes()),
            Err(FormatError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn test_rejects_truncated_chunk() {
        let mut data = file_with(FileHeader::mesh(), &[triangle_mesh_chunk()]);
        data.truncate(data.len() - 1);
        assert!(matches!(
            MeshFile::from_bytes(&data),
            Err(FormatError::TruncatedChunk {
                tag: ChunkTag::Mesh,
                offset: 8
            })
        ));
    }

    #[test]
    fn test_rejects_mesh_size_mismatch() {
        let mut chunk = triangle_mesh_chunk();
        chunk.payload.push(0);
        let data = file_with(FileHeader::mesh(), &[chunk]);
        assert!(matches!(
            MeshFile::from_bytes(&data),
            Err(FormatError::ChunkLength {
                tag: ChunkTag::Mesh,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_duplicate_skeleton() {
        let bone = BoneRecord::new(Mat4::IDENTITY, Mat4::IDENTITY, 0, 0);
        let skel = Chunk::new(ChunkTag::Skeleton, bone.to_bytes().to_vec());
        let data = file_with(FileHeader::mesh(), &[skel.clone(), skel]);
        assert_eq!(
            MeshFile::from_bytes(&data),
            Err(FormatError::DuplicateSkeleton)
        );
    }

    #[test]
    fn test_reads_animation_tracks() {
        let mut pos = TrackHeader::new(0, TrackBinding::Position, 2).to_bytes().to_vec();
        for (t, x) in [(0.0, 1.0), (0.5, 2.0)] {
            pos.extend_from_slice(
                &Vec3Key {
                    time: t,
                    value: [x, 0.0, 0.0],
                }
                .to_bytes(),
            );
        }
        let mut rot = TrackHeader::new(0, TrackBinding::Rotation, 1).to_bytes().to_vec();
        rot.extend_from_slice(
            &QuatKey {
                time: 1.0,
                value: [0.0, 0.0, 0.0, 1.0],
            }
            .to_bytes(),
        );

        let data = file_with(
            FileHeader::animation(),
            &[
                Chunk::new(ChunkTag::Vec3Track, pos),
                Chunk::new(ChunkTag::QuatTrack, rot),
            ],
        );
        let file = AnimationFile::from_bytes(&data).unwrap();

        assert_eq!(file.tracks.len(), 2);
        let track = file.track(0, TrackBinding::Position).unwrap();
        assert_eq!(track.values.len(), 2);
        assert!(file.track(0, TrackBinding::Scale).is_none());
        assert_eq!(file.duration(), 1.0);
    }

    #[test]
    fn test_rejects_binding_in_wrong_chunk() {
        let payload = TrackHeader::new(0, TrackBinding::Rotation, 0).to_bytes().to_vec();
        let data = file_with(
            FileHeader::animation(),
            &[Chunk::new(ChunkTag::Vec3Track, payload)],
        );
        assert!(matches!(
            AnimationFile::from_bytes(&data),
            Err(FormatError::BindingMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_binding() {
        let mut payload = TrackHeader::new(0, TrackBinding::Position, 0).to_bytes().to_vec();
        payload[4] = 9;
        let data = file_with(
            FileHeader::animation(),
            &[Chunk::new(ChunkTag::Vec3Track, payload)],
        );
        assert_eq!(
            AnimationFile::from_bytes(&data),
            Err(FormatError::UnknownBinding(9))
        );
    }
}
