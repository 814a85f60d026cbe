//! Shared types and utilities for DreamBox assets
//!
//! This crate provides the pieces shared between:
//! - `db-export` (asset pipeline)
//! - runtime loaders and inspection tools
//!
//! # Modules
//!
//! - [`packing`] - Numeric packing utilities (f32 → f16/unorm8)
//! - [`formats`] - Binary record layouts and the chunk reader for `.dbm`/`.dba` files

pub mod formats;
pub mod packing;

// Re-export commonly used packing items
pub use packing::{
    pack_color_unorm8, pack_half, pack_quantized_weight, pack_unorm8, pack_uv_f16,
    pack_vec3_f16, unpack_half, unpack_unorm8,
};

// Re-export commonly used format items
pub use formats::{
    AnimationFile, BinarySerializable, BoneRecord, Chunk, ChunkHeader, ChunkReader, ChunkTag,
    DBA_MAGIC, DBM_MAGIC, FORMAT_VERSION, FileHeader, FormatError, MaterialRecord, MeshFile,
    MeshHeader, MeshRecord, PackedVertex, QuatKey, TrackBinding, TrackHeader, TrackRecord,
    TrackValues, Vec3Key,
};
