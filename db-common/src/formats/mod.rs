//! DreamBox binary asset formats
//!
//! Two chunked container formats, little-endian throughout:
//!
//! # Mesh file (`.dbm`)
//! ```text
//! 0x00: magic "DBM\0"
//! 0x04: version u32
//! 0x08: chunks...
//!         "SKEL" (optional, at most one): bone_count × 130-byte bone records
//!         "MESH" (one per mesh): 117-byte header + triangle_count × 3 × 24-byte vertices
//! ```
//!
//! # Animation file (`.dba`)
//! ```text
//! 0x00: magic "DBA\0"
//! 0x04: version u32
//! 0x08: chunks...
//!         "VEC3": track header (12 bytes) + key_count × 16-byte keys (time, x, y, z)
//!         "QUAT": track header (12 bytes) + key_count × 20-byte keys (time, x, y, z, w)
//! ```
//!
//! Every chunk is `{ tag: [u8; 4], size: u32, payload: [u8; size] }`. Readers skip
//! chunks with unknown tags.
//!
//! All record types implement the [`BinarySerializable`] trait for consistent
//! serialization/deserialization.

pub mod animation;
pub mod container;
pub mod mesh;
pub mod reader;
mod serialization;
pub mod skeleton;

pub use animation::*;
pub use container::*;
pub use mesh::*;
pub use reader::*;
pub use serialization::BinarySerializable;
pub use skeleton::*;
