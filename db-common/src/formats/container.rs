//! File header and chunk framing shared by `.dbm` and `.dba` files

use std::fmt;
use std::io::{self, Write};

/// Magic bytes of a mesh file
pub const DBM_MAGIC: [u8; 4] = *b"DBM\0";

/// Magic bytes of an animation file
pub const DBA_MAGIC: [u8; 4] = *b"DBA\0";

/// Format version written by this crate (both file kinds)
pub const FORMAT_VERSION: u32 = 1;

/// File header (8 bytes)
///
/// ```text
/// 0x00: magic [u8; 4]
/// 0x04: version u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
}

impl FileHeader {
    pub const SIZE: usize = 8;

    /// Header of a mesh file at the current version
    pub fn mesh() -> Self {
        Self {
            magic: DBM_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    /// Header of an animation file at the current version
    pub fn animation() -> Self {
        Self {
            magic: DBA_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// Chunk type discriminator (the 4-byte tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// `SKEL` - bone palette
    Skeleton,
    /// `MESH` - mesh header + vertex data
    Mesh,
    /// `VEC3` - position or scale track
    Vec3Track,
    /// `QUAT` - rotation track
    QuatTrack,
    /// Any other tag; readers skip these
    Unknown([u8; 4]),
}

impl ChunkTag {
    pub fn from_bytes(tag: [u8; 4]) -> Self {
        match &tag {
            b"SKEL" => Self::Skeleton,
            b"MESH" => Self::Mesh,
            b"VEC3" => Self::Vec3Track,
            b"QUAT" => Self::QuatTrack,
            _ => Self::Unknown(tag),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Skeleton => *b"SKEL",
            Self::Mesh => *b"MESH",
            Self::Vec3Track => *b"VEC3",
            Self::QuatTrack => *b"QUAT",
            Self::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bytes().escape_ascii())
    }
}

/// Chunk header (8 bytes)
///
/// ```text
/// 0x00: tag [u8; 4]
/// 0x04: size u32 (payload length, header excluded)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: ChunkTag,
    pub size: u32,
}

impl ChunkHeader {
    pub const SIZE: usize = 8;

    pub fn new(tag: ChunkTag, size: u32) -> Self {
        Self { tag, size }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.tag.to_bytes());
        bytes[4..8].copy_from_slice(&self.size.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            tag: ChunkTag::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// An encoded chunk ready to be written into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn new(tag: ChunkTag, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    /// Header describing this chunk's payload
    pub fn header(&self) -> ChunkHeader {
        ChunkHeader::new(self.tag, self.payload.len() as u32)
    }

    /// Write header and payload
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.header().to_bytes())?;
        w.write_all(&self.payload)
    }
}
