//! `VEC3` / `QUAT` track chunk records
//!
//! # Layout
//! ```text
//! Track header (12 bytes):
//! 0x00: bone_index u32
//! 0x04: binding_id u32 (0 = position, 1 = rotation, 2 = scale)
//! 0x08: key_count u32
//!
//! Keys (key_count entries):
//! VEC3: time f32, x f32, y f32, z f32          (16 bytes)
//! QUAT: time f32, x f32, y f32, z f32, w f32   (20 bytes)
//! ```

use super::ChunkTag;

/// Which bone attribute a track drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackBinding {
    Position = 0,
    Rotation = 1,
    Scale = 2,
}

impl TrackBinding {
    pub fn from_u32(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Position),
            1 => Some(Self::Rotation),
            2 => Some(Self::Scale),
            _ => None,
        }
    }

    /// Chunk tag carrying tracks of this binding
    pub fn chunk_tag(self) -> ChunkTag {
        match self {
            Self::Rotation => ChunkTag::QuatTrack,
            Self::Position | Self::Scale => ChunkTag::Vec3Track,
        }
    }
}

/// Track chunk header (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHeader {
    pub bone_index: u32,
    pub binding: TrackBinding,
    pub key_count: u32,
}

impl TrackHeader {
    pub const SIZE: usize = 12;

    pub fn new(bone_index: u32, binding: TrackBinding, key_count: u32) -> Self {
        Self {
            bone_index,
            binding,
            key_count,
        }
    }

    /// Size of one key for this track's binding
    pub fn key_size(&self) -> usize {
        match self.binding {
            TrackBinding::Rotation => QuatKey::SIZE,
            TrackBinding::Position | TrackBinding::Scale => Vec3Key::SIZE,
        }
    }

    /// Expected chunk payload size (header + keys)
    pub fn payload_size(&self) -> usize {
        Self::SIZE + self.key_count as usize * self.key_size()
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.bone_index.to_le_bytes());
        bytes[4..8].copy_from_slice(&(self.binding as u32).to_le_bytes());
        bytes[8..12].copy_from_slice(&self.key_count.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    ///
    /// Returns `None` for short input or an unknown binding id.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let binding_id = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Some(Self {
            bone_index: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            binding: TrackBinding::from_u32(binding_id)?,
            key_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

fn read_f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut out = [0.0f32; N];
    for (i, f) in out.iter_mut().enumerate() {
        let o = i * 4;
        *f = f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
    }
    out
}

/// Position or scale key (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3Key {
    /// Seconds from the start of the clip's source range
    pub time: f32,
    pub value: [f32; 3],
}

impl Vec3Key {
    pub const SIZE: usize = 16;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.time.to_le_bytes());
        for (i, f) in self.value.iter().enumerate() {
            bytes[4 + i * 4..8 + i * 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let [time, x, y, z] = read_f32s::<4>(bytes);
        Some(Self {
            time,
            value: [x, y, z],
        })
    }
}

/// Rotation key (20 bytes), quaternion stored as (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    pub time: f32,
    pub value: [f32; 4],
}

impl QuatKey {
    pub const SIZE: usize = 20;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.time.to_le_bytes());
        for (i, f) in self.value.iter().enumerate() {
            bytes[4 + i * 4..8 + i * 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let [time, x, y, z, w] = read_f32s::<5>(bytes);
        Some(Self {
            time,
            value: [x, y, z, w],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_sizes() {
        assert_eq!(TrackHeader::SIZE, 12);
        assert_eq!(Vec3Key::SIZE, 16);
        assert_eq!(QuatKey::SIZE, 20);
    }

    #[test]
    fn test_binding_ids() {
        assert_eq!(TrackBinding::Position as u32, 0);
        assert_eq!(TrackBinding::Rotation as u32, 1);
        assert_eq!(TrackBinding::Scale as u32, 2);
        assert_eq!(TrackBinding::from_u32(3), None);
        assert_eq!(TrackBinding::Rotation.chunk_tag(), ChunkTag::QuatTrack);
        assert_eq!(TrackBinding::Scale.chunk_tag(), ChunkTag::Vec3Track);
    }

    #[test]
    fn test_track_header_roundtrip() {
        let header = TrackHeader::new(4, TrackBinding::Rotation, 9);
        let parsed = TrackHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.payload_size(), 12 + 9 * 20);
    }

    #[test]
    fn test_track_header_rejects_unknown_binding() {
        let mut bytes = TrackHeader::new(0, TrackBinding::Scale, 1).to_bytes();
        bytes[4] = 7;
        assert!(TrackHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_key_layout() {
        let key = QuatKey {
            time: 0.5,
            value: [0.0, 0.0, 0.0, 1.0],
        };
        let bytes = key.to_bytes();
        assert_eq!(&bytes[0..4], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());
        assert_eq!(QuatKey::from_bytes(&bytes).unwrap(), key);

        let key = Vec3Key {
            time: 1.25,
            value: [1.0, 2.0, 3.0],
        };
        assert_eq!(Vec3Key::from_bytes(&key.to_bytes()).unwrap(), key);
    }
}
