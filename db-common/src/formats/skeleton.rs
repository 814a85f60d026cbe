//! `SKEL` chunk bone records
//!
//! # Layout (130 bytes per bone)
//! ```text
//! 0x00: inverse_bind_matrix [f32; 16] (row-major)
//! 0x40: local_rest_matrix   [f32; 16] (row-major, relative to parent)
//! 0x80: bone_index u8
//! 0x81: child_count u8
//! ```
//!
//! Runtimes rebuild the hierarchy by reading the records as a pre-order
//! depth-first tree: every record is followed by its `child_count` children.

use glam::Mat4;

/// One bone of the skeleton palette (130 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneRecord {
    /// Inverse of the bone's world-space rest matrix, row-major
    pub inverse_bind: [f32; 16],
    /// Rest matrix relative to the parent's rest matrix, row-major
    pub local_rest: [f32; 16],
    pub bone_index: u8,
    pub child_count: u8,
}

impl BoneRecord {
    pub const SIZE: usize = 130;

    pub fn new(inverse_bind: Mat4, local_rest: Mat4, bone_index: u8, child_count: u8) -> Self {
        Self {
            inverse_bind: mat4_to_row_major(&inverse_bind),
            local_rest: mat4_to_row_major(&local_rest),
            bone_index,
            child_count,
        }
    }

    pub fn inverse_bind_matrix(&self) -> Mat4 {
        mat4_from_row_major(&self.inverse_bind)
    }

    pub fn local_rest_matrix(&self) -> Mat4 {
        mat4_from_row_major(&self.local_rest)
    }

    /// Write record to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        for (i, f) in self.inverse_bind.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&f.to_le_bytes());
        }
        for (i, f) in self.local_rest.iter().enumerate() {
            let offset = 64 + i * 4;
            bytes[offset..offset + 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes[128] = self.bone_index;
        bytes[129] = self.child_count;
        bytes
    }

    /// Read record from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let read_f32 = |offset: usize| {
            f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        let mut inverse_bind = [0.0f32; 16];
        let mut local_rest = [0.0f32; 16];
        for i in 0..16 {
            inverse_bind[i] = read_f32(i * 4);
            local_rest[i] = read_f32(64 + i * 4);
        }

        Some(Self {
            inverse_bind,
            local_rest,
            bone_index: bytes[128],
            child_count: bytes[129],
        })
    }
}

/// Flatten a matrix row by row (row 0 first)
pub fn mat4_to_row_major(m: &Mat4) -> [f32; 16] {
    m.transpose().to_cols_array()
}

/// Rebuild a matrix from 16 floats stored row by row
pub fn mat4_from_row_major(values: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(values).transpose()
}
