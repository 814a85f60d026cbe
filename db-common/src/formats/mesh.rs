//! `MESH` chunk records
//!
//! # Layout
//! ```text
//! 0x00: name [u8; 32] (UTF-8, NUL-padded)
//! 0x20: translation [f32; 3]
//! 0x2C: rotation [f32; 4] (x, y, z, w)
//! 0x3C: scale [f32; 3]
//! 0x48: material (43 bytes, see MaterialRecord)
//! 0x73: triangle_count u16
//! 0x75: vertex_data (triangle_count × 3 × 24 bytes, see PackedVertex)
//! ```

use bytemuck::cast_slice;
use half::f16;

/// Fixed width of name fields
pub const NAME_SIZE: usize = 32;

/// Encode a name into a fixed NUL-padded field
///
/// Names longer than 32 bytes are truncated on a UTF-8 character boundary.
pub fn encode_name(name: &str) -> [u8; NAME_SIZE] {
    let mut end = name.len().min(NAME_SIZE);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut field = [0u8; NAME_SIZE];
    field[..end].copy_from_slice(&name.as_bytes()[..end]);
    field
}

/// Decode a fixed name field up to the first NUL
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Material summary (43 bytes)
///
/// ```text
/// 0x00: name [u8; 32]
/// 0x20: has_texture u8
/// 0x21: alpha_blend u8
/// 0x22: backface_cull u8
/// 0x23: diffuse_color [u8; 4] (rgba)
/// 0x27: specular_color [u8; 3] (rgb)
/// 0x2A: roughness u8
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialRecord {
    pub name: [u8; NAME_SIZE],
    pub has_texture: bool,
    pub alpha_blend: bool,
    pub backface_cull: bool,
    pub diffuse_color: [u8; 4],
    pub specular_color: [u8; 3],
    pub roughness: u8,
}

impl Default for MaterialRecord {
    /// Summary written for meshes without a material
    fn default() -> Self {
        Self {
            name: [0; NAME_SIZE],
            has_texture: false,
            alpha_blend: false,
            backface_cull: true,
            diffuse_color: [255, 255, 255, 255],
            specular_color: [0, 0, 0],
            roughness: 255,
        }
    }
}

impl MaterialRecord {
    pub const SIZE: usize = 43;

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    /// Write record to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..32].copy_from_slice(&self.name);
        bytes[32] = self.has_texture as u8;
        bytes[33] = self.alpha_blend as u8;
        bytes[34] = self.backface_cull as u8;
        bytes[35..39].copy_from_slice(&self.diffuse_color);
        bytes[39..42].copy_from_slice(&self.specular_color);
        bytes[42] = self.roughness;
        bytes
    }

    /// Read record from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut name = [0u8; NAME_SIZE];
        name.copy_from_slice(&bytes[0..32]);
        Some(Self {
            name,
            has_texture: bytes[32] != 0,
            alpha_blend: bytes[33] != 0,
            backface_cull: bytes[34] != 0,
            diffuse_color: [bytes[35], bytes[36], bytes[37], bytes[38]],
            specular_color: [bytes[39], bytes[40], bytes[41]],
            roughness: bytes[42],
        })
    }
}

/// Mesh chunk header (117 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHeader {
    pub name: [u8; NAME_SIZE],
    pub translation: [f32; 3],
    /// Quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    pub material: MaterialRecord,
    pub triangle_count: u16,
}

impl MeshHeader {
    pub const SIZE: usize = NAME_SIZE + 40 + MaterialRecord::SIZE + 2;

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    /// Number of vertices following the header
    pub fn vertex_count(&self) -> usize {
        self.triangle_count as usize * 3
    }

    /// Expected chunk payload size (header + vertex data)
    pub fn payload_size(&self) -> usize {
        Self::SIZE + self.vertex_count() * PackedVertex::SIZE
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..32].copy_from_slice(&self.name);
        let floats = self
            .translation
            .iter()
            .chain(self.rotation.iter())
            .chain(self.scale.iter());
        for (i, f) in floats.enumerate() {
            let offset = 32 + i * 4;
            bytes[offset..offset + 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes[72..115].copy_from_slice(&self.material.to_bytes());
        bytes[115..117].copy_from_slice(&self.triangle_count.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut name = [0u8; NAME_SIZE];
        name.copy_from_slice(&bytes[0..32]);

        let mut floats = [0.0f32; 10];
        for (i, f) in floats.iter_mut().enumerate() {
            let offset = 32 + i * 4;
            *f = f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
        }

        Some(Self {
            name,
            translation: [floats[0], floats[1], floats[2]],
            rotation: [floats[3], floats[4], floats[5], floats[6]],
            scale: [floats[7], floats[8], floats[9]],
            material: MaterialRecord::from_bytes(&bytes[72..115])?,
            triangle_count: u16::from_le_bytes([bytes[115], bytes[116]]),
        })
    }
}

/// Packed vertex (24 bytes)
///
/// ```text
/// 0x00: position [f16; 3]
/// 0x06: normal [f16; 3]
/// 0x0C: color [u8; 4] (rgba unorm8)
/// 0x10: uv [f16; 2]
/// 0x14: bone_weights [u8; 2] (unorm8)
/// 0x16: bone_indices [u8; 2]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedVertex {
    pub position: [f16; 3],
    pub normal: [f16; 3],
    pub color: [u8; 4],
    pub uv: [f16; 2],
    pub bone_weights: [u8; 2],
    pub bone_indices: [u8; 2],
}

impl PackedVertex {
    pub const SIZE: usize = 24;

    /// Write vertex to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..6].copy_from_slice(cast_slice(&self.position));
        bytes[6..12].copy_from_slice(cast_slice(&self.normal));
        bytes[12..16].copy_from_slice(&self.color);
        bytes[16..20].copy_from_slice(cast_slice(&self.uv));
        bytes[20..22].copy_from_slice(&self.bone_weights);
        bytes[22..24].copy_from_slice(&self.bone_indices);
        bytes
    }

    /// Read vertex from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let half_at = |offset: usize| f16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        Some(Self {
            position: [half_at(0), half_at(2), half_at(4)],
            normal: [half_at(6), half_at(8), half_at(10)],
            color: [bytes[12], bytes[13], bytes[14], bytes[15]],
            uv: [half_at(16), half_at(18)],
            bone_weights: [bytes[20], bytes[21]],
            bone_indices: [bytes[22], bytes[23]],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(MaterialRecord::SIZE, 43);
        assert_eq!(MeshHeader::SIZE, 117);
        assert_eq!(PackedVertex::SIZE, 24);
    }

    #[test]
    fn test_encode_name_pads_with_nul() {
        let field = encode_name("Cube");
        assert_eq!(&field[0..4], b"Cube");
        assert!(field[4..].iter().all(|&b| b == 0));
        assert_eq!(decode_name(&field), "Cube");
    }

    #[test]
    fn test_encode_name_truncates_on_char_boundary() {
        // 31 ASCII bytes followed by a 2-byte character that does not fit
        let name = format!("{}é", "a".repeat(31));
        let field = encode_name(&name);
        assert_eq!(decode_name(&field), "a".repeat(31));

        let exact = "b".repeat(40);
        assert_eq!(decode_name(&encode_name(&exact)), "b".repeat(32));
    }

    #[test]
    fn test_default_material() {
        let bytes = MaterialRecord::default().to_bytes();
        assert!(bytes[0..32].iter().all(|&b| b == 0));
        assert_eq!(&bytes[32..35], &[0, 0, 1]);
        assert_eq!(&bytes[35..39], &[255, 255, 255, 255]);
        assert_eq!(&bytes[39..42], &[0, 0, 0]);
        assert_eq!(bytes[42], 255);
    }

    #[test]
    fn test_mesh_header_roundtrip() {
        let header = MeshHeader {
            name: encode_name("Body"),
            translation: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 2.0],
            material: MaterialRecord {
                name: encode_name("Skin"),
                has_texture: true,
                alpha_blend: false,
                backface_cull: true,
                diffuse_color: [10, 20, 30, 255],
                specular_color: [1, 2, 3],
                roughness: 128,
            },
            triangle_count: 12,
        };

        let parsed = MeshHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.vertex_count(), 36);
        assert_eq!(parsed.payload_size(), 117 + 36 * 24);
    }

    #[test]
    fn test_packed_vertex_roundtrip() {
        let vertex = PackedVertex {
            position: [f16::from_f32(1.0), f16::from_f32(0.5), f16::from_f32(-2.0)],
            normal: [f16::from_f32(0.0), f16::from_f32(1.0), f16::from_f32(0.0)],
            color: [255, 128, 0, 255],
            uv: [f16::from_f32(0.25), f16::from_f32(0.75)],
            bone_weights: [159, 96],
            bone_indices: [0, 1],
        };
        let bytes = vertex.to_bytes();
        assert_eq!(&bytes[0..2], &f16::from_f32(1.0).to_le_bytes());
        assert_eq!(PackedVertex::from_bytes(&bytes).unwrap(), vertex);
    }
}
