//! Numeric packing utilities
//!
//! Converts scene-space floats to the compact on-disk representations used by
//! DreamBox assets:
//! - f32 → f16 (IEEE 754 half-float) for positions, normals and UVs
//! - f32 → unorm8 (unsigned normalized, 0.0 to 1.0) for colors, material
//!   channels and bone weights
//!
//! All functions are pure and never fail for finite input.

use glam::{Vec2, Vec3, Vec4};
use half::f16;

// ============================================================================
// Basic Conversion Functions
// ============================================================================

/// Convert f32 to IEEE 754 half precision (round-to-nearest-even)
#[inline]
pub fn pack_half(value: f32) -> f16 {
    f16::from_f32(value)
}

/// Convert a half-precision value back to f32
#[inline]
pub fn unpack_half(value: f16) -> f32 {
    value.to_f32()
}

/// Convert f32 to unsigned normalized 8-bit integer (unorm8)
///
/// Maps f32 range [0.0, 1.0] to u8 range [0, 255] with rounding.
/// Out-of-range input is clamped rather than wrapped.
#[inline]
pub fn pack_unorm8(value: f32) -> u8 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * 255.0).round() as u8
}

/// Convert unorm8 back to f32 in [0.0, 1.0]
#[inline]
pub fn unpack_unorm8(value: u8) -> f32 {
    value as f32 / 255.0
}

/// Pack a bone weight already renormalized to [0.0, 1.0]
#[inline]
pub fn pack_quantized_weight(weight: f32) -> u8 {
    pack_unorm8(weight)
}

// ============================================================================
// Vector Packing
// ============================================================================

/// Pack a 3D vector (position or normal) to Float16x3
#[inline]
pub fn pack_vec3_f16(v: Vec3) -> [f16; 3] {
    [pack_half(v.x), pack_half(v.y), pack_half(v.z)]
}

/// Pack a 2D UV coordinate to Float16x2
#[inline]
pub fn pack_uv_f16(uv: Vec2) -> [f16; 2] {
    [pack_half(uv.x), pack_half(uv.y)]
}

/// Pack an RGBA color to Unorm8x4
#[inline]
pub fn pack_color_unorm8(color: Vec4) -> [u8; 4] {
    [
        pack_unorm8(color.x),
        pack_unorm8(color.y),
        pack_unorm8(color.z),
        pack_unorm8(color.w),
    ]
}
