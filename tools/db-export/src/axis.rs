//! Source (Z-up) to runtime coordinate conversion
//!
//! The conversion is a -90° rotation about X: `(x, y, z) -> (x, z, -y)`.
//! Positions, normals, skeleton matrices and root bone poses all go through
//! the same rotation so skinning and static geometry agree. Mesh header
//! transforms only swap Y and Z (see [`swap_yz`]).

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::animation::BonePose;

/// Conversion matrix `C`
pub const AXIS_CONVERSION: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Rotation part of `C` as a quaternion
pub fn axis_rotation() -> Quat {
    Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)
}

/// Convert a position, normal or translation
#[inline]
pub fn convert_vec3(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Mesh header translation and scale: `(x, y, z) -> (x, z, y)`
///
/// The header rotation is written unconverted.
#[inline]
pub fn swap_yz(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, v.y)
}

/// Premultiply a world-space matrix by `C`
#[inline]
pub fn convert_matrix(m: Mat4) -> Mat4 {
    AXIS_CONVERSION * m
}

/// Premultiply a root bone's pose by `C`
pub fn convert_root_pose(pose: BonePose) -> BonePose {
    BonePose {
        translation: convert_vec3(pose.translation),
        rotation: (axis_rotation() * pose.rotation).normalize(),
        scale: pose.scale,
    }
}
