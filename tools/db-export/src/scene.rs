//! In-memory scene model consumed by the encoders
//!
//! Everything here is already resolved by the host: triangles are
//! pre-triangulated, vertex attributes carry their defaults, and bone rest
//! matrices are in source (Z-up) world space. The encoders never mutate it.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// A fully materialized scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<MeshObject>,
    /// Only the first skeleton is exported
    pub skeletons: Vec<Skeleton>,
    pub clips: Vec<AnimationClip>,
}

/// Object-level translation / rotation / scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshObject {
    pub name: String,
    pub transform: Transform,
    pub material: Option<MaterialSummary>,
    /// Names of the mesh's vertex groups; `Vertex::groups` indexes into this
    pub vertex_groups: Vec<String>,
    pub triangles: Vec<Triangle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    /// Flat face normal
    pub normal: Vec3,
    /// Use per-vertex normals instead of the face normal
    pub smooth: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
    /// (vertex group index, weight) influences, in source order
    pub groups: Vec<(usize, f32)>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            uv: Vec2::ZERO,
            color: Vec4::ONE,
            groups: Vec::new(),
        }
    }
}

/// Material properties the runtime cares about
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSummary {
    pub name: String,
    pub has_texture: bool,
    pub alpha_blend: bool,
    pub backface_cull: bool,
    /// Linear RGBA in [0, 1]
    pub diffuse_color: Vec4,
    /// RGB in [0, 1]
    pub specular_color: Vec3,
    /// [0, 1]
    pub roughness: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub name: String,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    /// Number of direct children of `index`
    pub fn child_count(&self, index: usize) -> usize {
        self.bones
            .iter()
            .filter(|b| b.parent == Some(index))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    /// Unique within the skeleton
    pub name: String,
    pub parent: Option<usize>,
    /// World-space rest matrix in source coordinates
    pub rest: Mat4,
}

/// Inclusive range of host frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub begin: i32,
    pub end: i32,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub frame_range: FrameRange,
    /// Muted clips are skipped when `skip_muted_tracks` is set
    pub muted: bool,
}
