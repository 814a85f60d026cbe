//! db-export library
//!
//! Encodes an in-memory 3D scene into DreamBox binary assets: one `.dbm`
//! mesh file (optional skeleton plus meshes) and one `.dba` animation file
//! per clip. The [`loader`] module builds scenes from glTF files for the
//! command-line tool.

pub mod animation;
pub mod axis;
pub mod config;
pub mod export;
pub mod formats;
pub mod loader;
pub mod mesh;
pub mod scene;
pub mod skeleton;

// Re-export the export entry points
pub use config::ExportConfig;
pub use export::{ClipOutput, ExportOutput, ExportReport, ExportWarning, export_scene, export_to_memory};

// Re-export host-facing types
pub use animation::{BonePose, PoseSampler, Thresholds};
pub use loader::{GltfPoseSampler, GltfScene, load_gltf};
pub use scene::{
    AnimationClip, Bone, FrameRange, MaterialSummary, MeshObject, Scene, Skeleton, Transform,
    Triangle, Vertex,
};
pub use skeleton::{BoneMap, MAX_BONES, SkeletonError};
