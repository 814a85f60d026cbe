//! Export orchestration
//!
//! Runs the encoders in order (skeleton first, since its bone map feeds mesh
//! skinning and animation tracks), collects recoverable problems as
//! [`ExportWarning`]s, and writes the `.dbm` plus one `.dba` per clip.

use anyhow::{Context, Result};
use hashbrown::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::animation::{PoseSampler, reduce_clip};
use crate::config::ExportConfig;
use crate::formats::{animation_file_name, write_animation_file, write_mesh_file};
use crate::mesh::encode_mesh;
use crate::scene::Scene;
use crate::skeleton::{BoneMap, SkeletonError, encode_skeleton};

/// A recoverable problem; the export continues with a documented fallback
#[derive(Debug, Clone, PartialEq)]
pub enum ExportWarning {
    /// Only the first skeleton is exported
    MultipleSkeletons { count: usize, used: String },
    /// No `SKEL` chunk; vertices are written unskinned
    SkeletonSkipped(SkeletonError),
    /// Bones are not listed parent-first depth-first
    NonPreorderBones { skeleton: String },
    /// Inverse bind matrix replaced by identity
    SingularRestMatrix { bone: String },
    /// Clips exist but there is no bone palette to address
    TracksWithoutSkeleton { clips: usize },
    /// Clips exist but the host supplied no pose sampler
    TracksWithoutSampler { clips: usize },
    /// Clip file name already taken by an earlier clip; written to `path`
    DuplicateClipFile { clip: String, path: PathBuf },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleSkeletons { count, used } => write!(
                f,
                "Only a single skeleton is supported: found {count}, using '{used}'"
            ),
            Self::SkeletonSkipped(err) => {
                write!(f, "Skeleton will be skipped ({err}); meshes are written without skinning")
            }
            Self::NonPreorderBones { skeleton } => write!(
                f,
                "Bones of '{skeleton}' are not in depth-first order; runtimes may rebuild the wrong hierarchy"
            ),
            Self::SingularRestMatrix { bone } => write!(
                f,
                "Rest matrix of bone '{bone}' is not invertible; using identity inverse bind matrix"
            ),
            Self::TracksWithoutSkeleton { clips } => {
                write!(f, "{clips} animation clip(s) skipped: no exportable skeleton")
            }
            Self::TracksWithoutSampler { clips } => {
                write!(f, "{clips} animation clip(s) skipped: no pose sampler available")
            }
            Self::DuplicateClipFile { clip, path } => write!(
                f,
                "Clip '{clip}' maps to an already written file name; writing {:?} instead",
                path
            ),
        }
    }
}

/// One encoded `.dba` file
#[derive(Debug, Clone)]
pub struct ClipOutput {
    pub name: String,
    pub data: Vec<u8>,
}

/// Result of an in-memory export
#[derive(Debug, Clone, Default)]
pub struct ExportOutput {
    /// Complete `.dbm` file
    pub mesh: Vec<u8>,
    pub animations: Vec<ClipOutput>,
    pub warnings: Vec<ExportWarning>,
    /// Bones written to the `SKEL` chunk (0 without one)
    pub bone_count: usize,
    pub triangle_count: usize,
}

/// Result of [`export_scene`]
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub mesh_path: PathBuf,
    pub animation_paths: Vec<PathBuf>,
    pub warnings: Vec<ExportWarning>,
    pub bone_count: usize,
    pub triangle_count: usize,
}

fn report(warnings: &mut Vec<ExportWarning>, warning: ExportWarning) {
    tracing::warn!("{}", warning);
    warnings.push(warning);
}

/// Encode a scene into file images without touching the filesystem
pub fn export_to_memory(
    scene: &Scene,
    sampler: Option<&mut dyn PoseSampler>,
    config: &ExportConfig,
) -> Result<ExportOutput> {
    config.validate()?;

    let mut warnings = Vec::new();

    let skeleton = scene.skeletons.first();
    if scene.skeletons.len() > 1 {
        report(
            &mut warnings,
            ExportWarning::MultipleSkeletons {
                count: scene.skeletons.len(),
                used: scene.skeletons[0].name.clone(),
            },
        );
    }

    let wants_tracks = config.export_tracks && !scene.clips.is_empty();
    let mut skeleton_chunk = None;
    let mut bone_map = BoneMap::default();
    let mut bone_count = 0;
    match skeleton {
        Some(skeleton) if config.export_skinning || wants_tracks => {
            match encode_skeleton(skeleton) {
                Ok(encoded) => {
                    for warning in encoded.warnings {
                        report(&mut warnings, warning);
                    }
                    if config.export_skinning {
                        bone_count = skeleton.bones.len();
                        skeleton_chunk = Some(encoded.chunk);
                    }
                    bone_map = encoded.bone_map;
                }
                Err(err) => report(&mut warnings, ExportWarning::SkeletonSkipped(err)),
            }
        }
        _ => {}
    }

    let no_skin = BoneMap::default();
    let skin_map = if config.export_skinning {
        &bone_map
    } else {
        &no_skin
    };

    let mut mesh_chunks = Vec::with_capacity(scene.meshes.len());
    let mut triangle_count = 0;
    for mesh in &scene.meshes {
        mesh_chunks.push(encode_mesh(mesh, skin_map)?);
        triangle_count += mesh.triangles.len();
    }
    let mut mesh_data = Vec::new();
    write_mesh_file(&mut mesh_data, skeleton_chunk.as_ref(), &mesh_chunks)?;

    let mut animations = Vec::new();
    if wants_tracks {
        match (skeleton, sampler) {
            (Some(skeleton), Some(sampler)) if !bone_map.is_empty() => {
                let thresholds = config.thresholds();
                for (index, clip) in scene.clips.iter().enumerate() {
                    if clip.muted && config.skip_muted_tracks {
                        tracing::info!("Skipping muted clip '{}'", clip.name);
                        continue;
                    }
                    let reduced = reduce_clip(
                        skeleton,
                        &mut *sampler,
                        index,
                        clip,
                        config.resample_framerate,
                        &thresholds,
                    );
                    let mut data = Vec::new();
                    write_animation_file(&mut data, &reduced, &bone_map)?;
                    animations.push(ClipOutput {
                        name: reduced.name,
                        data,
                    });
                }
            }
            (_, None) => report(
                &mut warnings,
                ExportWarning::TracksWithoutSampler {
                    clips: scene.clips.len(),
                },
            ),
            _ => report(
                &mut warnings,
                ExportWarning::TracksWithoutSkeleton {
                    clips: scene.clips.len(),
                },
            ),
        }
    }

    Ok(ExportOutput {
        mesh: mesh_data,
        animations,
        warnings,
        bone_count,
        triangle_count,
    })
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(data)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write output: {:?}", path))
}

/// Export a scene to `mesh_path` and its sibling `.dba` files
///
/// Clips whose file names collide (e.g. `Arm/Wave` and `Arm_Wave`) get a
/// numeric suffix instead of overwriting each other.
pub fn export_scene(
    scene: &Scene,
    sampler: Option<&mut dyn PoseSampler>,
    config: &ExportConfig,
    mesh_path: &Path,
) -> Result<ExportReport> {
    let ExportOutput {
        mesh,
        animations,
        mut warnings,
        bone_count,
        triangle_count,
    } = export_to_memory(scene, sampler, config)?;

    write_file(mesh_path, &mesh)?;
    tracing::info!(
        "Exported {:?}: {} meshes, {} triangles, {} bones",
        mesh_path,
        scene.meshes.len(),
        triangle_count,
        bone_count
    );

    let mut animation_paths: Vec<PathBuf> = Vec::with_capacity(animations.len());
    let mut used = HashSet::new();
    for clip in &animations {
        let mut path = animation_file_name(mesh_path, &clip.name);
        if used.contains(&path) {
            let mut suffix = 2;
            while used.contains(&path) {
                path = animation_file_name(mesh_path, &format!("{}_{suffix}", clip.name));
                suffix += 1;
            }
            report(
                &mut warnings,
                ExportWarning::DuplicateClipFile {
                    clip: clip.name.clone(),
                    path: path.clone(),
                },
            );
        }
        used.insert(path.clone());

        write_file(&path, &clip.data)?;
        tracing::info!("Exported clip '{}' -> {:?}", clip.name, path);
        animation_paths.push(path);
    }

    Ok(ExportReport {
        mesh_path: mesh_path.to_path_buf(),
        animation_paths,
        warnings,
        bone_count,
        triangle_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::BonePose;
    use crate::formats::{AnimationFile, MeshFile, TrackBinding};
    use crate::scene::{AnimationClip, Bone, FrameRange, MeshObject, Skeleton, Triangle, Vertex};
    use glam::{Mat4, Vec3};

    struct StaticSampler {
        frame: i32,
        clip: Option<usize>,
    }

    impl PoseSampler for StaticSampler {
        fn frame_rate(&self) -> f32 {
            30.0
        }
        fn current_frame(&self) -> i32 {
            self.frame
        }
        fn set_frame(&mut self, frame: i32) {
            self.frame = frame;
        }
        fn active_clip(&self) -> Option<usize> {
            self.clip
        }
        fn set_active_clip(&mut self, clip: Option<usize>) {
            self.clip = clip;
        }
        fn local_pose(&self, _bone: usize) -> BonePose {
            BonePose::default()
        }
    }

    fn skeleton(name: &str, count: usize) -> Skeleton {
        Skeleton {
            name: name.to_string(),
            bones: (0..count)
                .map(|i| Bone {
                    name: format!("bone_{i}"),
                    parent: i.checked_sub(1),
                    rest: Mat4::IDENTITY,
                })
                .collect(),
        }
    }

    fn skinned_mesh() -> MeshObject {
        let vertex = Vertex {
            groups: vec![(0, 1.0)],
            ..Vertex::default()
        };
        MeshObject {
            name: "Body".to_string(),
            vertex_groups: vec!["bone_1".to_string()],
            triangles: vec![Triangle {
                vertices: [vertex.clone(), vertex.clone(), vertex],
                normal: Vec3::Z,
                smooth: false,
            }],
            ..MeshObject::default()
        }
    }

    fn clip(name: &str, muted: bool) -> AnimationClip {
        AnimationClip {
            name: name.to_string(),
            frame_range: FrameRange { begin: 0, end: 10 },
            muted,
        }
    }

    fn scene(bones: usize) -> Scene {
        Scene {
            meshes: vec![skinned_mesh()],
            skeletons: vec![skeleton("Armature", bones)],
            clips: vec![clip("Idle", false), clip("Muted", true)],
        }
    }

    fn sampler() -> StaticSampler {
        StaticSampler {
            frame: 0,
            clip: None,
        }
    }

    #[test]
    fn test_export_skinned_scene() {
        let mut sampler = sampler();
        let output =
            export_to_memory(&scene(2), Some(&mut sampler), &ExportConfig::default()).unwrap();

        assert!(output.warnings.is_empty());
        assert_eq!(output.bone_count, 2);
        assert_eq!(output.triangle_count, 1);

        let mesh = MeshFile::from_bytes(&output.mesh).unwrap();
        assert_eq!(mesh.bone_count(), 2);
        let vertex = &mesh.meshes[0].vertices[0];
        assert_eq!(vertex.bone_indices, [1, 0]);
        assert_eq!(vertex.bone_weights, [255, 0]);

        // Muted clip skipped by default
        assert_eq!(output.animations.len(), 1);
        assert_eq!(output.animations[0].name, "Idle");
        let anim = AnimationFile::from_bytes(&output.animations[0].data).unwrap();
        assert_eq!(anim.tracks.len(), 6);
        assert_eq!(
            anim.track(1, TrackBinding::Rotation).unwrap().values.len(),
            1
        );
    }

    #[test]
    fn test_muted_clips_kept_when_requested() {
        let mut sampler = sampler();
        let config = ExportConfig {
            skip_muted_tracks: false,
            ..ExportConfig::default()
        };
        let output = export_to_memory(&scene(2), Some(&mut sampler), &config).unwrap();
        assert_eq!(output.animations.len(), 2);
    }

    #[test]
    fn test_too_many_bones_degrades_to_unskinned() {
        let mut sampler = sampler();
        let output =
            export_to_memory(&scene(300), Some(&mut sampler), &ExportConfig::default()).unwrap();

        assert!(matches!(
            output.warnings[0],
            ExportWarning::SkeletonSkipped(SkeletonError::TooManyBones { count: 300 })
        ));
        assert!(matches!(
            output.warnings[1],
            ExportWarning::TracksWithoutSkeleton { .. }
        ));

        let mesh = MeshFile::from_bytes(&output.mesh).unwrap();
        assert!(mesh.skeleton.is_none());
        for vertex in &mesh.meshes[0].vertices {
            assert_eq!(vertex.bone_indices, [0, 0]);
            assert_eq!(vertex.bone_weights, [0, 0]);
        }
        assert!(output.animations.is_empty());
    }

    #[test]
    fn test_multiple_skeletons_uses_first() {
        let mut scene = scene(2);
        scene.skeletons.push(skeleton("Second", 5));
        let output = export_to_memory(&scene, None, &ExportConfig::default()).unwrap();

        assert_eq!(
            output.warnings[0],
            ExportWarning::MultipleSkeletons {
                count: 2,
                used: "Armature".to_string()
            }
        );
        assert_eq!(output.bone_count, 2);
    }

    #[test]
    fn test_skinning_disabled() {
        let config = ExportConfig {
            export_skinning: false,
            export_tracks: false,
            ..ExportConfig::default()
        };
        let output = export_to_memory(&scene(2), None, &config).unwrap();

        let mesh = MeshFile::from_bytes(&output.mesh).unwrap();
        assert!(mesh.skeleton.is_none());
        assert_eq!(mesh.meshes[0].vertices[0].bone_weights, [0, 0]);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_tracks_without_sampler_warns() {
        let output = export_to_memory(&scene(2), None, &ExportConfig::default()).unwrap();
        assert_eq!(
            output.warnings,
            vec![ExportWarning::TracksWithoutSampler { clips: 2 }]
        );
    }

    #[test]
    fn test_export_scene_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mesh_path = dir.path().join("hero.dbm");
        let mut sampler = sampler();

        let report = export_scene(
            &scene(2),
            Some(&mut sampler),
            &ExportConfig::default(),
            &mesh_path,
        )
        .unwrap();

        assert!(mesh_path.exists());
        assert_eq!(report.animation_paths, vec![dir.path().join("hero_Idle.dba")]);
        assert!(report.animation_paths[0].exists());
        assert_eq!(sampler.frame, 0);
        assert_eq!(sampler.clip, None);
    }

    #[test]
    fn test_colliding_clip_names_get_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mesh_path = dir.path().join("hero.dbm");
        let mut sampler = sampler();
        let mut scene = scene(2);
        scene.clips = vec![
            clip("Arm/Wave", false),
            clip("Arm_Wave", false),
            clip("Arm_Wave", false),
        ];

        let report = export_scene(
            &scene,
            Some(&mut sampler),
            &ExportConfig::default(),
            &mesh_path,
        )
        .unwrap();

        assert_eq!(
            report.animation_paths,
            vec![
                dir.path().join("hero_Arm_Wave.dba"),
                dir.path().join("hero_Arm_Wave_2.dba"),
                dir.path().join("hero_Arm_Wave_3.dba"),
            ]
        );
        assert!(report.animation_paths.iter().all(|p| p.exists()));
        assert_eq!(
            report.warnings,
            vec![
                ExportWarning::DuplicateClipFile {
                    clip: "Arm_Wave".to_string(),
                    path: dir.path().join("hero_Arm_Wave_2.dba"),
                },
                ExportWarning::DuplicateClipFile {
                    clip: "Arm_Wave".to_string(),
                    path: dir.path().join("hero_Arm_Wave_3.dba"),
                },
            ]
        );
    }

    #[test]
    fn test_warning_messages() {
        let warning = ExportWarning::SkeletonSkipped(SkeletonError::TooManyBones { count: 300 });
        assert_eq!(
            warning.to_string(),
            "Skeleton will be skipped (skeleton has 300 bones, maximum is 256); meshes are written without skinning"
        );
    }
}
