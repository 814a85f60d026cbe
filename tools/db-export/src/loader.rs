//! glTF host adapter
//!
//! Materializes a [`Scene`] and a matching [`PoseSampler`] from a glTF/GLB
//! file so the exporter can run from the command line.
//!
//! glTF is Y-up; everything is converted into the Z-up source convention the
//! encoders expect (`(x, y, z) -> (x, -z, y)`, UV `v -> 1 - v`), so the
//! runtime sees the same orientation the glTF file had.

use anyhow::{Context, Result};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;
use std::path::Path;

use crate::animation::{BonePose, PoseSampler};
use crate::axis::swap_yz;
use crate::scene::{
    AnimationClip, Bone, FrameRange, MaterialSummary, MeshObject, Scene, Skeleton, Transform,
    Triangle, Vertex,
};

/// Default sample rate for animations (frames per second)
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Y-up to Z-up: `(x, y, z) -> (x, -z, y)`
const Y_UP_TO_Z_UP: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

fn to_z_up(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// A loaded glTF document
pub struct GltfScene {
    pub scene: Scene,
    /// Samples the first skeleton of `scene`
    pub sampler: GltfPoseSampler,
}

/// Load a glTF/GLB file
///
/// `frame_rate` is the host frame rate clips are expressed in.
pub fn load_gltf(input: &Path, frame_rate: f32) -> Result<GltfScene> {
    let (document, buffers, _images) =
        gltf::import(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;

    let hierarchy = NodeHierarchy::new(&document);
    let rest_world = hierarchy.world_matrices(&hierarchy.rest);

    let mut meshes = Vec::new();
    for node in document.nodes() {
        if let Some(mesh) = node.mesh() {
            meshes.push(convert_mesh(&node, &mesh, &buffers, rest_world[node.index()])?);
        }
    }

    let skeletons: Vec<Skeleton> = document
        .skins()
        .map(|skin| convert_skin(&skin, &buffers, &hierarchy, &rest_world))
        .collect();

    let mut clips = Vec::new();
    let mut clip_channels = Vec::new();
    for (index, animation) in document.animations().enumerate() {
        let channels = read_channels(&animation, &buffers)?;
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0f32, f32::max);
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{index}"));
        clips.push(AnimationClip {
            name,
            frame_range: FrameRange {
                begin: 0,
                end: (duration * frame_rate).ceil() as i32,
            },
            muted: false,
        });
        clip_channels.push(channels);
    }

    let bones = match (document.skins().next(), skeletons.first()) {
        (Some(skin), Some(skeleton)) => {
            let nodes = skeleton_nodes(&skin, &hierarchy);
            nodes
                .iter()
                .zip(&skeleton.bones)
                .map(|(&node, bone)| (node, bone.parent.map(|p| nodes[p])))
                .collect()
        }
        _ => Vec::new(),
    };

    tracing::info!(
        "Loaded {:?}: {} meshes, {} skeletons, {} clips",
        input,
        meshes.len(),
        skeletons.len(),
        clips.len()
    );

    let sampler = GltfPoseSampler::new(frame_rate, hierarchy, clip_channels, bones);
    Ok(GltfScene {
        scene: Scene {
            meshes,
            skeletons,
            clips,
        },
        sampler,
    })
}

// ============================================================================
// Node hierarchy
// ============================================================================

/// Parent links, evaluation order and rest TRS of every node
struct NodeHierarchy {
    parents: Vec<Option<usize>>,
    /// Parents before children
    order: Vec<usize>,
    rest: Vec<BonePose>,
    names: Vec<String>,
}

impl NodeHierarchy {
    fn new(document: &gltf::Document) -> Self {
        let count = document.nodes().count();
        let mut parents = vec![None; count];
        let mut rest = vec![BonePose::default(); count];
        let mut names = vec![String::new(); count];

        for node in document.nodes() {
            for child in node.children() {
                parents[child.index()] = Some(node.index());
            }
            let (t, r, s) = node.transform().decomposed();
            rest[node.index()] = BonePose {
                translation: Vec3::from_array(t),
                rotation: Quat::from_array(r),
                scale: Vec3::from_array(s),
            };
            names[node.index()] = node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node_{}", node.index()));
        }

        // Depth-first from the roots, in document order
        let mut order = Vec::with_capacity(count);
        let mut stack: Vec<usize> = (0..count).rev().filter(|&i| parents[i].is_none()).collect();
        let children: Vec<Vec<usize>> = document
            .nodes()
            .map(|n| n.children().map(|c| c.index()).collect())
            .collect();
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(children[node].iter().rev());
        }

        Self {
            parents,
            order,
            rest,
            names,
        }
    }

    /// World matrices (glTF space) for the given local poses
    fn world_matrices(&self, local: &[BonePose]) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.parents.len()];
        for &node in &self.order {
            let matrix = local[node].to_matrix();
            world[node] = match self.parents[node] {
                Some(parent) => world[parent] * matrix,
                None => matrix,
            };
        }
        world
    }
}

// ============================================================================
// Meshes
// ============================================================================

fn convert_mesh(
    node: &gltf::Node,
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
) -> Result<MeshObject> {
    let name = node
        .name()
        .or(mesh.name())
        .map(str::to_string)
        .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

    let vertex_groups = node
        .skin()
        .map(|skin| joint_names(&skin))
        .unwrap_or_default();

    // Mesh headers swap Y/Z and keep the rotation as-is, so the swap is
    // undone here and the runtime sees the glTF node transform
    let (scale, rotation, translation) = world.to_scale_rotation_translation();
    let transform = Transform {
        translation: swap_yz(translation),
        rotation,
        scale: swap_yz(scale),
    };

    let mut material = None;
    let mut triangles = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            tracing::warn!(
                "Mesh '{}': skipping {:?} primitive (only triangles are supported)",
                name,
                primitive.mode()
            );
            continue;
        }
        if material.is_none() {
            material = Some(convert_material(&primitive.material()));
        }
        triangles.extend(read_triangles(&primitive, buffers, &name)?);
    }

    Ok(MeshObject {
        name,
        transform,
        material: material.flatten(),
        vertex_groups,
        triangles,
    })
}

fn convert_material(material: &gltf::Material) -> Option<MaterialSummary> {
    // Primitives without a material use the glTF default material
    let index = material.index()?;
    let pbr = material.pbr_metallic_roughness();
    Some(MaterialSummary {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material_{index}")),
        has_texture: pbr.base_color_texture().is_some(),
        alpha_blend: material.alpha_mode() == gltf::material::AlphaMode::Blend,
        backface_cull: !material.double_sided(),
        diffuse_color: Vec4::from_array(pbr.base_color_factor()),
        specular_color: Vec3::ONE,
        roughness: pbr.roughness_factor(),
    })
}

fn read_triangles(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    mesh_name: &str,
) -> Result<Vec<Triangle>> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .with_context(|| format!("Mesh '{}' has a primitive without positions", mesh_name))?
        .map(|p| to_z_up(Vec3::from_array(p)))
        .collect();
    let normals: Option<Vec<Vec3>> = reader
        .read_normals()
        .map(|iter| iter.map(|n| to_z_up(Vec3::from_array(n))).collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|iter| iter.into_f32().collect());
    let colors: Option<Vec<[f32; 4]>> =
        reader.read_colors(0).map(|iter| iter.into_rgba_f32().collect());
    let joints: Option<Vec<[u16; 4]>> = reader.read_joints(0).map(|iter| iter.into_u16().collect());
    let weights: Option<Vec<[f32; 4]>> =
        reader.read_weights(0).map(|iter| iter.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let vertex = |i: usize| -> Vertex {
        let influences = joints
            .as_ref()
            .and_then(|j| j.get(i))
            .zip(weights.as_ref().and_then(|w| w.get(i)));
        let groups: Vec<(usize, f32)> = match influences {
            Some((j, w)) => (0..4)
                .filter(|&k| w[k] > 0.0)
                .map(|k| (j[k] as usize, w[k]))
                .collect(),
            None => Vec::new(),
        };
        let uv = uvs.as_ref().and_then(|uv| uv.get(i)).copied().unwrap_or([0.0, 0.0]);
        Vertex {
            position: positions[i],
            normal: normals
                .as_ref()
                .and_then(|n| n.get(i))
                .copied()
                .unwrap_or(Vec3::Z),
            uv: Vec2::new(uv[0], 1.0 - uv[1]),
            color: colors
                .as_ref()
                .and_then(|c| c.get(i))
                .map(|&c| Vec4::from_array(c))
                .unwrap_or(Vec4::ONE),
            groups,
        }
    };

    let mut triangles = Vec::with_capacity(indices.len() / 3);
    for tri in indices.chunks_exact(3) {
        let ids = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if ids.iter().any(|&i| i >= positions.len()) {
            anyhow::bail!("Mesh '{}' has an index out of range", mesh_name);
        }
        let [a, b, c] = ids.map(|i| positions[i]);
        triangles.push(Triangle {
            vertices: ids.map(vertex),
            normal: (b - a).cross(c - a).normalize_or_zero(),
            smooth: normals.is_some(),
        });
    }
    Ok(triangles)
}

// ============================================================================
// Skeletons
// ============================================================================

fn joint_names(skin: &gltf::Skin) -> Vec<String> {
    skin.joints()
        .map(|joint| {
            joint
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node_{}", joint.index()))
        })
        .collect()
}

/// Joint node indices in depth-first pre-order of the node hierarchy
fn skeleton_nodes(skin: &gltf::Skin, hierarchy: &NodeHierarchy) -> Vec<usize> {
    let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
    let mut ordered: Vec<usize> = hierarchy
        .order
        .iter()
        .copied()
        .filter(|n| joints.contains(n))
        .collect();
    // Joints unreachable from any root keep skin order at the end
    for joint in joints {
        if !ordered.contains(&joint) {
            ordered.push(joint);
        }
    }
    ordered
}

/// Closest ancestor of `node` that is a joint
fn joint_ancestor(node: usize, joints: &[usize], hierarchy: &NodeHierarchy) -> Option<usize> {
    let mut current = hierarchy.parents[node];
    while let Some(parent) = current {
        if joints.contains(&parent) {
            return Some(parent);
        }
        current = hierarchy.parents[parent];
    }
    None
}

fn convert_skin(
    skin: &gltf::Skin,
    buffers: &[gltf::buffer::Data],
    hierarchy: &NodeHierarchy,
    rest_world: &[Mat4],
) -> Skeleton {
    let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
    let inverse_binds: Option<Vec<Mat4>> = skin
        .reader(|buffer| Some(&buffers[buffer.index()]))
        .read_inverse_bind_matrices()
        .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect());

    let nodes = skeleton_nodes(skin, hierarchy);
    let bones = nodes
        .iter()
        .map(|&node| {
            let joint_slot = joints.iter().position(|&j| j == node);
            // Bind pose from the inverse bind matrix when present, else the node's rest pose
            let world = joint_slot
                .and_then(|slot| inverse_binds.as_ref()?.get(slot))
                .filter(|ibm| ibm.determinant().abs() > f32::EPSILON)
                .map(|ibm| ibm.inverse())
                .unwrap_or(rest_world[node]);
            Bone {
                name: hierarchy.names[node].clone(),
                parent: joint_ancestor(node, &joints, hierarchy)
                    .and_then(|p| nodes.iter().position(|&n| n == p)),
                rest: Y_UP_TO_Z_UP * world,
            }
        })
        .collect();

    Skeleton {
        name: skin
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("skin_{}", skin.index())),
        bones,
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelProperty {
    Translation,
    Rotation,
    Scale,
}

#[derive(Clone, Debug)]
enum ChannelValues {
    Vec3(Vec<[f32; 3]>),
    Quat(Vec<[f32; 4]>),
}

#[derive(Clone, Debug)]
struct Channel {
    node: usize,
    property: ChannelProperty,
    interpolation: Interpolation,
    times: Vec<f32>,
    values: ChannelValues,
}

fn read_channels(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<Channel>> {
    let mut channels = Vec::new();
    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        let times: Vec<f32> = reader
            .read_inputs()
            .context("Animation channel has no input times")?
            .collect();
        let (property, values) = match reader
            .read_outputs()
            .context("Animation channel has no output values")?
        {
            ReadOutputs::Translations(iter) => {
                (ChannelProperty::Translation, ChannelValues::Vec3(iter.collect()))
            }
            ReadOutputs::Rotations(iter) => {
                (ChannelProperty::Rotation, ChannelValues::Quat(iter.into_f32().collect()))
            }
            ReadOutputs::Scales(iter) => (ChannelProperty::Scale, ChannelValues::Vec3(iter.collect())),
            ReadOutputs::MorphTargetWeights(_) => continue, // Ignore weights/morph targets
        };
        channels.push(Channel {
            node: channel.target().node().index(),
            property,
            interpolation: channel.sampler().interpolation(),
            times,
            values,
        });
    }
    Ok(channels)
}

/// Index of the keyframe segment containing `t` and the blend factor
fn find_segment(times: &[f32], t: f32) -> (usize, f32) {
    let mut i = 0;
    while i < times.len() - 1 && times[i + 1] < t {
        i += 1;
    }
    if i >= times.len() - 1 {
        return (times.len() - 1, 0.0);
    }
    let t0 = times[i];
    let t1 = times[i + 1];
    let factor = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
    (i, factor.clamp(0.0, 1.0))
}

/// Keyframe `i` of an output array (cubic spline stores in-tangent, value, out-tangent)
fn key<T: Copy>(values: &[T], i: usize, interpolation: Interpolation) -> T {
    match interpolation {
        Interpolation::CubicSpline => values[i * 3 + 1],
        _ => values[i],
    }
}

fn key_count<T>(values: &[T], interpolation: Interpolation) -> usize {
    match interpolation {
        Interpolation::CubicSpline => values.len() / 3,
        _ => values.len(),
    }
}

fn interpolate_vec3(times: &[f32], values: &[[f32; 3]], t: f32, interp: Interpolation) -> Option<Vec3> {
    if times.is_empty() || key_count(values, interp) < times.len() {
        return None;
    }
    let (i, factor) = find_segment(times, t);
    let v0 = Vec3::from_array(key(values, i, interp));
    if factor == 0.0 || interp == Interpolation::Step {
        return Some(v0);
    }
    // Cubic splines are approximated linearly between their key values
    let v1 = Vec3::from_array(key(values, i + 1, interp));
    Some(v0.lerp(v1, factor))
}

fn interpolate_quat(times: &[f32], values: &[[f32; 4]], t: f32, interp: Interpolation) -> Option<Quat> {
    if times.is_empty() || key_count(values, interp) < times.len() {
        return None;
    }
    let (i, factor) = find_segment(times, t);
    let q0 = Quat::from_array(key(values, i, interp)).normalize();
    if factor == 0.0 || interp == Interpolation::Step {
        return Some(q0);
    }
    let q1 = Quat::from_array(key(values, i + 1, interp)).normalize();
    Some(slerp(q0, q1, factor))
}

fn slerp(q0: Quat, q1: Quat, t: f32) -> Quat {
    let mut dot = q0.dot(q1);

    // Ensure shortest path
    let mut q1 = q1;
    if dot < 0.0 {
        q1 = -q1;
        dot = -dot;
    }

    // If quaternions are very close, use linear interpolation
    if dot > 0.9995 {
        return (q0 + (q1 - q0) * t).normalize();
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let s1 = theta.sin() / theta_0.sin();
    let s0 = theta.cos() - dot * s1;
    q0 * s0 + q1 * s1
}

/// Evaluates glTF animations for the first skin's joints
pub struct GltfPoseSampler {
    frame_rate: f32,
    frame: i32,
    clip: Option<usize>,
    hierarchy: NodeHierarchy,
    clips: Vec<Vec<Channel>>,
    /// (joint node, parent joint node) per bone, in skeleton order
    bones: Vec<(usize, Option<usize>)>,
    /// World matrices (glTF space) at the current frame
    world: Vec<Mat4>,
}

impl GltfPoseSampler {
    fn new(
        frame_rate: f32,
        hierarchy: NodeHierarchy,
        clips: Vec<Vec<Channel>>,
        bones: Vec<(usize, Option<usize>)>,
    ) -> Self {
        let world = hierarchy.world_matrices(&hierarchy.rest);
        Self {
            frame_rate,
            frame: 0,
            clip: None,
            hierarchy,
            clips,
            bones,
            world,
        }
    }

    /// Recompute world matrices for the current clip and frame
    fn refresh(&mut self) {
        let mut local = self.hierarchy.rest.clone();
        if let Some(channels) = self.clip.and_then(|c| self.clips.get(c)) {
            let t = self.frame as f32 / self.frame_rate;
            for channel in channels {
                let Some(pose) = local.get_mut(channel.node) else {
                    continue;
                };
                match (&channel.values, channel.property) {
                    (ChannelValues::Vec3(values), ChannelProperty::Translation) => {
                        if let Some(v) = interpolate_vec3(&channel.times, values, t, channel.interpolation) {
                            pose.translation = v;
                        }
                    }
                    (ChannelValues::Vec3(values), ChannelProperty::Scale) => {
                        if let Some(v) = interpolate_vec3(&channel.times, values, t, channel.interpolation) {
                            pose.scale = v;
                        }
                    }
                    (ChannelValues::Quat(values), ChannelProperty::Rotation) => {
                        if let Some(q) = interpolate_quat(&channel.times, values, t, channel.interpolation) {
                            pose.rotation = q;
                        }
                    }
                    _ => {}
                }
            }
        }
        self.world = self.hierarchy.world_matrices(&local);
    }
}

impl PoseSampler for GltfPoseSampler {
    fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    fn current_frame(&self) -> i32 {
        self.frame
    }

    fn set_frame(&mut self, frame: i32) {
        self.frame = frame;
        self.refresh();
    }

    fn active_clip(&self) -> Option<usize> {
        self.clip
    }

    fn set_active_clip(&mut self, clip: Option<usize>) {
        self.clip = clip;
        self.refresh();
    }

    fn local_pose(&self, bone: usize) -> BonePose {
        let Some(&(node, parent)) = self.bones.get(bone) else {
            return BonePose::default();
        };
        let matrix = match parent {
            Some(parent) => self.world[parent].inverse() * self.world[node],
            None => Y_UP_TO_Z_UP * self.world[node],
        };
        BonePose::from_matrix(&matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_up_matrix_matches_vector_conversion() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Y_UP_TO_Z_UP.transform_point3(v), to_z_up(v));
        // Round trip through the export conversion is identity
        assert_eq!(crate::axis::convert_vec3(to_z_up(v)), v);
    }

    #[test]
    fn test_find_segment() {
        let times = [0.0, 1.0, 2.0];
        assert_eq!(find_segment(&times, -1.0), (0, 0.0));
        assert_eq!(find_segment(&times, 0.5), (0, 0.5));
        assert_eq!(find_segment(&times, 1.5), (1, 0.5));
        assert_eq!(find_segment(&times, 5.0), (2, 0.0));
    }

    #[test]
    fn test_interpolate_vec3_linear_and_step() {
        let times = [0.0, 1.0];
        let values = [[0.0, 0.0, 0.0], [2.0, 4.0, 6.0]];
        assert_eq!(
            interpolate_vec3(&times, &values, 0.5, Interpolation::Linear),
            Some(Vec3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(
            interpolate_vec3(&times, &values, 0.5, Interpolation::Step),
            Some(Vec3::ZERO)
        );
        assert_eq!(interpolate_vec3(&[], &[], 0.5, Interpolation::Linear), None);
    }

    #[test]
    fn test_interpolate_cubic_uses_key_values() {
        let times = [0.0, 1.0];
        // (in-tangent, value, out-tangent) per key
        let values = [
            [9.0, 9.0, 9.0],
            [0.0, 0.0, 0.0],
            [9.0, 9.0, 9.0],
            [9.0, 9.0, 9.0],
            [2.0, 2.0, 2.0],
            [9.0, 9.0, 9.0],
        ];
        assert_eq!(
            interpolate_vec3(&times, &values, 1.0, Interpolation::CubicSpline),
            Some(Vec3::splat(2.0))
        );
    }

    #[test]
    fn test_slerp_halfway() {
        let q0 = Quat::IDENTITY;
        let q1 = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mid = slerp(q0, q1, 0.5);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(mid.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn test_slerp_takes_shortest_path() {
        let q0 = Quat::IDENTITY;
        let q1 = -Quat::from_rotation_x(0.2);
        let mid = slerp(q0, q1, 0.5);
        assert!(mid.dot(Quat::from_rotation_x(0.1)).abs() > 0.9999);
    }
}
