//! Mesh chunk encoder (`MESH` chunk)

use anyhow::{Result, bail};
use db_common::formats::{
    Chunk, ChunkTag, MaterialRecord, MeshHeader, PackedVertex, encode_name,
};
use db_common::packing::{
    pack_color_unorm8, pack_quantized_weight, pack_unorm8, pack_uv_f16, pack_vec3_f16,
};
use glam::Vec2;

use crate::axis::{convert_vec3, swap_yz};
use crate::scene::{MaterialSummary, MeshObject, Triangle, Vertex};
use crate::skeleton::BoneMap;

/// Triangle count is stored as u16
pub const MAX_TRIANGLES: usize = u16::MAX as usize;

/// Up to two bone influences per vertex
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SkinInfluences {
    pub bones: [u8; 2],
    pub weights: [f32; 2],
}

/// Pick the two influences written for a vertex
///
/// Each non-zero group weight is offered to slot 0, then slot 1, replacing
/// the first slot holding a lower weight. Groups without a bone in
/// `bone_map` count as bone 0 with weight 0. Two non-zero survivors are
/// renormalized to sum to 1; a single survivor keeps its raw weight.
pub fn select_influences(
    groups: &[(usize, f32)],
    group_names: &[String],
    bone_map: &BoneMap,
) -> SkinInfluences {
    let mut slots = [(0u8, 0.0f32); 2];

    for &(group, weight) in groups {
        if weight == 0.0 {
            continue;
        }
        let candidate = group_names
            .get(group)
            .and_then(|name| bone_map.get(name))
            .map_or((0, 0.0), |bone| (bone, weight));

        for slot in &mut slots {
            if slot.1 < candidate.1 {
                *slot = candidate;
                break;
            }
        }
    }

    let [(b0, mut w0), (b1, mut w1)] = slots;
    if w0 != 0.0 && w1 != 0.0 {
        let sum = w0 + w1;
        w0 /= sum;
        w1 /= sum;
    }

    SkinInfluences {
        bones: [b0, b1],
        weights: [w0, w1],
    }
}

/// Build the 43-byte material summary
pub fn material_record(material: Option<&MaterialSummary>) -> MaterialRecord {
    let Some(material) = material else {
        return MaterialRecord::default();
    };
    let specular = material.specular_color;
    MaterialRecord {
        name: encode_name(&material.name),
        has_texture: material.has_texture,
        alpha_blend: material.alpha_blend,
        backface_cull: material.backface_cull,
        diffuse_color: pack_color_unorm8(material.diffuse_color),
        specular_color: [
            pack_unorm8(specular.x),
            pack_unorm8(specular.y),
            pack_unorm8(specular.z),
        ],
        roughness: pack_unorm8(material.roughness),
    }
}

fn pack_vertex(
    vertex: &Vertex,
    triangle: &Triangle,
    mesh: &MeshObject,
    bone_map: &BoneMap,
) -> PackedVertex {
    let normal = if triangle.smooth {
        vertex.normal
    } else {
        triangle.normal
    };
    let skin = select_influences(&vertex.groups, &mesh.vertex_groups, bone_map);

    PackedVertex {
        position: pack_vec3_f16(convert_vec3(vertex.position)),
        normal: pack_vec3_f16(convert_vec3(normal)),
        color: pack_color_unorm8(vertex.color),
        uv: pack_uv_f16(Vec2::new(vertex.uv.x, 1.0 - vertex.uv.y)),
        bone_weights: skin.weights.map(pack_quantized_weight),
        bone_indices: skin.bones,
    }
}

/// Encode one mesh object
///
/// An empty `bone_map` (no skinning, or no usable skeleton) writes every
/// vertex with bone 0 / weight 0.
pub fn encode_mesh(mesh: &MeshObject, bone_map: &BoneMap) -> Result<Chunk> {
    if mesh.triangles.len() > MAX_TRIANGLES {
        bail!(
            "Mesh '{}' has {} triangles, maximum is {}",
            mesh.name,
            mesh.triangles.len(),
            MAX_TRIANGLES
        );
    }

    // Header transform: Y/Z swapped, rotation stored as (x, y, z, w)
    let transform = &mesh.transform;
    let header = MeshHeader {
        name: encode_name(&mesh.name),
        translation: swap_yz(transform.translation).to_array(),
        rotation: transform.rotation.to_array(),
        scale: swap_yz(transform.scale).to_array(),
        material: material_record(mesh.material.as_ref()),
        triangle_count: mesh.triangles.len() as u16,
    };

    let mut payload = Vec::with_capacity(header.payload_size());
    payload.extend_from_slice(&header.to_bytes());
    for triangle in &mesh.triangles {
        for vertex in &triangle.vertices {
            let packed = pack_vertex(vertex, triangle, mesh, bone_map);
            payload.extend_from_slice(&packed.to_bytes());
        }
    }

    tracing::debug!(
        "Encoded mesh '{}': {} triangles, {} bytes",
        mesh.name,
        mesh.triangles.len(),
        payload.len()
    );

    Ok(Chunk::new(ChunkTag::Mesh, payload))
}
