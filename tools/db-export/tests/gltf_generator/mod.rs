//! Programmatic GLB generation for integration tests.
//!
//! Builds a two-bone skinned triangle ("Root" -> "Arm") with one animation
//! ("Wave") that rotates the arm 90 degrees about Z over one second.

use serde_json::{Value, json};

/// Arm bone offset from the root (glTF Y-up)
pub const ARM_LENGTH: f32 = 1.0;

/// Translation of the mesh node (glTF Y-up)
pub const BODY_OFFSET: [f32; 3] = [1.0, 2.0, 3.0];

/// Animation duration in seconds
pub const WAVE_DURATION: f32 = 1.0;

const FLOAT: u32 = 5126;
const UNSIGNED_BYTE: u32 = 5121;
const UNSIGNED_SHORT: u32 = 5123;

/// Binary buffer plus the views/accessors describing it
#[derive(Default)]
struct BufferBuilder {
    data: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    /// Append one tightly packed accessor and return its index
    fn push(&mut self, bytes: &[u8], component_type: u32, count: usize, type_: &str) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        while !self.data.len().is_multiple_of(4) {
            self.data.push(0);
        }
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
        }));
        self.accessors.push(json!({
            "bufferView": self.views.len() - 1,
            "componentType": component_type,
            "count": count,
            "type": type_,
        }));
        self.accessors.len() - 1
    }

    fn set_bounds(&mut self, accessor: usize, min: Value, max: Value) {
        self.accessors[accessor]["min"] = min;
        self.accessors[accessor]["max"] = max;
    }
}

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Generate the skinned test scene as a GLB file
pub fn generate_skinned_glb() -> Vec<u8> {
    let mut buffer = BufferBuilder::default();

    // One triangle in the XY plane, facing +Z
    let positions = buffer.push(
        &floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        FLOAT,
        3,
        "VEC3",
    );
    buffer.set_bounds(positions, json!([0.0, 0.0, 0.0]), json!([1.0, 1.0, 0.0]));
    let normals = buffer.push(
        &floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
        FLOAT,
        3,
        "VEC3",
    );
    let uvs = buffer.push(&floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 0.5]), FLOAT, 3, "VEC2");
    let joints = buffer.push(&[0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0], UNSIGNED_BYTE, 3, "VEC4");
    let weights = buffer.push(
        &floats(&[
            1.0, 0.0, 0.0, 0.0, //
            0.5, 0.5, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0,
        ]),
        FLOAT,
        3,
        "VEC4",
    );
    let indices_bytes: Vec<u8> = [0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    let indices = buffer.push(&indices_bytes, UNSIGNED_SHORT, 3, "SCALAR");

    // Column-major inverse bind matrices: identity, translate(0, -ARM_LENGTH, 0)
    #[rustfmt::skip]
    let ibm = floats(&[
        1.0, 0.0, 0.0, 0.0,  0.0, 1.0, 0.0, 0.0,  0.0, 0.0, 1.0, 0.0,  0.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0, 0.0,  0.0, 1.0, 0.0, 0.0,  0.0, 0.0, 1.0, 0.0,  0.0, -ARM_LENGTH, 0.0, 1.0,
    ]);
    let inverse_binds = buffer.push(&ibm, FLOAT, 2, "MAT4");

    let times = buffer.push(&floats(&[0.0, WAVE_DURATION]), FLOAT, 2, "SCALAR");
    buffer.set_bounds(times, json!([0.0]), json!([WAVE_DURATION]));
    let half = std::f32::consts::FRAC_1_SQRT_2;
    let rotations = buffer.push(
        &floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, half, half]),
        FLOAT,
        2,
        "VEC4",
    );

    let root = json!({
        "asset": { "version": "2.0", "generator": "db-export tests" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 2] }],
        "nodes": [
            { "name": "Root", "children": [1] },
            { "name": "Arm", "translation": [0.0, ARM_LENGTH, 0.0] },
            { "name": "Body", "mesh": 0, "skin": 0, "translation": BODY_OFFSET },
        ],
        "meshes": [{
            "name": "Body",
            "primitives": [{
                "attributes": {
                    "POSITION": positions,
                    "NORMAL": normals,
                    "TEXCOORD_0": uvs,
                    "JOINTS_0": joints,
                    "WEIGHTS_0": weights,
                },
                "indices": indices,
                "material": 0,
            }],
        }],
        "materials": [{
            "name": "Skin",
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 0.5, 0.0, 1.0],
                "roughnessFactor": 0.5,
            },
            "doubleSided": true,
        }],
        "skins": [{
            "name": "Armature",
            "joints": [0, 1],
            "inverseBindMatrices": inverse_binds,
            "skeleton": 0,
        }],
        "animations": [{
            "name": "Wave",
            "samplers": [{ "input": times, "output": rotations, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "rotation" } }],
        }],
        "buffers": [{ "byteLength": buffer.data.len() }],
        "bufferViews": buffer.views,
        "accessors": buffer.accessors,
    });

    assemble_glb(&root, &buffer.data)
}

/// Assemble the final GLB binary
fn assemble_glb(root: &Value, buffer_data: &[u8]) -> Vec<u8> {
    let json_bytes = serde_json::to_vec(root).expect("Failed to serialize JSON");

    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;

    // Pad buffer to 4-byte alignment
    let buffer_padding = (4 - (buffer_data.len() % 4)) % 4;
    let buffer_chunk_length = buffer_data.len() + buffer_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;
    let mut glb = Vec::with_capacity(total_length);

    // Header
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes());
    glb.extend_from_slice(&json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding));

    // BIN chunk
    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes());
    glb.extend_from_slice(buffer_data);
    glb.extend(std::iter::repeat_n(0u8, buffer_padding));

    glb
}
