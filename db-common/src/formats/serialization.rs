//! Binary serialization trait for format records.
//!
//! Every fixed-size DreamBox record implements `BinarySerializable` so generic
//! code (the chunk reader, record arrays) can decode them uniformly, while each
//! type keeps its specific `to_bytes()` returning a fixed-size array.

use super::{
    BoneRecord, ChunkHeader, FileHeader, MaterialRecord, MeshHeader, PackedVertex, QuatKey,
    TrackHeader, Vec3Key,
};

/// Trait for binary-serializable fixed-size records.
///
/// The trait uses `Vec<u8>` for the return type because associated const
/// generics in return types (`[u8; Self::SIZE]`) are not yet stable in Rust.
///
/// # Example
///
/// ```
/// use db_common::formats::{BinarySerializable, FileHeader};
///
/// let header = FileHeader::mesh();
/// let bytes = header.serialize();
/// let parsed = FileHeader::deserialize(&bytes).unwrap();
/// assert_eq!(parsed, header);
/// ```
pub trait BinarySerializable: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Serialize to bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes.
    ///
    /// Returns `None` if the byte slice is too short or contains invalid data.
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_binary_serializable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BinarySerializable for $ty {
                const SIZE: usize = <$ty>::SIZE;

                fn serialize(&self) -> Vec<u8> {
                    self.to_bytes().to_vec()
                }

                fn deserialize(bytes: &[u8]) -> Option<Self> {
                    Self::from_bytes(bytes)
                }
            }
        )*
    };
}

impl_binary_serializable!(
    FileHeader,
    ChunkHeader,
    BoneRecord,
    MaterialRecord,
    MeshHeader,
    PackedVertex,
    TrackHeader,
    Vec3Key,
    QuatKey,
);

/// Decode `count` consecutive records from `bytes`
///
/// Returns `None` if `bytes` holds fewer than `count` records.
pub(crate) fn read_array<T: BinarySerializable>(bytes: &[u8], count: usize) -> Option<Vec<T>> {
    if bytes.len() < count.checked_mul(T::SIZE)? {
        return None;
    }
    bytes
        .chunks_exact(T::SIZE)
        .take(count)
        .map(T::deserialize)
        .collect()
}
