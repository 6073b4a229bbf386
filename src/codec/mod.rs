//! Compressed response framing.
//!
//! Responses may arrive as a sequence of LZ4 blocks, each guarded by a
//! CityHash128 checksum. [`FrameReader`] turns such a stream back into plain
//! bytes; [`FrameWriter`] and [`encode_block`] produce it.

pub mod cityhash;
mod frame;

pub use cityhash::hash128;
pub use frame::{
    encode_block, FrameReader, FrameWriter, CHECKSUM_LEN, DEFAULT_MAX_BLOCK_SIZE,
    DEFAULT_WRITE_BLOCK_SIZE, HEADER_LEN, MAGIC,
};
