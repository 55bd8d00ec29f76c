pub mod chunker;
pub mod config;
pub mod constants;
pub mod error;
pub mod quantize;
pub mod resample;

pub use chunker::{OutputChunk, StreamChunker};
pub use config::{ChunkLayout, ChunkerConfig};
pub use error::ChunkerError;
