mod manager;
mod metadata;

pub use manager::{decode_blob, encode_blob, CheckpointManager, LoadedCheckpoint};
pub use metadata::{CheckpointMetadata, CheckpointMetrics};
