use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};

use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;
use crate::model::{FeatureStats, SpeechNetwork};

const MAGIC: &[u8; 4] = b"CWCK";
const FORMAT_VERSION: u32 = 1;

type ModelRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// A network restored from disk with its metadata.
#[derive(Debug)]
pub struct LoadedCheckpoint<B: Backend> {
    pub network: SpeechNetwork<B>,
    pub metadata: CheckpointMetadata,
}

/// Reads and atomically replaces a single-file model checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointManager { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint. Returns `Ok(None)` when the file does not exist;
    /// any other failure is an error.
    pub fn load<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<Option<LoadedCheckpoint<B>>, CheckpointError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let (metadata, record) = decode_blob(&bytes, &self.path)?;
        let network = restore_network(&metadata, record.to_vec(), device)?;
        Ok(Some(LoadedCheckpoint { network, metadata }))
    }

    /// Serialize `network` and replace the checkpoint file.
    pub fn save<B: Backend>(
        &self,
        network: &SpeechNetwork<B>,
        metadata: &CheckpointMetadata,
    ) -> Result<(), CheckpointError> {
        let blob = encode_blob(network, metadata)?;

        let tmp_path = self.path.with_extension("tmp");
        let write_err = |source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&tmp_path, blob).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}

/// `magic | version | metadata length | metadata JSON | model record`
pub fn encode_blob<B: Backend>(
    network: &SpeechNetwork<B>,
    metadata: &CheckpointMetadata,
) -> Result<Vec<u8>, CheckpointError> {
    let recorder = ModelRecorder::default();
    let record = Recorder::<B>::record(&recorder, network.clone().into_record(), ())
        .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
    let meta = serde_json::to_vec(metadata)
        .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
    let meta_len =
        u32::try_from(meta.len()).map_err(|e| CheckpointError::ModelSave(e.to_string()))?;

    let mut blob = Vec::with_capacity(12 + meta.len() + record.len());
    blob.extend_from_slice(MAGIC);
    blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&meta_len.to_le_bytes());
    blob.extend_from_slice(&meta);
    blob.extend_from_slice(&record);
    Ok(blob)
}

/// Split a checkpoint blob into its metadata and model record bytes.
pub fn decode_blob<'a>(
    bytes: &'a [u8],
    path: &Path,
) -> Result<(CheckpointMetadata, &'a [u8]), CheckpointError> {
    if bytes.len() < 4 || &bytes[..4] != MAGIC {
        return Err(CheckpointError::BadMagic(path.to_path_buf()));
    }
    let version = read_u32(bytes, 4)?;
    if version != FORMAT_VERSION {
        return Err(CheckpointError::Version {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let meta_len = read_u32(bytes, 8)? as usize;
    let meta_end = 12usize
        .checked_add(meta_len)
        .filter(|&end| end <= bytes.len())
        .ok_or(CheckpointError::Truncated)?;
    let metadata: CheckpointMetadata = serde_json::from_slice(&bytes[12..meta_end])?;
    Ok((metadata, &bytes[meta_end..]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, CheckpointError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(CheckpointError::Truncated)
}

fn restore_network<B: Backend>(
    metadata: &CheckpointMetadata,
    record: Vec<u8>,
    device: &B::Device,
) -> Result<SpeechNetwork<B>, CheckpointError> {
    let skeleton = metadata
        .network
        .init::<B>(&FeatureStats::identity(metadata.input_size), device);
    let recorder = ModelRecorder::default();
    let record = Recorder::<B>::load(&recorder, record, device)
        .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
    Ok(skeleton.load_record(record))
}
