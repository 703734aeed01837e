use std::path::PathBuf;

/// Errors that can occur while decoding audio.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to read audio file {path}: {source}")]
    Read {
        path: PathBuf,
        source: hound::Error,
    },

    #[error("unsupported sample format in {path}: {bits}-bit {format}")]
    UnsupportedFormat {
        path: PathBuf,
        bits: u16,
        format: &'static str,
    },

    #[error("audio file {0} contains no samples")]
    Empty(PathBuf),
}

/// Errors that can occur while building a dataset from a sample directory.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read sample index {path}: {source}")]
    IndexRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse sample index {path}: {source}")]
    IndexParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("sample {id}: {source}")]
    Audio {
        id: String,
        #[source]
        source: AudioError,
    },
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} is not a cube-whisper checkpoint")]
    BadMagic(PathBuf),

    #[error("unsupported checkpoint version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("checkpoint is truncated")]
    Truncated,

    #[error("failed to parse checkpoint metadata: {0}")]
    MetadataParse(#[from] serde_json::Error),

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("checkpoint expects {expected}-dimensional features, extractor produces {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("evaluation worker panicked")]
    WorkerPanic,

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Errors that can occur while classifying a recording.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("{}: {source}", path.display())]
    Audio {
        path: PathBuf,
        #[source]
        source: AudioError,
    },

    #[error("failed to read network output: {0}")]
    Output(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::BadMagic(PathBuf::from("model.bin"));
        assert_eq!(err.to_string(), "model.bin is not a cube-whisper checkpoint");
    }

    #[test]
    fn test_dataset_error_names_sample() {
        let err = DatasetError::Audio {
            id: "abc".into(),
            source: AudioError::Empty(PathBuf::from("a.wav")),
        };
        assert_eq!(err.to_string(), "sample abc: audio file a.wav contains no samples");
    }

    #[test]
    fn test_training_error_display() {
        let err = TrainingError::FeatureMismatch {
            expected: 26,
            found: 24,
        };
        assert_eq!(
            err.to_string(),
            "checkpoint expects 26-dimensional features, extractor produces 24"
        );
    }

    #[test]
    fn test_inference_error_display() {
        let err = InferenceError::Audio {
            path: PathBuf::from("clip.wav"),
            source: AudioError::Empty(PathBuf::from("clip.wav")),
        };
        assert_eq!(err.to_string(), "clip.wav: audio file clip.wav contains no samples");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("training.step_size must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: training.step_size must be > 0"
        );
    }
}
