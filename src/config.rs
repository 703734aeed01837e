use std::path::Path;

use crate::audio::FeatureConfig;
use crate::error::ConfigError;
use crate::inference::DecodeConfig;
use crate::model::NetworkConfig;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub features: FeatureConfig,
    pub network: NetworkConfig,
    pub training: TrainerConfig,
    pub decode: DecodeConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.features;
        if f.window_ms == 0 {
            return Err(ConfigError::Validation(
                "features.window_ms must be > 0".into(),
            ));
        }
        if f.overlap_ms >= f.window_ms {
            return Err(ConfigError::Validation(
                "features.overlap_ms must be < features.window_ms".into(),
            ));
        }
        if f.mel_bands == 0 {
            return Err(ConfigError::Validation(
                "features.mel_bands must be > 0".into(),
            ));
        }
        if f.cepstral_coefficients == 0 || f.cepstral_coefficients > f.mel_bands {
            return Err(ConfigError::Validation(
                "features.cepstral_coefficients must be in [1, features.mel_bands]".into(),
            ));
        }
        if f.low_freq_hz < 0.0 || f.high_freq_hz <= f.low_freq_hz {
            return Err(ConfigError::Validation(
                "features.high_freq_hz must be > features.low_freq_hz >= 0".into(),
            ));
        }
        if f.noise_std.is_nan() || f.noise_std < 0.0 {
            return Err(ConfigError::Validation(
                "features.noise_std must be >= 0".into(),
            ));
        }

        let n = &self.network;
        if n.hidden_size == 0 || n.output_hidden_size == 0 {
            return Err(ConfigError::Validation(
                "network.hidden_size and network.output_hidden_size must be > 0".into(),
            ));
        }
        if n.weight_std <= 0.0 {
            return Err(ConfigError::Validation(
                "network.weight_std must be > 0".into(),
            ));
        }
        if n.input_noise < 0.0 {
            return Err(ConfigError::Validation(
                "network.input_noise must be >= 0".into(),
            ));
        }
        if n.output_dropout < 0.0 || n.output_dropout >= 1.0 {
            return Err(ConfigError::Validation(
                "network.output_dropout must be in [0, 1)".into(),
            ));
        }

        let t = &self.training;
        if t.step_size <= 0.0 {
            return Err(ConfigError::Validation(
                "training.step_size must be > 0".into(),
            ));
        }
        if t.batch_size == 0 {
            return Err(ConfigError::Validation(
                "training.batch_size must be > 0".into(),
            ));
        }
        if t.max_sub_batch == 0 {
            return Err(ConfigError::Validation(
                "training.max_sub_batch must be > 0".into(),
            ));
        }
        if t.cost_batch_size == 0 || t.cost_sample_size == 0 {
            return Err(ConfigError::Validation(
                "training.cost_batch_size and training.cost_sample_size must be > 0".into(),
            ));
        }
        if t.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "training.max_concurrency must be >= 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&t.validation_ratio) {
            return Err(ConfigError::Validation(
                "training.validation_ratio must be in [0, 1)".into(),
            ));
        }
        if t.max_epochs == Some(0) {
            return Err(ConfigError::Validation(
                "training.max_epochs must be >= 1".into(),
            ));
        }
        if t.grad_clip_norm.is_some_and(|norm| norm <= 0.0) {
            return Err(ConfigError::Validation(
                "training.grad_clip_norm must be > 0".into(),
            ));
        }

        let d = &self.decode;
        if d.prefix_cutoff <= 0.0 || d.prefix_cutoff >= 1.0 {
            return Err(ConfigError::Validation(
                "decode.prefix_cutoff must be in (0, 1)".into(),
            ));
        }
        if d.beam_width == 0 {
            return Err(ConfigError::Validation(
                "decode.beam_width must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).unwrap_or_default()
    }
}
