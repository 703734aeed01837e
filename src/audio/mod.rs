mod features;
pub mod mfcc;
pub(crate) mod wav;

pub use features::{FeatureConfig, FeatureExtractor, FeatureSequence};
pub use wav::{read_wav, Waveform};
