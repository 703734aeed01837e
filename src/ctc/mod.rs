//! Connectionist temporal classification: training loss and decoders.

mod decode;
mod loss;

pub use decode::{best_path, prefix_search, PrefixSearch};
pub use loss::{ctc_batch_loss, ctc_loss};
