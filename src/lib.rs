//! # cube-whisper
//!
//! Speech recognition for spoken Rubik's cube algorithms. Recordings are
//! turned into cepstral feature sequences, a bidirectional recurrent network
//! trained with CTC predicts a label stream, and the labels are rendered back
//! into cube notation. Built on the Burn ML framework with a Ratatui training
//! dashboard.
//!
//! ## Modules
//!
//! - [`labels`]: label alphabet and the notation codec
//! - [`audio`]: WAV decoding and MFCC feature extraction
//! - [`dataset`]: sample index loading, dataset building and partitioning
//! - [`model`]: the bidirectional GRU network and its regularizers
//! - [`ctc`]: CTC loss and decoding
//! - [`training`]: epoch loop, cost evaluation and metrics
//! - [`checkpoint`]: model persistence
//! - [`inference`]: classifying and rating recordings
//! - [`ui`]: terminal training dashboard
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: structured error types

#![recursion_limit = "256"]

pub mod audio;
pub mod checkpoint;
pub mod config;
pub mod ctc;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod labels;
pub mod model;
pub mod training;
pub mod ui;
