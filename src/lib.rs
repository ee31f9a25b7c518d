//! Papas Classifier: transfer-learning pipeline for potato variety
//! classification with Burn.
//!
//! The crate is split into a library (the modules declared below) and a thin
//! CLI binary in `main.rs`. Each module owns one stage of the pipeline:
//! backend selection, dataset loading/augmentation/batching, the model,
//! training, validation, export, and the end-to-end orchestration.

pub mod backend;
pub mod dataset;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod training;
pub mod utils;
pub mod validate;
