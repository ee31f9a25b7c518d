//! Dataset module: directory-tree loading, augmentation, and batching.
//!
//! The on-disk layout is one directory per split with one subdirectory per
//! class. Training batches are augmented and rescaled; validation and test
//! batches are rescaled only and keep their stable on-disk order.

pub mod augmentation;
pub mod batcher;
pub mod loader;

pub use augmentation::{AugmentationConfig, Augmenter};
pub use batcher::{FolderDataset, ImageBatch, ImageBatcher, ImageItem};
pub use loader::{DatasetBundle, ImageFolder, ImageSample, IMAGE_EXTENSIONS};
