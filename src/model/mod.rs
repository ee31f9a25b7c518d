//! Model module: MobileNetV2 backbone and the variety classifier.

pub mod classifier;
pub mod mobilenet;

pub use classifier::{ClassifierConfig, ClassifierHead, VarietyClassifier};
pub use mobilenet::{MobileNetV2, MobileNetV2Config};
