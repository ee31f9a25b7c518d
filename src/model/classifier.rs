//! Variety classifier: frozen MobileNetV2 backbone + trainable head.
//!
//! The head is global average pooling followed by a 128-unit ReLU layer and
//! a linear projection to the class logits. Softmax is applied only at
//! inference; the loss consumes raw logits. The backbone is marked
//! `no_grad` at assembly, and the trainer steps head parameters only.

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use super::mobilenet::{MobileNetV2, MobileNetV2Config};

/// Configuration for the full classifier
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "224")]
    pub input_size: usize,

    /// Backbone width multiplier
    #[config(default = "1.0")]
    pub alpha: f64,

    /// Hidden units in the classification head
    #[config(default = "128")]
    pub hidden_units: usize,
}

/// Trainable classification head on top of the frozen feature extractor
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pool: AdaptiveAvgPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    pub fn new(
        feature_dim: usize,
        hidden_units: usize,
        num_classes: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1: LinearConfig::new(feature_dim, hidden_units).init(device),
            fc2: LinearConfig::new(hidden_units, num_classes).init(device),
        }
    }

    /// Map a [batch, channels, H, W] feature map to [batch, num_classes] logits
    pub fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(features);

        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        self.fc2.forward(x)
    }
}

/// Potato variety classifier
#[derive(Module, Debug)]
pub struct VarietyClassifier<B: Backend> {
    /// Frozen feature extractor
    pub backbone: MobileNetV2<B>,
    /// Trainable head (the only part the optimizer steps)
    pub head: ClassifierHead<B>,
    num_classes: usize,
}

impl<B: Backend> VarietyClassifier<B> {
    /// Create a classifier with a randomly initialized backbone
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        let backbone = MobileNetV2::new(
            &MobileNetV2Config::new().with_alpha(config.alpha),
            device,
        );
        Self::assemble(backbone, config, device)
    }

    /// Create a classifier with pretrained backbone weights loaded from a record file
    pub fn from_pretrained(
        config: &ClassifierConfig,
        backbone_weights: &Path,
        device: &B::Device,
    ) -> crate::utils::error::Result<Self> {
        let backbone = MobileNetV2::new(
            &MobileNetV2Config::new().with_alpha(config.alpha),
            device,
        )
        .load_pretrained(backbone_weights, device)?;
        Ok(Self::assemble(backbone, config, device))
    }

    fn assemble(backbone: MobileNetV2<B>, config: &ClassifierConfig, device: &B::Device) -> Self {
        let backbone = backbone.no_grad();
        let head = ClassifierHead::new(
            backbone.feature_dim(),
            config.hidden_units,
            config.num_classes,
            device,
        );

        Self {
            backbone,
            head,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass producing class logits
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(x);
        self.head.forward(features)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn_ndarray::NdArray<f32>;

    fn small_config() -> ClassifierConfig {
        ClassifierConfig::new(4)
            .with_input_size(32)
            .with_alpha(0.25)
    }

    #[test]
    fn test_classifier_output_shape() {
        let device = Default::default();
        let model = VarietyClassifier::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 4]);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = Default::default();
        let model = VarietyClassifier::<TestBackend>::new(&small_config(), &device);

        let input = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
        let probs = model.forward_softmax(input);

        let values: Vec<f32> = probs.into_data().to_vec().unwrap();
        for row in values.chunks(4) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_head_output_shape() {
        let device = Default::default();
        let head = ClassifierHead::<TestBackend>::new(64, 128, 5, &device);

        let features = Tensor::<TestBackend, 4>::zeros([3, 64, 2, 2], &device);
        let logits = head.forward(features);

        assert_eq!(logits.dims(), [3, 5]);
    }

    #[test]
    fn test_config_defaults() {
        let config = ClassifierConfig::new(7);
        assert_eq!(config.num_classes, 7);
        assert_eq!(config.input_size, 224);
        assert_eq!(config.hidden_units, 128);
        assert!((config.alpha - 1.0).abs() < f64::EPSILON);
    }
}
