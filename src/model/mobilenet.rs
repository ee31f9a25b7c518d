//! MobileNetV2 feature extractor built with Burn.
//!
//! Standard inverted-residual architecture: a strided stem convolution,
//! seven groups of bottleneck blocks, and a final 1x1 convolution to the
//! feature dimension. Activations are ReLU6. A width multiplier scales
//! channel counts, rounded to multiples of 8.

use std::path::PathBuf;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor},
};

use crate::utils::error::Error;

/// Bottleneck settings per group: (expansion, channels, repeats, stride)
const BLOCK_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

/// Feature dimension of the final convolution at width multiplier <= 1.0
const FEATURE_DIM: usize = 1280;

/// Configuration for the MobileNetV2 backbone
#[derive(Config, Debug)]
pub struct MobileNetV2Config {
    /// Width multiplier applied to all channel counts
    #[config(default = "1.0")]
    pub alpha: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,
}

/// Scale a channel count by the width multiplier, rounding to a multiple of 8.
fn scaled_channels(channels: usize, alpha: f64) -> usize {
    let scaled = channels as f64 * alpha;
    let rounded = (((scaled / 8.0) + 0.5).floor() * 8.0).max(8.0);
    let rounded = if rounded < 0.9 * scaled {
        rounded + 8.0
    } else {
        rounded
    };
    rounded as usize
}

/// Convolution + BatchNorm + ReLU6
#[derive(Module, Debug)]
pub struct ConvBnRelu6<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
}

impl<B: Backend> ConvBnRelu6<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        groups: usize,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(kernel_size / 2, kernel_size / 2))
            .with_groups(groups)
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);

        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        x.clamp(0.0, 6.0)
    }
}

/// Inverted residual bottleneck block
///
/// Expansion 1x1 (absent when the expansion factor is 1), depthwise 3x3,
/// linear projection 1x1. The skip connection applies when the block keeps
/// both stride and channel count.
#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    expand: Option<ConvBnRelu6<B>>,
    depthwise: ConvBnRelu6<B>,
    project: Conv2d<B>,
    project_bn: BatchNorm<B>,
    use_residual: bool,
}

impl<B: Backend> InvertedResidual<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        expand_ratio: usize,
        device: &B::Device,
    ) -> Self {
        let hidden = in_channels * expand_ratio;

        let expand = if expand_ratio != 1 {
            Some(ConvBnRelu6::new(in_channels, hidden, 1, 1, 1, device))
        } else {
            None
        };

        let depthwise = ConvBnRelu6::new(hidden, hidden, 3, stride, hidden, device);

        let project = Conv2dConfig::new([hidden, out_channels], [1, 1])
            .with_bias(false)
            .init(device);
        let project_bn = BatchNormConfig::new(out_channels).init(device);

        Self {
            expand,
            depthwise,
            project,
            project_bn,
            use_residual: stride == 1 && in_channels == out_channels,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = match &self.expand {
            Some(expand) => expand.forward(x.clone()),
            None => x.clone(),
        };
        let out = self.depthwise.forward(out);
        let out = self.project_bn.forward(self.project.forward(out));

        if self.use_residual {
            x + out
        } else {
            out
        }
    }
}

/// MobileNetV2 backbone producing a [batch, feature_dim, H/32, W/32] map
#[derive(Module, Debug)]
pub struct MobileNetV2<B: Backend> {
    stem: ConvBnRelu6<B>,
    blocks: Vec<InvertedResidual<B>>,
    final_conv: ConvBnRelu6<B>,
    feature_dim: usize,
}

impl<B: Backend> MobileNetV2<B> {
    /// Create a new backbone with randomly initialized weights
    pub fn new(config: &MobileNetV2Config, device: &B::Device) -> Self {
        let alpha = config.alpha;
        let stem_channels = scaled_channels(32, alpha);
        let stem = ConvBnRelu6::new(config.in_channels, stem_channels, 3, 2, 1, device);

        let mut blocks = Vec::new();
        let mut in_channels = stem_channels;
        for (expand_ratio, channels, repeats, first_stride) in BLOCK_SETTINGS {
            let out_channels = scaled_channels(channels, alpha);
            for i in 0..repeats {
                let stride = if i == 0 { first_stride } else { 1 };
                blocks.push(InvertedResidual::new(
                    in_channels,
                    out_channels,
                    stride,
                    expand_ratio,
                    device,
                ));
                in_channels = out_channels;
            }
        }

        let feature_dim = if alpha > 1.0 {
            scaled_channels(FEATURE_DIM, alpha)
        } else {
            FEATURE_DIM
        };
        let final_conv = ConvBnRelu6::new(in_channels, feature_dim, 1, 1, 1, device);

        Self {
            stem,
            blocks,
            final_conv,
            feature_dim,
        }
    }

    /// Load backbone weights from a record file.
    pub fn load_pretrained<P: Into<PathBuf>>(self, path: P, device: &B::Device) -> crate::utils::error::Result<Self> {
        let recorder = CompactRecorder::new();
        self.load_file(path.into(), &recorder, device)
            .map_err(|e| Error::Model(format!("failed to load pretrained backbone: {:?}", e)))
    }

    /// Forward pass producing the feature map
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = self.stem.forward(x);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.final_conv.forward(x)
    }

    /// Channel count of the produced feature map
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }
}
