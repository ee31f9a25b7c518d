//! Pipeline orchestration: Load → Train → Validate → Export.
//!
//! Four sequential stages, no branching beyond the optional export gate,
//! no retries. Any stage error aborts the run with no partial-state
//! recovery.

use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::{AugmentationConfig, Augmenter, DatasetBundle, FolderDataset};
use crate::export::{export_model, ExportPaths, ModelManifest};
use crate::model::{ClassifierConfig, VarietyClassifier};
use crate::training::{Trainer, TrainingConfig, TrainingHistory};
use crate::utils::error::Result;
use crate::validate::{validate_model, ValidationReport};

/// Configuration of a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dataset root containing `train/`, `val/`, and optionally `test/`
    pub data_dir: PathBuf,
    /// Directory receiving the exported artifacts
    pub output_dir: PathBuf,
    /// Square input image size
    pub image_size: usize,
    /// Minimum validation accuracy for the judgement
    pub min_accuracy: f64,
    /// Backbone width multiplier
    pub alpha: f64,
    /// Optional pretrained backbone record
    pub pretrained_backbone: Option<PathBuf>,
    /// Skip export when validation fails the threshold
    pub gate_export: bool,
    /// Training hyperparameters
    pub training: TrainingConfig,
    /// Training-split augmentation ranges
    pub augmentation: AugmentationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            image_size: 224,
            min_accuracy: 0.85,
            alpha: 1.0,
            pretrained_backbone: None,
            gate_export: false,
            training: TrainingConfig::default(),
            augmentation: AugmentationConfig::default(),
        }
    }
}

/// Outcome of a pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Discovered label set, shared across splits
    pub classes: Vec<String>,
    /// Per-epoch training history
    pub history: TrainingHistory,
    /// Held-out validation result
    pub validation: ValidationReport,
    /// Exported artifact paths; `None` when the export gate skipped them
    pub artifacts: Option<ExportPaths>,
}

/// Run the full pipeline.
pub fn run<B: AutodiffBackend>(config: &PipelineConfig, device: &B::Device) -> Result<PipelineReport> {
    // Load
    println!("{}", "Loading dataset...".cyan().bold());
    let bundle = DatasetBundle::load(&config.data_dir)?;
    info!(
        "found {} classes, {} train / {} val samples",
        bundle.num_classes(),
        bundle.train.len(),
        bundle.val.len()
    );

    let augmenter = Augmenter::new(config.augmentation.clone());
    let train = FolderDataset::with_augmentation(&bundle.train, config.image_size, augmenter);
    let val = FolderDataset::new(&bundle.val, config.image_size);

    // Train
    println!("{}", "Training...".cyan().bold());
    let model_config = ClassifierConfig::new(bundle.num_classes())
        .with_input_size(config.image_size)
        .with_alpha(config.alpha);

    let model: VarietyClassifier<B> = match &config.pretrained_backbone {
        Some(path) => VarietyClassifier::from_pretrained(&model_config, path, device)?,
        None => {
            warn!("no pretrained backbone configured; feature extractor starts from random weights");
            VarietyClassifier::new(&model_config, device)
        }
    };

    let trainer = Trainer::<B>::new(config.training.clone(), device.clone());
    let (model, history) = trainer.fit(model, &train, &val)?;

    // Validate
    println!("{}", "Validating...".cyan().bold());
    let inner = model.valid();
    let inner_device = <B::InnerBackend as Backend>::Device::default();
    let validation = validate_model(&inner, &val, config.training.batch_size, &inner_device)?;
    validation.print_judgement(config.min_accuracy);

    // Export
    let artifacts = if config.gate_export && !validation.passes(config.min_accuracy) {
        warn!("validation below threshold and export gating is enabled; skipping export");
        None
    } else {
        println!("{}", "Exporting...".cyan().bold());
        let manifest = ModelManifest::new(
            &inner,
            bundle.classes(),
            config.image_size,
            config.alpha,
            model_config.hidden_units,
        );
        Some(export_model(&inner, &manifest, &config.output_dir)?)
    };

    Ok(PipelineReport {
        classes: bundle.classes().to_vec(),
        history,
        validation,
        artifacts,
    })
}
