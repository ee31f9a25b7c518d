//! Held-out evaluation and the accuracy threshold judgement.
//!
//! A single deterministic pass over the validation sequence in index order,
//! producing sample-weighted mean loss and accuracy. The judgement against
//! the configured minimum accuracy is advisory; gating the export on it is
//! the orchestrator's decision.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::tensor::{backend::Backend, ElementConversion};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{FolderDataset, ImageBatcher};
use crate::model::VarietyClassifier;
use crate::utils::error::{Error, Result};

/// Result of evaluating a model over a held-out split
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Mean cross-entropy loss, >= 0
    pub loss: f64,
    /// Mean accuracy in [0, 1]
    pub accuracy: f64,
    /// Number of evaluated samples
    pub samples: usize,
}

impl ValidationReport {
    /// Whether the accuracy meets the configured minimum
    pub fn passes(&self, min_accuracy: f64) -> bool {
        self.accuracy >= min_accuracy
    }

    /// Print the loss, accuracy, and pass/fail judgement
    pub fn print_judgement(&self, min_accuracy: f64) {
        println!("Validation Loss: {:.4}", self.loss);
        println!("Validation Accuracy: {:.4}", self.accuracy);

        if self.passes(min_accuracy) {
            println!(
                "{}",
                format!(
                    "Model validation successful. Accuracy meets the requirement of {}%.",
                    min_accuracy * 100.0
                )
                .green()
            );
        } else {
            println!(
                "{}",
                format!(
                    "Model validation failed. Accuracy is below the requirement of {}%.",
                    min_accuracy * 100.0
                )
                .red()
            );
        }
    }
}

/// Evaluate the model over the full dataset, without shuffling.
pub fn validate_model<B: Backend>(
    model: &VarietyClassifier<B>,
    dataset: &FolderDataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<ValidationReport> {
    if dataset.len() == 0 {
        return Err(Error::Dataset("validation dataset is empty".to_string()));
    }

    let batcher = ImageBatcher::new(dataset.image_size());
    let mut total_loss = 0.0f64;
    let mut correct = 0usize;
    let mut total = 0usize;

    for start in (0..dataset.len()).step_by(batch_size.max(1)) {
        let end = (start + batch_size).min(dataset.len());
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }
        let n = items.len();

        let batch = batcher.batch(items, device);
        let output = model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();
        total_loss += loss_value * n as f64;

        let predictions = output.argmax(1).squeeze_dim::<1>(1);
        let batch_correct: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();
        correct += batch_correct as usize;
        total += n;
    }

    let loss = total_loss / total.max(1) as f64;
    let accuracy = correct as f64 / total.max(1) as f64;

    info!(
        "validation: loss = {:.4}, accuracy = {:.2}%, samples = {}",
        loss,
        accuracy * 100.0,
        total
    );

    Ok(ValidationReport {
        loss,
        accuracy,
        samples: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ImageFolder;
    use crate::model::ClassifierConfig;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    type TestBackend = burn_ndarray::NdArray<f32>;

    #[test]
    fn test_passes_threshold_boundary() {
        let report = ValidationReport {
            loss: 0.4,
            accuracy: 0.85,
            samples: 100,
        };
        assert!(report.passes(0.85));
        assert!(report.passes(0.80));
        assert!(!report.passes(0.86));
    }

    #[test]
    fn test_validate_reports_bounded_metrics() {
        let tmp = TempDir::new().unwrap();
        for (class, value) in [("dark", 20u8), ("light", 230u8)] {
            let dir = tmp.path().join(class);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..2 {
                let img = RgbImage::from_pixel(8, 8, Rgb([value, value, value]));
                img.save(dir.join(format!("{}.png", i))).unwrap();
            }
        }

        let folder = ImageFolder::open(tmp.path()).unwrap();
        let dataset = FolderDataset::new(&folder, 32);

        let device = Default::default();
        let config = ClassifierConfig::new(2).with_input_size(32).with_alpha(0.25);
        let model = VarietyClassifier::<TestBackend>::new(&config, &device);

        let report = validate_model(&model, &dataset, 2, &device).unwrap();

        assert_eq!(report.samples, 4);
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert!(report.loss >= 0.0);
    }

    #[test]
    fn test_validate_empty_dataset_fails() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("only");
        std::fs::create_dir_all(&dir).unwrap();
        let img = RgbImage::from_pixel(8, 8, Rgb([1u8, 2u8, 3u8]));
        img.save(dir.join("a.png")).unwrap();

        let mut folder = ImageFolder::open(tmp.path()).unwrap();
        folder.samples.clear();
        let dataset = FolderDataset::new(&folder, 32);

        let device = Default::default();
        let config = ClassifierConfig::new(2).with_input_size(32).with_alpha(0.25);
        let model = VarietyClassifier::<TestBackend>::new(&config, &device);

        let result = validate_model(&model, &dataset, 2, &device);
        assert!(matches!(result, Err(Error::Dataset(_))));
    }
}
