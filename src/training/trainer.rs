//! Fixed-epoch training loop for the frozen-backbone classifier.
//!
//! Each epoch shuffles the training indices with a seeded RNG, batches
//! items on demand, and steps the Adam optimizer over the head parameters
//! only. The validation split is evaluated after every epoch.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::dataset::{FolderDataset, ImageBatcher};
use crate::model::VarietyClassifier;
use crate::training::{TrainingConfig, TrainingHistory};
use crate::utils::error::{Error, Result};
use crate::validate::{validate_model, ValidationReport};

/// Trainer running the fixed-epoch loop on an autodiff backend
pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainingConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Train the model, returning the trained model and the epoch history.
    pub fn fit(
        &self,
        mut model: VarietyClassifier<B>,
        train: &FolderDataset,
        val: &FolderDataset,
    ) -> Result<(VarietyClassifier<B>, TrainingHistory)> {
        if train.len() == 0 {
            return Err(Error::Training("training dataset is empty".to_string()));
        }
        if self.config.batch_size == 0 {
            return Err(Error::Training("batch size must be positive".to_string()));
        }

        let batcher = ImageBatcher::new(train.image_size());
        let mut optimizer = AdamConfig::new().init();
        let mut history = TrainingHistory::default();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        info!(
            "training for {} epochs, batch size {}, lr {}",
            self.config.epochs, self.config.batch_size, self.config.learning_rate
        );

        for epoch in 0..self.config.epochs {
            println!(
                "{}",
                format!("Epoch {}/{}", epoch + 1, self.config.epochs)
                    .yellow()
                    .bold()
            );

            let mut epoch_loss = 0.0f64;
            let mut correct = 0usize;
            let mut seen = 0usize;

            let mut indices: Vec<usize> = (0..train.len()).collect();
            indices.shuffle(&mut rng);
            let num_batches =
                (indices.len() + self.config.batch_size - 1) / self.config.batch_size;

            for (batch_idx, chunk) in indices.chunks(self.config.batch_size).enumerate() {
                let items: Vec<_> = chunk.iter().filter_map(|&i| train.get(i)).collect();
                if items.is_empty() {
                    continue;
                }

                let batch = batcher.batch(items, &self.device);

                // Forward pass
                let output = model.forward(batch.images.clone());

                let loss = CrossEntropyLossConfig::new()
                    .init(&output.device())
                    .forward(output.clone(), batch.targets.clone());

                let loss_value: f64 = loss.clone().into_scalar().elem();
                epoch_loss += loss_value;

                let predictions = output.argmax(1).squeeze_dim::<1>(1);
                let batch_correct: i64 = predictions
                    .equal(batch.targets.clone())
                    .int()
                    .sum()
                    .into_scalar()
                    .elem();
                correct += batch_correct as usize;
                seen += batch.targets.dims()[0];

                // Backward pass; only the head receives updates
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model.head);
                model.head = optimizer.step(self.config.learning_rate, model.head.clone(), grads);

                if (batch_idx + 1) % 10 == 0 || batch_idx + 1 == num_batches {
                    debug!(
                        "  batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                        batch_idx + 1,
                        num_batches,
                        loss_value,
                        100.0 * correct as f64 / seen.max(1) as f64
                    );
                }
            }

            let train_loss = epoch_loss / num_batches.max(1) as f64;
            let train_accuracy = correct as f64 / seen.max(1) as f64;

            // Validation phase
            let report = self.evaluate(&model, val)?;
            history.record_epoch(train_loss, train_accuracy, report.loss, report.accuracy);

            info!(
                "epoch {}: train_loss = {:.4}, train_acc = {:.2}%, val_loss = {:.4}, val_acc = {:.2}%",
                epoch + 1,
                train_loss,
                100.0 * train_accuracy,
                report.loss,
                100.0 * report.accuracy
            );
            println!(
                "  {} loss: {:.4} | train acc: {:.2}% | val acc: {:.2}%",
                "→".cyan(),
                train_loss,
                100.0 * train_accuracy,
                100.0 * report.accuracy
            );
        }

        Ok((model, history))
    }

    /// Evaluate on the inner (non-autodiff) backend.
    fn evaluate(
        &self,
        model: &VarietyClassifier<B>,
        dataset: &FolderDataset,
    ) -> Result<ValidationReport> {
        let inner = model.valid();
        let device = <B::InnerBackend as Backend>::Device::default();
        validate_model(&inner, dataset, self.config.batch_size, &device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AugmentationConfig, Augmenter, ImageFolder};
    use crate::model::ClassifierConfig;
    use burn::backend::Autodiff;
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use tempfile::TempDir;

    type TestBackend = Autodiff<burn_ndarray::NdArray<f32>>;

    fn write_image(path: &Path, value: u8) {
        let img = RgbImage::from_pixel(8, 8, Rgb([value, 255 - value, value / 2]));
        img.save(path).unwrap();
    }

    fn make_split(root: &Path, images_per_class: usize) {
        for (class, value) in [("dark", 30u8), ("light", 220u8)] {
            let dir = root.join(class);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..images_per_class {
                write_image(&dir.join(format!("{}.png", i)), value);
            }
        }
    }

    #[test]
    fn test_fit_records_history_per_epoch() {
        let tmp = TempDir::new().unwrap();
        make_split(&tmp.path().join("train"), 3);
        make_split(&tmp.path().join("val"), 1);

        let train_folder = ImageFolder::open(tmp.path().join("train")).unwrap();
        let val_folder = ImageFolder::open(tmp.path().join("val")).unwrap();

        let augmenter = Augmenter::new(AugmentationConfig::default());
        let train = FolderDataset::with_augmentation(&train_folder, 32, augmenter);
        let val = FolderDataset::new(&val_folder, 32);

        let device = Default::default();
        let config = ClassifierConfig::new(2).with_input_size(32).with_alpha(0.25);
        let model = VarietyClassifier::<TestBackend>::new(&config, &device);

        let training_config = TrainingConfig {
            epochs: 2,
            batch_size: 4,
            learning_rate: 1e-3,
            seed: 42,
        };
        let trainer = Trainer::<TestBackend>::new(training_config, device);

        let (model, history) = trainer.fit(model, &train, &val).unwrap();

        assert_eq!(history.epochs(), 2);
        assert_eq!(model.num_classes(), 2);
        assert!(history.val_accuracy.iter().all(|&a| (0.0..=1.0).contains(&a)));
        assert!(history.val_loss.iter().all(|&l| l >= 0.0));
    }

    #[test]
    fn test_fit_empty_dataset_fails() {
        let tmp = TempDir::new().unwrap();
        make_split(&tmp.path().join("val"), 1);
        let val_folder = ImageFolder::open(tmp.path().join("val")).unwrap();
        let val = FolderDataset::new(&val_folder, 32);

        // Empty training dataset built from a cleared sample list.
        let mut empty_folder = val_folder.clone();
        empty_folder.samples.clear();
        let train = FolderDataset::new(&empty_folder, 32);

        let device = Default::default();
        let config = ClassifierConfig::new(2).with_input_size(32).with_alpha(0.25);
        let model = VarietyClassifier::<TestBackend>::new(&config, &device);

        let trainer = Trainer::<TestBackend>::new(TrainingConfig::default(), device);
        let result = trainer.fit(model, &train, &val);

        assert!(matches!(result, Err(Error::Training(_))));
    }
}
