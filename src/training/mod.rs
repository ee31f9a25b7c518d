//! Training module: configuration, per-epoch history, and the trainer.
//!
//! The run is a fixed number of passes over the training split. There is no
//! early stopping, no mid-run checkpointing, and no learning-rate schedule;
//! a failure mid-run aborts the whole pipeline.

pub mod trainer;

pub use trainer::Trainer;

use serde::{Deserialize, Serialize};

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Seed for the per-epoch shuffle
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

/// Per-epoch loss and accuracy history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

impl TrainingHistory {
    /// Record the metrics of one completed epoch
    pub fn record_epoch(
        &mut self,
        train_loss: f64,
        train_accuracy: f64,
        val_loss: f64,
        val_accuracy: f64,
    ) {
        self.train_loss.push(train_loss);
        self.train_accuracy.push(train_accuracy);
        self.val_loss.push(val_loss);
        self.val_accuracy.push(val_accuracy);
    }

    /// Number of recorded epochs
    pub fn epochs(&self) -> usize {
        self.train_loss.len()
    }

    /// Best validation accuracy seen so far
    pub fn best_val_accuracy(&self) -> f64 {
        self.val_accuracy.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_training_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_history_record() {
        let mut history = TrainingHistory::default();
        assert_eq!(history.epochs(), 0);

        history.record_epoch(1.2, 0.4, 1.1, 0.5);
        history.record_epoch(0.8, 0.6, 0.9, 0.7);

        assert_eq!(history.epochs(), 2);
        assert_eq!(history.train_loss, vec![1.2, 0.8]);
        assert_eq!(history.val_accuracy, vec![0.5, 0.7]);
    }

    #[test]
    fn test_best_val_accuracy() {
        let mut history = TrainingHistory::default();
        assert_eq!(history.best_val_accuracy(), 0.0);

        history.record_epoch(1.0, 0.5, 1.0, 0.62);
        history.record_epoch(0.9, 0.6, 0.9, 0.71);
        history.record_epoch(0.8, 0.7, 1.1, 0.66);

        assert!((history.best_val_accuracy() - 0.71).abs() < 1e-9);
    }
}
