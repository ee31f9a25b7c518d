//! Potato variety classification CLI
//!
//! Entry point for the transfer-learning pipeline: load a labeled image
//! directory tree, fine-tune the classification head on a frozen
//! MobileNetV2 backbone, validate against an accuracy threshold, and
//! export the trained model.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use burn::data::dataloader::batcher::Batcher;

use papas_classifier::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use papas_classifier::dataset::{AugmentationConfig, ImageBatch, ImageBatcher, ImageFolder, ImageItem};
use papas_classifier::export::load_web_model;
use papas_classifier::pipeline::{self, PipelineConfig};
use papas_classifier::training::TrainingConfig;
use papas_classifier::utils::logging::{init_logging, LogConfig};

/// Potato variety classification via transfer learning
#[derive(Parser, Debug)]
#[command(name = "papas_classifier")]
#[command(version)]
#[command(about = "Potato variety classification with a frozen MobileNetV2 backbone", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: load, train, validate, export
    Train {
        /// Dataset root containing train/, val/, and optionally test/
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value = "10")]
        epochs: usize,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Adam learning rate
        #[arg(long, default_value = "0.001")]
        learning_rate: f64,

        /// Square input image size
        #[arg(long, default_value = "224")]
        image_size: usize,

        /// Minimum validation accuracy for the pass/fail judgement
        #[arg(long, default_value = "0.85")]
        min_accuracy: f64,

        /// Backbone width multiplier
        #[arg(long, default_value = "1.0")]
        alpha: f64,

        /// Output directory for the exported artifacts
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Pretrained backbone record file
        #[arg(long)]
        pretrained: Option<PathBuf>,

        /// Random seed for the per-epoch shuffle
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Skip export when validation fails the threshold
        #[arg(long, default_value = "false")]
        gate_export: bool,

        /// Disable training-split augmentation
        #[arg(long, default_value = "false")]
        no_augmentation: bool,
    },

    /// Show dataset statistics
    Stats {
        /// Dataset root
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Classify a single image with an exported web model
    Infer {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the exported web model directory
        #[arg(short, long, default_value = "web_model")]
        web_model: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            data_dir,
            epochs,
            batch_size,
            learning_rate,
            image_size,
            min_accuracy,
            alpha,
            output_dir,
            pretrained,
            seed,
            gate_export,
            no_augmentation,
        } => {
            let config = PipelineConfig {
                data_dir,
                output_dir,
                image_size,
                min_accuracy,
                alpha,
                pretrained_backbone: pretrained,
                gate_export,
                training: TrainingConfig {
                    epochs,
                    batch_size,
                    learning_rate,
                    seed,
                },
                augmentation: if no_augmentation {
                    AugmentationConfig::none()
                } else {
                    AugmentationConfig::default()
                },
            };
            cmd_train(config)?;
        }

        Commands::Stats { data_dir } => {
            cmd_stats(&data_dir)?;
        }

        Commands::Infer { input, web_model } => {
            cmd_infer(&input, &web_model)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        "Papas Classifier | potato variety classification with Burn".green().bold()
    );
    println!("Backend: {}", backend_name());
    println!();
}

fn cmd_train(config: PipelineConfig) -> Result<()> {
    info!("starting pipeline run on {}", config.data_dir.display());

    println!("{}", "Run Configuration:".cyan().bold());
    println!("  Data directory:  {}", config.data_dir.display());
    println!("  Output directory: {}", config.output_dir.display());
    println!("  Image size:      {0}x{0}", config.image_size);
    println!("  Epochs:          {}", config.training.epochs);
    println!("  Batch size:      {}", config.training.batch_size);
    println!("  Learning rate:   {}", config.training.learning_rate);
    println!("  Min accuracy:    {}", config.min_accuracy);
    println!();

    let device = default_device();
    let report = pipeline::run::<TrainingBackend>(&config, &device)?;

    println!();
    println!("{}", "Pipeline Complete!".green().bold());
    println!(
        "  Best validation accuracy: {:.2}%",
        report.history.best_val_accuracy() * 100.0
    );
    match &report.artifacts {
        Some(artifacts) => {
            println!("  Checkpoint: {}", artifacts.checkpoint.display());
            println!("  Web model:  {}", artifacts.web_model.display());
            println!();
            println!("{}", "Next steps:".cyan().bold());
            println!(
                "  • Classify an image: papas_classifier infer --input <image> --web-model {}",
                artifacts.web_model.display()
            );
        }
        None => {
            println!("  Export skipped (validation below threshold).");
        }
    }

    Ok(())
}

fn cmd_stats(data_dir: &Path) -> Result<()> {
    info!("computing dataset statistics for {}", data_dir.display());

    if !data_dir.is_dir() {
        println!(
            "{} dataset directory not found: {}",
            "Error:".red(),
            data_dir.display()
        );
        println!();
        println!("Expected structure:");
        println!("  {}/", data_dir.display());
        println!("  ├── train/<class>/*.jpg");
        println!("  ├── val/<class>/*.jpg");
        println!("  └── test/<class>/*.jpg   (optional)");
        return Ok(());
    }

    for split in ["train", "val", "test"] {
        let split_dir = data_dir.join(split);
        if !split_dir.is_dir() {
            continue;
        }

        match ImageFolder::open(&split_dir) {
            Ok(folder) => {
                println!("{}", format!("{} split:", split).cyan().bold());
                println!("  Samples: {}", folder.len());
                println!("  Classes: {}", folder.num_classes());

                let counts = folder.class_counts();
                for (idx, class) in folder.classes.iter().enumerate() {
                    let count = counts[idx];
                    let bar_len =
                        (count as f32 / folder.len().max(1) as f32 * 40.0).round() as usize;
                    println!("    {:30} {:>5} {}", class, count, "█".repeat(bar_len));
                }
                println!();
            }
            Err(e) => {
                println!("{} failed to load {} split: {}", "Error:".red(), split, e);
            }
        }
    }

    Ok(())
}

fn cmd_infer(input: &Path, web_model: &Path) -> Result<()> {
    info!("running inference");
    info!("  input: {}", input.display());
    info!("  model: {}", web_model.display());

    if !input.exists() {
        println!("{} input image not found: {}", "Error:".red(), input.display());
        return Ok(());
    }
    if !web_model.is_dir() {
        println!(
            "{} web model directory not found: {}",
            "Error:".red(),
            web_model.display()
        );
        return Ok(());
    }

    println!("{}", "Loading model...".cyan());
    let device = default_device();
    let (model, manifest) = load_web_model::<DefaultBackend>(web_model, &device)?;

    let item = ImageItem::from_path(input, 0, manifest.input_size, None)?;
    let batcher = ImageBatcher::new(manifest.input_size);
    let batch: ImageBatch<DefaultBackend> = batcher.batch(vec![item], &device);

    let probs = model.forward_softmax(batch.images);
    let probs: Vec<f32> = probs.into_data().to_vec().unwrap();

    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let (best_idx, best_prob) = indexed[0];
    let predicted = manifest
        .classes
        .get(best_idx)
        .map(String::as_str)
        .unwrap_or("unknown");

    println!();
    println!("Image: {}", input.display());
    println!(
        "Predicted: {} ({:.1}%)",
        predicted.green().bold(),
        best_prob * 100.0
    );
    println!("Per-class probabilities:");
    for (idx, prob) in &indexed {
        let name = manifest
            .classes
            .get(*idx)
            .map(String::as_str)
            .unwrap_or("unknown");
        println!("  {:30} {:>6.2}%", name, prob * 100.0);
    }

    Ok(())
}
