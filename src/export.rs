//! Model export: single-file checkpoint plus a web-deployable directory.
//!
//! Two artifacts are written: a `.mpk` checkpoint record, and a
//! `web_model/` directory holding a JSON manifest and the full weight
//! record in JSON form for browser-side loading. If any step fails, every
//! artifact written so far is removed before the error propagates, so the
//! exporter produces both artifacts or neither.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{CompactRecorder, FullPrecisionSettings, PrettyJsonFileRecorder};
use burn::tensor::backend::Backend;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{ClassifierConfig, VarietyClassifier};
use crate::utils::error::{Error, Result};

/// Checkpoint file stem; the recorder appends `.mpk`
pub const CHECKPOINT_STEM: &str = "papas_model";

/// Name of the web-deployable directory
pub const WEB_MODEL_DIR: &str = "web_model";

/// Weight file stem inside the web directory; the recorder appends `.json`
pub const WEB_WEIGHTS_STEM: &str = "weights";

/// Manifest file name inside the web directory
pub const MANIFEST_FILE: &str = "model.json";

/// Format tag written into the manifest
pub const WEB_FORMAT: &str = "papas-web/1";

/// Manifest describing the exported model for loaders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Format tag
    pub format: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// Square input size the model expects
    pub input_size: usize,
    /// Number of input channels
    pub channels: usize,
    /// Pixel rescale factor applied before inference
    pub rescale: f32,
    /// Class names, index-aligned with the output logits
    pub classes: Vec<String>,
    /// Backbone width multiplier
    pub alpha: f64,
    /// Hidden units in the classification head
    pub hidden_units: usize,
    /// Total parameter count
    pub num_parameters: usize,
    /// Weight file name inside the web directory
    pub weights_file: String,
}

impl ModelManifest {
    /// Build a manifest for a trained model
    pub fn new<B: Backend>(
        model: &VarietyClassifier<B>,
        classes: &[String],
        input_size: usize,
        alpha: f64,
        hidden_units: usize,
    ) -> Self {
        Self {
            format: WEB_FORMAT.to_string(),
            created_at: Utc::now().to_rfc3339(),
            input_size,
            channels: 3,
            rescale: 1.0 / 255.0,
            classes: classes.to_vec(),
            alpha,
            hidden_units,
            num_parameters: model.num_params(),
            weights_file: format!("{}.json", WEB_WEIGHTS_STEM),
        }
    }

    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let manifest: ModelManifest = serde_json::from_str(&json)?;
        Ok(manifest)
    }

    /// Model configuration matching this manifest
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.classes.len())
            .with_input_size(self.input_size)
            .with_alpha(self.alpha)
            .with_hidden_units(self.hidden_units)
    }
}

/// Paths of the artifacts an export produced
#[derive(Debug, Clone)]
pub struct ExportPaths {
    /// Single-file checkpoint
    pub checkpoint: PathBuf,
    /// Web-deployable directory
    pub web_model: PathBuf,
}

/// Export the trained model into `output_dir`.
pub fn export_model<B: Backend>(
    model: &VarietyClassifier<B>,
    manifest: &ModelManifest,
    output_dir: &Path,
) -> Result<ExportPaths> {
    fs::create_dir_all(output_dir)?;

    let checkpoint = output_dir.join(format!("{}.mpk", CHECKPOINT_STEM));
    let web_dir = output_dir.join(WEB_MODEL_DIR);

    if let Err(err) = write_artifacts(model, manifest, output_dir, &web_dir) {
        cleanup(&checkpoint, &web_dir);
        return Err(err);
    }

    info!(
        "model exported: {} and {}",
        checkpoint.display(),
        web_dir.display()
    );

    Ok(ExportPaths {
        checkpoint,
        web_model: web_dir,
    })
}

fn write_artifacts<B: Backend>(
    model: &VarietyClassifier<B>,
    manifest: &ModelManifest,
    output_dir: &Path,
    web_dir: &Path,
) -> Result<()> {
    let recorder = CompactRecorder::new();
    model
        .clone()
        .save_file(output_dir.join(CHECKPOINT_STEM), &recorder)
        .map_err(|e| Error::Export(format!("failed to save checkpoint: {:?}", e)))?;
    info!("checkpoint saved as {}.mpk", CHECKPOINT_STEM);

    fs::create_dir_all(web_dir)?;
    let manifest_json = serde_json::to_string_pretty(manifest)?;
    fs::write(web_dir.join(MANIFEST_FILE), manifest_json)?;

    let weights_recorder = PrettyJsonFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(web_dir.join(WEB_WEIGHTS_STEM), &weights_recorder)
        .map_err(|e| Error::Export(format!("failed to write web weights: {:?}", e)))?;
    info!("web model written to {}", web_dir.display());

    Ok(())
}

fn cleanup(checkpoint: &Path, web_dir: &Path) {
    if checkpoint.exists() {
        if let Err(e) = fs::remove_file(checkpoint) {
            warn!("failed to remove partial checkpoint {}: {}", checkpoint.display(), e);
        }
    }
    if web_dir.is_dir() {
        if let Err(e) = fs::remove_dir_all(web_dir) {
            warn!("failed to remove partial web model {}: {}", web_dir.display(), e);
        }
    }
}

/// Load a model and its manifest back from an exported web directory.
pub fn load_web_model<B: Backend>(
    web_dir: &Path,
    device: &B::Device,
) -> Result<(VarietyClassifier<B>, ModelManifest)> {
    let manifest = ModelManifest::load(&web_dir.join(MANIFEST_FILE))?;

    let model = VarietyClassifier::new(&manifest.classifier_config(), device);
    let recorder = PrettyJsonFileRecorder::<FullPrecisionSettings>::new();
    let model = model
        .load_file(web_dir.join(WEB_WEIGHTS_STEM), &recorder, device)
        .map_err(|e| Error::Model(format!("failed to load web model weights: {:?}", e)))?;

    Ok((model, manifest))
}
