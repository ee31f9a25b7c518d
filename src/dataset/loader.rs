//! Dataset loading from labeled directory trees.
//!
//! A split directory contains one subdirectory per class; class membership
//! is inferred from the subdirectory name. The label set is the sorted list
//! of class directory names discovered at load time, and it must match
//! across the train, val, and test splits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{Error, Result};

/// File extensions recognized as images
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// A single image sample with its label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (subdirectory name)
    pub class_name: String,
}

/// One dataset split loaded from a class-per-subdirectory layout
///
/// ```text
/// root/
/// ├── desiree/
/// │   ├── image1.jpg
/// │   └── image2.jpg
/// ├── kennebec/
/// │   └── ...
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct ImageFolder {
    /// Root directory of the split
    pub root: PathBuf,
    /// Sorted class names
    pub classes: Vec<String>,
    /// Mapping from class name to label index
    pub class_to_idx: HashMap<String, usize>,
    /// All samples, ordered by class then by path
    pub samples: Vec<ImageSample>,
}

impl ImageFolder {
    /// Open a split directory, discovering classes and samples.
    ///
    /// Fails with a configuration error when the directory is missing,
    /// contains no class subdirectories, or contains no images.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(Error::Config(format!(
                "data directory does not exist: {}",
                root.display()
            )));
        }

        let mut classes: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    classes.push(name.to_string());
                }
            }
        }
        classes.sort();

        if classes.is_empty() {
            return Err(Error::Config(format!(
                "no class subdirectories found in {}",
                root.display()
            )));
        }

        let class_to_idx: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let mut samples = Vec::new();
        for class_name in &classes {
            let class_dir = root.join(class_name);
            let label = class_to_idx[class_name];

            let mut paths: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.path().to_path_buf())
                .filter(|p| {
                    p.extension()
                        .map(|ext| {
                            let ext = ext.to_string_lossy().to_lowercase();
                            IMAGE_EXTENSIONS.contains(&ext.as_str())
                        })
                        .unwrap_or(false)
                })
                .collect();
            // Stable sample order so unshuffled passes map back to files
            paths.sort();

            debug!("class '{}' (label {}): {} images", class_name, label, paths.len());

            samples.extend(paths.into_iter().map(|path| ImageSample {
                path,
                label,
                class_name: class_name.clone(),
            }));
        }

        if samples.is_empty() {
            return Err(Error::Config(format!(
                "no images found under {}",
                root.display()
            )));
        }

        info!(
            "loaded split {}: {} classes, {} samples",
            root.display(),
            classes.len(),
            samples.len()
        );

        Ok(Self {
            root,
            classes,
            class_to_idx,
            samples,
        })
    }

    /// Number of samples in the split
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the split is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Sample counts per class, indexed by label
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }
}

/// The train/val/test splits of a dataset root
///
/// `train` and `val` are required, `test` is optional. All present splits
/// must agree on the label set and its ordering; otherwise the classifier
/// output indices would not be comparable across splits.
#[derive(Debug)]
pub struct DatasetBundle {
    pub train: ImageFolder,
    pub val: ImageFolder,
    pub test: Option<ImageFolder>,
}

impl DatasetBundle {
    /// Load `<root>/train`, `<root>/val`, and `<root>/test` when present.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();

        let train = ImageFolder::open(root.join("train"))?;
        let val = ImageFolder::open(root.join("val"))?;

        let test_dir = root.join("test");
        let test = if test_dir.is_dir() {
            Some(ImageFolder::open(test_dir)?)
        } else {
            None
        };

        ensure_same_classes(&train, &val, "train", "val")?;
        if let Some(test) = &test {
            ensure_same_classes(&train, test, "train", "test")?;
        }

        Ok(Self { train, val, test })
    }

    /// The shared, sorted label set
    pub fn classes(&self) -> &[String] {
        &self.train.classes
    }

    /// Number of classes
    pub fn num_classes(&self) -> usize {
        self.train.num_classes()
    }
}

fn ensure_same_classes(
    a: &ImageFolder,
    b: &ImageFolder,
    a_name: &str,
    b_name: &str,
) -> Result<()> {
    if a.classes != b.classes {
        return Err(Error::Config(format!(
            "class mismatch between '{}' and '{}' splits: {:?} vs {:?}",
            a_name, b_name, a.classes, b.classes
        )));
    }
    Ok(())
}
