//! Burn dataset integration: lazy per-index image loading and batching.
//!
//! Items are loaded on demand, so every epoch restarts the same finite
//! sequence while the augmented training split produces fresh variations
//! on each draw.

use std::path::{Path, PathBuf};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use image::imageops::FilterType;
use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::dataset::augmentation::Augmenter;
use crate::dataset::loader::ImageFolder;
use crate::utils::error::Result;

/// A single decoded image ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageItem {
    /// Image data as flattened CHW float array [3 * H * W], rescaled to [0, 1]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Image path (for debugging/logging)
    pub path: String,
}

impl ImageItem {
    /// Load an image from disk, resize it to `image_size` square, optionally
    /// augment it, and rescale pixel values to [0, 1].
    pub fn from_path(
        path: &Path,
        label: usize,
        image_size: usize,
        augmenter: Option<&Augmenter>,
    ) -> Result<Self> {
        let img = ImageReader::open(path)?
            .decode()?
            .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
            .to_rgb8();

        let img = match augmenter {
            Some(augmenter) => augmenter.augment(&img, &mut rand::thread_rng()),
            None => img,
        };

        let (width, height) = (image_size, image_size);
        let mut image = vec![0.0f32; 3 * height * width];

        // CHW layout, rescale 1/255
        for y in 0..height {
            for x in 0..width {
                let pixel = img.get_pixel(x as u32, y as u32);
                image[y * width + x] = pixel[0] as f32 / 255.0;
                image[height * width + y * width + x] = pixel[1] as f32 / 255.0;
                image[2 * height * width + y * width + x] = pixel[2] as f32 / 255.0;
            }
        }

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// Lazy dataset over one split, implementing Burn's `Dataset` trait.
#[derive(Debug, Clone)]
pub struct FolderDataset {
    samples: Vec<(PathBuf, usize)>,
    image_size: usize,
    augmenter: Option<Augmenter>,
}

impl FolderDataset {
    /// Deterministic dataset (validation and test splits)
    pub fn new(folder: &ImageFolder, image_size: usize) -> Self {
        Self {
            samples: folder
                .samples
                .iter()
                .map(|s| (s.path.clone(), s.label))
                .collect(),
            image_size,
            augmenter: None,
        }
    }

    /// Augmenting dataset (training split); each `get` draws fresh parameters
    pub fn with_augmentation(folder: &ImageFolder, image_size: usize, augmenter: Augmenter) -> Self {
        Self {
            augmenter: Some(augmenter),
            ..Self::new(folder, image_size)
        }
    }

    /// Target square image size
    pub fn image_size(&self) -> usize {
        self.image_size
    }
}

impl Dataset<ImageItem> for FolderDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        let (path, label) = self.samples.get(index)?;
        ImageItem::from_path(path, *label, self.image_size, self.augmenter.as_ref()).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of images for training or evaluation
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width], values in [0, 1]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher stacking items into tensors
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    image_size: usize,
}

impl ImageBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::augmentation::{AugmentationConfig, Augmenter};
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    type TestBackend = burn_ndarray::NdArray<f32>;

    fn write_image(path: &Path, value: u8) {
        let img = RgbImage::from_pixel(8, 8, Rgb([value, value, value]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_item_from_path_rescales_to_unit_range() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.png");
        write_image(&path, 255);

        let item = ImageItem::from_path(&path, 2, 16, None).unwrap();
        assert_eq!(item.label, 2);
        assert_eq!(item.image.len(), 3 * 16 * 16);
        assert!(item.image.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((item.image[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_item_from_path_with_augmentation_stays_in_range() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.png");
        write_image(&path, 180);

        let augmenter = Augmenter::new(AugmentationConfig::default());
        let item = ImageItem::from_path(&path, 0, 16, Some(&augmenter)).unwrap();
        assert!(item.image.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_folder_dataset_get() {
        let tmp = TempDir::new().unwrap();
        let class_dir = tmp.path().join("desiree");
        std::fs::create_dir_all(&class_dir).unwrap();
        write_image(&class_dir.join("a.png"), 10);
        write_image(&class_dir.join("b.png"), 20);

        let folder = ImageFolder::open(tmp.path()).unwrap();
        let dataset = FolderDataset::new(&folder, 16);

        assert_eq!(dataset.len(), 2);
        assert!(dataset.get(0).is_some());
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_batcher_shapes_and_targets() {
        let items = vec![
            ImageItem::from_data(vec![0.5f32; 3 * 16 * 16], 0, "a.png".to_string()),
            ImageItem::from_data(vec![0.25f32; 3 * 16 * 16], 1, "b.png".to_string()),
            ImageItem::from_data(vec![0.75f32; 3 * 16 * 16], 1, "c.png".to_string()),
        ];

        let batcher = ImageBatcher::new(16);
        let device = Default::default();
        let batch: ImageBatch<TestBackend> = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [3, 3, 16, 16]);
        assert_eq!(batch.targets.dims(), [3]);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0, 1, 1]);

        let pixels: Vec<f32> = batch.images.into_data().to_vec().unwrap();
        assert!(pixels.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
