use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ModelConfig;
use crate::vision::mask::{Mask, DISEASED_THRESHOLD};
use crate::vision::preprocess::{ImageError, LeafImage};
use crate::vision::unet::UNet;
use crate::vision::weights::{self, WeightsError, WeightsFile};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),
    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] WeightsError),
    #[error("inference exceeded {0} ms")]
    Timeout(u64),
    #[error("inference task was aborted")]
    Aborted,
}

/// One segmentation outcome. `fallback` is true when the mask came from the
/// placeholder path instead of real weights, so callers can tell stub
/// predictions from real ones.
pub struct Segmentation {
    pub mask: Mask,
    pub confidence: f32,
    pub fallback: bool,
}

/// Read-only segmentation handle, fully initialized before the server
/// accepts requests and shared across all of them.
pub struct SegmentationEngine {
    net: Option<UNet>,
    input_size: u32,
}

impl SegmentationEngine {
    pub fn new(cfg: &ModelConfig) -> Result<Self, EngineError> {
        let loaded = match &cfg.weights_path {
            Some(path) => weights::load(path).and_then(|wf| {
                let WeightsFile {
                    architecture,
                    mut store,
                    checksum,
                } = wf;
                let net = UNet::build(architecture, &mut store)?;
                log::info!(
                    "Loaded segmentation weights from {} (sha256 {})",
                    path.display(),
                    hex::encode(checksum)
                );
                Ok(net)
            }),
            None => Err(WeightsError::NotConfigured),
        };

        match loaded {
            Ok(net) => Ok(Self {
                input_size: net.input_size(),
                net: Some(net),
            }),
            Err(e) if cfg.fallback_enabled => {
                log::warn!(
                    "No usable segmentation weights ({}); serving deterministic placeholder masks",
                    e
                );
                Ok(Self {
                    net: None,
                    input_size: cfg.input_size,
                })
            }
            Err(e) => Err(EngineError::ModelUnavailable(e)),
        }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    pub fn is_fallback(&self) -> bool {
        self.net.is_none()
    }

    /// Synchronous CPU inference. `seed` is the SHA-256 digest of the raw
    /// image bytes, which keeps the placeholder path reproducible: identical
    /// bytes always yield an identical mask.
    pub fn segment(&self, image: &LeafImage, seed: [u8; 32]) -> Segmentation {
        match &self.net {
            Some(net) => {
                let mask = Mask::new(net.forward(&image.pixels));
                let confidence = confidence_score(&mask);
                Segmentation {
                    mask,
                    confidence,
                    fallback: false,
                }
            }
            None => placeholder_segmentation(self.input_size as usize, seed),
        }
    }
}

/// Mean predicted probability over foreground pixels, or over the healthy
/// side when nothing is flagged. Expressed in [0,100]. Measures how sure
/// the model is, never how much of the leaf is diseased.
fn confidence_score(mask: &Mask) -> f32 {
    let mut fg_sum = 0.0f32;
    let mut fg_n = 0usize;
    let mut bg_sum = 0.0f32;
    for &p in mask.probs().iter() {
        if p > DISEASED_THRESHOLD {
            fg_sum += p;
            fg_n += 1;
        } else {
            bg_sum += 1.0 - p;
        }
    }
    if fg_n > 0 {
        100.0 * fg_sum / fg_n as f32
    } else if mask.total_pixels() > 0 {
        100.0 * bg_sum / mask.total_pixels() as f32
    } else {
        0.0
    }
}

/// Placeholder for deployments without trained weights: a sparse speckle
/// field smoothed and re-thresholded so it resembles lesion blobs. Strictly
/// a stand-in behind the `fallback_enabled` flag, never production behavior.
fn placeholder_segmentation(size: usize, seed: [u8; 32]) -> Segmentation {
    let mut rng = StdRng::from_seed(seed);

    let mut speckle: Array2<f32> = Array2::zeros((size, size));
    for v in speckle.iter_mut() {
        if rng.random::<f32>() > 0.85 {
            *v = 1.0;
        }
    }
    let probs = box_blur3(&speckle).mapv(|v| if v > 0.3 { 1.0 } else { 0.0 });
    let confidence = rng.random_range(75.0..95.0);

    Segmentation {
        mask: Mask::new(probs),
        confidence,
        fallback: true,
    }
}

fn box_blur3(grid: &Array2<f32>) -> Array2<f32> {
    let (h, w) = grid.dim();
    let mut out = Array2::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            let mut n = 0;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let iy = y as i32 + dy;
                    let ix = x as i32 + dx;
                    if iy >= 0 && ix >= 0 && (iy as usize) < h && (ix as usize) < w {
                        sum += grid[[iy as usize, ix as usize]];
                        n += 1;
                    }
                }
            }
            out[[y, x]] = sum / n as f32;
        }
    }
    out
}
