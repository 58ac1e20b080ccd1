pub mod engine;
pub mod mask;
pub mod preprocess;
pub mod unet;
pub mod weights;

pub use engine::{EngineError, Segmentation, SegmentationEngine};
pub use mask::Mask;
pub use preprocess::{ImageError, LeafImage};
