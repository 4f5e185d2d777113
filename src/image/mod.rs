pub mod loader;
pub mod preprocessing;
pub mod postprocessing;

pub use loader::ImageLoader;
pub use preprocessing::{ImagePreprocessor, PixelSource};
pub use postprocessing::{ClassScore, ResultFormatter};
