pub mod pipeline;
pub mod postfx;
pub mod raster;
pub mod shading;
pub mod target;

pub use pipeline::{PipelineSettings, RenderPipeline};
pub use postfx::{BloomSettings, VignetteSettings};
pub use target::{PixelBuffer, RenderTargetState};
