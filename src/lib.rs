//! Isometric cyber-container scene: procedural geometry, a deterministic CPU
//! renderer with bloom and vignette, and exclusive high-resolution PNG export.

pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod render;
pub mod scene;

pub use camera::{CameraFrame, IsometricCamera, IsometricProjector};
pub use config::Config;
pub use error::{ConfigError, EncodeError, ExportError, InvalidParameters, PipelineError};
pub use export::{ExportClient, ExportController, ExportPhase, ExportRequest, ExportedImage};
pub use render::{PixelBuffer, RenderPipeline, RenderTargetState};
pub use scene::{Scene, SceneAssembler};
