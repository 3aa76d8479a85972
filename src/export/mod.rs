pub mod client;
pub mod controller;
pub mod encode;
pub mod request;

pub use client::ExportClient;
pub use controller::{ExportController, ExportOutcome, ExportPhase, ExportedImage, RenderTargetLease};
pub use encode::encode_png;
pub use request::{DEFAULT_BASENAME, ExportRequest};
