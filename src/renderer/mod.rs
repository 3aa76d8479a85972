pub mod frame;
pub mod gpu;

pub use gpu::GpuState;
