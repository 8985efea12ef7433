//! wgpu device, surface and the windowed [`crate::gpu::GpuBackend`].
//!
//! [`Gpu`] owns the adapter, device, queue, surface and depth buffer;
//! [`WgpuBackend`] builds pipelines and bind groups from shader reflection
//! on top of it.

mod backend;
mod gpu;
mod init;
mod surface;

pub use backend::WgpuBackend;
pub use gpu::{Gpu, GpuFrame};
pub use init::GpuInit;
pub use surface::{SurfaceErrorAction, DEPTH_FORMAT};
