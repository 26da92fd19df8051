//! GPU path for the preview window.
//!
//! - `context` owns the wgpu instance, device and surface, and reconfigures
//!   the swapchain on resize.
//! - `pipeline` compiles the glow shader into a single full-screen pipeline.
//! - `uniforms` mirrors the shader's uniform block.
//! - `state` glues them together behind `GpuState`, used by `window`.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
