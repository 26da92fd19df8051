//! Renderer crate for Turrell Glow.
//!
//! Turns a playing palette [`sequence::Sequence`] into pixels. The flow is:
//!
//! ```text
//!   Sequence ──▶ Engine ──(delta)──▶ SequencePlayer ──▶ FrameUniforms
//!                                                          │
//!                         ┌────────────────────────────────┤
//!                         ▼                                ▼
//!                WindowRuntime / GpuState          raster::render_frame
//!                (GLSL fragment shader)            (CPU, PNG export)
//! ```
//!
//! [`Engine`] owns the player together with the play/pause flag and the
//! viewport. Each frame it produces a [`FrameUniforms`] snapshot: the two
//! palettes being blended, the blend factor and the field shape. Both
//! backends evaluate the same field, the GPU through the shader generated in
//! `compile`, the CPU through [`field::shade`].

mod compile;
pub mod engine;
pub mod field;
mod gpu;
pub mod raster;
pub mod runtime;
pub mod types;
mod window;

pub use engine::{Engine, EngineError};
pub use field::{FieldShape, FrameUniforms, PackedPalette};
pub use raster::{export_png, render_frame, RasterError};
pub use runtime::{time_source_for_policy, FrameScheduler, RenderPolicy};
pub use types::{
    AspectRatio, EngineOptions, Interpolation, RendererConfig, SurfaceAlpha, STOP_CAPACITY,
};
pub use window::WindowRuntime;
