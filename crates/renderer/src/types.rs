use crate::runtime::RenderPolicy;

/// Upper bound on stops per palette; sizes the uniform arrays shared with the
/// fragment shader.
pub const STOP_CAPACITY: usize = 16;

/// Shaping curve applied to the position inside a palette segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Smoothstep,
    EaseInOut,
}

impl Interpolation {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            Interpolation::Linear => clamped,
            Interpolation::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            Interpolation::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
        }
    }

    /// Selector value the fragment shader switches on.
    pub(crate) fn shader_code(self) -> f32 {
        match self {
            Interpolation::Linear => 0.0,
            Interpolation::Smoothstep => 1.0,
            Interpolation::EaseInOut => 2.0,
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interpolation::Linear => f.write_str("linear"),
            Interpolation::Smoothstep => f.write_str("smoothstep"),
            Interpolation::EaseInOut => f.write_str("ease-in-out"),
        }
    }
}

/// Horizontal stretch applied to field coordinates before shaping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectRatio {
    /// Constant factor regardless of the surface shape.
    Fixed(f32),
    /// Follow the surface's width / height.
    Viewport,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::Fixed(2.0)
    }
}

impl AspectRatio {
    pub fn resolve(self, width: u32, height: u32) -> f32 {
        match self {
            AspectRatio::Fixed(value) => value,
            AspectRatio::Viewport => width.max(1) as f32 / height.max(1) as f32,
        }
    }
}

/// Tunables for the field evaluator, fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Widens the smooth threshold at the outer edge of the field.
    pub feather: f32,
    /// Feeds the maximum-reach normalisation of the field scalar.
    pub aspect_fix: f32,
    /// Multiplier applied to the final colour.
    pub intensity: f32,
    /// Number of stop slots each palette is packed into.
    pub max_stops: usize,
    pub aspect_ratio: AspectRatio,
    /// Horizontal extent of the glow in field units.
    pub horizontal_width: f32,
    /// Vertical extent of the glow in field units.
    pub vertical_stretch: f32,
    /// Blend weight from round (0) to square (1) contours.
    pub roundness: f32,
    pub alpha: f32,
    pub interpolation: Interpolation,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            feather: 0.6,
            aspect_fix: 0.3,
            intensity: 1.15,
            max_stops: 8,
            aspect_ratio: AspectRatio::default(),
            horizontal_width: 0.8,
            vertical_stretch: 0.4,
            roundness: 0.3,
            alpha: 1.0,
            interpolation: Interpolation::default(),
        }
    }
}

/// Declares how the compositor should treat the swapchain alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceAlpha {
    /// Frames fully cover the surface.
    #[default]
    Opaque,
    /// Frames may contain transparency and should be blended by the compositor.
    Transparent,
}

/// Immutable configuration passed to the preview window at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Animate, hold a still frame, or export.
    pub policy: RenderPolicy,
    pub surface_alpha: SurfaceAlpha,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Turrell Glow".to_string(),
            policy: RenderPolicy::default(),
            surface_alpha: SurfaceAlpha::default(),
        }
    }
}
