//! Backend-independent evaluation of the glow field.
//!
//! Everything here is a pure function of a normalised surface coordinate and
//! a [`FrameUniforms`] snapshot. The GLSL fragment shader in
//! [`crate::compile`] mirrors these functions line for line; the CPU raster
//! and the tests call them directly.

use sequence::{ColorStop, Palette, Rgb};
use tracing::warn;

use crate::types::{EngineOptions, Interpolation, STOP_CAPACITY};

/// Hermite step between two edges, matching GLSL `smoothstep`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Largest raw field value reached inside the visible area for a given
/// aspect correction.
pub fn max_reach(aspect_fix: f32) -> f32 {
    (0.5 * (1.0 + aspect_fix)).hypot(0.5)
}

/// Evaluates a gradient at `d`.
///
/// Values below the first stop resolve to the first colour and values above
/// the last stop to the last colour. Inside, the segment containing `d` is
/// interpolated; when `d` sits on a boundary shared by two segments the later
/// one wins, and a zero-width segment resolves to its upper stop.
pub fn sample_stops(stops: &[ColorStop], d: f32, interpolation: Interpolation) -> Rgb {
    let Some((first, last)) = stops.first().zip(stops.last()) else {
        return Rgb::BLACK;
    };
    if d < first.distance {
        return first.colour;
    }
    if d > last.distance {
        return last.colour;
    }

    let mut colour = first.colour;
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if d >= lo.distance && d <= hi.distance {
            let width = hi.distance - lo.distance;
            let t = if width > 0.0 {
                (d - lo.distance) / width
            } else {
                1.0
            };
            colour = lo.colour.lerp(hi.colour, interpolation.sample(t));
        }
    }
    colour
}

/// Fixed-capacity copy of a palette, padded with its last stop.
///
/// `len` is the number of slots the evaluator walks (the configured maximum
/// stop count); slots past it are filled too so the whole array can be
/// uploaded as is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedPalette {
    stops: [ColorStop; STOP_CAPACITY],
    len: usize,
}

impl PackedPalette {
    /// Packs `palette` into `max_stops` slots (clamped to `1..=STOP_CAPACITY`).
    pub fn pack(palette: &Palette, max_stops: usize) -> Self {
        let slots = max_stops.clamp(1, STOP_CAPACITY);
        let real = palette.stops();
        if real.len() > slots {
            warn!(
                stops = real.len(),
                max_stops = slots,
                "palette has more stops than the renderer supports; truncating"
            );
        }
        let kept = &real[..real.len().min(slots)];
        let pad = kept[kept.len() - 1];
        let mut stops = [pad; STOP_CAPACITY];
        stops[..kept.len()].copy_from_slice(kept);
        Self { stops, len: slots }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The slots the evaluator walks, padding included.
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops[..self.len]
    }

    /// Every slot, as uploaded to the GPU.
    pub fn slots(&self) -> &[ColorStop; STOP_CAPACITY] {
        &self.stops
    }

    pub fn sample(&self, d: f32, interpolation: Interpolation) -> Rgb {
        sample_stops(self.stops(), d, interpolation)
    }
}

/// Geometry of the field: aspect handling, contour shape, normalisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldShape {
    pub aspect_ratio: f32,
    pub horizontal_width: f32,
    pub vertical_stretch: f32,
    pub roundness: f32,
    pub max_reach: f32,
    pub feather: f32,
}

impl FieldShape {
    pub fn from_options(options: &EngineOptions, viewport: (u32, u32)) -> Self {
        Self {
            aspect_ratio: options.aspect_ratio.resolve(viewport.0, viewport.1),
            horizontal_width: options.horizontal_width,
            vertical_stretch: options.vertical_stretch,
            roundness: options.roundness,
            max_reach: max_reach(options.aspect_fix),
            feather: options.feather,
        }
    }

    /// Normalised field value before the feathered threshold.
    pub fn raw(&self, uv: [f32; 2]) -> f32 {
        let x = (uv[0] - 0.5) * self.aspect_ratio;
        let y = uv[1] - 0.5;
        let h = x / self.horizontal_width;
        let v = y / self.vertical_stretch;
        let euclid = h.hypot(v);
        let chebyshev = h.abs().max(v.abs());
        let r = euclid * (1.0 - self.roundness) + chebyshev * self.roundness;
        r / self.max_reach
    }

    /// Field scalar `d` fed to the palettes.
    pub fn distance(&self, uv: [f32; 2]) -> f32 {
        smoothstep(0.0, 1.0 + self.feather, self.raw(uv))
    }
}

/// Everything one frame needs, on any backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Palette of the active step.
    pub palette_a: PackedPalette,
    /// Palette of the following step.
    pub palette_b: PackedPalette,
    pub mix: f32,
    pub intensity: f32,
    pub alpha: f32,
    pub interpolation: Interpolation,
    pub shape: FieldShape,
    /// Surface size in pixels.
    pub viewport: (u32, u32),
}

impl FrameUniforms {
    /// Linear RGBA for the surface coordinate `uv` in `[0, 1]^2`.
    pub fn shade(&self, uv: [f32; 2]) -> [f32; 4] {
        shade(uv, self)
    }
}

pub fn shade(uv: [f32; 2], uniforms: &FrameUniforms) -> [f32; 4] {
    let d = uniforms.shape.distance(uv);
    let a = uniforms.palette_a.sample(d, uniforms.interpolation);
    let b = uniforms.palette_b.sample(d, uniforms.interpolation);
    let colour = a.lerp(b, uniforms.mix).scale(uniforms.intensity);
    [colour.r, colour.g, colour.b, uniforms.alpha]
}
