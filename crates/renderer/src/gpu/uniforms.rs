use bytemuck::{Pod, Zeroable};

use crate::field::{FrameUniforms, PackedPalette};
use crate::types::STOP_CAPACITY;

/// CPU-side mirror of the `GlowParams` uniform block.
///
/// Every member is a `vec4` so the std140 layout has no implicit padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct GlowUniforms {
    /// width, height, aspect ratio, max reach
    pub viewport: [f32; 4],
    /// horizontal width, vertical stretch, roundness, feather
    pub shape: [f32; 4],
    /// mix, intensity, alpha, interpolation selector
    pub blend: [f32; 4],
    pub stops_a: [[f32; 4]; STOP_CAPACITY],
    pub stops_b: [[f32; 4]; STOP_CAPACITY],
}

impl GlowUniforms {
    pub fn from_frame(frame: &FrameUniforms) -> Self {
        let shape = &frame.shape;
        Self {
            viewport: [
                frame.viewport.0 as f32,
                frame.viewport.1 as f32,
                shape.aspect_ratio,
                shape.max_reach,
            ],
            shape: [
                shape.horizontal_width,
                shape.vertical_stretch,
                shape.roundness,
                shape.feather,
            ],
            blend: [
                frame.mix,
                frame.intensity,
                frame.alpha,
                frame.interpolation.shader_code(),
            ],
            stops_a: pack_stops(&frame.palette_a),
            stops_b: pack_stops(&frame.palette_b),
        }
    }
}

fn pack_stops(palette: &PackedPalette) -> [[f32; 4]; STOP_CAPACITY] {
    let slots = *palette.slots();
    slots.map(|stop| {
        let [r, g, b] = stop.colour.to_array();
        [r, g, b, stop.distance]
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sequence::{ColorStop, Palette, Rgb, Sequence, Step};

    use super::*;
    use crate::engine::Engine;
    use crate::types::{EngineOptions, Interpolation};

    #[test]
    fn block_size_matches_std140_layout() {
        assert_eq!(std::mem::size_of::<GlowUniforms>(), 16 * (3 + 2 * STOP_CAPACITY));
    }

    #[test]
    fn frame_fields_land_in_their_slots() {
        let red = Rgb::new(1.0, 0.0, 0.0);
        let palette = Palette::new(vec![
            ColorStop::new(Rgb::BLACK, 0.2),
            ColorStop::new(red, 0.8),
        ])
        .unwrap();
        let step = Step::new(palette, Duration::from_secs(2), Duration::ZERO).unwrap();
        let mut options = EngineOptions::default();
        options.interpolation = Interpolation::EaseInOut;
        let mut engine = Engine::new(Sequence::new(vec![step]).unwrap(), options).unwrap();
        engine.resize(640, 480);
        let frame = engine.frame_at(Duration::from_millis(500));

        let uniforms = GlowUniforms::from_frame(&frame);
        assert_eq!(uniforms.viewport[..3], [640.0, 480.0, 2.0]);
        assert_eq!(uniforms.shape, [0.8, 0.4, 0.3, 0.6]);
        assert_eq!(uniforms.blend, [0.25, 1.15, 1.0, 2.0]);
        assert_eq!(uniforms.stops_a[0], [0.0, 0.0, 0.0, 0.2]);
        assert_eq!(uniforms.stops_a[1], [1.0, 0.0, 0.0, 0.8]);
        assert_eq!(uniforms.stops_a[STOP_CAPACITY - 1], [1.0, 0.0, 0.0, 0.8]);
        assert_eq!(uniforms.stops_b, uniforms.stops_a);
    }
}
