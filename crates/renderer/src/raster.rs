//! CPU rasterisation of the glow field.
//!
//! Pixels are sampled at their centres. Row 0 is the top of the image, so the
//! `v` coordinate is flipped to match the bottom-left origin the shader sees.
//! Channel values are written without any transfer curve, the same way the
//! GPU path writes into a non-sRGB surface.

use std::path::Path;

use image::RgbaImage;
use tracing::info;

use crate::field::FrameUniforms;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("cannot rasterise an empty {width}x{height} image")]
    EmptySize { width: u32, height: u32 },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

fn quantise(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Evaluates every pixel of a `width`x`height` frame.
pub fn render_frame(
    uniforms: &FrameUniforms,
    width: u32,
    height: u32,
) -> Result<RgbaImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::EmptySize { width, height });
    }
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let u = (x as f32 + 0.5) / width as f32;
        let v = 1.0 - (y as f32 + 0.5) / height as f32;
        let [r, g, b, a] = uniforms.shade([u, v]);
        image::Rgba([quantise(r), quantise(g), quantise(b), quantise(a)])
    });
    Ok(image)
}

/// Renders a frame and saves it as PNG.
pub fn export_png(
    uniforms: &FrameUniforms,
    width: u32,
    height: u32,
    path: &Path,
) -> Result<(), RasterError> {
    let image = render_frame(uniforms, width, height)?;
    image::save_buffer_with_format(
        path,
        image.as_raw(),
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|source| RasterError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), width, height, "exported still frame");
    Ok(())
}
