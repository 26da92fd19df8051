use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::types::STOP_CAPACITY;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the glow fragment shader for palettes packed into `num_stops`.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    num_stops: usize,
) -> wgpu::ShaderModule {
    let source = fragment_source(num_stops);
    tracing::debug!(num_stops, "compiling glow fragment shader");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("glow fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// GLSL for the glow field with the palette walk bounded to `num_stops`.
pub(crate) fn fragment_source(num_stops: usize) -> String {
    let num_stops = num_stops.clamp(1, STOP_CAPACITY);
    FRAGMENT_SHADER_GLSL
        .replace("{{NUM_STOPS}}", &num_stops.to_string())
        .replace("{{STOP_CAPACITY}}", &STOP_CAPACITY.to_string())
}

/// Field evaluation mirrored from `field.rs`.
///
/// Each stop is packed as `vec4(r, g, b, distance)`. The block layout must
/// match `GlowUniforms`.
const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform GlowParams {
    vec4 viewport;
    vec4 shape;
    vec4 blend;
    vec4 stops_a[{{STOP_CAPACITY}}];
    vec4 stops_b[{{STOP_CAPACITY}}];
} ubo;

#define NUM_STOPS {{NUM_STOPS}}

float shape_segment(float t) {
    t = clamp(t, 0.0, 1.0);
    int curve = int(ubo.blend.w + 0.5);
    if (curve == 1) {
        return t * t * (3.0 - 2.0 * t);
    }
    if (curve == 2) {
        return t < 0.5 ? 2.0 * t * t : -1.0 + (4.0 - 2.0 * t) * t;
    }
    return t;
}

vec4 stop_at(bool second, int index) {
    return second ? ubo.stops_b[index] : ubo.stops_a[index];
}

vec3 sample_palette(bool second, float d) {
    vec4 first = stop_at(second, 0);
    vec4 last = stop_at(second, NUM_STOPS - 1);
    if (d < first.w) {
        return first.rgb;
    }
    if (d > last.w) {
        return last.rgb;
    }
    vec3 col = first.rgb;
    for (int i = 0; i < NUM_STOPS - 1; i++) {
        vec4 lo = stop_at(second, i);
        vec4 hi = stop_at(second, i + 1);
        if (d >= lo.w && d <= hi.w) {
            float width = hi.w - lo.w;
            float t = width > 0.0 ? (d - lo.w) / width : 1.0;
            col = mix(lo.rgb, hi.rgb, shape_segment(t));
        }
    }
    return col;
}

void main() {
    vec2 p = v_uv - 0.5;
    p.x *= ubo.viewport.z;
    float h = p.x / ubo.shape.x;
    float v = p.y / ubo.shape.y;
    float euclid = length(vec2(h, v));
    float chebyshev = max(abs(h), abs(v));
    float r = mix(euclid, chebyshev, ubo.shape.z) / ubo.viewport.w;
    float d = smoothstep(0.0, 1.0 + ubo.shape.w, r);

    vec3 a = sample_palette(false, d);
    vec3 b = sample_palette(true, d);
    outColor = vec4(mix(a, b, ubo.blend.x) * ubo.blend.y, ubo.blend.z);
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga;

    fn parse(source: &str, stage: ShaderStage) -> naga::Module {
        let mut frontend = naga::front::glsl::Frontend::default();
        let module = frontend
            .parse(&naga::front::glsl::Options::from(stage), source)
            .unwrap_or_else(|err| panic!("GLSL failed to parse: {err:?}"));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|err| panic!("GLSL failed to validate: {err:?}"));
        module
    }

    #[test]
    fn stop_count_is_substituted_and_clamped() {
        assert!(fragment_source(8).contains("#define NUM_STOPS 8\n"));
        assert!(fragment_source(0).contains("#define NUM_STOPS 1\n"));
        assert!(fragment_source(40).contains("#define NUM_STOPS 16\n"));
        assert!(!fragment_source(8).contains("{{"));
    }

    #[test]
    fn fragment_shader_compiles_for_every_stop_count() {
        for num_stops in [1, 2, 8, STOP_CAPACITY] {
            let module = parse(&fragment_source(num_stops), ShaderStage::Fragment);
            assert!(module.entry_points.iter().any(|entry| entry.name == "main"));
        }
    }

    #[test]
    fn vertex_shader_compiles() {
        parse(VERTEX_SHADER_GLSL, ShaderStage::Vertex);
    }
}
