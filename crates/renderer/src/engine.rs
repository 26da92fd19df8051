use std::time::Duration;

use player::SequencePlayer;
use sequence::Sequence;
use tracing::{debug, info};

use crate::field::{FieldShape, FrameUniforms, PackedPalette};
use crate::types::{AspectRatio, EngineOptions, STOP_CAPACITY};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f32 },
    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("max_stops must be between 1 and 16, got {0}")]
    MaxStops(usize),
    #[error("roundness must lie in [0, 1], got {0}")]
    Roundness(f32),
}

impl EngineOptions {
    /// Rejects option sets the field evaluator cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let finite = [
            ("feather", self.feather),
            ("aspect_fix", self.aspect_fix),
            ("intensity", self.intensity),
            ("horizontal_width", self.horizontal_width),
            ("vertical_stretch", self.vertical_stretch),
            ("roundness", self.roundness),
            ("alpha", self.alpha),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(EngineError::NotFinite { name, value });
            }
        }
        for (name, value) in [("feather", self.feather), ("intensity", self.intensity)] {
            if value < 0.0 {
                return Err(EngineError::Negative { name, value });
            }
        }
        for (name, value) in [
            ("horizontal_width", self.horizontal_width),
            ("vertical_stretch", self.vertical_stretch),
        ] {
            if value <= 0.0 {
                return Err(EngineError::NotPositive { name, value });
            }
        }
        if self.aspect_fix <= -1.0 {
            return Err(EngineError::NotPositive {
                name: "1 + aspect_fix",
                value: 1.0 + self.aspect_fix,
            });
        }
        if let AspectRatio::Fixed(value) = self.aspect_ratio {
            if !value.is_finite() {
                return Err(EngineError::NotFinite {
                    name: "aspect_ratio",
                    value,
                });
            }
            if value <= 0.0 {
                return Err(EngineError::NotPositive {
                    name: "aspect_ratio",
                    value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.roundness) {
            return Err(EngineError::Roundness(self.roundness));
        }
        if !(1..=STOP_CAPACITY).contains(&self.max_stops) {
            return Err(EngineError::MaxStops(self.max_stops));
        }
        Ok(())
    }
}

/// Owns the player and turns its state into per-frame uniforms.
///
/// A new engine starts paused. Time only moves through [`Engine::frame`]
/// while playing, or explicitly through [`Engine::frame_at`].
pub struct Engine {
    player: SequencePlayer,
    options: EngineOptions,
    viewport: (u32, u32),
    shape: FieldShape,
    playing: bool,
}

impl Engine {
    pub fn new(sequence: Sequence, options: EngineOptions) -> Result<Self, EngineError> {
        options.validate()?;
        let longest = sequence.max_palette_len();
        if longest > options.max_stops {
            tracing::warn!(
                longest,
                max_stops = options.max_stops,
                "sequence contains palettes longer than max_stops; they will be truncated"
            );
        }
        let viewport = (1, 1);
        let shape = FieldShape::from_options(&options, viewport);
        info!(
            steps = sequence.len(),
            total_cycle_ms = sequence.total_cycle().as_millis() as u64,
            max_stops = options.max_stops,
            "engine ready"
        );
        Ok(Self {
            player: SequencePlayer::new(sequence),
            options,
            viewport,
            shape,
            playing: false,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn player(&self) -> &SequencePlayer {
        &self.player
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Arms the frame loop. Returns `false` when already playing.
    pub fn play(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.playing = true;
        debug!(elapsed_ms = self.player.elapsed().as_millis() as u64, "playback started");
        true
    }

    /// Disarms the frame loop. Returns `false` when already paused.
    pub fn pause(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.playing = false;
        debug!(elapsed_ms = self.player.elapsed().as_millis() as u64, "playback paused");
        true
    }

    /// Updates the viewport-derived constants. Zero-sized requests are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.viewport {
            return;
        }
        self.viewport = (width, height);
        self.shape = FieldShape::from_options(&self.options, self.viewport);
        debug!(width, height, aspect = self.shape.aspect_ratio, "viewport resized");
    }

    /// Advances by `delta` and returns the frame, or `None` while paused.
    pub fn frame(&mut self, delta: Duration) -> Option<FrameUniforms> {
        if !self.playing {
            return None;
        }
        self.player.advance(delta);
        Some(self.uniforms())
    }

    /// Jumps to an absolute time regardless of the play state.
    pub fn frame_at(&mut self, elapsed: Duration) -> FrameUniforms {
        self.player.seek(elapsed);
        self.uniforms()
    }

    /// Uniforms for the current state without moving the clock.
    pub fn uniforms(&self) -> FrameUniforms {
        let frame = self.player.peek();
        let (a, b) = self.player.palettes();
        FrameUniforms {
            palette_a: PackedPalette::pack(a, self.options.max_stops),
            palette_b: PackedPalette::pack(b, self.options.max_stops),
            mix: frame.mix,
            intensity: self.options.intensity,
            alpha: self.options.alpha,
            interpolation: self.options.interpolation,
            shape: self.shape,
            viewport: self.viewport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player::{ManualTimeSource, TimeSource};
    use sequence::{ColorStop, Palette, Rgb, Step};

    fn sequence() -> Sequence {
        let palette = |colour| {
            Palette::new(vec![
                ColorStop::new(Rgb::BLACK, 0.0),
                ColorStop::new(colour, 1.0),
            ])
            .unwrap()
        };
        Sequence::new(vec![
            Step::new(
                palette(Rgb::WHITE),
                Duration::from_millis(1000),
                Duration::from_millis(500),
            )
            .unwrap(),
            Step::new(
                palette(Rgb::new(1.0, 0.0, 0.0)),
                Duration::from_millis(1000),
                Duration::from_millis(500),
            )
            .unwrap(),
        ])
        .unwrap()
    }

    fn engine() -> Engine {
        Engine::new(sequence(), EngineOptions::default()).expect("engine")
    }

    #[test]
    fn starts_paused_and_ignores_frames() {
        let mut engine = engine();
        assert!(!engine.is_playing());
        assert!(engine.frame(Duration::from_millis(500)).is_none());
        assert_eq!(engine.player().elapsed(), Duration::ZERO);
    }

    #[test]
    fn play_and_pause_are_idempotent() {
        let mut engine = engine();
        assert!(engine.play());
        assert!(!engine.play());
        assert!(engine.is_playing());
        assert!(engine.pause());
        assert!(!engine.pause());
        assert!(!engine.is_playing());
    }

    #[test]
    fn time_only_moves_while_playing() {
        let mut engine = engine();
        engine.play();
        let frame = engine.frame(Duration::from_millis(250)).expect("playing");
        assert!((frame.mix - 0.25).abs() < 1e-6);

        engine.pause();
        assert!(engine.frame(Duration::from_secs(10)).is_none());

        engine.play();
        let frame = engine.frame(Duration::from_millis(250)).expect("playing");
        assert!((frame.mix - 0.5).abs() < 1e-6);
    }

    #[test]
    fn resize_only_touches_viewport_constants() {
        let mut options = EngineOptions::default();
        options.aspect_ratio = AspectRatio::Viewport;
        let mut engine = Engine::new(sequence(), options).unwrap();
        engine.play();
        engine.frame(Duration::from_millis(1600));
        let before = engine.uniforms();

        engine.resize(1920, 1080);
        let after = engine.uniforms();
        assert_eq!(after.viewport, (1920, 1080));
        assert!((after.shape.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(after.mix, before.mix);
        assert_eq!(after.palette_a, before.palette_a);
        assert_eq!(engine.player().active_index(), 1);
        assert_eq!(engine.player().elapsed(), Duration::from_millis(1600));

        engine.resize(0, 200);
        assert_eq!(engine.viewport(), (1920, 1080));
    }

    #[test]
    fn manual_clock_drives_a_deterministic_cross_fade() {
        let mut engine = engine();
        let mut clock = ManualTimeSource::new(Duration::from_millis(100));
        engine.play();

        let mixes: Vec<f32> = (0..5)
            .map(|_| {
                let sample = clock.sample();
                engine.frame(sample.delta).expect("playing").mix
            })
            .collect();
        for (index, mix) in mixes.iter().enumerate() {
            let expected = (index as f32 + 1.0) * 0.1;
            assert!((mix - expected).abs() < 1e-6, "frame {index}: {mix}");
        }

        // One long frame crosses the 1.5 s cycle into the second step.
        clock.set_step(Duration::from_millis(1100));
        let sample = clock.sample();
        assert_eq!(sample.frame_index, 5);
        let frame = engine.frame(sample.delta).expect("playing");
        assert_eq!(engine.player().active_index(), 1);
        assert!((frame.mix - 0.1).abs() < 1e-6);
    }

    #[test]
    fn frame_at_seeks_even_when_paused() {
        let mut engine = engine();
        let frame = engine.frame_at(Duration::from_millis(1750));
        assert!((frame.mix - 0.25).abs() < 1e-6);
        assert_eq!(frame.palette_a.stops()[1].colour, Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(frame.palette_b.stops()[1].colour, Rgb::WHITE);
        assert!(!engine.is_playing());
    }

    #[test]
    fn palettes_are_packed_to_max_stops() {
        let mut options = EngineOptions::default();
        options.max_stops = 5;
        let engine = Engine::new(sequence(), options).unwrap();
        let uniforms = engine.uniforms();
        assert_eq!(uniforms.palette_a.len(), 5);
        assert_eq!(uniforms.palette_a.stops()[4], uniforms.palette_a.stops()[1]);
    }

    #[test]
    fn rejects_invalid_options() {
        let reject = |edit: fn(&mut EngineOptions)| {
            let mut options = EngineOptions::default();
            edit(&mut options);
            Engine::new(sequence(), options).err()
        };
        assert_eq!(
            reject(|o| o.feather = -0.1),
            Some(EngineError::Negative {
                name: "feather",
                value: -0.1
            })
        );
        assert_eq!(reject(|o| o.max_stops = 0), Some(EngineError::MaxStops(0)));
        assert_eq!(reject(|o| o.max_stops = 17), Some(EngineError::MaxStops(17)));
        assert!(matches!(
            reject(|o| o.intensity = f32::NAN),
            Some(EngineError::NotFinite {
                name: "intensity",
                ..
            })
        ));
        assert!(matches!(
            reject(|o| o.aspect_ratio = AspectRatio::Fixed(0.0)),
            Some(EngineError::NotPositive {
                name: "aspect_ratio",
                ..
            })
        ));
        assert_eq!(reject(|o| o.roundness = 1.5), Some(EngineError::Roundness(1.5)));
    }
}
