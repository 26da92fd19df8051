use std::path::PathBuf;
use std::time::{Duration, Instant};

use player::{BoxedTimeSource, FixedTimeSource, SystemTimeSource};

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames should animate continuously,
/// be evaluated at a fixed timestamp, or be exported to disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Render a single still frame at a fixed point of the sequence.
    Still { time: Duration },
    /// Render a frame at `time` and write it to `path` as PNG.
    Export { time: Duration, path: PathBuf },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

impl RenderPolicy {
    pub fn is_animated(&self) -> bool {
        matches!(self, RenderPolicy::Animate { .. })
    }
}

/// Builds a frame clock suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } | RenderPolicy::Export { time, .. } => {
            Box::new(FixedTimeSource::new(*time))
        }
    }
}

/// Decides when the next animated frame is due.
///
/// Without an FPS cap every callback renders; with one, frames are paced on a
/// fixed interval measured from the previous render.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_render: Option<Instant>,
}

/// Slack allowed when comparing against a deadline so vsync jitter does not
/// halve the frame rate.
const DEADLINE_SLACK: Duration = Duration::from_micros(250);

impl FrameScheduler {
    pub fn new(policy: &RenderPolicy) -> Self {
        let interval = match policy {
            RenderPolicy::Animate { target_fps } => target_fps
                .filter(|fps| fps.is_finite() && *fps > 0.0)
                .map(|fps| Duration::from_secs_f32(1.0 / fps)),
            RenderPolicy::Still { .. } | RenderPolicy::Export { .. } => None,
        };
        Self {
            interval,
            last_render: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => {
                now.saturating_duration_since(last) + DEADLINE_SLACK >= interval
            }
            _ => true,
        }
    }

    /// Instant of the next due frame, if the scheduler is waiting on one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.interval
            .zip(self.last_render)
            .map(|(interval, last)| last + interval)
    }

    pub fn mark_rendered_at(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    pub fn mark_rendered(&mut self) {
        self.mark_rendered_at(Instant::now());
    }

    pub fn reset(&mut self) {
        self.last_render = None;
    }
}
