use std::time::{Duration, Instant};

/// Time elapsed since the previous sample, plus a frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub delta: Duration,
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(delta: Duration, frame_index: u64) -> Self {
        Self { delta, frame_index }
    }
}

/// Abstraction over where frame deltas originate from.
pub trait TimeSource: Send {
    /// Forgets the previous sample; the next delta starts from zero.
    fn reset(&mut self);
    /// Produces the delta for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Time source backed by the system monotonic clock.
///
/// The first sample after construction or [`TimeSource::reset`] reports a zero
/// delta, so a paused interval is never fed to the player.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource {
    last: Option<Instant>,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn sample_at(&mut self, now: Instant) -> TimeSample {
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now);
        let sample = TimeSample::new(delta, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.last = None;
    }

    fn sample(&mut self) -> TimeSample {
        self.sample_at(Instant::now())
    }
}

/// Reports a single jump to a fixed timestamp, then stands still.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    at: Duration,
    delivered: bool,
}

impl FixedTimeSource {
    pub fn new(at: Duration) -> Self {
        Self {
            at,
            delivered: false,
        }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.delivered = false;
    }

    fn sample(&mut self) -> TimeSample {
        if self.delivered {
            TimeSample::new(Duration::ZERO, 0)
        } else {
            self.delivered = true;
            TimeSample::new(self.at, 0)
        }
    }
}

/// Deterministic source that advances by a fixed step per sample.
#[derive(Debug, Clone, Copy)]
pub struct ManualTimeSource {
    step: Duration,
    frame: u64,
}

impl ManualTimeSource {
    pub fn new(step: Duration) -> Self {
        Self { step, frame: 0 }
    }

    pub fn set_step(&mut self, step: Duration) {
        self.step = step;
    }
}

impl TimeSource for ManualTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.step, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_source_starts_with_zero_delta() {
        let mut source = SystemTimeSource::new();
        let start = Instant::now();
        let first = source.sample_at(start);
        assert_eq!(first.delta, Duration::ZERO);
        assert_eq!(first.frame_index, 0);

        let second = source.sample_at(start + Duration::from_millis(16));
        assert_eq!(second.delta, Duration::from_millis(16));
        assert_eq!(second.frame_index, 1);
    }

    #[test]
    fn system_source_reset_drops_paused_gap() {
        let mut source = SystemTimeSource::new();
        let start = Instant::now();
        source.sample_at(start);
        source.reset();
        let resumed = source.sample_at(start + Duration::from_secs(30));
        assert_eq!(resumed.delta, Duration::ZERO);
    }

    #[test]
    fn fixed_source_jumps_once() {
        let mut source = FixedTimeSource::new(Duration::from_millis(750));
        assert_eq!(source.sample().delta, Duration::from_millis(750));
        assert_eq!(source.sample().delta, Duration::ZERO);
        source.reset();
        assert_eq!(source.sample().delta, Duration::from_millis(750));
    }

    #[test]
    fn manual_source_counts_frames() {
        let mut source = ManualTimeSource::new(Duration::from_millis(10));
        source.sample();
        source.set_step(Duration::from_millis(20));
        let sample = source.sample();
        assert_eq!(sample.delta, Duration::from_millis(20));
        assert_eq!(sample.frame_index, 1);
    }
}
