//! Time-driven walk through a palette [`Sequence`].
//!
//! The player owns a free-running clock and the index of the active step. Each
//! [`SequencePlayer::advance`] call adds a frame delta and reports which
//! palettes are on screen and how far the cross-fade between them has
//! progressed:
//!
//! ```text
//!   |<------- fade ------->|<--- hold --->|
//!   mix 0 ───────────────▶ 1 ─────────────┤ step index += 1, mix back to 0
//! ```
//!
//! Step changes are decided by comparing the time spent in the active step
//! against its cycle length, so a stalled frame advances through every step it
//! skipped instead of missing the wrap.

pub mod clock;

use std::time::Duration;

use sequence::{Palette, Sequence, Step};
use tracing::debug;

pub use clock::{
    BoxedTimeSource, FixedTimeSource, ManualTimeSource, SystemTimeSource, TimeSample, TimeSource,
};

/// Snapshot of the player after a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerFrame {
    /// Index of the step whose palette is faded *from*.
    pub active_index: usize,
    /// Index of the step whose palette is faded *to*.
    pub next_index: usize,
    /// Cross-fade factor in `[0, 1]`.
    pub mix: f32,
    /// Time spent inside the active step's cycle.
    pub local_time: Duration,
    /// Free-running time since the player started.
    pub elapsed: Duration,
    /// Number of step changes that happened during this frame.
    pub advanced: u64,
}

pub struct SequencePlayer {
    sequence: Sequence,
    active: usize,
    elapsed: Duration,
    step_started_at: Duration,
}

impl SequencePlayer {
    pub fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            active: 0,
            elapsed: Duration::ZERO,
            step_started_at: Duration::ZERO,
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn active_step(&self) -> &Step {
        self.sequence.step(self.active)
    }

    /// Palettes currently faded from (A) and to (B).
    pub fn palettes(&self) -> (&Palette, &Palette) {
        let next = self.sequence.next_index(self.active);
        (
            self.sequence.step(self.active).palette(),
            self.sequence.step(next).palette(),
        )
    }

    /// Adds `delta` to the clock and returns the resulting frame.
    pub fn advance(&mut self, delta: Duration) -> PlayerFrame {
        self.elapsed = self.elapsed.saturating_add(delta);
        let advanced = self.catch_up();
        if advanced > 0 {
            debug!(
                step = self.active,
                advanced,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "sequence step advanced"
            );
        }
        self.frame(advanced)
    }

    /// Current frame without moving the clock.
    pub fn peek(&self) -> PlayerFrame {
        self.frame(0)
    }

    /// Rewinds to the first step and jumps to an absolute time.
    pub fn seek(&mut self, elapsed: Duration) -> PlayerFrame {
        self.reset();
        self.advance(elapsed)
    }

    pub fn reset(&mut self) {
        self.active = 0;
        self.elapsed = Duration::ZERO;
        self.step_started_at = Duration::ZERO;
    }

    fn local_time(&self) -> Duration {
        self.elapsed.saturating_sub(self.step_started_at)
    }

    /// Moves the active step forward until the local time lies inside its
    /// cycle. The end point of a cycle still belongs to it.
    fn catch_up(&mut self) -> u64 {
        let mut advanced = 0u64;

        let lap = self.sequence.total_cycle();
        let local = self.local_time();
        if local > lap {
            // Whole laps land on the same step; skip them in one go.
            let laps = (local.as_nanos() - 1) / lap.as_nanos();
            let skipped = lap.as_nanos() * laps;
            self.step_started_at = self
                .step_started_at
                .saturating_add(duration_from_nanos(skipped));
            advanced = advanced.saturating_add(
                u64::try_from(laps)
                    .unwrap_or(u64::MAX)
                    .saturating_mul(self.sequence.len() as u64),
            );
        }

        loop {
            let cycle = self.active_step().cycle();
            if self.local_time() <= cycle {
                break;
            }
            self.step_started_at += cycle;
            self.active = self.sequence.next_index(self.active);
            advanced = advanced.saturating_add(1);
        }

        advanced
    }

    fn frame(&self, advanced: u64) -> PlayerFrame {
        let step = self.active_step();
        let local_time = self.local_time();
        let mix = (local_time.as_secs_f64() / step.fade().as_secs_f64()).clamp(0.0, 1.0) as f32;
        PlayerFrame {
            active_index: self.active,
            next_index: self.sequence.next_index(self.active),
            mix,
            local_time,
            elapsed: self.elapsed,
            advanced,
        }
    }
}

/// Full-range conversion; `Duration::from_nanos` only takes a `u64`.
fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}
