//! Rhythm clock - converts audio time into a monotonic beat counter
//!
//! The audio collaborator is authoritative. The clock never runs on its own;
//! it only re-derives beat count and phase from the latest audio timestamp.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StealthError};
use crate::core::types::Beat;
use crate::rhythm::judge::{Judgment, JudgmentWindow};

/// More than one beat boundary crossed between two samples (frame hitch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatStall {
    pub from: Beat,
    pub to: Beat,
}

impl BeatStall {
    pub fn skipped(&self) -> u64 {
        self.to - self.from
    }
}

/// Result of one clock sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatSample {
    pub beat: Beat,
    /// Seconds since the last beat boundary, in `[0, beat_interval)`
    pub phase: f64,
    /// Boundaries crossed since the previous sample
    pub crossed: u64,
    pub stall: Option<BeatStall>,
}

#[derive(Debug, Clone)]
pub struct RhythmClock {
    bpm: f64,
    beat_interval: f64,
    beat_count: Beat,
    phase: f64,
    last_time: f64,
    /// Audio time of the last tempo change
    anchor_time: f64,
    /// Fractional beat position at `anchor_time`
    anchor_position: f64,
}

impl RhythmClock {
    pub fn new(bpm: f64) -> Result<Self> {
        validate_bpm(bpm)?;
        Ok(Self {
            bpm,
            beat_interval: 60.0 / bpm,
            beat_count: 0,
            phase: 0.0,
            last_time: 0.0,
            anchor_time: 0.0,
            anchor_position: 0.0,
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beat_interval(&self) -> f64 {
        self.beat_interval
    }

    pub fn beat_count(&self) -> Beat {
        self.beat_count
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    /// Fractional beat position at an audio time under the current tempo
    pub fn beat_position_at(&self, audio_time: f64) -> f64 {
        self.anchor_position + (audio_time - self.anchor_time) / self.beat_interval
    }

    /// Seconds since the most recent beat boundary at `audio_time`
    pub fn phase_at(&self, audio_time: f64) -> f64 {
        let position = self.beat_position_at(audio_time);
        let phase = (position - position.floor()) * self.beat_interval;
        // Float noise can land a hair below the next boundary
        if phase >= self.beat_interval {
            0.0
        } else {
            phase.max(0.0)
        }
    }

    /// Sample the clock at the current audio time
    ///
    /// Audio time that jitters backward is treated as the last known time, so
    /// neither `beat_count` nor `phase` ever moves backward.
    pub fn sample(&mut self, audio_time: f64) -> BeatSample {
        let time = audio_time.max(self.last_time);
        let position = self.beat_position_at(time).max(0.0);
        let observed = position.floor() as Beat;

        let previous = self.beat_count;
        let beat = observed.max(previous);
        let crossed = beat - previous;

        self.last_time = time;
        self.beat_count = beat;
        self.phase = if observed < previous {
            0.0
        } else {
            self.phase_at(time)
        };

        let stall = if crossed > 1 {
            tracing::warn!(
                from = previous,
                to = beat,
                "Beat clock skipped {} boundaries in one sample",
                crossed
            );
            Some(BeatStall { from: previous, to: beat })
        } else {
            None
        };

        BeatSample {
            beat,
            phase: self.phase,
            crossed,
            stall,
        }
    }

    /// Change tempo without resetting the beat count
    ///
    /// The new interval only applies to crossings after the last sampled time.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        validate_bpm(bpm)?;
        self.anchor_position = self.beat_position_at(self.last_time);
        self.anchor_time = self.last_time;
        self.bpm = bpm;
        self.beat_interval = 60.0 / bpm;
        tracing::debug!(bpm, beat = self.beat_count, "Tempo changed");
        Ok(())
    }

    /// Distance in seconds from `input_time` to the nearest beat boundary
    pub fn deviation_at(&self, input_time: f64) -> f64 {
        let phase = self.phase_at(input_time);
        phase.min(self.beat_interval - phase)
    }

    /// Classify an input against the nearest beat boundary
    pub fn judge(&self, input_time: f64, window: &JudgmentWindow) -> Judgment {
        window.classify(self.deviation_at(input_time))
    }
}

fn validate_bpm(bpm: f64) -> Result<()> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(())
    } else {
        Err(StealthError::InvalidBpm(bpm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_bpm() {
        let clock = RhythmClock::new(120.0).unwrap();
        assert!((clock.beat_interval() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_bpm() {
        assert!(RhythmClock::new(0.0).is_err());
        assert!(RhythmClock::new(-90.0).is_err());
        assert!(RhythmClock::new(f64::NAN).is_err());
    }

    #[test]
    fn test_sample_counts_boundaries() {
        let mut clock = RhythmClock::new(120.0).unwrap();

        let sample = clock.sample(0.25);
        assert_eq!(sample.beat, 0);
        assert_eq!(sample.crossed, 0);
        assert!((sample.phase - 0.25).abs() < 1e-9);

        let sample = clock.sample(0.6);
        assert_eq!(sample.beat, 1);
        assert_eq!(sample.crossed, 1);
        assert!(sample.stall.is_none());
    }

    #[test]
    fn test_backward_jitter_is_ignored() {
        let mut clock = RhythmClock::new(120.0).unwrap();
        clock.sample(1.02);
        assert_eq!(clock.beat_count(), 2);

        let sample = clock.sample(0.98);
        assert_eq!(sample.beat, 2);
        assert_eq!(sample.crossed, 0);
        assert!((sample.phase - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_stall_advances_by_crossed_count() {
        let mut clock = RhythmClock::new(120.0).unwrap();
        clock.sample(0.1);

        let sample = clock.sample(2.1);
        assert_eq!(sample.beat, 4);
        assert_eq!(sample.crossed, 4);
        assert_eq!(sample.stall, Some(BeatStall { from: 0, to: 4 }));
        assert_eq!(sample.stall.unwrap().skipped(), 4);
    }

    #[test]
    fn test_set_bpm_keeps_count_and_rescales_future() {
        let mut clock = RhythmClock::new(120.0).unwrap();
        clock.sample(1.0);
        assert_eq!(clock.beat_count(), 2);

        clock.set_bpm(60.0).unwrap();
        assert_eq!(clock.beat_count(), 2);
        assert!((clock.beat_interval() - 1.0).abs() < 1e-12);

        // Half a second later is only half a beat under the new tempo
        assert_eq!(clock.sample(1.5).beat, 2);
        assert_eq!(clock.sample(2.0).beat, 3);
    }

    #[test]
    fn test_set_bpm_rejects_invalid() {
        let mut clock = RhythmClock::new(120.0).unwrap();
        assert!(clock.set_bpm(0.0).is_err());
        assert!((clock.bpm() - 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_judge_scenario_near_boundary() {
        let clock = RhythmClock::new(120.0).unwrap();
        let window = JudgmentWindow::new(0.05, 0.1).unwrap();

        // Boundary is at 0.5, so 0.48 deviates by 0.02
        assert!((clock.deviation_at(0.48) - 0.02).abs() < 1e-9);
        assert_eq!(clock.judge(0.48, &window), Judgment::Perfect);
        assert_eq!(clock.judge(0.5, &window), Judgment::Perfect);
        assert_eq!(clock.judge(0.58, &window), Judgment::Good);
        assert_eq!(clock.judge(0.25, &window), Judgment::Miss);
    }
}
