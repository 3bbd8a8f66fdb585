//! Input timing judgment against the beat grid

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StealthError};
use crate::rhythm::clock::RhythmClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgment {
    Perfect,
    Good,
    Miss,
}

impl Judgment {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Judgment::Miss)
    }
}

/// Tolerances in seconds around a beat boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentWindow {
    perfect_tolerance: f64,
    good_tolerance: f64,
}

impl JudgmentWindow {
    /// Build a window; `perfect > good` is a configuration error, never clamped
    pub fn new(perfect_tolerance: f64, good_tolerance: f64) -> Result<Self> {
        if !(perfect_tolerance.is_finite() && good_tolerance.is_finite()) {
            return Err(StealthError::InvalidJudgmentWindow(
                "tolerances must be finite".into(),
            ));
        }
        if perfect_tolerance < 0.0 || good_tolerance < 0.0 {
            return Err(StealthError::InvalidJudgmentWindow(format!(
                "tolerances must be non-negative (perfect {}, good {})",
                perfect_tolerance, good_tolerance
            )));
        }
        if perfect_tolerance > good_tolerance {
            return Err(StealthError::InvalidJudgmentWindow(format!(
                "perfect_tolerance ({}) exceeds good_tolerance ({})",
                perfect_tolerance, good_tolerance
            )));
        }
        Ok(Self {
            perfect_tolerance,
            good_tolerance,
        })
    }

    pub fn perfect_tolerance(&self) -> f64 {
        self.perfect_tolerance
    }

    pub fn good_tolerance(&self) -> f64 {
        self.good_tolerance
    }

    /// Reject windows wider than half a beat (they would overlap the next beat)
    pub fn validate_for_interval(&self, beat_interval: f64) -> Result<()> {
        let half = beat_interval / 2.0;
        if self.good_tolerance > half {
            return Err(StealthError::InvalidJudgmentWindow(format!(
                "good_tolerance ({}) exceeds half the beat interval ({:.4})",
                self.good_tolerance, half
            )));
        }
        Ok(())
    }

    pub fn classify(&self, deviation: f64) -> Judgment {
        if deviation <= self.perfect_tolerance {
            Judgment::Perfect
        } else if deviation <= self.good_tolerance {
            Judgment::Good
        } else {
            Judgment::Miss
        }
    }

    fn scaled(&self, factor: f64) -> Result<Self> {
        Self::new(self.perfect_tolerance * factor, self.good_tolerance * factor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn tolerance_scale(&self) -> f64 {
        match self {
            Difficulty::Easy => 1.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 0.6,
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Running count of judgments, for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentTally {
    pub perfect: u32,
    pub good: u32,
    pub miss: u32,
}

impl JudgmentTally {
    pub fn record(&mut self, judgment: Judgment) {
        match judgment {
            Judgment::Perfect => self.perfect += 1,
            Judgment::Good => self.good += 1,
            Judgment::Miss => self.miss += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.perfect + self.good + self.miss
    }

    /// Fraction of inputs that were not Miss
    pub fn accuracy(&self) -> f32 {
        if self.total() == 0 {
            return 0.0;
        }
        (self.perfect + self.good) as f32 / self.total() as f32
    }
}

/// Judges player inputs against the rhythm clock
#[derive(Debug, Clone)]
pub struct RhythmInputJudge {
    base_window: JudgmentWindow,
    window: JudgmentWindow,
    difficulty: Difficulty,
    tally: JudgmentTally,
}

impl RhythmInputJudge {
    pub fn new(window: JudgmentWindow) -> Self {
        Self {
            base_window: window,
            window,
            difficulty: Difficulty::Normal,
            tally: JudgmentTally::default(),
        }
    }

    pub fn window(&self) -> &JudgmentWindow {
        &self.window
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn tally(&self) -> &JudgmentTally {
        &self.tally
    }

    pub fn judge(&mut self, clock: &RhythmClock, input_time: f64) -> Judgment {
        let judgment = clock.judge(input_time, &self.window);
        self.tally.record(judgment);
        judgment
    }

    /// Rescale the window from the configured base; the only runtime mutation
    ///
    /// On error the previous window stays in effect.
    pub fn apply_difficulty(&mut self, difficulty: Difficulty, beat_interval: f64) -> Result<()> {
        let window = self.base_window.scaled(difficulty.tolerance_scale())?;
        window.validate_for_interval(beat_interval)?;
        self.window = window;
        self.difficulty = difficulty;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_tolerances() {
        let err = JudgmentWindow::new(0.1, 0.05).unwrap_err();
        assert!(err.is_config_error());
        assert!(JudgmentWindow::new(-0.01, 0.05).is_err());
        assert!(JudgmentWindow::new(0.05, 0.05).is_ok());
    }

    #[test]
    fn test_validate_for_interval() {
        let window = JudgmentWindow::new(0.05, 0.2).unwrap();
        assert!(window.validate_for_interval(0.5).is_ok());
        assert!(window.validate_for_interval(0.3).is_err());
    }

    #[test]
    fn test_classify_bands() {
        let window = JudgmentWindow::new(0.05, 0.1).unwrap();
        assert_eq!(window.classify(0.0), Judgment::Perfect);
        assert_eq!(window.classify(0.05), Judgment::Perfect);
        assert_eq!(window.classify(0.07), Judgment::Good);
        assert_eq!(window.classify(0.1), Judgment::Good);
        assert_eq!(window.classify(0.11), Judgment::Miss);
    }

    #[test]
    fn test_phase_zero_is_perfect() {
        let clock = RhythmClock::new(97.0).unwrap();
        let window = JudgmentWindow::new(0.0, 0.0).unwrap();
        let mut judge = RhythmInputJudge::new(window);
        assert_eq!(judge.judge(&clock, 0.0), Judgment::Perfect);
    }

    #[test]
    fn test_half_beat_is_miss() {
        let clock = RhythmClock::new(120.0).unwrap();
        let window = JudgmentWindow::new(0.05, 0.2).unwrap();
        let mut judge = RhythmInputJudge::new(window);
        // Phase 0.25 is the largest possible deviation at 120 bpm
        assert_eq!(judge.judge(&clock, 0.25), Judgment::Miss);
    }

    #[test]
    fn test_difficulty_scales_from_base() {
        let window = JudgmentWindow::new(0.05, 0.1).unwrap();
        let mut judge = RhythmInputJudge::new(window);

        judge.apply_difficulty(Difficulty::Hard, 0.5).unwrap();
        assert!((judge.window().good_tolerance() - 0.06).abs() < 1e-9);

        // Re-applying does not compound
        judge.apply_difficulty(Difficulty::Easy, 0.5).unwrap();
        assert!((judge.window().good_tolerance() - 0.15).abs() < 1e-9);
        assert_eq!(judge.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn test_difficulty_rejected_keeps_window() {
        let window = JudgmentWindow::new(0.05, 0.2).unwrap();
        let mut judge = RhythmInputJudge::new(window);

        // Easy would make good 0.3 > 0.25
        assert!(judge.apply_difficulty(Difficulty::Easy, 0.5).is_err());
        assert_eq!(judge.difficulty(), Difficulty::Normal);
        assert!((judge.window().good_tolerance() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_tally_accuracy() {
        let mut tally = JudgmentTally::default();
        assert_eq!(tally.accuracy(), 0.0);
        tally.record(Judgment::Perfect);
        tally.record(Judgment::Good);
        tally.record(Judgment::Miss);
        tally.record(Judgment::Perfect);
        assert_eq!(tally.total(), 4);
        assert!((tally.accuracy() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("brutal".parse::<Difficulty>().is_err());
    }
}
