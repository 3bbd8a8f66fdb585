use std::cell::Cell;

use crate::world::collaborators::AudioSource;

/// Audio clock driven by hand, for replays and tests
#[derive(Debug, Default)]
pub struct ManualAudioClock {
    time: Cell<f64>,
}

impl ManualAudioClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Cell::new(start),
        }
    }

    pub fn set(&self, time: f64) {
        self.time.set(time);
    }

    pub fn advance(&self, dt: f64) {
        self.time.set(self.time.get() + dt);
    }
}

impl AudioSource for ManualAudioClock {
    fn current_audio_time(&self) -> f64 {
        self.time.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualAudioClock::new(1.0);
        clock.advance(0.5);
        assert_eq!(clock.current_audio_time(), 1.5);
        clock.set(0.25);
        assert_eq!(clock.current_audio_time(), 0.25);
    }
}
