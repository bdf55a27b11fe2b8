/// Ticks in one whole note. A quarter note is 960.
pub const TICKS_PER_WHOLE_NOTE: f64 = 3840.0;

/// Ticks per beat (quarter note), the unit the tempo is counted in.
pub const TICKS_PER_BEAT: f64 = 960.0;

/// Render context owned by the engine. Components copy what they need out of
/// it when they are built; only the engine advances it.
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    sample_rate: f64,
    dtime: f64,
    frame: u64,
}

impl Clock {
    pub fn new(sample_rate: f64) -> Self {
        Clock {
            sample_rate,
            dtime: 1.0 / sample_rate,
            frame: 0,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Seconds per frame.
    pub fn dtime(&self) -> f64 {
        self.dtime
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn seconds(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    pub(crate) fn advance(&mut self) {
        self.frame += 1;
    }
}

/// Converts tempo into a tick counter advanced once per frame.
///
/// Retempo means building a new ticker; the counter never resets on its own.
#[derive(Debug, Clone)]
pub struct Ticker {
    dticks: f64,
    current: f64,
}

impl Ticker {
    pub fn new(clock: &Clock, bpm: f64, offset: f64) -> Self {
        Ticker {
            dticks: TICKS_PER_BEAT * bpm / 60.0 / clock.sample_rate(),
            current: offset,
        }
    }

    pub fn advance(&mut self) -> f64 {
        self.current += self.dticks;
        self.current
    }

    pub fn tick(&self) -> f64 {
        self.current
    }

    pub fn dticks(&self) -> f64 {
        self.dticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dticks_from_tempo() {
        let clock = Clock::new(48000.0);
        let ticker = Ticker::new(&clock, 120.0, 0.0);
        assert_eq!(ticker.dticks(), 960.0 * 120.0 / 60.0 / 48000.0);
    }

    #[test]
    fn test_advance_accumulates_from_offset() {
        let clock = Clock::new(44100.0);
        let mut ticker = Ticker::new(&clock, 120.0, 100.0);
        let mut last = 0.0;
        for _ in 0..1000 {
            let next = ticker.advance();
            assert!(next > last);
            last = next;
        }
        let expected = 100.0 + 1000.0 * ticker.dticks();
        assert!((ticker.tick() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_one_second_at_60_bpm_is_one_beat() {
        let clock = Clock::new(8000.0);
        let mut ticker = Ticker::new(&clock, 60.0, 0.0);
        for _ in 0..8000 {
            ticker.advance();
        }
        assert!((ticker.tick() - TICKS_PER_BEAT).abs() < 1e-6);
    }

    #[test]
    fn test_clock_seconds() {
        let mut clock = Clock::new(4.0);
        assert_eq!(clock.dtime(), 0.25);
        for _ in 0..6 {
            clock.advance();
        }
        assert_eq!(clock.frame(), 6);
        assert_eq!(clock.seconds(), 1.5);
    }
}
