use crate::clock::Clock;

/// C4, the zero point of the log2 control value.
pub const REFERENCE_FREQUENCY: f64 = 261.626;

/// Pitch glide in log2-frequency space, so every interval takes the same time
/// to cover. A rising trigger edge or a zero glide time jumps straight to the
/// target.
///
/// A zero target frequency drives the control value to -inf and the output
/// to NaN on the next glided step.
#[derive(Debug, Clone)]
pub struct Portamento {
    dtime: f64,
    cv: f64,
    is_on: bool,
}

impl Portamento {
    pub fn new(clock: &Clock) -> Self {
        Portamento {
            dtime: clock.dtime(),
            cv: 0.0,
            is_on: false,
        }
    }

    /// `time` is the glide time constant in seconds.
    pub fn step(&mut self, frequency: f64, trigger: bool, time: f64) -> f64 {
        let target = (frequency / REFERENCE_FREQUENCY).log2();
        let triggered = trigger && !self.is_on;
        self.is_on = trigger;
        if triggered || time == 0.0 {
            self.cv = target;
            frequency
        } else {
            self.cv = target + (self.cv - target) * (-self.dtime / time).exp();
            REFERENCE_FREQUENCY * self.cv.exp2()
        }
    }
}

/// Cheaper glide straight in Hz with a fixed time constant. Large intervals
/// sound uneven (fast at the top, slow at the bottom).
#[derive(Debug, Clone)]
pub struct PortamentoLight {
    time: f64,
    decay: f64,
    current: f64,
    is_on: bool,
}

impl PortamentoLight {
    pub fn new(clock: &Clock, time: f64) -> Self {
        PortamentoLight {
            time,
            decay: (-clock.dtime() / time).exp(),
            current: 0.0,
            is_on: false,
        }
    }

    pub fn step(&mut self, frequency: f64, trigger: bool) -> f64 {
        if (trigger && !self.is_on) || self.time == 0.0 {
            self.current = frequency;
        } else {
            self.current = frequency + (self.current - frequency) * self.decay;
        }
        self.is_on = trigger;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 1000.0;

    #[test]
    fn test_rising_edge_snaps() {
        let mut p = Portamento::new(&Clock::new(RATE));
        assert_eq!(p.step(440.0, true, 0.1), 440.0);
        // held trigger glides toward the new target
        let v = p.step(880.0, true, 0.1);
        assert!(v > 440.0 && v < 880.0);
    }

    #[test]
    fn test_zero_time_tracks_target() {
        let mut p = Portamento::new(&Clock::new(RATE));
        p.step(440.0, true, 0.0);
        assert_eq!(p.step(220.0, true, 0.0), 220.0);
        assert_eq!(p.step(330.0, false, 0.0), 330.0);
    }

    #[test]
    fn test_glide_is_even_in_octaves() {
        let clock = Clock::new(RATE);
        let mut up = Portamento::new(&clock);
        up.step(REFERENCE_FREQUENCY, true, 0.05);
        let mut down = Portamento::new(&clock);
        down.step(REFERENCE_FREQUENCY * 2.0, true, 0.05);
        for _ in 0..50 {
            let a = up.step(REFERENCE_FREQUENCY * 2.0, true, 0.05);
            let b = down.step(REFERENCE_FREQUENCY, true, 0.05);
            // progress measured in octaves mirrors exactly
            let pa = (a / REFERENCE_FREQUENCY).log2();
            let pb = 1.0 - (b / REFERENCE_FREQUENCY).log2();
            assert!((pa - pb).abs() < 1e-9);
        }
        let mut settled = 0.0;
        for _ in 0..1000 {
            settled = up.step(REFERENCE_FREQUENCY * 2.0, true, 0.05);
        }
        assert!((settled - REFERENCE_FREQUENCY * 2.0).abs() < 1.0);
    }

    #[test]
    fn test_light_exponential_approach() {
        let clock = Clock::new(RATE);
        let mut p = PortamentoLight::new(&clock, 0.01);
        assert_eq!(p.step(100.0, true), 100.0);
        // one time constant covers 1 - 1/e of the distance
        let mut v = 0.0;
        for _ in 0..10 {
            v = p.step(200.0, true);
        }
        let expected = 200.0 - 100.0 * (-1.0_f64).exp();
        assert!((v - expected).abs() < 1e-9, "{}", v);
    }

    #[test]
    fn test_light_retrigger_snaps() {
        let mut p = PortamentoLight::new(&Clock::new(RATE), 0.5);
        p.step(100.0, true);
        p.step(100.0, false);
        assert_eq!(p.step(300.0, true), 300.0);
    }
}
