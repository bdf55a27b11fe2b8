use std::str::FromStr;

use crate::clock::Clock;
use crate::error::SynthError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveformType {
    Sine,
    Square,
    /// Square with a pulse width threshold in `[0, 1]`.
    PulseSquare,
    Triangle,
    /// Morph: 0.0 descending saw, 0.5 triangle, 1.0 ascending saw.
    TriangleSaw,
    Sawtooth,
    Noise,
    Mute,
}

impl WaveformType {
    /// Maps a phase in `[0, 1)` to an amplitude. `shape` is the pulse width or
    /// the morph amount; other waveforms ignore it.
    pub fn generate_sample(&self, phase: f64, shape: f64) -> f64 {
        match self {
            WaveformType::Sine => (phase * std::f64::consts::TAU).sin(),
            WaveformType::Square => if phase < 0.5 { 1.0 } else { -1.0 },
            WaveformType::PulseSquare => if phase < shape { 1.0 } else { -1.0 },
            WaveformType::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    -4.0 * phase + 2.0
                } else {
                    4.0 * phase - 4.0
                }
            }
            WaveformType::TriangleSaw => morph_sample(phase, shape),
            WaveformType::Sawtooth => if phase < 0.5 { -2.0 * phase } else { -2.0 * phase + 2.0 },
            WaveformType::Noise => fastrand::f64() * 2.0 - 1.0,
            WaveformType::Mute => 0.0,
        }
    }
}

fn morph_sample(phase: f64, morph: f64) -> f64 {
    // the breakpoints collapse at the endpoints
    if morph == 0.0 {
        -2.0 * (phase - 0.5)
    } else if morph == 1.0 {
        if phase < 0.5 { 2.0 * phase } else { 2.0 * (phase - 1.0) }
    } else {
        let half = morph / 2.0;
        if phase < half {
            phase / half
        } else if phase < 1.0 - half {
            (phase - 0.5) * -2.0 / (1.0 - morph)
        } else {
            (phase - 1.0) / half
        }
    }
}

impl FromStr for WaveformType {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sine" | "sin" => Ok(WaveformType::Sine),
            "square" | "sqr" => Ok(WaveformType::Square),
            "pulse" | "sqr_pw" => Ok(WaveformType::PulseSquare),
            "triangle" | "tri" => Ok(WaveformType::Triangle),
            "tri_saw" | "morph" => Ok(WaveformType::TriangleSaw),
            "sawtooth" | "saw" => Ok(WaveformType::Sawtooth),
            "noise" => Ok(WaveformType::Noise),
            "mute" => Ok(WaveformType::Mute),
            _ => Err(SynthError::ParseError(format!("Unknown Waveform: {}", s.trim()))),
        }
    }
}

/// Phase accumulator driving one waveform.
///
/// Frequencies are not validated: a non-finite frequency poisons the phase
/// with NaN and every later sample with it.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: WaveformType,
    phase: f64,
    dtime: f64,
}

impl Oscillator {
    pub fn new(waveform: WaveformType, clock: &Clock) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
            dtime: clock.dtime(),
        }
    }

    pub fn waveform(&self) -> WaveformType {
        self.waveform
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Steps with the neutral shape: 50% pulse width, triangle morph.
    pub fn step(&mut self, frequency: f64) -> f64 {
        self.step_with(frequency, 0.5)
    }

    pub fn step_with(&mut self, frequency: f64, shape: f64) -> f64 {
        self.phase = (self.phase + frequency * self.dtime).rem_euclid(1.0);
        self.waveform.generate_sample(self.phase, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn osc(waveform: WaveformType) -> Oscillator {
        Oscillator::new(waveform, &Clock::new(8.0))
    }

    #[test]
    fn test_phase_wraps() {
        let mut o = osc(WaveformType::Sine);
        for _ in 0..100 {
            o.step(3.0);
            assert!((0.0..1.0).contains(&o.phase()));
        }
        let mut o = osc(WaveformType::Sine);
        for _ in 0..100 {
            o.step(-5.0);
            assert!((0.0..1.0).contains(&o.phase()));
        }
    }

    #[test]
    fn test_square_and_pulse() {
        let mut o = osc(WaveformType::Square);
        // 1 Hz at 8 Hz rate: phases 1/8 .. 7/8
        let out: Vec<f64> = (0..7).map(|_| o.step(1.0)).collect();
        assert_eq!(out, vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);

        let mut o = osc(WaveformType::PulseSquare);
        let out: Vec<f64> = (0..7).map(|_| o.step_with(1.0, 0.25)).collect();
        assert_eq!(out, vec![1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_triangle_shape() {
        let w = WaveformType::Triangle;
        assert_eq!(w.generate_sample(0.0, 0.5), 0.0);
        assert_eq!(w.generate_sample(0.25, 0.5), 1.0);
        assert_eq!(w.generate_sample(0.5, 0.5), 0.0);
        assert_eq!(w.generate_sample(0.75, 0.5), -1.0);
    }

    #[test]
    fn test_saw_shape() {
        let w = WaveformType::Sawtooth;
        assert_eq!(w.generate_sample(0.0, 0.5), 0.0);
        assert_eq!(w.generate_sample(0.25, 0.5), -0.5);
        assert_eq!(w.generate_sample(0.5, 0.5), 1.0);
        assert_eq!(w.generate_sample(0.75, 0.5), 0.5);
    }

    #[test]
    fn test_morph_endpoints_and_middle() {
        let w = WaveformType::TriangleSaw;
        assert_eq!(w.generate_sample(0.0, 0.0), 1.0);
        assert_eq!(w.generate_sample(0.75, 0.0), -0.5);
        assert_eq!(w.generate_sample(0.25, 1.0), 0.5);
        assert_eq!(w.generate_sample(0.75, 1.0), -0.5);
        // halfway matches the plain triangle
        for p in [0.1, 0.2, 0.4, 0.6, 0.8, 0.9] {
            let a = w.generate_sample(p, 0.5);
            let b = WaveformType::Triangle.generate_sample(p, 0.5);
            assert!((a - b).abs() < 1e-12, "phase {}", p);
        }
    }

    #[test]
    fn test_noise_range_and_mute() {
        let mut n = osc(WaveformType::Noise);
        for _ in 0..1000 {
            let v = n.step(0.0);
            assert!((-1.0..=1.0).contains(&v));
        }
        let mut m = osc(WaveformType::Mute);
        assert_eq!(m.step(440.0), 0.0);
    }

    #[test]
    fn test_waveform_names() {
        assert_eq!("Saw".parse::<WaveformType>().unwrap(), WaveformType::Sawtooth);
        assert_eq!(" tri ".parse::<WaveformType>().unwrap(), WaveformType::Triangle);
        assert!("wobble".parse::<WaveformType>().is_err());
    }
}
