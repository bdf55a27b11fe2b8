use std::str::FromStr;

use crate::clock::Clock;
use crate::error::SynthError;

// Neither filter guards its inputs. A cutoff at or below zero, or q at zero,
// yields NaN/inf output that sticks in the history; that is the caller's
// contract to uphold.

/// State-variable low-pass. The cutoff is clamped to a quarter of the sample
/// rate to keep the recurrence stable near Nyquist.
#[derive(Debug, Clone)]
pub struct SvfLowPass {
    sample_rate: f64,
    buf0: f64,
    buf1: f64,
}

impl SvfLowPass {
    pub fn new(clock: &Clock) -> Self {
        SvfLowPass {
            sample_rate: clock.sample_rate(),
            buf0: 0.0,
            buf1: 0.0,
        }
    }

    pub fn process(&mut self, input: f64, cutoff: f64, resonance: f64) -> f64 {
        let f = 2.0 * (std::f64::consts::PI * (cutoff / self.sample_rate).min(0.25)).sin();
        self.buf0 += f * (input - self.buf0 + resonance * (self.buf0 - self.buf1));
        self.buf1 += f * (self.buf0 - self.buf1);
        self.buf1
    }
}

/// Biquad low-pass with coefficients recomputed every sample, so cutoff and q
/// can be modulated per call.
#[derive(Debug, Clone)]
pub struct BiquadLowPass {
    freq_unit: f64,
    x: (f64, f64, f64), // x[n], x[n-1], x[n-2]
    y: (f64, f64, f64),
}

impl BiquadLowPass {
    pub fn new(clock: &Clock) -> Self {
        BiquadLowPass {
            freq_unit: std::f64::consts::TAU / clock.sample_rate(),
            x: (0.0, 0.0, 0.0),
            y: (0.0, 0.0, 0.0),
        }
    }

    pub fn process(&mut self, input: f64, cutoff: f64, q: f64) -> f64 {
        let w0 = cutoff * self.freq_unit;
        let alpha = w0.sin() / (2.0 * q);
        let cs = w0.cos();
        let b1 = 1.0 - cs;
        let b0 = b1 / 2.0;

        self.x = (input, self.x.0, self.x.1);
        self.y.2 = self.y.1;
        self.y.1 = self.y.0;

        // y[n] = (b0*x[n] + b1*x[n-1] + b0*x[n-2] + 2cs*y[n-1] - (1-alpha)*y[n-2]) / (1+alpha)
        self.y.0 = (b0 * self.x.0 + b1 * self.x.1 + b0 * self.x.2 + 2.0 * cs * self.y.1
            - (1.0 - alpha) * self.y.2)
            / (1.0 + alpha);
        self.y.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    StateVariable,
    Biquad,
}

impl FromStr for FilterType {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sv" | "svf" | "lpf_sv" => Ok(FilterType::StateVariable),
            "biquad" | "lp" | "lowpass" | "lpf_biquad" => Ok(FilterType::Biquad),
            _ => Err(SynthError::ParseError(format!("Unknown Filter: {}", s.trim()))),
        }
    }
}

/// Either low-pass behind one call. `resonance` is the feedback amount for
/// the state-variable filter and q for the biquad.
#[derive(Debug, Clone)]
pub enum Filter {
    StateVariable(SvfLowPass),
    Biquad(BiquadLowPass),
}

impl Filter {
    pub fn new(filter_type: FilterType, clock: &Clock) -> Self {
        match filter_type {
            FilterType::StateVariable => Filter::StateVariable(SvfLowPass::new(clock)),
            FilterType::Biquad => Filter::Biquad(BiquadLowPass::new(clock)),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64, cutoff: f64, resonance: f64) -> f64 {
        match self {
            Filter::StateVariable(f) => f.process(input, cutoff, resonance),
            Filter::Biquad(f) => f.process(input, cutoff, resonance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 48000.0;

    fn settle(filter: &mut Filter, input: f64, cutoff: f64, res: f64, n: usize) -> f64 {
        let mut out = 0.0;
        for _ in 0..n {
            out = filter.process(input, cutoff, res);
        }
        out
    }

    #[test]
    fn test_svf_passes_dc() {
        let mut f = Filter::new(FilterType::StateVariable, &Clock::new(RATE));
        let out = settle(&mut f, 1.0, 1000.0, 0.2, 20000);
        assert!((out - 1.0).abs() < 1e-6, "{}", out);
    }

    #[test]
    fn test_biquad_passes_dc() {
        let mut f = Filter::new(FilterType::Biquad, &Clock::new(RATE));
        let out = settle(&mut f, 1.0, 1000.0, 0.707, 20000);
        assert!((out - 1.0).abs() < 1e-6, "{}", out);
    }

    #[test]
    fn test_biquad_attenuates_above_cutoff() {
        let clock = Clock::new(RATE);
        let mut f = BiquadLowPass::new(&clock);
        // alternating signal sits at Nyquist
        let mut peak: f64 = 0.0;
        for i in 0..4000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = f.process(x, 500.0, 0.707);
            if i > 2000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 1e-3, "{}", peak);
    }

    #[test]
    fn test_svf_cutoff_is_clamped() {
        let clock = Clock::new(RATE);
        let mut a = SvfLowPass::new(&clock);
        let mut b = SvfLowPass::new(&clock);
        for i in 0..256 {
            let x = ((i * 7) % 13) as f64 / 13.0 - 0.5;
            assert_eq!(a.process(x, RATE * 0.25, 0.5), b.process(x, RATE * 0.45, 0.5));
        }
    }

    #[test]
    fn test_zero_q_is_not_guarded() {
        let mut f = BiquadLowPass::new(&Clock::new(RATE));
        let out = f.process(1.0, 1000.0, 0.0);
        assert!(!out.is_finite() || out == 0.0);
    }

    #[test]
    fn test_filter_names() {
        assert_eq!("biquad".parse::<FilterType>().unwrap(), FilterType::Biquad);
        assert_eq!("SV".parse::<FilterType>().unwrap(), FilterType::StateVariable);
        assert!("comb".parse::<FilterType>().is_err());
    }
}
