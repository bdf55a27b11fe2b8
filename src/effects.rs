use crate::clock::Clock;
use crate::utils::RingBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct ReverbParams {
    pub start: f64, // earliest echo, seconds
    pub length: f64, // spread of echoes after start, seconds
    pub density: usize, // number of echoes
    pub feedback: f64,
    pub wet: f64,
}

impl Default for ReverbParams {
    fn default() -> Self {
        ReverbParams {
            start: 0.02,
            length: 0.25,
            density: 100,
            feedback: 0.2,
            wet: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub delay: usize, // in samples
    pub gain: f64,
}

/// Reverb built from randomly placed echoes over one shared history.
///
/// Tap positions and gains are drawn once at construction. Gains fall off
/// with delay as `(1/density)^(delay/total)` and alternate in sign to break
/// up comb resonances.
#[derive(Debug, Clone)]
pub struct RandomReverb {
    history: RingBuffer,
    taps: Vec<Tap>,
    feedback: f64,
}

impl RandomReverb {
    pub fn new(clock: &Clock, start: f64, length: f64, density: usize, feedback: f64) -> Self {
        Self::with_rng(clock, start, length, density, feedback, &mut fastrand::Rng::new())
    }

    pub fn with_rng(
        clock: &Clock,
        start: f64,
        length: f64,
        density: usize,
        feedback: f64,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let sample_rate = clock.sample_rate();
        let total = length + start;
        let history = RingBuffer::new((total * sample_rate).ceil() as usize);

        let taps = (0..density)
            .map(|i| {
                let delay_time = rng.f64() * length + start;
                let decay = (1.0 / density as f64).powf(delay_time / total);
                Tap {
                    delay: (delay_time * sample_rate).ceil() as usize,
                    gain: if i % 2 == 0 { decay } else { -decay },
                }
            })
            .collect();

        RandomReverb { history, taps, feedback }
    }

    pub fn from_params(clock: &Clock, params: &ReverbParams) -> Self {
        Self::new(clock, params.start, params.length, params.density, params.feedback)
    }

    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    /// Returns the wet signal only.
    pub fn process(&mut self, input: f64) -> f64 {
        let sum: f64 = self
            .taps
            .iter()
            .map(|tap| tap.gain * self.history.read(tap.delay))
            .sum();
        self.history.push((1.0 - self.feedback) * input + self.feedback * sum);
        sum
    }
}
