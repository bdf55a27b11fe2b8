use std::str::FromStr;

use crate::clock::{Clock, Ticker};
use crate::controller::PortamentoLight;
use crate::effects::{RandomReverb, ReverbParams};
use crate::engine::Patch;
use crate::envelope::Adsr;
use crate::error::SynthError;
use crate::filter::{Filter, FilterType};
use crate::sequencer::{PlaybackOptions, Sequencer};
use crate::utils::A4_FREQUENCY;
use crate::waveform::{Oscillator, WaveformType};

#[derive(Debug, Clone, PartialEq)]
pub struct FilterParams {
    pub filter_type: FilterType,
    pub cutoff: f64, // Hz
    pub resonance: f64, // feedback for the state-variable filter, q for the biquad
    pub env_amount: f64, // Hz added at full envelope level
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentParams {
    pub waveform: WaveformType,
    pub shape: f64, // pulse width or morph
    pub attack: f64, // ADSR envelope parameters
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub glide: f64, // seconds, 0 disables
    pub volume: f64,
    pub accent: f64, // gain cut for notes without accent
    pub filter: Option<FilterParams>,
    pub reverb: Option<ReverbParams>,
}

impl Default for InstrumentParams {
    fn default() -> Self {
        InstrumentParams {
            waveform: WaveformType::Sine,
            shape: 0.5,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.8,
            release: 0.2,
            glide: 0.0,
            volume: 0.5,
            accent: 0.2,
            filter: None,
            reverb: None,
        }
    }
}

/// One monophonic chain: glide, oscillator, filter, envelope, reverb.
#[derive(Debug, Clone)]
pub struct Instrument {
    params: InstrumentParams,
    oscillator: Oscillator,
    filter: Option<Filter>,
    envelope: Adsr,
    glide: Option<PortamentoLight>,
    reverb: Option<RandomReverb>,
}

impl Instrument {
    pub fn new(clock: &Clock, params: InstrumentParams) -> Self {
        Instrument {
            oscillator: Oscillator::new(params.waveform, clock),
            filter: params.filter.as_ref().map(|f| Filter::new(f.filter_type, clock)),
            envelope: Adsr::new(clock, params.attack, params.decay, params.sustain, params.release),
            glide: (params.glide > 0.0).then(|| PortamentoLight::new(clock, params.glide)),
            reverb: params.reverb.as_ref().map(|r| RandomReverb::from_params(clock, r)),
            params,
        }
    }

    pub fn params(&self) -> &InstrumentParams {
        &self.params
    }

    pub fn step(&mut self, frequency: f64, trigger: bool, accent: bool) -> f64 {
        let frequency = match self.glide.as_mut() {
            Some(glide) => glide.step(frequency, trigger),
            None => frequency,
        };
        let mut v = self.oscillator.step_with(frequency, self.params.shape);
        let level = self.envelope.step(trigger);

        if let (Some(filter), Some(fp)) = (self.filter.as_mut(), self.params.filter.as_ref()) {
            v = filter.process(v, fp.cutoff + fp.env_amount * level, fp.resonance);
        }

        let gain = if accent { 1.0 } else { 1.0 - self.params.accent };
        let dry = v * level * gain * self.params.volume;

        match (self.reverb.as_mut(), self.params.reverb.as_ref()) {
            (Some(reverb), Some(rp)) => dry + rp.wet * reverb.process(dry),
            _ => dry,
        }
    }
}

/// Ticker, sequencer and instrument wired into a patch that writes the same
/// sample to every output channel.
#[derive(Debug, Clone)]
pub struct MonoSynth {
    pub ticker: Ticker,
    pub sequencer: Sequencer,
    pub instrument: Instrument,
}

impl MonoSynth {
    pub fn new(clock: &Clock, bpm: f64, sequencer: Sequencer, params: InstrumentParams) -> Self {
        MonoSynth {
            ticker: Ticker::new(clock, bpm, 0.0),
            sequencer,
            instrument: Instrument::new(clock, params),
        }
    }

    /// Builds a synth from `key: value` lines:
    ///
    /// ```text
    /// // bass
    /// tempo: 120
    /// loop: true
    /// waveform: square
    /// attack: 0.01
    /// filter: biquad, 550, 5.0
    /// mml: Q5 L16 O1 F!>C<FC F!~>E8!~<C
    /// ```
    ///
    /// Repeated `mml:` lines are joined into one score.
    pub fn from_patch(text: &str, clock: &Clock) -> Result<Self, SynthError> {
        let mut params = InstrumentParams::default();
        let mut options = PlaybackOptions::default();
        let mut tempo = 120.0;
        let mut tune = A4_FREQUENCY;
        let mut mml = String::new();

        macro_rules! parse_field {
            ($line:expr, $prefix:expr, $field:expr) => {
                if let Some(v) = $line.strip_prefix($prefix) {
                    $field = parse_value(v, $prefix)?;
                    continue;
                }
            };
        }

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") { continue; } // Comments (//) & empty lines

            if let Some(v) = line.strip_prefix("mml:") {
                mml.push_str(v.trim());
                mml.push(' ');

            } else if let Some(v) = line.strip_prefix("waveform:") {
                params.waveform = v.parse()?;

            } else if let Some(v) = line.strip_prefix("filter:") {
                let parts: Vec<&str> = v.split(',').map(|s| s.trim()).collect();
                if parts.len() < 3 {
                    return Err(SynthError::ParseError("filter: expects type, cutoff, resonance".to_string()));
                }
                params.filter = Some(FilterParams {
                    filter_type: parts[0].parse()?,
                    cutoff: parse_value(parts[1], "filter cutoff")?,
                    resonance: parse_value(parts[2], "filter resonance")?,
                    env_amount: match parts.get(3) {
                        Some(p) => parse_value(p, "filter env amount")?,
                        None => 0.0,
                    },
                });

            } else if let Some(v) = line.strip_prefix("reverb:") {
                let parts: Vec<&str> = v.split(',').map(|s| s.trim()).collect();
                if parts.len() < 4 {
                    return Err(SynthError::ParseError("reverb: expects start, length, density, feedback".to_string()));
                }
                let defaults = ReverbParams::default();
                params.reverb = Some(ReverbParams {
                    start: parse_value(parts[0], "reverb start")?,
                    length: parse_value(parts[1], "reverb length")?,
                    density: parse_value(parts[2], "reverb density")?,
                    feedback: parse_value(parts[3], "reverb feedback")?,
                    wet: match parts.get(4) {
                        Some(p) => parse_value(p, "reverb wet")?,
                        None => defaults.wet,
                    },
                });

            } else if let Some(v) = line.strip_prefix("offset:") {
                options.offset = Some(parse_value(v, "offset:")?);
            } else if let Some(v) = line.strip_prefix("loop:") {
                options.looping = Some(parse_value(v, "loop:")?);
            } else if let Some(v) = line.strip_prefix("loop_length:") {
                options.loop_length = Some(parse_value(v, "loop_length:")?);

            } else {
                parse_field!(line, "tempo:", tempo);
                parse_field!(line, "tune:", tune);
                parse_field!(line, "shape:", params.shape);
                parse_field!(line, "attack:", params.attack);
                parse_field!(line, "decay:", params.decay);
                parse_field!(line, "sustain:", params.sustain);
                parse_field!(line, "release:", params.release);
                parse_field!(line, "glide:", params.glide);
                parse_field!(line, "volume:", params.volume);
                parse_field!(line, "accent:", params.accent);
                return Err(SynthError::ParseError(format!("Unknown patch line: {}", line)));
            }
        }

        let mut sequencer = Sequencer::new(tune);
        sequencer.score(&mml, options)?;
        Ok(MonoSynth::new(clock, tempo, sequencer, params))
    }

    pub fn next_sample(&mut self) -> f64 {
        let tick = self.ticker.advance();
        self.sequencer.play(tick);
        self.instrument.step(
            self.sequencer.frequency(),
            self.sequencer.trigger(),
            self.sequencer.accent(),
        )
    }
}

impl Patch for MonoSynth {
    fn render_frame(&mut self, _clock: &Clock, _input: &[f32], output: &mut [f32]) {
        let v = self.next_sample() as f32;
        output.fill(v);
    }
}

fn parse_value<T: FromStr>(value: &str, what: &str) -> Result<T, SynthError> {
    value
        .trim()
        .parse()
        .map_err(|_| SynthError::ParseError(format!("Invalid {} {}", what, value.trim())))
}
