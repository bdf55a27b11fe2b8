//! Real-time synthesis toolkit: oscillators, filters, envelopes, a reverb,
//! an MML compiler with a tick sequencer, and a block renderer that drives
//! a per-frame patch.

pub mod clock;
pub mod controller;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod instrument;
pub mod mml;
pub mod sequencer;
pub mod utils;
pub mod waveform;

pub use clock::{Clock, Ticker};
pub use controller::{Portamento, PortamentoLight};
pub use effects::{RandomReverb, ReverbParams};
pub use engine::{EngineConfig, Patch, SynthEngine};
#[cfg(feature = "device")]
pub use engine::Player;
pub use envelope::Adsr;
pub use error::{MmlSyntaxError, SynthError};
pub use filter::{BiquadLowPass, Filter, FilterType, SvfLowPass};
pub use instrument::{FilterParams, Instrument, InstrumentParams, MonoSynth};
pub use mml::{NoteEvent, Score};
pub use sequencer::{PlaybackOptions, Sequencer};
pub use utils::RingBuffer;
pub use waveform::{Oscillator, WaveformType};
