use crate::error::MmlSyntaxError;
use crate::mml::{self, NoteEvent, Score};
use crate::utils::A4_FREQUENCY;

/// Playback settings applied with a new score. `None` keeps the current
/// offset and loop flag; a missing or zero `loop_length` means the score's
/// own length.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackOptions {
    pub offset: Option<f64>,
    pub looping: Option<bool>,
    pub loop_length: Option<f64>,
}

impl PlaybackOptions {
    pub fn looped() -> Self {
        PlaybackOptions {
            looping: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Cursor {
    next_index: usize,
    next_tick: Option<f64>,
    prev_tick: f64,
}

/// Walks a compiled score against incoming ticks and exposes the latest
/// frequency, trigger and accent.
///
/// Each `play` only looks at events between the previous and the current
/// tick, so the cost per frame is constant apart from the events that
/// actually fire. Looping rewinds the cursor when the local time wraps.
#[derive(Debug, Clone)]
pub struct Sequencer {
    tune_a4: f64,
    frequency: f64,
    trigger: bool,
    accent: bool,

    score: Score,
    offset: f64,
    looping: bool,
    loop_length: f64,
    cursor: Cursor,
}

impl Default for Sequencer {
    fn default() -> Self {
        Sequencer::new(A4_FREQUENCY)
    }
}

impl Sequencer {
    pub fn new(tune_a4: f64) -> Self {
        Sequencer {
            tune_a4,
            frequency: 0.0,
            trigger: false,
            accent: false,
            score: Score::default(),
            offset: 0.0,
            looping: false,
            loop_length: 0.0,
            cursor: Cursor::default(),
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn trigger(&self) -> bool {
        self.trigger
    }

    pub fn accent(&self) -> bool {
        self.accent
    }

    pub fn current_score(&self) -> &Score {
        &self.score
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn loop_length(&self) -> f64 {
        self.loop_length
    }

    pub fn next_index(&self) -> usize {
        self.cursor.next_index
    }

    /// Compiles `text` and swaps it in. On a syntax error the current score,
    /// options and cursor are left as they were.
    pub fn score(&mut self, text: &str, options: PlaybackOptions) -> Result<(), MmlSyntaxError> {
        let score = mml::compile_with_tuning(text, self.tune_a4)?;
        self.load(score, options);
        Ok(())
    }

    /// Replaces the score and rewinds the cursor to the first event.
    pub fn load(&mut self, score: Score, options: PlaybackOptions) {
        if let Some(offset) = options.offset {
            self.offset = offset;
        }
        if let Some(looping) = options.looping {
            self.looping = looping;
        }
        self.loop_length = match options.loop_length {
            Some(length) if length != 0.0 => length,
            _ => score.length,
        };
        log::info!(
            "Score loaded: {} events, {} ticks, loop {}",
            score.events.len(),
            score.length,
            self.looping
        );
        self.score = score;
        self.cursor.next_index = 0;
        self.cursor.next_tick = self.tick_at(0);
    }

    fn tick_at(&self, index: usize) -> Option<f64> {
        self.score.events.get(index).map(|e| e.tick)
    }

    /// Advances to `tick`, applying every event at or before it.
    pub fn play(&mut self, tick: f64) {
        let mut t = tick - self.offset;
        if self.looping {
            // a zero-length loop leaves t NaN and nothing fires
            t %= self.loop_length;
            if t < self.cursor.prev_tick {
                self.cursor.next_index = 0;
                self.cursor.next_tick = self.tick_at(0);
            }
        }

        while let Some(next_tick) = self.cursor.next_tick {
            if next_tick > t {
                break;
            }
            let NoteEvent { frequency, trigger, accent, .. } = self.score.events[self.cursor.next_index];
            self.frequency = frequency;
            self.trigger = trigger;
            self.accent = accent;
            self.cursor.next_index += 1;
            self.cursor.next_tick = self.tick_at(self.cursor.next_index);
        }
        self.cursor.prev_tick = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(text: &str, options: PlaybackOptions) -> Sequencer {
        let mut s = Sequencer::default();
        s.score(text, options).unwrap();
        s
    }

    #[test]
    fn test_plays_events_in_order() {
        let mut s = seq("L4 C D", PlaybackOptions::default());
        s.play(0.0);
        assert!(s.trigger());
        assert!((s.frequency() - 261.6256).abs() < 1e-3);
        s.play(839.0);
        assert!(s.trigger());
        s.play(840.0);
        assert!(!s.trigger());
        s.play(960.0);
        assert!(s.trigger());
        assert!((s.frequency() - 293.6648).abs() < 1e-3);
        s.play(100000.0);
        assert!(!s.trigger());
        assert_eq!(s.next_index(), 4);
    }

    #[test]
    fn test_drains_several_events_in_one_frame() {
        let mut s = seq("L64 C D E F! G", PlaybackOptions::default());
        s.play(60.0 * 3.0 + 1.0);
        // F's note-on is the last event at or before the tick
        assert!(s.trigger());
        assert!(s.accent());
        assert_eq!(s.next_index(), 7);
    }

    #[test]
    fn test_offset_delays_playback() {
        let mut s = seq("C", PlaybackOptions { offset: Some(480.0), ..Default::default() });
        s.play(100.0);
        assert!(!s.trigger());
        assert_eq!(s.frequency(), 0.0);
        s.play(480.0);
        assert!(s.trigger());
    }

    #[test]
    fn test_loop_wrap_replays_from_start() {
        let mut s = seq(
            "L8 C D",
            PlaybackOptions { looping: Some(true), loop_length: Some(960.0), ..Default::default() },
        );
        let c = 261.6256;
        let d = 293.6648;

        s.play(0.0);
        assert!((s.frequency() - c).abs() < 1e-3 && s.trigger());
        s.play(480.0);
        assert!((s.frequency() - d).abs() < 1e-3 && s.trigger());
        assert_eq!(s.next_index(), 3);

        s.play(960.0);
        assert!((s.frequency() - c).abs() < 1e-3 && s.trigger());
        assert_eq!(s.next_index(), 1);
        s.play(1440.0);
        assert!((s.frequency() - d).abs() < 1e-3 && s.trigger());
        assert_eq!(s.next_index(), 3);
    }

    #[test]
    fn test_loop_length_defaults_to_score_length() {
        let s = seq("L4 C D E", PlaybackOptions::looped());
        assert_eq!(s.loop_length(), 2880.0);
        let s = seq("L4 C D E", PlaybackOptions { loop_length: Some(0.0), ..Default::default() });
        assert_eq!(s.loop_length(), 2880.0);
    }

    #[test]
    fn test_every_event_fires_once_per_pass() {
        let mut s = seq("L16 CDEF GABR", PlaybackOptions::looped());
        let length = s.loop_length();
        let mut triggers = 0;
        let mut last = false;
        let mut tick = 0.0;
        while tick < length * 3.0 {
            s.play(tick);
            if s.trigger() && !last {
                triggers += 1;
            }
            last = s.trigger();
            tick += 7.5;
        }
        assert_eq!(triggers, 7 * 3);
    }

    #[test]
    fn test_failed_recompile_keeps_previous_score() {
        let mut s = seq("C D E", PlaybackOptions::looped());
        s.play(0.0);
        let before = s.current_score().clone();
        assert!(s.score("C D Z", PlaybackOptions::default()).is_err());
        assert_eq!(s.current_score(), &before);
        assert!(s.is_looping());
        assert_eq!(s.next_index(), 1);
    }

    #[test]
    fn test_new_score_rewinds_and_keeps_options() {
        let mut s = seq("C D E", PlaybackOptions { offset: Some(10.0), looping: Some(true), ..Default::default() });
        s.play(2000.0);
        s.score("F G", PlaybackOptions::default()).unwrap();
        assert_eq!(s.next_index(), 0);
        assert!(s.is_looping());
        assert_eq!(s.loop_length(), 1920.0);
    }

    #[test]
    fn test_empty_score_is_silent() {
        let mut s = seq("", PlaybackOptions::default());
        s.play(0.0);
        s.play(1000.0);
        assert!(!s.trigger());
        assert_eq!(s.frequency(), 0.0);
    }
}
