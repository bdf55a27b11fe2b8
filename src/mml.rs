//! MML (Music Macro Language) compiler.
//!
//! A score is a run of single-letter commands, case-insensitive, separated
//! by optional whitespace or `|`:
//!
//! - `C D E F G A B` note, followed by modifiers `#`/`+` (sharp) and `-`
//!   (flat), an optional length and post-modifiers `!` (accent) and `~`
//!   (legato, no note-off).
//! - `N<number>` note by absolute note number, `R` rest.
//! - `O<n>` octave, `>`/`<` octave up/down, `L<length>` default length.
//! - `Q<g>` gate ratio (`g >= 1` counts eighths), `Q<g>!` absolute gate in
//!   ticks derived from the current default length.
//!
//! Lengths are note values (`4` quarter, `8.` dotted eighth) joined with `+`
//! or `^` (tie) and `-` (shorten), e.g. `4^16` or `2-8`.

use crate::clock::TICKS_PER_WHOLE_NOTE;
use crate::error::MmlSyntaxError;
use crate::utils::{note_frequency, A4_FREQUENCY};

const LABELS: &str = "CDEFGABNRO><LQ";
const MODIFIERS: &str = "#+-";
const LENGTHS: &str = "0123456789.+-^";
const POST_MODIFIERS: &str = "!~";
const DELIMITERS: &str = "| \n\r\t";

const DEFAULT_OCTAVE: f64 = 4.0;
const DEFAULT_GATE: f64 = 7.0 / 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub tick: f64,
    pub frequency: f64,
    pub trigger: bool,
    pub accent: bool,
}

/// Compiled score: events ascending by tick plus the total length in ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub events: Vec<NoteEvent>,
    pub length: f64,
}

impl Score {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Compiles with A4 = 440 Hz.
pub fn compile(text: &str) -> Result<Score, MmlSyntaxError> {
    compile_with_tuning(text, A4_FREQUENCY)
}

pub fn compile_with_tuning(text: &str, tune_a4: f64) -> Result<Score, MmlSyntaxError> {
    let mut compiler = Compiler::new(tune_a4);
    let mut lexer = Lexer::default();

    for (offset, c) in text.chars().enumerate() {
        let c = c.to_ascii_uppercase();
        // A transition may hand the same character to the next state.
        let mut state = lexer.state;
        loop {
            match lexer.step(state, c, &mut compiler) {
                Step::Consumed(next) => {
                    lexer.state = next;
                    break;
                }
                Step::Redispatch(next) => state = next,
                Step::Rejected => {
                    return Err(MmlSyntaxError::new(
                        format!("Unexpected character '{}'", c),
                        text,
                        offset,
                    ));
                }
            }
        }
    }
    if let Some(token) = lexer.token.take() {
        compiler.emit(&token);
    }

    Ok(compiler.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Label,
    Modifier,
    Length,
    PostModifier,
}

enum Step {
    Consumed(State),
    Redispatch(State),
    Rejected,
}

#[derive(Debug, Clone, Default)]
struct Token {
    label: char,
    modifier: String,
    length: String,
    post: String,
}

#[derive(Debug, Default)]
struct Lexer {
    state: State,
    token: Option<Token>,
}

impl Lexer {
    fn step(&mut self, state: State, c: char, compiler: &mut Compiler) -> Step {
        let is = |set: &str| set.contains(c);

        match state {
            State::Label => {
                if is(LABELS) {
                    self.token = Some(Token { label: c, ..Token::default() });
                    Step::Consumed(State::Modifier)
                } else if is(DELIMITERS) {
                    Step::Consumed(State::Label)
                } else {
                    Step::Rejected
                }
            }
            State::Modifier => {
                if is(MODIFIERS) {
                    self.push(c, |t| &mut t.modifier);
                    Step::Consumed(State::Modifier)
                } else if is(LABELS) {
                    self.flush(compiler);
                    Step::Redispatch(State::Label)
                } else if is(LENGTHS) {
                    Step::Redispatch(State::Length)
                } else if is(POST_MODIFIERS) {
                    Step::Redispatch(State::PostModifier)
                } else {
                    self.end_on_delimiter(c, compiler)
                }
            }
            State::Length => {
                if is(LENGTHS) {
                    self.push(c, |t| &mut t.length);
                    Step::Consumed(State::Length)
                } else if is(LABELS) {
                    self.flush(compiler);
                    Step::Redispatch(State::Label)
                } else if is(POST_MODIFIERS) {
                    Step::Redispatch(State::PostModifier)
                } else {
                    self.end_on_delimiter(c, compiler)
                }
            }
            State::PostModifier => {
                if is(POST_MODIFIERS) {
                    self.push(c, |t| &mut t.post);
                    Step::Consumed(State::PostModifier)
                } else if is(LABELS) {
                    self.flush(compiler);
                    Step::Redispatch(State::Label)
                } else {
                    self.end_on_delimiter(c, compiler)
                }
            }
        }
    }

    fn end_on_delimiter(&mut self, c: char, compiler: &mut Compiler) -> Step {
        if DELIMITERS.contains(c) {
            self.flush(compiler);
            Step::Consumed(State::Label)
        } else {
            Step::Rejected
        }
    }

    fn push(&mut self, c: char, field: impl FnOnce(&mut Token) -> &mut String) {
        if let Some(token) = self.token.as_mut() {
            field(token).push(c);
        }
    }

    fn flush(&mut self, compiler: &mut Compiler) {
        if let Some(token) = self.token.take() {
            compiler.emit(&token);
        }
    }
}

/// Musical state while walking the tokens.
struct Compiler {
    tune_a4: f64,
    tick: f64,
    octave: f64,
    default_length: f64,
    gate: f64, // ratio, or ticks when gate_absolute
    gate_absolute: bool,
    events: Vec<NoteEvent>,
}

impl Compiler {
    fn new(tune_a4: f64) -> Self {
        Compiler {
            tune_a4,
            tick: 0.0,
            octave: DEFAULT_OCTAVE,
            default_length: TICKS_PER_WHOLE_NOTE / 4.0,
            gate: DEFAULT_GATE,
            gate_absolute: false,
            events: Vec::new(),
        }
    }

    fn length_or_default(&self, token: &Token) -> f64 {
        if token.length.is_empty() {
            self.default_length
        } else {
            parse_length(&token.length)
        }
    }

    fn emit(&mut self, token: &Token) {
        match token.label {
            'C' | 'D' | 'E' | 'F' | 'G' | 'A' | 'B' => {
                let number = pitch_class(token.label)
                    + (self.octave + 1.0) * 12.0
                    + parse_modifier(&token.modifier);
                let length = self.length_or_default(token);
                self.note(number, length, &token.post);
            }
            'N' => match leading_int(&token.length) {
                Some(number) => self.note(number, self.default_length, &token.post),
                None => self.tick += self.default_length,
            },
            'R' => self.tick += self.length_or_default(token),
            'O' => {
                if let Some(octave) = leading_int(&token.length) {
                    self.octave = octave;
                }
            }
            '>' => self.octave += 1.0,
            '<' => self.octave -= 1.0,
            'L' => {
                if !token.length.is_empty() {
                    self.default_length = parse_length(&token.length);
                }
            }
            'Q' => {
                if let Some(g) = leading_float(&token.length) {
                    let ratio = if g >= 1.0 { g / 8.0 } else { g };
                    self.gate_absolute = token.post.contains('!');
                    self.gate = if self.gate_absolute {
                        self.default_length * ratio
                    } else {
                        ratio
                    };
                }
            }
            _ => {}
        }
    }

    fn note(&mut self, number: f64, length: f64, post: &str) {
        let frequency = note_frequency(number, self.tune_a4);
        let gate_time = if self.gate_absolute {
            self.gate
        } else {
            (length * self.gate).floor()
        };
        let accent = post.contains('!');

        self.events.push(NoteEvent { tick: self.tick, frequency, trigger: true, accent });
        if !post.contains('~') {
            self.events.push(NoteEvent {
                tick: self.tick + gate_time,
                frequency,
                trigger: false,
                accent,
            });
        }
        self.tick += length;
    }

    fn finish(mut self) -> Score {
        // stable, so a note-off sharing a tick with the next note-on stays first
        self.events.sort_by(|a, b| a.tick.total_cmp(&b.tick));
        Score {
            events: self.events,
            length: self.tick,
        }
    }
}

fn pitch_class(label: char) -> f64 {
    match label {
        'C' => 0.0,
        'D' => 2.0,
        'E' => 4.0,
        'F' => 5.0,
        'G' => 7.0,
        'A' => 9.0,
        'B' => 11.0,
        _ => 0.0,
    }
}

/// Semitone offset of a modifier run; repeats accumulate.
fn parse_modifier(modifier: &str) -> f64 {
    modifier
        .chars()
        .map(|c| match c {
            '#' | '+' => 1.0,
            '-' => -1.0,
            _ => 0.0,
        })
        .sum()
}

/// Converts a length field to ticks.
///
/// Each term `n` with `d` trailing dots is `3840 / n * (2 - 2^-d)`; `+` and
/// `^` add the next term, `-` subtracts it. A term without a usable number
/// (missing or zero) adds nothing and its digits and dots carry over into
/// the next term.
pub fn parse_length(length: &str) -> f64 {
    let mut total = 0.0;
    let mut adding = true;
    let mut number = String::new();
    let mut dots = 0;

    let mut flush = |number: &mut String, dots: &mut i32, adding: bool| {
        let n = match leading_int(number) {
            Some(n) if n != 0.0 => n,
            _ => return,
        };
        let mut ticks = TICKS_PER_WHOLE_NOTE / n;
        if *dots > 0 {
            ticks *= 2.0 - 1.0 / 2.0_f64.powi(*dots);
        }
        if adding {
            total += ticks;
        } else {
            total -= ticks;
        }
        number.clear();
        *dots = 0;
    };

    for c in length.chars() {
        match c {
            '0'..='9' => number.push(c),
            '.' => dots += 1,
            '+' | '^' | '-' => {
                flush(&mut number, &mut dots, adding);
                adding = c != '-';
            }
            _ => {}
        }
    }
    flush(&mut number, &mut dots, adding);
    total
}

/// Leading signed integer, ignoring whatever follows. Read as f64 so long
/// digit runs grow instead of overflowing.
fn leading_int(s: &str) -> Option<f64> {
    let end = numeric_prefix(s, false);
    s[..end].parse().ok()
}

/// Leading signed decimal, ignoring whatever follows.
fn leading_float(s: &str) -> Option<f64> {
    let end = numeric_prefix(s, true);
    let prefix = &s[..end];
    if prefix.chars().any(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

fn numeric_prefix(s: &str, allow_fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {}
            b'.' if allow_fraction && !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    end
}
