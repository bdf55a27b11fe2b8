use crate::clock::Clock;

/// Floor for attack, decay and release times, in seconds.
pub const MIN_PHASE_TIME: f64 = 0.0005;

/// Edge-triggered ADSR envelope.
///
/// Every on/off edge restarts the phase clock from the current level, so a
/// retrigger mid-release attacks from wherever the level was instead of
/// jumping to zero. Levels stay in `[0, 1]` for sustain in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Adsr {
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,
    dtime: f64,

    is_on: bool,
    level: f64,
    start_level: f64,
    elapsed: f64,
    attack_slope: f64,
    release_slope: f64,
}

impl Adsr {
    /// Times in seconds, sustain as a level.
    pub fn new(clock: &Clock, attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        let attack = attack.max(MIN_PHASE_TIME);
        Adsr {
            attack,
            decay: decay.max(MIN_PHASE_TIME),
            sustain,
            release: release.max(MIN_PHASE_TIME),
            dtime: clock.dtime(),
            is_on: false,
            level: 0.0,
            start_level: 0.0,
            elapsed: 0.0,
            attack_slope: 1.0 / attack,
            release_slope: 0.0,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn step(&mut self, trigger: bool) -> f64 {
        if trigger != self.is_on {
            self.is_on = trigger;
            self.start_level = self.level;
            self.attack_slope = (1.0 - self.start_level) / self.attack;
            self.release_slope = -self.start_level / self.release;
            self.elapsed = 0.0;
        }

        self.level = if self.is_on {
            if self.elapsed <= self.attack {
                self.attack_slope * self.elapsed + self.start_level
            } else if self.elapsed < self.attack + self.decay {
                let decay_slope = -(1.0 - self.sustain) / self.decay;
                decay_slope * (self.elapsed - self.attack) + 1.0
            } else {
                self.sustain
            }
        } else if self.elapsed < self.release {
            self.release_slope * self.elapsed + self.start_level
        } else {
            0.0
        };

        self.elapsed += self.dtime;
        self.level
    }
}
