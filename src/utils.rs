/// Reference pitch of MIDI note 69.
pub const A4_FREQUENCY: f64 = 440.0;

/// Equal-tempered frequency of a note number, with A4 (69) tuned to `tune_a4`.
pub fn note_frequency(note_number: f64, tune_a4: f64) -> f64 {
    tune_a4 * 2.0_f64.powf((note_number - 69.0) / 12.0)
}

/// Fixed-size history of pushed values. Capacity is rounded up to a power of
/// two so both cursors wrap with a mask.
///
/// `read(offset)` returns the value pushed `offset` pushes ago. Offsets at or
/// beyond the capacity alias onto earlier slots instead of failing.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Box<[f64]>,
    mask: usize,
    cursor: usize,
}

impl RingBuffer {
    pub fn new(min_size: usize) -> Self {
        let capacity = min_size.max(1).next_power_of_two();
        RingBuffer {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            mask: capacity - 1,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn push(&mut self, value: f64) {
        self.buffer[self.cursor] = value;
        self.cursor = (self.cursor + 1) & self.mask;
    }

    #[inline]
    pub fn read(&self, offset: usize) -> f64 {
        self.buffer[self.cursor.wrapping_sub(offset) & self.mask]
    }
}
