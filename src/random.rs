//! Deterministic xorshift128 generator.
//!
//! Every stochastic choice in planet generation flows through this
//! generator, so a planet is reproducible bit-for-bit from its seed. The
//! four state words are kept in `[0, 2^31)`: they are masked to 31 bits on
//! every reseed, and the recurrence preserves the bound, so `next()` is
//! always non-negative and `unit()` stays in `[0, 1)`.

/// Fixed fallback state used when no seed is supplied.
pub const DEFAULT_STATE: [u32; 4] = [123456789, 362436069, 521288629, 88675123];

const WORD_MASK: u32 = 0x7FFF_FFFF;

/// Xorshift generator over four 31-bit state words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XorShift128 {
    x: u32,
    y: u32,
    z: u32,
    w: u32,
}

impl XorShift128 {
    /// Generator seeded with the fixed default state. Deterministic: two
    /// `new()` generators produce identical sequences.
    pub fn new() -> Self {
        let [x, y, z, w] = DEFAULT_STATE;
        Self { x, y, z, w }
    }

    /// Generator seeded from four explicit state words. Words are masked to
    /// 31 bits; a word that masks to zero falls back to its default.
    pub fn from_words(x: u32, y: u32, z: u32, w: u32) -> Self {
        Self {
            x: seed_word(x, DEFAULT_STATE[0]),
            y: seed_word(y, DEFAULT_STATE[1]),
            z: seed_word(z, DEFAULT_STATE[2]),
            w: seed_word(w, DEFAULT_STATE[3]),
        }
    }

    /// Generator seeded from a single master seed, expanded to four words.
    pub fn from_master(master: u64) -> Self {
        let [x, y, z, w] = crate::seeds::state_words(master);
        Self::from_words(x, y, z, w)
    }

    /// Reset to four explicit state words.
    pub fn reseed(&mut self, x: u32, y: u32, z: u32, w: u32) {
        *self = Self::from_words(x, y, z, w);
    }

    /// Reset to the fixed default state.
    pub fn reseed_default(&mut self) {
        *self = Self::new();
    }

    /// Reset from a master seed.
    pub fn reseed_master(&mut self, master: u64) {
        *self = Self::from_master(master);
    }

    /// Next draw: the classic xorshift recurrence over four words. Always
    /// in `[0, 2^31)` given the 31-bit state invariant.
    pub fn next(&mut self) -> i32 {
        let t = self.x ^ ((self.x << 11) & WORD_MASK);
        self.x = self.y;
        self.y = self.z;
        self.z = self.w;
        self.w = (self.w ^ (self.w >> 19)) ^ (t ^ (t >> 8));
        self.w as i32
    }

    /// Uniform float in the half-open interval `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.next() as f64 / 2_147_483_648.0
    }

    /// Uniform float in the closed interval `[0, 1]`.
    pub fn unit_inclusive(&mut self) -> f64 {
        self.next() as f64 / 2_147_483_647.0
    }

    /// Uniform integer in the closed range `[min, max]`.
    pub fn integer(&mut self, min: i64, max: i64) -> i64 {
        self.integer_exclusive(min, max + 1)
    }

    /// Uniform integer in the half-open range `[min, max)`. A degenerate
    /// range returns `min`.
    pub fn integer_exclusive(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        (self.unit() * (max - min) as f64).floor() as i64 + min
    }

    /// Uniform float in `[min, max)`.
    pub fn real(&mut self, min: f64, max: f64) -> f64 {
        min + self.unit() * (max - min)
    }

    /// Uniform float in `[min, max]`.
    pub fn real_inclusive(&mut self, min: f64, max: f64) -> f64 {
        min + self.unit_inclusive() * (max - min)
    }
}

impl Default for XorShift128 {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_word(word: u32, fallback: u32) -> u32 {
    let masked = word & WORD_MASK;
    if masked == 0 {
        fallback
    } else {
        masked
    }
}
