//! Score-proportional selection among ranked candidates.

use rand::{Rng, RngCore, SeedableRng};

use crate::resolver::ResolveResult;

/// Seed used when none (or zero) is configured.
pub const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Marsaglia xorshift64 generator. Cheap, deterministic, not cryptographic.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create a generator; a zero seed (a fixed point of xorshift) is replaced.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { DEFAULT_SEED } else { seed };
        Self { state }
    }
}

impl Default for XorShift64 {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl RngCore for XorShift64 {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }
}

/// Pick one candidate with probability proportional to its score.
///
/// A lone candidate is returned without drawing. When every score is zero
/// the pick is uniform. Returns `None` only for an empty slice.
pub fn select_weighted<R>(candidates: &[ResolveResult], rng: &mut R) -> Option<usize>
where
    R: RngCore + ?Sized,
{
    match candidates.len() {
        0 => None,
        1 => Some(0),
        n => {
            let total: f32 = candidates.iter().map(|c| c.score.max(0.0)).sum();
            if total <= 0.0 || !total.is_finite() {
                return Some(rng.gen_range(0..n));
            }

            let draw = rng.gen::<f32>() * total;
            let mut cumulative = 0.0f32;
            for (index, candidate) in candidates.iter().enumerate() {
                cumulative += candidate.score.max(0.0);
                if cumulative > draw {
                    return Some(index);
                }
            }
            // Rounding can leave the last prefix sum a hair under the draw.
            Some(n - 1)
        }
    }
}
