//! World random number generator
//!
//! The world draws from `rand_xoshiro`'s xoshiro128+, fully reproducible
//! from its 4-word state. [`RngExt`] adds the float and vector draws the
//! simulation uses on top of any `RngCore`.

use glam::Vec3;
use rand::SeedableRng;
use rand::rand_core::RngCore;
use serde::Deserialize;

pub use rand_xoshiro::Xoshiro128Plus;

/// Seed words of a fresh world
const DEFAULT_WORDS: [u32; 4] = [9, 12, 32, 10];

/// Generator with the built-in seed
pub fn default_rng() -> Xoshiro128Plus {
    from_words(DEFAULT_WORDS)
}

/// Restore a generator from its raw state. An all-zero state is replaced
/// by the crate's zero-seed fallback.
pub fn from_words(words: [u32; 4]) -> Xoshiro128Plus {
    let mut seed = [0u8; 16];
    for (chunk, w) in seed.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    Xoshiro128Plus::from_seed(seed)
}

/// Serialized shape of the generator
#[derive(Deserialize)]
struct State {
    s: [u32; 4],
}

/// Raw state, for save states
pub fn words(rng: &Xoshiro128Plus) -> Result<[u32; 4], serde_json::Error> {
    let state: State = serde_json::from_value(serde_json::to_value(rng)?)?;
    Ok(state.s)
}

/// Simulation draws
pub trait RngExt: RngCore {
    /// Uniform float in [0, 1) built from the top 24 bits
    #[inline]
    fn randf(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
    }

    /// Random point on the unit sphere (used for passive rotation axes)
    fn unit3(&mut self) -> Vec3 {
        let theta = self.randf() * std::f32::consts::TAU;
        let z = 1.0 - self.randf() * 2.0;
        let cz = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(cz * theta.cos(), cz * theta.sin(), z)
    }
}

impl<R: RngCore + ?Sized> RngExt for R {}
