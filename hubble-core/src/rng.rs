//! Deterministic RNG hierarchy.
//!
//! Sequential validators draw from one `StdRng` seeded once with the master
//! seed. Parallel validators instead derive a sub-seed per `(stream, iteration)`
//! pair by BLAKE3 hashing, so the draws of iteration `i` do not depend on which
//! thread ran it or in what order. The two schemes produce different (each
//! reproducible) sequences.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Named draw streams; each hashes to disjoint sub-seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Bootstrap,
    Injection,
}

impl Stream {
    pub fn as_str(self) -> &'static str {
        match self {
            Stream::Bootstrap => "bootstrap",
            Stream::Injection => "injection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The single shared stream used by sequential runs.
    pub fn master_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.master_seed)
    }

    /// Sub-seed for one iteration of a stream. Independent of derivation order.
    pub fn sub_seed(&self, stream: Stream, iteration: u64) -> u64 {
        let hash = blake3::Hasher::new()
            .update(stream.as_str().as_bytes())
            .update(&self.master_seed.to_le_bytes())
            .update(&iteration.to_le_bytes())
            .finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, stream: Stream, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, iteration))
    }
}
