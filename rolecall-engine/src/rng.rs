//! Seeded random streams.
//!
//! Each consumer draws from its own stream so adding a roll in one place
//! never shifts the sequence seen by another. Streams are derived from the
//! round seed with HMAC-SHA256 domain separation.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

#[derive(Debug)]
pub struct RngBundle {
    ghost: RefCell<CountingRng<SmallRng>>,
    chance: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            ghost: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"ghost"))),
            chance: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"chance"))),
        }
    }

    /// Stream used by ghost-role acceptance rolls and candidate picks.
    #[must_use]
    pub fn ghost(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.ghost.borrow_mut()
    }

    /// Stream used by role abilities and add-on chance rolls.
    #[must_use]
    pub fn chance(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.chance.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Percentage roll: `true` with probability `percent / 100`.
///
/// `100` always succeeds without drawing and `0` never succeeds.
pub fn roll_percent<R: Rng + ?Sized>(rng: &mut R, percent: u8) -> bool {
    if percent >= 100 {
        return true;
    }
    rng.gen_range(1..=100u8) <= percent
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
