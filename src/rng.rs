use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------
// Rng
// -------------------------------------------------------------------------------------------------
/// A pure functional pseudo-random number generator.
///
/// Every primitive consumes the generator and returns the successor state
/// alongside the sampled value, so generation is reproducible and replayable:
/// the same state always yields the same `(state, value)` pair, and a state can
/// be kept around to re-run a generation from any point.
pub trait Rng: Sized {
    /// Sample a boolean.
    fn gen_bool(self) -> (Self, bool);

    /// Sample a value in `[0, bound)`. A `bound` of zero yields zero.
    fn gen_u32(self, bound: u32) -> (Self, u32);

    /// Sample a full 64-bit value.
    fn gen_u64(self) -> (Self, u64);
}

// -------------------------------------------------------------------------------------------------
// XorShiftRng
// -------------------------------------------------------------------------------------------------
/// The default [`Rng`]: a 64-bit xorshift register.
///
/// The seed is scrambled through SplitMix64 before use so that small and zero
/// seeds still produce well-mixed streams.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    pub fn new(seed: u64) -> Self {
        // SplitMix64 finalizer
        let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        if z == 0 {
            // xorshift has a fixed point at zero
            z = 0x9e37_79b9_7f4a_7c15;
        }
        XorShiftRng { state: z }
    }

    #[inline]
    fn step(self) -> (Self, u64) {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        (XorShiftRng { state: x }, x)
    }
}

impl Rng for XorShiftRng {
    fn gen_bool(self) -> (Self, bool) {
        let (rng, value) = self.step();
        (rng, value >> 63 == 1)
    }

    fn gen_u32(self, bound: u32) -> (Self, u32) {
        let (rng, value) = self.step();
        let value = if bound == 0 {
            0
        } else {
            // take the upper half; the low xorshift bits are the weakest
            ((value >> 32) % u64::from(bound)) as u32
        };
        (rng, value)
    }

    fn gen_u64(self) -> (Self, u64) {
        self.step()
    }
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn same_seed_same_stream() {
        let a = XorShiftRng::new(42);
        let b = XorShiftRng::new(42);
        assert_eq!(a.gen_u64(), b.gen_u64());
        let (a, _) = a.gen_u64();
        let (b, _) = b.gen_u64();
        assert_eq!(a.gen_bool(), b.gen_bool());
    }

    #[test]
    fn zero_seed_is_usable() {
        let (rng, first) = XorShiftRng::new(0).gen_u64();
        let (_, second) = rng.gen_u64();
        assert_ne!(first, 0);
        assert_ne!(first, second);
    }

    #[test]
    fn bools_are_not_constant() {
        let mut rng = XorShiftRng::new(7);
        let mut seen = [false; 2];
        for _ in 0..64 {
            let (next, b) = rng.gen_bool();
            rng = next;
            seen[usize::from(b)] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    proptest! {
        #[test]
        fn bounded_draws_stay_in_bounds(seed: u64, bound in 1u32..=1000) {
            let (_, value) = XorShiftRng::new(seed).gen_u32(bound);
            prop_assert!(value < bound);
        }

        #[test]
        fn zero_bound_yields_zero(seed: u64) {
            let (_, value) = XorShiftRng::new(seed).gen_u32(0);
            prop_assert_eq!(value, 0);
        }
    }
}
