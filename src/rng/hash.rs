//! Stateless hash-based variate generation
//!
//! Every variate is a pure function of `(seed, path_index, step_index)`, so
//! any path/step combination can be regenerated independently. This is what
//! makes parallel path simulation deterministic: no generator state is shared
//! between workers and the result does not depend on scheduling order.

use super::halton::box_muller;

/// SplitMix64 finalizer. Good 64-bit avalanche behaviour for cheap.
#[inline]
pub fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Maps a hash to a uniform in [0, 1) using the top 53 bits.
#[inline]
pub fn unit_from_hash(x: u64) -> f64 {
    const INV: f64 = 1.0 / 9007199254740992.0; // 2^-53
    ((x >> 11) & 0x1f_ffff_ffff_ffff) as f64 * INV
}

/// Pair of independent standard normals keyed by `(seed, path, step)`.
///
/// Uniforms are floored at 1e-12 before Box-Muller so the logarithm stays
/// finite.
#[inline]
pub fn normal_pair_at(seed: u64, path: u64, step: u64) -> (f64, f64) {
    let h1 = mix64(
        seed ^ path
            .wrapping_mul(0x9e37_79b9_7f4a_7c15)
            .wrapping_add(step.wrapping_mul(0x94d0_49bb_1331_11eb)),
    );
    let h2 = mix64(
        seed.wrapping_add(0xdead_beef_cafe_babe)
            ^ path
                .wrapping_mul(0xbf58_476d_1ce4_e5b9)
                .wrapping_add(step.wrapping_mul(0x9e37_79b9_7f4a_7c15)),
    );
    let u1 = unit_from_hash(h1).max(1e-12);
    let u2 = unit_from_hash(h2).max(1e-12);
    box_muller(u1, u2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mix64_not_identity() {
        assert_ne!(mix64(0), 0);
        assert_ne!(mix64(1), 1);
        assert_ne!(mix64(0), mix64(1));
    }

    #[test]
    fn test_unit_range() {
        for x in [0u64, 1, u64::MAX, 0x1234_5678_9abc_def0] {
            let u = unit_from_hash(x);
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_normal_pair_moments() {
        let n = 100_000u64;
        let (mut sum, mut sum2) = (0.0, 0.0);
        for i in 0..n {
            let (z1, z2) = normal_pair_at(42, i, 0);
            sum += z1 + z2;
            sum2 += z1 * z1 + z2 * z2;
        }
        let count = (2 * n) as f64;
        let m = sum / count;
        let v = sum2 / count - m * m;
        assert!(m.abs() < 0.01, "mean {} not near 0", m);
        assert!((v - 1.0).abs() < 0.02, "variance {} not near 1", v);
    }

    proptest! {
        #[test]
        fn prop_deterministic(seed: u64, path: u64, step: u64) {
            prop_assert_eq!(
                normal_pair_at(seed, path, step),
                normal_pair_at(seed, path, step)
            );
        }

        #[test]
        fn prop_finite(seed: u64, path: u64, step: u64) {
            let (z1, z2) = normal_pair_at(seed, path, step);
            prop_assert!(z1.is_finite());
            prop_assert!(z2.is_finite());
        }

        #[test]
        fn prop_paths_decorrelated(seed: u64, path in 0u64..1_000_000) {
            let a = normal_pair_at(seed, path, 0);
            let b = normal_pair_at(seed, path.wrapping_add(1), 0);
            prop_assert_ne!(a, b);
        }
    }
}
