use fnv::FnvHasher;
use murmur3::murmur3_32;
use std::hash::Hasher;
use std::io::Cursor;

/// A type alias for the hash function used by every constituent filter.
///
/// **Parameters:**
///
/// - `item: &[u8]`
///   - The key bytes (`u64` keys are hashed as their little-endian bytes).
/// - `seed: u64`
///   - Per-window seed. Two filters with different seeds hash the same key to
///     unrelated positions.
/// - `num_hashes: usize`
///   - The number of bit positions to derive.
/// - `capacity: usize`
///   - The size of the bit array; every returned index is `< capacity`.
///
/// **Returns:**
///
/// - `Vec<usize>` with `num_hashes` bit positions.
pub type HashFunction = fn(&[u8], u64, usize, usize) -> Vec<usize>;

pub(crate) fn hash_murmur32(key: &[u8], seed: u32) -> u32 {
    let mut cursor = Cursor::new(key);
    murmur3_32(&mut cursor, seed).expect("Failed to compute Murmur3 hash")
}

pub(crate) fn hash_fnv64(key: &[u8], seed: u64) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(&seed.to_le_bytes());
    hasher.write(key);
    hasher.finish()
}

/// Double hashing over a seeded Murmur3 and a seeded FNV-1a base hash.
pub fn default_hash_function(
    item: &[u8],
    seed: u64,
    num_hashes: usize,
    capacity: usize,
) -> Vec<usize> {
    let h1 = hash_murmur32(item, fold_seed(seed)) as u64;
    let h2 = hash_fnv64(item, seed);
    (0..num_hashes)
        .map(|i| {
            (h1.wrapping_add((i as u64).wrapping_mul(h2)) % capacity as u64)
                as usize
        })
        .collect()
}

fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Derives the seed of the `generation`-th window built from `base`.
///
/// SplitMix64 finalizer, so consecutive generations get unrelated seeds.
pub fn window_seed(base: u64, generation: u64) -> u64 {
    let mut z = base
        .wrapping_add(generation.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn optimal_bit_vector_size(n: u64, fpr: f64) -> u64 {
    let ln2 = std::f64::consts::LN_2;
    ((-(n as f64) * fpr.ln()) / (ln2 * ln2)).ceil() as u64
}

pub fn optimal_num_hashes(n: u64, m: u64) -> u32 {
    (((m as f64 / n as f64) * std::f64::consts::LN_2).round() as u32).max(1)
}

/// Expected false positive probability of an `m`-bit filter with `k` hashes
/// after `n` distinct inserts: `(1 - e^(-kn/m))^k`.
pub fn expected_fpp(n: u64, m: u64, k: u32) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let fill = 1.0 - (-(k as f64) * n as f64 / m as f64).exp();
    fill.powi(k as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_within_capacity() {
        for key in 0u64..500 {
            let indices = default_hash_function(&key.to_le_bytes(), 7, 5, 97);
            assert_eq!(indices.len(), 5);
            assert!(indices.iter().all(|&i| i < 97));
        }
    }

    #[test]
    fn test_seed_changes_positions() {
        let key = 42u64.to_le_bytes();
        let a = default_hash_function(&key, window_seed(1, 0), 4, 1 << 20);
        let b = default_hash_function(&key, window_seed(1, 1), 4, 1 << 20);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hashing_is_deterministic() {
        let key = 7u64.to_le_bytes();
        assert_eq!(
            default_hash_function(&key, 3, 3, 6250),
            default_hash_function(&key, 3, 3, 6250)
        );
    }

    #[test]
    fn test_optimal_parameters() {
        // 10_000 elements at 1% -> ~95_851 bits, 7 hashes
        let m = optimal_bit_vector_size(10_000, 0.01);
        assert_eq!(m, 95_851);
        assert_eq!(optimal_num_hashes(10_000, m), 7);
    }

    #[test]
    fn test_num_hashes_clamped_to_one() {
        assert_eq!(optimal_num_hashes(1_000_000, 10), 1);
    }

    #[test]
    fn test_expected_fpp() {
        assert_eq!(expected_fpp(0, 6250, 3), 0.0);
        let p = expected_fpp(1000, 9585, 7);
        assert!((p - 0.01).abs() < 0.002, "got {p}");
    }
}
