//! Single fixed-capacity Bloom filter, the building block of every window.
use crate::error::{FilterError, Result};
use crate::hash::HashFunction;
use crate::params::FilterParameters;
use bitvec::{bitvec, order::Lsb0, vec::BitVec};

/// One window: a `table_bits` bit array probed by `hash_count` seeded hashes.
///
/// [`union_with`](Self::union_with) and
/// [`intersect_with`](Self::intersect_with) only require equal `table_bits`
/// and `hash_count`. Filters of one chain carry different seeds, so the
/// result of combining two of them keeps the bit pattern and occupancy but
/// answers membership under the receiver's seed; intersecting with an empty
/// window is a valid way to clear.
#[derive(Clone)]
pub struct BitFilter {
    bits: BitVec<usize, Lsb0>,
    table_bits: u64,
    hash_count: u32,
    seed: u64,
    // Set bits, kept in step with `bits` so occupancy is O(1)
    ones: u64,
    hash_function: HashFunction,
}

impl BitFilter {
    pub fn new(params: &FilterParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self::with_seed(params, params.seed))
    }

    /// Builds an empty filter with the shape of `params` and its own seed.
    /// `params` must already be validated.
    pub(crate) fn with_seed(params: &FilterParameters, seed: u64) -> Self {
        Self {
            bits: bitvec![usize, Lsb0; 0; params.table_bits as usize],
            table_bits: params.table_bits,
            hash_count: params.hash_count,
            seed,
            ones: 0,
            hash_function: params.hash_function,
        }
    }

    fn indices(&self, key: u64) -> Vec<usize> {
        let capacity = self.bits.len();
        (self.hash_function)(
            &key.to_le_bytes(),
            self.seed,
            self.hash_count as usize,
            capacity,
        )
        .into_iter()
        .map(|idx| idx % capacity)
        .collect()
    }

    pub fn insert(&mut self, key: u64) {
        for idx in self.indices(key) {
            if !self.bits.replace(idx, true) {
                self.ones += 1;
            }
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        self.indices(key).into_iter().all(|idx| self.bits[idx])
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
        self.ones = 0;
    }

    /// Clears the filter and switches it to a new hash seed.
    pub fn reseed(&mut self, seed: u64) {
        self.clear();
        self.seed = seed;
    }

    pub fn union_with(&mut self, other: &BitFilter) -> Result<()> {
        self.check_shape(other)?;
        for (word, other_word) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *word |= *other_word;
        }
        self.recount();
        Ok(())
    }

    pub fn intersect_with(&mut self, other: &BitFilter) -> Result<()> {
        self.check_shape(other)?;
        for (word, other_word) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *word &= *other_word;
        }
        self.recount();
        Ok(())
    }

    /// Equal `table_bits` and `hash_count`. Seeds are not compared.
    pub fn same_shape(&self, other: &BitFilter) -> bool {
        self.table_bits == other.table_bits
            && self.hash_count == other.hash_count
    }

    fn check_shape(&self, other: &BitFilter) -> Result<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(FilterError::ShapeMismatch {
                table_bits: self.table_bits,
                hash_count: self.hash_count,
                other_table_bits: other.table_bits,
                other_hash_count: other.hash_count,
            })
        }
    }

    fn recount(&mut self) {
        self.ones = self.bits.count_ones() as u64;
    }

    /// Fraction of set bits.
    pub fn occupancy(&self) -> f64 {
        self.ones as f64 / self.table_bits as f64
    }

    /// False positive probability implied by the current bit occupancy,
    /// `(ones / table_bits) ^ hash_count`.
    pub fn fpp_from_occupancy(&self) -> f64 {
        self.occupancy().powi(self.hash_count as i32)
    }

    pub fn ones(&self) -> u64 {
        self.ones
    }

    pub fn is_empty(&self) -> bool {
        self.ones == 0
    }

    pub fn table_bits(&self) -> u64 {
        self.table_bits
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl std::fmt::Debug for BitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitFilter")
            .field("table_bits", &self.table_bits)
            .field("hash_count", &self.hash_count)
            .field("seed", &format_args!("{:#x}", self.seed))
            .field("ones", &self.ones)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(table_bits: u64, hash_count: u32) -> BitFilter {
        BitFilter::new(&FilterParameters::with_shape(table_bits, hash_count).unwrap())
            .unwrap()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut bf = filter(6250, 3);
        bf.insert(1);
        bf.insert(2);
        assert!(bf.contains(1));
        assert!(bf.contains(2));
        assert!(!bf.contains(3));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut bf = filter(6250, 3);
        bf.insert(99);
        let ones = bf.ones();
        bf.insert(99);
        assert_eq!(bf.ones(), ones);
    }

    #[test]
    fn test_ones_tracks_bit_count() {
        let mut bf = filter(1024, 4);
        for key in 0..200 {
            bf.insert(key);
        }
        assert_eq!(bf.ones(), bf.bits.count_ones() as u64);
    }

    #[test]
    fn test_clear() {
        let mut bf = filter(6250, 3);
        bf.insert(5);
        bf.clear();
        assert!(bf.is_empty());
        assert!(!bf.contains(5));
        assert_eq!(bf.fpp_from_occupancy(), 0.0);
    }

    #[test]
    fn test_reseed_clears() {
        let mut bf = filter(6250, 3);
        bf.insert(5);
        bf.reseed(12345);
        assert!(bf.is_empty());
        assert_eq!(bf.seed(), 12345);
    }

    #[test]
    fn test_union_and_intersect() {
        let mut a = filter(4096, 3);
        let mut b = filter(4096, 3);
        a.insert(1);
        b.insert(2);

        let mut union = a.clone();
        union.union_with(&b).unwrap();
        assert!(union.contains(1));
        assert!(union.contains(2));

        let mut inter = union.clone();
        inter.intersect_with(&a).unwrap();
        assert!(inter.contains(1));
        assert_eq!(inter.ones(), a.ones());
    }

    #[test]
    fn test_intersect_with_empty_clears() {
        let mut a = filter(4096, 3);
        let empty = filter(4096, 3);
        a.insert(10);
        a.intersect_with(&empty).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_intersect_with_empty_window_of_same_chain() {
        let params = FilterParameters::with_shape(6250, 3).unwrap();
        let mut a = BitFilter::with_seed(&params, 1);
        let empty = BitFilter::with_seed(&params, 2);
        a.insert(10);
        a.intersect_with(&empty).unwrap();
        assert!(a.is_empty());
        assert_eq!(a.seed(), 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut a = filter(4096, 3);
        let b = filter(4096, 4);
        assert!(matches!(
            a.union_with(&b),
            Err(FilterError::ShapeMismatch { .. })
        ));
        let c = filter(2048, 3);
        assert!(matches!(
            a.intersect_with(&c),
            Err(FilterError::ShapeMismatch { .. })
        ));
    }
}
