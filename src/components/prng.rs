use {
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};

const FOLD_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// An explicit, splittable source of randomness.
///
/// A [`PrngKey`] never changes: drawing random numbers means turning the key
/// into a generator with [`PrngKey::rng`] and throwing the key away. Every
/// stochastic operation in a training run gets its own key obtained by
/// splitting, so a run is fully determined by the key it started from.
///
/// ```
/// use td3_rl::components::PrngKey;
///
/// let key = PrngKey::new(42);
/// let (key, key_noise) = key.split();
/// let [key_a, key_b, key_c] = key.split_n();
/// assert_ne!(key_a, key_b);
/// assert_ne!(key_b, key_c);
/// assert_ne!(key_noise, key_a);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrngKey(u64);

impl PrngKey {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Split this key into two independent keys.
    pub fn split(self) -> (Self, Self) {
        let [a, b] = self.split_n();
        (a, b)
    }

    /// Split this key into `N` independent keys.
    pub fn split_n<const N: usize>(self) -> [Self; N] {
        let mut rng = self.rng();
        std::array::from_fn(|_| Self(rng.gen()))
    }

    /// Split this key into `n` independent keys.
    pub fn split_many(self, n: usize) -> Vec<Self> {
        let mut rng = self.rng();
        (0..n).map(|_| Self(rng.gen())).collect()
    }

    /// Derive a new key from this key and some data, without consuming a
    /// split. Used where a read-only consumer (e.g. an evaluation) needs
    /// randomness that must not advance the training stream.
    pub fn fold_in(self, data: u64) -> Self {
        // salted so that folded keys never coincide with split children
        let mut rng = StdRng::seed_from_u64(self.0 ^ FOLD_SALT ^ data.rotate_left(32));
        Self(rng.gen())
    }

    /// The random stream behind this key.
    pub fn rng(self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }

    pub fn seed(&self) -> u64 {
        self.0
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        std::collections::HashSet,
    };

    #[test]
    fn split_is_deterministic() {
        let key = PrngKey::new(7);
        assert_eq!(key.split(), key.split());
        assert_eq!(key.split_many(5), key.split_many(5));
    }

    #[test]
    fn split_children_are_distinct() {
        let keys = PrngKey::new(0).split_many(1000);
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert!(!keys.contains(&PrngKey::new(0)));
    }

    #[test]
    fn split_n_agrees_with_split_many() {
        let key = PrngKey::new(123);
        let arr: [PrngKey; 3] = key.split_n();
        assert_eq!(arr.to_vec(), key.split_many(3));
    }

    #[test]
    fn fold_in_depends_on_data() {
        let key = PrngKey::new(99);
        assert_ne!(key.fold_in(0), key.fold_in(1));
        assert_ne!(key.fold_in(0), key);
        assert_eq!(key.fold_in(5), key.fold_in(5));
        assert!(!key.split_many(8).contains(&key.fold_in(0)));
    }

    #[test]
    fn same_key_same_stream() {
        let key = PrngKey::new(3);
        let (mut rng_a, mut rng_b) = (key.rng(), key.rng());
        let a: Vec<f64> = (0..4).map(|_| rng_a.gen()).collect();
        let b: Vec<f64> = (0..4).map(|_| rng_b.gen()).collect();
        assert_eq!(a, b);
    }
}
