use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Hierarchical seed. Every random point derives its own seed from its
/// position in the tree, so draws do not depend on evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantSeed(pub u64);

fn splitmix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl VariantSeed {
    pub fn root(variant_index: u64) -> Self {
        Self(splitmix(variant_index))
    }

    pub fn child(self, ordinal: u64) -> Self {
        Self(splitmix(self.0.wrapping_mul(31).wrapping_add(ordinal)))
    }

    pub fn rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_path_same_stream() {
        let a = VariantSeed::root(3).child(2).child(7);
        let b = VariantSeed::root(3).child(2).child(7);
        assert_eq!(a.rng().r#gen::<u64>(), b.rng().r#gen::<u64>());
    }

    #[test]
    fn siblings_differ() {
        let parent = VariantSeed::root(1);
        assert_ne!(parent.child(0), parent.child(1));
        assert_ne!(VariantSeed::root(1), VariantSeed::root(2));
    }
}
