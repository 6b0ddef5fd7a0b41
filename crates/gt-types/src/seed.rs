//! Deterministic seed derivation.

/// Derive an independent seed from a base seed and a path of indices
/// (candidate, repeat, fold, tree ...). Uses the splitmix64 finalizer so that
/// neighbouring inputs map to unrelated outputs.
pub fn derive_seed(base: u64, path: &[u64]) -> u64 {
    path.iter().fold(splitmix64(base), |acc, &part| {
        splitmix64(acc ^ part.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    })
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
