use subsim_core::derive_substream_seed;

const DIRECT_MC_SALT: u64 = 0xD1EC_7D1E_C7D1_EC7D;

/// Derives the deterministic seed of the direct Monte Carlo stream.
pub fn direct_mc_seed(master_seed: u64) -> u64 {
    derive_substream_seed(master_seed ^ DIRECT_MC_SALT, 0)
}

/// Derives the deterministic seed of one chain within a level.
///
/// Level `0` is the direct Monte Carlo level and owns no chains, so chain
/// streams start at level `1`.
pub fn chain_seed(master_seed: u64, level: usize, chain_index: usize) -> u64 {
    let intermediate = derive_substream_seed(master_seed, level as u64);
    derive_substream_seed(intermediate, chain_index as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_streams_are_distinct() {
        let a = chain_seed(11, 1, 0);
        let b = chain_seed(11, 1, 1);
        let c = chain_seed(11, 2, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, direct_mc_seed(11));
        assert_eq!(a, chain_seed(11, 1, 0));
    }
}
