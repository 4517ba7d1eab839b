/// Reduce a 256-bit big-endian seed modulo `modulus`.
///
/// The full seed takes part in the reduction, so every bit influences the
/// result. Returns 0 when `modulus` is 0.
pub fn reduce_seed(seed: &[u8; 32], modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }
    let m = modulus as u128;
    let remainder = seed
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % m);
    remainder as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_seed_reduces_to_itself() {
        let mut seed = [0u8; 32];
        seed[31] = 119;
        assert_eq!(reduce_seed(&seed, 120), 119);
        assert_eq!(reduce_seed(&seed, 100), 19);
    }

    #[test]
    fn test_reduction_uses_high_bytes() {
        // 2^248 mod 120: 2^248 = 256^31
        let mut seed = [0u8; 32];
        seed[0] = 1;
        let expected = (0..31).fold(1u128, |acc, _| (acc * 256) % 120) as u64;
        assert_eq!(reduce_seed(&seed, 120), expected);
    }

    #[test]
    fn test_max_seed_and_degenerate_modulus() {
        let seed = [0xFF; 32];
        assert!(reduce_seed(&seed, u64::MAX) < u64::MAX);
        assert_eq!(reduce_seed(&seed, 1), 0);
        assert_eq!(reduce_seed(&seed, 0), 0);
    }
}
