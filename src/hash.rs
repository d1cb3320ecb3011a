/// Fast 2-value hash with xorshift
#[inline(always)]
pub fn hash2(a: u64, b: u64) -> u64 {
    let mut seed = a.wrapping_mul(2654435761).wrapping_add(b.wrapping_mul(2246822519));
    seed ^= seed << 13;
    seed ^= seed >> 7;
    seed ^= seed << 17;
    seed
}

/// Fast deterministic random using splitmix64 - handles small seeds properly
#[inline(always)]
pub fn rand_simple(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9e3779b97f4a7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    (x >> 11) as f64 / 9007199254740992.0
}

/// Deterministic value in [0, 1) for the `channel`-th attribute of item `index`.
/// Lets the starfield be regenerated identically without storing an RNG.
#[inline(always)]
pub fn unit(index: u64, channel: u64) -> f64 {
    rand_simple(hash2(index, channel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_in_unit_range() {
        for i in 0..1000 {
            let v = unit(i, 3);
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_channels_differ() {
        assert_ne!(unit(7, 0), unit(7, 1));
        assert_eq!(unit(7, 0), unit(7, 0));
    }
}
