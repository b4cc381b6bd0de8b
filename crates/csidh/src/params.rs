//! Read-only parameter tables for the supported CSIDH primes.
//!
//! Every supported prime has the shape `p = 2^f · ∏L − 1` with `f = 2` and
//! `L` a list of small odd primes sorted ascending, so `p ≡ 3 (mod 4)` and
//! the starting curve `y² = x³ + x` is supersingular with group order
//! `p + 1` on both the curve and its quadratic twist.

use num_bigint::BigUint;
use num_traits::One as _;

use crate::error::CsidhError;

/// The CSIDH-512 prime, `4·(3·5·…·373·587) − 1` (511 bits).
const P512_HEX: &[u8] = b"65b48e8f740f89bffc8ab0d15e3e4c4ab42d083aedc88c425afbfcc69322c9cd\
a7aac6c567f35507516730cc1f0b4f25c2721bf457aca8351b81b90533c6c87b";

/// The CSIDH-1024 prime, `4·(3·5·…·733·983) − 1` (1020 bits).
const P1024_HEX: &[u8] = b"ece55ed427012a9d89dec879007ebd7216c22bc86f21a080683cf25db31ad5bf\
06de2471cf9386e4d6c594a8ad82d2df811d9c419ec83297611ad4f90441c800\
978dbeed90a2b58b97c56d1de81ede56b317c5431541f40642aca4d5a313709c\
2cab6a0e287f1bd514ba72cb8d89fd3a1d81eebbc3d344ddbe34c5460e36453";

/// Small odd prime list for `p512`: the 73 smallest odd primes plus 587.
const L512: [u64; 74] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41,
    43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157,
    163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227,
    229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283,
    293, 307, 311, 313, 317, 331, 337, 347, 349, 353, 359, 367,
    373, 587,
];

/// Small odd prime list for `p1024`: the 129 smallest odd primes plus 983.
const L1024: [u64; 130] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41,
    43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157,
    163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227,
    229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283,
    293, 307, 311, 313, 317, 331, 337, 347, 349, 353, 359, 367,
    373, 379, 383, 389, 397, 401, 409, 419, 421, 431, 433, 439,
    443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509,
    521, 523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599,
    601, 607, 613, 617, 619, 631, 641, 643, 647, 653, 659, 661,
    673, 677, 683, 691, 701, 709, 719, 727, 733, 983,
];

/// Label of a supported CSIDH prime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prime {
    /// CSIDH-512: 74 small odd primes, 64-byte public keys.
    P512,
    /// CSIDH-1024: 130 small odd primes, 128-byte public keys.
    P1024,
}

impl Prime {
    /// The label used for cache files and diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::P512 => "p512",
            Self::P1024 => "p1024",
        }
    }

    /// Default per-coordinate exponent bound `m` for this prime.
    #[must_use]
    pub const fn default_exponent(self) -> u32 {
        match self {
            Self::P512 => 10,
            Self::P1024 => 2,
        }
    }
}

/// Immutable parameter set for one prime, loaded once at construction.
#[derive(Clone, Debug)]
pub struct Params {
    /// Which prime this table describes.
    pub prime: Prime,
    /// The field characteristic `p`.
    pub p: BigUint,
    /// Bit length of `p`.
    pub p_bits: u64,
    /// Byte width of public keys and shared secrets: `⌈p_bits / 8⌉`.
    pub key_bytes: usize,
    /// The small odd primes, ascending; `p + 1 = 2^f · ∏L`.
    pub l: &'static [u64],
    /// `|L|`, the secret-key length in exponents (and bytes).
    pub n: usize,
    /// Two-adicity of `p + 1`.
    pub two_adicity: u32,
    /// Proven-order bit threshold for supersingularity validation: a point
    /// of order exceeding `4·√p` pins the group order to `p + 1`.
    pub validation_stop: u64,
}

impl Params {
    /// Load the table for `prime`.
    pub fn new(prime: Prime) -> Result<Self, CsidhError> {
        let (hex, l): (&[u8], &'static [u64]) = match prime {
            Prime::P512 => (P512_HEX, &L512),
            Prime::P1024 => (P1024_HEX, &L1024),
        };
        let p = BigUint::parse_bytes(hex, 16)
            .ok_or(CsidhError::InvalidParameter("malformed prime table"))?;
        let p_bits = p.bits();
        Ok(Self {
            prime,
            p_bits,
            key_bytes: usize::try_from((p_bits + 7) / 8)
                .map_err(|_| CsidhError::InvalidParameter("prime too large"))?,
            l,
            n: l.len(),
            two_adicity: 2,
            validation_stop: p_bits / 2 + 2,
            p,
        })
    }

    /// `∏L` recomputed from the table; used by self-checks.
    #[must_use]
    pub fn odd_order(&self) -> BigUint {
        self.l.iter().fold(BigUint::one(), |acc, &ell| acc * ell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p512_table_is_consistent() {
        let params = Params::new(Prime::P512).unwrap();
        assert_eq!(params.n, 74);
        assert_eq!(params.p_bits, 511);
        assert_eq!(params.key_bytes, 64);
        // p + 1 = 2^f * prod(L)
        let rebuilt = params.odd_order() << params.two_adicity;
        assert_eq!(rebuilt, &params.p + 1u32);
        // p = 3 mod 4
        assert_eq!((&params.p % 4u32), BigUint::from(3u32));
    }

    #[test]
    fn p1024_table_is_consistent() {
        let params = Params::new(Prime::P1024).unwrap();
        assert_eq!(params.n, 130);
        assert_eq!(params.p_bits, 1020);
        assert_eq!(params.key_bytes, 128);
        let rebuilt = params.odd_order() << params.two_adicity;
        assert_eq!(rebuilt, &params.p + 1u32);
    }

    #[test]
    fn prime_lists_sorted_strictly() {
        for params in [Params::new(Prime::P512).unwrap(), Params::new(Prime::P1024).unwrap()] {
            assert!(params.l.windows(2).all(|w| w[0] < w[1]), "L must ascend");
            assert!(params.l.iter().all(|&ell| ell % 2 == 1), "L must be odd");
        }
    }
}
