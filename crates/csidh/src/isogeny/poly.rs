//! Dense polynomial arithmetic over the prime field.
//!
//! Just enough machinery for √élu: products, Horner evaluation, reduction
//! by a monic divisor, subproduct trees and remainder-tree multipoint
//! evaluation. Coefficient vectors are ascending-degree and never empty.

use num_bigint::BigUint;
use num_traits::{One as _, Zero as _};

use crate::fp::Fp;

/// Invert every element of `xs` with a single field inversion
/// (Montgomery's trick). All inputs must be nonzero.
pub(crate) fn batch_inv(fp: &Fp, xs: &[BigUint]) -> Vec<BigUint> {
    let mut prefix = Vec::with_capacity(xs.len() + 1);
    prefix.push(BigUint::one());
    for x in xs {
        let last = fp.mul(&prefix[prefix.len() - 1], x);
        prefix.push(last);
    }
    let mut acc = fp.inv(&prefix[xs.len()]);
    let mut out = vec![BigUint::zero(); xs.len()];
    for i in (0..xs.len()).rev() {
        out[i] = fp.mul(&acc, &prefix[i]);
        acc = fp.mul(&acc, &xs[i]);
    }
    out
}

/// Product of two polynomials (schoolbook; operands stay tiny).
pub(crate) fn poly_mul(fp: &Fp, a: &[BigUint], b: &[BigUint]) -> Vec<BigUint> {
    let mut out = vec![BigUint::zero(); a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        if ai.is_zero() {
            continue;
        }
        for (j, bj) in b.iter().enumerate() {
            out[i + j] = fp.add(&out[i + j], &fp.mul(ai, bj));
        }
    }
    out
}

/// Horner evaluation at `x`.
pub(crate) fn poly_eval(fp: &Fp, a: &[BigUint], x: &BigUint) -> BigUint {
    let mut acc = BigUint::zero();
    for c in a.iter().rev() {
        acc = fp.add(&fp.mul(&acc, x), c);
    }
    acc
}

/// `a mod m` for monic `m`.
pub(crate) fn poly_mod(fp: &Fp, a: &[BigUint], m: &[BigUint]) -> Vec<BigUint> {
    let deg_m = m.len() - 1;
    let mut rem = a.to_vec();
    while rem.len() - 1 >= deg_m && rem.len() > 1 {
        let lead = rem[rem.len() - 1].clone();
        if !lead.is_zero() {
            let off = rem.len() - 1 - deg_m;
            for i in 0..deg_m {
                rem[off + i] = fp.sub(&rem[off + i], &fp.mul(&lead, &m[i]));
            }
        }
        rem.pop();
    }
    while rem.len() > 1 && rem[rem.len() - 1].is_zero() {
        rem.pop();
    }
    rem
}

/// Monic `∏ (W − x)` over the given abscissas.
pub(crate) fn subproduct(fp: &Fp, xs: &[BigUint]) -> Vec<BigUint> {
    let mut out = vec![BigUint::one()];
    for x in xs {
        out = poly_mul(fp, &out, &[fp.neg(x), BigUint::one()]);
    }
    out
}

/// Evaluate `poly` at every abscissa via a remainder tree.
pub(crate) fn multieval(fp: &Fp, poly: &[BigUint], xs: &[BigUint]) -> Vec<BigUint> {
    if xs.len() <= 2 {
        return xs.iter().map(|x| poly_eval(fp, poly, x)).collect();
    }
    let (lo, hi) = xs.split_at(xs.len() / 2);
    let left = poly_mod(fp, poly, &subproduct(fp, lo));
    let right = poly_mod(fp, poly, &subproduct(fp, hi));
    let mut out = multieval(fp, &left, lo);
    out.extend(multieval(fp, &right, hi));
    out
}

#[cfg(test)]
mod tests {
    use num_bigint::RandBigInt as _;
    use num_traits::Zero as _;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;
    use crate::params::{Params, Prime};

    fn fp512() -> Fp {
        Fp::new(Params::new(Prime::P512).unwrap().p)
    }

    #[test]
    fn batch_inverse_matches_single() {
        let fp = fp512();
        let mut rng = StdRng::seed_from_u64(20);
        let xs: Vec<BigUint> = (0..7).map(|_| rng.gen_biguint_range(&BigUint::from(1u32), fp.p())).collect();
        let invs = batch_inv(&fp, &xs);
        for (x, ix) in xs.iter().zip(&invs) {
            assert_eq!(&fp.inv(x), ix);
        }
    }

    #[test]
    fn subproduct_vanishes_on_roots() {
        let fp = fp512();
        let mut rng = StdRng::seed_from_u64(21);
        let xs: Vec<BigUint> = (0..5).map(|_| rng.gen_biguint_below(fp.p())).collect();
        let tree = subproduct(&fp, &xs);
        for x in &xs {
            assert!(poly_eval(&fp, &tree, x).is_zero());
        }
    }

    #[test]
    fn remainder_tree_agrees_with_horner() {
        let fp = fp512();
        let mut rng = StdRng::seed_from_u64(22);
        let poly: Vec<BigUint> = (0..9).map(|_| rng.gen_biguint_below(fp.p())).collect();
        let xs: Vec<BigUint> = (0..6).map(|_| rng.gen_biguint_below(fp.p())).collect();
        let batched = multieval(&fp, &poly, &xs);
        for (x, v) in xs.iter().zip(&batched) {
            assert_eq!(&poly_eval(&fp, &poly, x), v);
        }
    }

    #[test]
    fn poly_mod_is_remainder() {
        let fp = fp512();
        let mut rng = StdRng::seed_from_u64(23);
        let a: Vec<BigUint> = (0..8).map(|_| rng.gen_biguint_below(fp.p())).collect();
        let roots: Vec<BigUint> = (0..3).map(|_| rng.gen_biguint_below(fp.p())).collect();
        let m = subproduct(&fp, &roots);
        let r = poly_mod(&fp, &a, &m);
        assert!(r.len() < m.len());
        for x in &roots {
            assert_eq!(poly_eval(&fp, &a, x), poly_eval(&fp, &r, x));
        }
    }
}
