//! Traditional Vélu formulas, `O(ℓ)` in the degree.
//!
//! The kernel table holds the `(ℓ−1)/2` distinct x-lines of the kernel
//! subgroup. The codomain comes from the twisted-Edwards form: with
//! `a = A24` and `d = A24 − C24`,
//!
//! ```text
//! a' = a^ℓ · (∏ (Xᵢ + Zᵢ))⁸        d' = d^ℓ · (∏ (Xᵢ − Zᵢ))⁸
//! ```
//!
//! and `(A24', C24') = (a', a' − d')`. Point images use the criss-cross
//! product form of the Costello–Hisil evaluation.

use num_bigint::BigUint;
use num_traits::One as _;

use crate::montgomery::{Coeff, MontgomeryCurve, Point};

/// Kernel data: `[P, 2P, …, dP]` with `d = (ℓ−1)/2`.
#[derive(Clone, Debug)]
pub struct Kernel {
    multiples: Vec<Point>,
}

/// Precompute the kernel multiples for `ℓ = L[i]` at `P`.
#[must_use]
pub fn kps(curve: &MontgomeryCurve, i: usize, p: &Point, a: &Coeff) -> Kernel {
    let ell = curve.params().l[i];
    let d = usize::try_from((ell - 1) / 2).unwrap_or(0);
    let mut multiples = Vec::with_capacity(d);
    multiples.push(p.clone());
    if d >= 2 {
        multiples.push(curve.xdbl(p, a));
    }
    for j in 2..d {
        multiples.push(curve.xadd(&multiples[j - 1], p, &multiples[j - 2]));
    }
    Kernel { multiples }
}

/// Codomain constant of the degree-`L[i]` isogeny.
#[must_use]
pub fn xisog(curve: &MontgomeryCurve, kernel: &Kernel, a: &Coeff, i: usize) -> Coeff {
    let fp = curve.fp();
    let mut prod_plus = BigUint::one();
    let mut prod_minus = BigUint::one();
    for pt in &kernel.multiples {
        prod_plus = fp.mul(&prod_plus, &fp.add(&pt.x, &pt.z));
        prod_minus = fp.mul(&prod_minus, &fp.sub(&pt.x, &pt.z));
    }
    let ell = BigUint::from(curve.params().l[i]);
    let a_ed = a.a.clone();
    let d_ed = fp.sub(&a.a, &a.c);
    let a_pow = fp.exp(&a_ed, &ell);
    let d_pow = fp.exp(&d_ed, &ell);
    for _ in 0..3 {
        prod_plus = fp.sqr(&prod_plus);
        prod_minus = fp.sqr(&prod_minus);
    }
    let a_new = fp.mul(&a_pow, &prod_plus);
    let d_new = fp.mul(&d_pow, &prod_minus);
    Coeff { c: fp.sub(&a_new, &d_new), a: a_new }
}

/// Image of `P` under the isogeny prepared by [`kps`].
#[must_use]
pub fn xeval(curve: &MontgomeryCurve, kernel: &Kernel, p: &Point) -> Point {
    let fp = curve.fp();
    let s = fp.add(&p.x, &p.z);
    let t = fp.sub(&p.x, &p.z);
    let mut sum_prod = BigUint::one();
    let mut diff_prod = BigUint::one();
    for pt in &kernel.multiples {
        let hat_s = fp.add(&pt.x, &pt.z);
        let hat_d = fp.sub(&pt.x, &pt.z);
        let (sum, diff) = curve.criss_cross(&hat_d, &hat_s, &t, &s);
        sum_prod = fp.mul(&sum_prod, &sum);
        diff_prod = fp.mul(&diff_prod, &diff);
    }
    Point {
        x: fp.mul(&p.x, &fp.sqr(&sum_prod)),
        z: fp.mul(&p.z, &fp.sqr(&diff_prod)),
    }
}
