//! √élu formulas, `Õ(√ℓ)` in the degree.
//!
//! The odd kernel multiples `{1, 3, …, ℓ−2}·P` are covered by a
//! baby-step/giant-step decomposition: babies `J = {1, 3, …, 2b−1}`,
//! giants `I = {2b·(2i+1) : i < b'}` (so `I ± J` covers the odd interval
//! `[1, 4bb'−1]`), and a leftover set `K` of size
//! `((ℓ − 2 − 4bb' − 1) / 2) + 1` reached through the even chain via
//! `x([s]P) = x([ℓ−s]P)`.
//!
//! Everything the action needs from the kernel is a product of the shape
//! `∏ₛ (U − V·xₛ)` for `(U : V)` one of `(±1 : 1)`, `(X : Z)`, `(Z : X)`.
//! Over `I ± J` that product is a resultant: per baby `j` the biquadratic
//! group law packs `(α − x_{i+j})(α − x_{i−j})` into a quadratic `Q_j(W)`
//! in the giant abscissa with `(U, V)`-dependent coefficients, and
//!
//! ```text
//! ∏_{i,j} Q_j(x_i)  =  c · ∏_{s ∈ I±J} (U − V·xₛ)
//! ```
//!
//! with `c` independent of `(U, V)`. Each consumer takes a *ratio* of two
//! such products (curve: `(−1,1)` vs `(1,1)`; point: `(Z,X)` vs `(X,Z)`),
//! so `c` cancels projectively and never needs to be computed. The
//! `multievaluation` switch picks remainder-tree batched evaluation of
//! `E_J` at the giant abscissas instead of per-root Horner.

use num_bigint::BigUint;
use num_traits::One as _;

use super::poly;
use crate::montgomery::{Coeff, MontgomeryCurve, Point};

/// Index-set sizes `(sJ, sI, sK)` for degree `ℓ`.
#[must_use]
pub fn sizes(ell: u64) -> (usize, usize, usize) {
    let fallback = usize::try_from((ell - 1) / 2).unwrap_or(0);
    if ell < 5 {
        return (0, 0, fallback);
    }
    let b = ((ell - 1) / 4).isqrt();
    if b == 0 {
        return (0, 0, fallback);
    }
    let bp = (ell - 1) / (4 * b);
    // i64: the numerator can be exactly -2 (e.g. ell = 5); it is always
    // even, so truncating division agrees with floor division.
    let raw = (i64::try_from(ell).unwrap_or(i64::MAX) - 2 - i64::try_from(4 * b * bp).unwrap_or(0) - 1) / 2 + 1;
    (
        usize::try_from(b).unwrap_or(0),
        usize::try_from(bp).unwrap_or(0),
        usize::try_from(raw.max(0)).unwrap_or(0),
    )
}

/// Kernel data: affine abscissas of the baby, giant and leftover sets,
/// plus the affine curve coefficient the biquadratics need.
#[derive(Clone, Debug)]
pub struct Kernel {
    x_j: Vec<BigUint>,
    x_i: Vec<BigUint>,
    x_k: Vec<BigUint>,
    a_affine: BigUint,
}

/// Precompute the index-set abscissas for `ℓ = L[i]` at `P`.
///
/// Builds the needed odd/even differential chains, then converts every
/// abscissa to affine with one batched inversion.
#[must_use]
pub fn kps(curve: &MontgomeryCurve, i: usize, p: &Point, a: &Coeff) -> Kernel {
    let fp = curve.fp();
    let ell = curve.params().l[i];
    let (b, bp, sk) = sizes(ell);
    let p2 = curve.xdbl(p, a);

    // Odd multiples [1]P, [3]P, ...
    let odd_count = if b == 0 { sk } else { b };
    let mut odds: Vec<Point> = Vec::with_capacity(odd_count);
    odds.push(p.clone());
    if odd_count >= 2 {
        odds.push(curve.xadd(&p2, p, p));
    }
    for j in 2..odd_count {
        odds.push(curve.xadd(&odds[j - 1], &p2, &odds[j - 2]));
    }

    let (j_pts, i_pts, k_pts) = if b == 0 {
        (Vec::new(), Vec::new(), odds)
    } else {
        // Even multiples [2]P, [4]P, ...: the leftover set K is the top
        // odd interval reflected through x([s]P) = x([l-s]P), plus the
        // giant stride [2b]P.
        let even_count = b.max(sk);
        let mut evens: Vec<Point> = Vec::with_capacity(even_count);
        evens.push(p2.clone());
        if even_count >= 2 {
            evens.push(curve.xdbl(&p2, a));
        }
        for j in 2..even_count {
            evens.push(curve.xadd(&evens[j - 1], &p2, &evens[j - 2]));
        }
        let k_pts: Vec<Point> = evens[..sk].to_vec();

        let c2b = evens[b - 1].clone();
        let c4b = curve.xdbl(&c2b, a);
        let mut giants: Vec<Point> = Vec::with_capacity(bp);
        giants.push(c2b.clone());
        if bp >= 2 {
            giants.push(curve.xadd(&c4b, &c2b, &c2b));
        }
        for k in 2..bp {
            giants.push(curve.xadd(&giants[k - 1], &c4b, &giants[k - 2]));
        }
        (odds, giants, k_pts)
    };

    // One inversion for every abscissa plus the curve constant.
    let mut zs: Vec<BigUint> = Vec::new();
    for pt in j_pts.iter().chain(&i_pts).chain(&k_pts) {
        zs.push(pt.z.clone());
    }
    zs.push(a.c.clone());
    let invs = poly::batch_inv(fp, &zs);

    let affine = |pts: &[Point], offset: usize| -> Vec<BigUint> {
        pts.iter()
            .enumerate()
            .map(|(k, pt)| fp.mul(&pt.x, &invs[offset + k]))
            .collect()
    };
    let x_j = affine(&j_pts, 0);
    let x_i = affine(&i_pts, j_pts.len());
    let x_k = affine(&k_pts, j_pts.len() + i_pts.len());

    // affine A = (4*A24 - 2*C24) / C24
    let mut four_a24 = fp.add(&a.a, &a.a);
    four_a24 = fp.add(&four_a24, &four_a24);
    let two_c24 = fp.add(&a.c, &a.c);
    let a_affine = fp.mul(&fp.sub(&four_a24, &two_c24), &invs[zs.len() - 1]);

    Kernel { x_j, x_i, x_k, a_affine }
}

/// `E_J(W; U, V) = ∏ⱼ Qⱼ(W)`, ascending coefficients in the giant
/// abscissa `W`; degree `2·sJ`.
fn ej_poly(curve: &MontgomeryCurve, kernel: &Kernel, u: &BigUint, v: &BigUint) -> Vec<BigUint> {
    let fp = curve.fp();
    let u_sqr = fp.sqr(u);
    let v_sqr = fp.sqr(v);
    let mut uv2 = fp.mul(u, v);
    uv2 = fp.add(&uv2, &uv2);
    let two_a = fp.add(&kernel.a_affine, &kernel.a_affine);
    let mut out = vec![BigUint::one()];
    for xj in &kernel.x_j {
        let xj2 = fp.sqr(xj);
        let xj_twice = fp.add(xj, xj);
        // W^2: (U - V*xj)^2
        let c2 = fp.sub(&fp.add(&u_sqr, &fp.mul(&v_sqr, &xj2)), &fp.mul(&uv2, xj));
        // W^1: -2*xj*(U^2 + V^2) - 2UV*(xj^2 + 1 + 2*A*xj)
        let mid = fp.add(&fp.add(&xj2, &BigUint::one()), &fp.mul(&two_a, xj));
        let c1 = fp.neg(&fp.add(
            &fp.mul(&xj_twice, &fp.add(&u_sqr, &v_sqr)),
            &fp.mul(&uv2, &mid),
        ));
        // W^0: (U*xj - V)^2
        let c0 = fp.sub(&fp.add(&fp.mul(&u_sqr, &xj2), &v_sqr), &fp.mul(&uv2, xj));
        out = poly::poly_mul(fp, &out, &[c0, c1, c2]);
    }
    out
}

/// `∏ₛ (U − V·xₛ)` over all odd kernel multiples, up to the
/// `(U, V)`-independent constant shared by every call site.
fn h_s(
    curve: &MontgomeryCurve,
    kernel: &Kernel,
    u: &BigUint,
    v: &BigUint,
    multievaluation: bool,
) -> BigUint {
    let fp = curve.fp();
    let mut acc = BigUint::one();
    if !kernel.x_i.is_empty() {
        let ej = ej_poly(curve, kernel, u, v);
        let values = if multievaluation && kernel.x_i.len() > 1 {
            poly::multieval(fp, &ej, &kernel.x_i)
        } else {
            kernel.x_i.iter().map(|xi| poly::poly_eval(fp, &ej, xi)).collect()
        };
        for value in &values {
            acc = fp.mul(&acc, value);
        }
    }
    for xk in &kernel.x_k {
        acc = fp.mul(&acc, &fp.sub(u, &fp.mul(v, xk)));
    }
    acc
}

/// Codomain constant: `a' = A24^ℓ · h(−1)⁸`, `d' = (A24−C24)^ℓ · h(1)⁸`,
/// `(A24', C24') = (a', a' − d')`.
#[must_use]
pub fn xisog(
    curve: &MontgomeryCurve,
    kernel: &Kernel,
    a: &Coeff,
    i: usize,
    multievaluation: bool,
) -> Coeff {
    let fp = curve.fp();
    let one = BigUint::one();
    let minus_one = fp.neg(&one);
    let mut h_one = h_s(curve, kernel, &one, &one, multievaluation);
    let mut h_minus = h_s(curve, kernel, &minus_one, &one, multievaluation);
    let ell = BigUint::from(curve.params().l[i]);
    let a_pow = fp.exp(&a.a, &ell);
    let d_pow = fp.exp(&fp.sub(&a.a, &a.c), &ell);
    for _ in 0..3 {
        h_one = fp.sqr(&h_one);
        h_minus = fp.sqr(&h_minus);
    }
    let a_new = fp.mul(&a_pow, &h_minus);
    let d_new = fp.mul(&d_pow, &h_one);
    Coeff { c: fp.sub(&a_new, &d_new), a: a_new }
}

/// Image of `P`: `X' = X·h(Z,X)²`, `Z' = Z·h(X,Z)²`.
#[must_use]
pub fn xeval(
    curve: &MontgomeryCurve,
    kernel: &Kernel,
    p: &Point,
    multievaluation: bool,
) -> Point {
    let fp = curve.fp();
    let e1 = h_s(curve, kernel, &p.z, &p.x, multievaluation);
    let e0 = h_s(curve, kernel, &p.x, &p.z, multievaluation);
    Point {
        x: fp.mul(&p.x, &fp.sqr(&e1)),
        z: fp.mul(&p.z, &fp.sqr(&e0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_sets_partition_the_odd_interval() {
        for ell in [3u64, 5, 7, 11, 89, 97, 113, 373, 587, 983] {
            let (b, bp, sk) = sizes(ell);
            // |I +- J| + |K| covers each odd multiple once
            assert_eq!(2 * b * bp + sk, usize::try_from((ell - 1) / 2).unwrap(), "degree {ell}");
            if b > 0 {
                assert!(b <= bp, "baby set never exceeds giant set for {ell}");
            }
        }
    }
}
