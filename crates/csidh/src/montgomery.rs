//! x-only Montgomery curve machinery.
//!
//! Curves are `C·y² = x³ + A·x² + x`, carried projectively as
//! `(A24 : C24) = (A + 2C : 4C)`; points are x-lines `(X : Z)` with
//! infinity at `Z = 0`. All walk arithmetic is x-only, which makes every
//! operation here agnostic to whether a point lives on the curve or its
//! quadratic twist; the group action exploits exactly that.
//!
//! `elligator`, `full_torsion_points` and `validate` branch on fresh public
//! randomness (never on key material) and run with the operation counters
//! paused; their retry counts are independent of any secret.

use num_bigint::{BigUint, RandBigInt as _};
use num_traits::{One as _, Zero as _};
use rand::{CryptoRng, RngCore};
use subtle::Choice;

use crate::fp::Fp;
use crate::params::Params;
use crate::sdac::SdacTable;

/// A projective x-line `(X : Z)`. Infinity is any `(X : 0)`.
#[derive(Clone, Debug)]
pub struct Point {
    /// Numerator.
    pub x: BigUint,
    /// Denominator; zero at infinity.
    pub z: BigUint,
}

impl Point {
    /// The point used as the "no twist torsion" sentinel for `wd1`.
    #[must_use]
    pub fn one() -> Self {
        Self { x: BigUint::one(), z: BigUint::one() }
    }
}

/// Projective curve constant `(A24 : C24)` with `A24 = A + 2C`, `C24 = 4C`.
#[derive(Clone, Debug)]
pub struct Coeff {
    /// `A + 2C`.
    pub a: BigUint,
    /// `4C`.
    pub c: BigUint,
}

/// The Montgomery-curve engine for one prime: field context, parameter
/// table and addition-chain table, plus every pure curve operation the
/// walk needs.
#[derive(Debug)]
pub struct MontgomeryCurve {
    fp: Fp,
    params: Params,
    sdacs: SdacTable,
}

impl MontgomeryCurve {
    /// Assemble the engine from its loaded tables.
    #[must_use]
    pub fn new(params: Params, sdacs: SdacTable) -> Self {
        Self { fp: Fp::new(params.p.clone()), params, sdacs }
    }

    /// The field context.
    #[must_use]
    pub const fn fp(&self) -> &Fp {
        &self.fp
    }

    /// The parameter table.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// The chain table.
    #[must_use]
    pub const fn sdacs(&self) -> &SdacTable {
        &self.sdacs
    }

    /// The starting curve `A = 0, C = 1`, i.e. `(A24 : C24) = (2 : 4)`.
    #[must_use]
    pub fn base(&self) -> Coeff {
        Coeff { a: BigUint::from(2u32), c: BigUint::from(4u32) }
    }

    /// Lift an affine coefficient `a = A/C` to `(A24 : C24)` with `C = 1`.
    #[must_use]
    pub fn affine_to_projective(&self, affine: &BigUint) -> Coeff {
        Coeff {
            a: self.fp.add(affine, &BigUint::from(2u32)),
            c: BigUint::from(4u32),
        }
    }

    /// Recover the affine coefficient `A/C = 2·(2·A24 − C24) / C24`.
    #[must_use]
    pub fn coeff(&self, a: &Coeff) -> BigUint {
        let mut out = self.fp.add(&a.a, &a.a);
        out = self.fp.sub(&out, &a.c);
        let c_inv = self.fp.inv(&a.c);
        out = self.fp.add(&out, &out);
        self.fp.mul(&out, &c_inv)
    }

    /// `x(P) = (1 : 0)`?
    #[must_use]
    pub fn isinfinity(p: &Point) -> bool {
        p.z.is_zero()
    }

    /// `x(P) = x(Q)` by cross-product.
    #[must_use]
    pub fn areequal(&self, p: &Point, q: &Point) -> bool {
        self.fp.mul(&p.x, &q.z) == self.fp.mul(&p.z, &q.x)
    }

    /// `(αδ + βγ, αδ − βγ)` — the shared kernel of the Vélu evaluation
    /// products.
    #[must_use]
    pub fn criss_cross(
        &self,
        alpha: &BigUint,
        beta: &BigUint,
        gamma: &BigUint,
        delta: &BigUint,
    ) -> (BigUint, BigUint) {
        let t1 = self.fp.mul(alpha, delta);
        let t2 = self.fp.mul(beta, gamma);
        (self.fp.add(&t1, &t2), self.fp.sub(&t1, &t2))
    }

    /// Projective doubling `x([2]P)`. Costs `3M + 2S + 4a`.
    #[must_use]
    pub fn xdbl(&self, p: &Point, a: &Coeff) -> Point {
        let mut t0 = self.fp.sub(&p.x, &p.z);
        let mut t1 = self.fp.add(&p.x, &p.z);
        t0 = self.fp.sqr(&t0);
        t1 = self.fp.sqr(&t1);
        let mut z = self.fp.mul(&a.c, &t0);
        let x = self.fp.mul(&z, &t1);
        t1 = self.fp.sub(&t1, &t0);
        t0 = self.fp.mul(&a.a, &t1);
        z = self.fp.add(&z, &t0);
        z = self.fp.mul(&z, &t1);
        Point { x, z }
    }

    /// Differential addition `x(P + Q)` given `x(P − Q)`.
    #[must_use]
    pub fn xadd(&self, p: &Point, q: &Point, pq: &Point) -> Point {
        let mut t0 = self.fp.add(&p.x, &p.z);
        let mut t1 = self.fp.sub(&p.x, &p.z);
        let mut t2 = self.fp.add(&q.x, &q.z);
        let mut t3 = self.fp.sub(&q.x, &q.z);
        t0 = self.fp.mul(&t0, &t3);
        t1 = self.fp.mul(&t1, &t2);
        t2 = self.fp.add(&t0, &t1);
        t3 = self.fp.sub(&t0, &t1);
        t2 = self.fp.sqr(&t2);
        t3 = self.fp.sqr(&t3);
        Point { x: self.fp.mul(&pq.z, &t2), z: self.fp.mul(&pq.x, &t3) }
    }

    /// `x([L[j]]·P)` by the SDAC for `L[j]`.
    ///
    /// Starts from the window `R = [P, 2P, 3P]` and consumes the chain
    /// from its most significant step down; each step either
    /// differential-adds the chain-selected operands or doubles when the
    /// selected difference is infinity, then slides the window.
    #[must_use]
    pub fn xmul(&self, p: &Point, a: &Coeff, j: usize) -> Point {
        let p2 = self.xdbl(p, a);
        let p3 = self.xadd(&p2, p, p);
        let mut r = [p.clone(), p2, p3];
        let chain = self.sdacs.chain(j);
        for i in (0..chain.len()).rev() {
            let b = usize::from(chain[i]);
            let t = if Self::isinfinity(&r[b]) {
                self.xdbl(&r[2], a)
            } else {
                self.xadd(&r[2], &r[b ^ 1], &r[b])
            };
            let keep = r[b ^ 1].clone();
            let mid = r[2].clone();
            r = [keep, mid, t];
        }
        let [_, _, out] = r;
        out
    }

    /// Elligator 2: map fresh randomness `u ∈ [2, (p−1)/2]` to a pair of
    /// points `(T⁺, T⁻)` with `T⁺` on `E_A` and `T⁻` on its twist.
    ///
    /// Branches only on the public sample (the Jacobi symbol reveals the
    /// twist assignment of `u`, nothing else); counters are paused.
    #[must_use]
    pub fn elligator(&self, rng: &mut (impl RngCore + CryptoRng), a: &Coeff) -> (Point, Point) {
        self.fp.pause_counts();
        let out = self.elligator_inner(rng, a);
        self.fp.resume_counts();
        out
    }

    fn elligator_inner(&self, rng: &mut (impl RngCore + CryptoRng), a: &Coeff) -> (Point, Point) {
        let fp = &self.fp;
        // (Ap : Cp) is the affine-scaled pair (A : C) = (4·A24 − 2·C24 : C24).
        let mut ap = fp.add(&a.a, &a.a);
        ap = fp.sub(&ap, &a.c);
        ap = fp.add(&ap, &ap);
        let cp = a.c.clone();

        let two = BigUint::from(2u32);
        let top = fp.p_minus_one_half() + 1u32;
        let u = rng.gen_biguint_range(&two, &top);
        let u_sqr = fp.sqr(&u);
        let mut u_sqr_plus_one = fp.add(&u_sqr, &BigUint::one());
        let u_sqr_minus_one = fp.sub(&u_sqr, &BigUint::one());

        let c_times = fp.mul(&cp, &u_sqr_minus_one);
        let ac_times = fp.mul(&ap, &c_times);

        let mut tmp = fp.sqr(&ap);
        tmp = fp.mul(&tmp, &u_sqr);
        let aux = fp.sqr(&c_times);
        tmp = fp.add(&tmp, &aux);
        tmp = fp.mul(&ac_times, &tmp);

        // Degenerate A = 0 branch: substitute alpha = u (public condition).
        let mut alpha = BigUint::zero();
        let mut beta = u;
        fp.cswap(&mut alpha, &mut beta, Choice::from(u8::from(tmp.is_zero())));
        u_sqr_plus_one = fp.mul(&alpha, &u_sqr_plus_one);
        alpha = fp.mul(&alpha, &c_times);

        let mut tp_x = fp.add(&ap, &alpha);
        let mut tm_x = fp.mul(&ap, &u_sqr);
        tm_x = fp.add(&tm_x, &alpha);
        tm_x = fp.neg(&tm_x);

        tmp = fp.add(&tmp, &u_sqr_plus_one);
        let needs_swap = fp.jacobi(&tmp) == -1;
        fp.cswap(&mut tp_x, &mut tm_x, Choice::from(u8::from(needs_swap)));

        (
            Point { x: tp_x, z: c_times.clone() },
            Point { x: tm_x, z: c_times },
        )
    }

    /// Split `P` into `|I|` points, the `k`-th of order dividing `L[I[k]]`,
    /// by divide-and-conquer cofactor multiplication.
    #[must_use]
    pub fn prime_factors(&self, p: &Point, a: &Coeff, idxs: &[usize]) -> Vec<Point> {
        if idxs.len() <= 1 {
            return idxs.iter().map(|_| p.clone()).collect();
        }
        let h = idxs.len() / 2;
        let (first, second) = idxs.split_at(h);
        let mut keep_second = p.clone();
        for &j in first {
            keep_second = self.xmul(&keep_second, a, j);
        }
        let mut keep_first = p.clone();
        for &j in second {
            keep_first = self.xmul(&keep_first, a, j);
        }
        let mut out = self.prime_factors(&keep_first, a, first);
        out.extend(self.prime_factors(&keep_second, a, second));
        out
    }

    fn has_full_odd_order(&self, p: &Point, a: &Coeff) -> bool {
        let idxs: Vec<usize> = (0..self.params.n).collect();
        self.prime_factors(p, a, &idxs)
            .iter()
            .all(|q| !Self::isinfinity(q))
    }

    /// Clear the `2^f` cofactor by `f` doublings.
    fn clear_two_part(&self, p: &Point, a: &Coeff) -> Point {
        let mut out = p.clone();
        for _ in 0..self.params.two_adicity {
            out = self.xdbl(&out, a);
        }
        out
    }

    /// Sample points of full odd order `∏L` on the curve and (unless
    /// `need_twist` is false) its twist. Retries are driven by public
    /// randomness only; an accepted side is kept while the other retries.
    #[must_use]
    pub fn full_torsion_points(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        a: &Coeff,
        need_twist: bool,
    ) -> (Point, Point) {
        self.fp.pause_counts();
        let mut plus: Option<Point> = None;
        let mut minus: Option<Point> = if need_twist { None } else { Some(Point::one()) };
        while plus.is_none() || minus.is_none() {
            let (tp, tm) = self.elligator_inner(rng, a);
            if plus.is_none() {
                let candidate = self.clear_two_part(&tp, a);
                if self.has_full_odd_order(&candidate, a) {
                    plus = Some(candidate);
                }
            }
            if need_twist && minus.is_none() {
                let candidate = self.clear_two_part(&tm, a);
                if self.has_full_odd_order(&candidate, a) {
                    minus = Some(candidate);
                }
            }
        }
        self.fp.resume_counts();
        // Both branches of the loop condition guarantee presence here.
        (plus.unwrap_or_else(Point::one), minus.unwrap_or_else(Point::one))
    }

    /// Galbraith–Petit–Silva-style public-key validation.
    ///
    /// Samples a point, clears the 2-power part, splits it per prime and
    /// accumulates proven order until it exceeds `validation_stop`
    /// (accept) or some per-prime part survives multiplication by its
    /// prime (reject: the group order cannot be `p + 1`).
    #[must_use]
    pub fn validate(&self, rng: &mut (impl RngCore + CryptoRng), a: &Coeff) -> bool {
        // Singular curves (affine A = ±2, i.e. A24 = 0 or A24 = C24) and
        // degenerate constants are rejected up front.
        if a.c.is_zero() || a.a.is_zero() || a.a == a.c {
            return false;
        }
        self.fp.pause_counts();
        let verdict = self.validate_inner(rng, a);
        self.fp.resume_counts();
        verdict
    }

    fn validate_inner(&self, rng: &mut (impl RngCore + CryptoRng), a: &Coeff) -> bool {
        let idxs: Vec<usize> = (0..self.params.n).collect();
        loop {
            let (sample, _) = self.elligator_inner(rng, a);
            let odd_part = self.clear_two_part(&sample, a);
            let split = self.prime_factors(&odd_part, a, &idxs);
            let mut order_bits = 0u64;
            for (i, part) in split.iter().enumerate() {
                if Self::isinfinity(part) {
                    continue;
                }
                if !Self::isinfinity(&self.xmul(part, a, i)) {
                    return false;
                }
                order_bits += u64::from(64 - self.params.l[i].leading_zeros());
                if order_bits > self.params.validation_stop {
                    return true;
                }
            }
        }
    }
}
