//! The class-group action engine.
//!
//! A secret key is an exponent vector `e ∈ ℤⁿ`; the action applies
//! `∏ 𝔩ᵢ^{eᵢ}` to a starting curve by walking `m` rounds. Every round
//! samples a full-odd-order generator pair `(T⁺, T⁻)` (curve and twist
//! side), then tears it down along a precomputed strategy tree: internal
//! nodes multiply the working pair into one subrange of primes, leaves
//! hold a kernel of exact order `ℓᵢ` and apply one isogeny step.
//!
//! The walk's *shape* is fixed by `(prime, style, m)` alone: every round
//! visits every index, direction and dummy choices are folded in with
//! `cswap` selection rather than branches, and each leaf performs the same
//! operation pattern regardless of the key. Sampling runs with counters
//! paused, so the op counts of an action are key-independent.
//!
//! Walking styles:
//!
//! - `df` — dummy-free: `eᵢ ≡ m (mod 2)`, bookkept as
//!   `(pos, neg) = ((m+eᵢ)/2, (m−eᵢ)/2)`; every leaf is a real isogeny,
//!   opposite directions cancel.
//! - `wd1` — one direction: `eᵢ ∈ [0, m]`, twist torsion skipped, spent
//!   coordinates masked by dummy steps.
//! - `wd2` — two directions: `eᵢ ∈ [−m, m]`, sign picks the torsion side,
//!   dummies mask exhausted coordinates.

use rand::{CryptoRng, Rng as _, RngCore};
use subtle::Choice;

use crate::error::CsidhError;
use crate::isogeny::Formula;
use crate::montgomery::{Coeff, MontgomeryCurve, Point};

/// Walking style of the group action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    /// Dummy-free, two-direction walk.
    Df,
    /// One-direction walk with dummies.
    Wd1,
    /// Two-direction walk with dummies.
    Wd2,
}

impl Style {
    /// Short label, matching the parameter-table keys.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Df => "df",
            Self::Wd1 => "wd1",
            Self::Wd2 => "wd2",
        }
    }

    const fn needs_twist(self) -> bool {
        match self {
            Self::Df | Self::Wd2 => true,
            Self::Wd1 => false,
        }
    }

    /// Is `e` inside this style's per-coordinate domain for bound `m`?
    #[must_use]
    pub fn admits(self, e: i8, m: u32) -> bool {
        let bound = i32::try_from(m).unwrap_or(i32::MAX);
        let v = i32::from(e);
        match self {
            Self::Wd1 => (0..=bound).contains(&v),
            Self::Wd2 => (-bound..=bound).contains(&v),
            Self::Df => (-bound..=bound).contains(&v) && (bound - v) % 2 == 0,
        }
    }
}

/// Per-round direction bookkeeping.
struct Ledger {
    pos: Vec<u32>,
    neg: Vec<u32>,
}

impl Ledger {
    /// Consume one unit at index `i`: positive first, then negative,
    /// else a dummy. Branch-free arithmetic on the counters.
    fn consume(&mut self, i: usize) -> LeafPlan {
        let pos = self.pos[i];
        let neg = self.neg[i];
        let take_pos = u32::from(pos > 0);
        let take_neg = u32::from(pos == 0 && neg > 0);
        self.pos[i] = pos - take_pos;
        self.neg[i] = neg - take_neg;
        LeafPlan {
            side: u8::try_from(take_neg).unwrap_or(0),
            dummy: u8::from(take_pos + take_neg == 0),
        }
    }
}

/// Outcome of the leaf-step selection for one index.
struct LeafPlan {
    /// Twist side consumed (1 = negative direction).
    side: u8,
    /// Discard the step (never set for `df`).
    dummy: u8,
}

/// The strategy-driven group action for one `(prime, formula, style)`.
#[derive(Clone, Debug)]
pub struct GroupAction {
    style: Style,
    m: u32,
    formula: Formula,
    strategy: Vec<usize>,
}

impl GroupAction {
    /// Build the engine: resolves the balanced-traversal strategy from
    /// the per-prime cost measures.
    #[must_use]
    pub fn new(curve: &MontgomeryCurve, formula: Formula, style: Style, m: u32) -> Self {
        let strategy = compute_strategy(curve, &formula);
        Self { style, m, formula, strategy }
    }

    /// The engine's style.
    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// The per-coordinate exponent bound.
    #[must_use]
    pub const fn exponent_bound(&self) -> u32 {
        self.m
    }

    /// The strategy split sequence (read-only, for inspection).
    #[must_use]
    pub fn strategy(&self) -> &[usize] {
        &self.strategy
    }

    /// Sample a secret exponent vector in the style's domain.
    pub fn random_key(&self, curve: &MontgomeryCurve, rng: &mut (impl RngCore + CryptoRng)) -> Vec<i8> {
        let n = curve.params().n;
        let m = i32::try_from(self.m).unwrap_or(i32::MAX);
        (0..n)
            .map(|_| {
                let v = match self.style {
                    Style::Wd1 => rng.gen_range(0..=m),
                    Style::Wd2 => rng.gen_range(-m..=m),
                    // balanced parity sampling: e = m - 2t, t uniform
                    Style::Df => m - 2 * rng.gen_range(0..=m),
                };
                i8::try_from(v).unwrap_or(0)
            })
            .collect()
    }

    fn ledger(&self, e: &[i8]) -> Ledger {
        let m = i32::try_from(self.m).unwrap_or(i32::MAX);
        let split = |v: i8| -> (u32, u32) {
            let v = i32::from(v);
            let (p, n) = match self.style {
                Style::Wd1 => (v, 0),
                Style::Wd2 => (v.max(0), (-v).max(0)),
                Style::Df => ((m + v) / 2, (m - v) / 2),
            };
            (u32::try_from(p).unwrap_or(0), u32::try_from(n).unwrap_or(0))
        };
        let (pos, neg): (Vec<u32>, Vec<u32>) = e.iter().map(|&v| split(v)).unzip();
        Ledger { pos, neg }
    }

    /// Apply the action indexed by `e` to the curve `a`.
    ///
    /// The result is a pure function of `(e, a)`; the randomness only
    /// steers which torsion generators witness the walk.
    pub fn action(
        &self,
        curve: &MontgomeryCurve,
        rng: &mut (impl RngCore + CryptoRng),
        e: &[i8],
        a: &Coeff,
    ) -> Result<Coeff, CsidhError> {
        let n = curve.params().n;
        if e.len() != n {
            return Err(CsidhError::InvalidSecretKey);
        }
        let mut ledger = self.ledger(e);
        let mut current = a.clone();
        for _round in 0..self.m {
            let (tp, tm) = curve.full_torsion_points(rng, &current, self.style.needs_twist());
            let pair = if self.style.needs_twist() { vec![tp, tm] } else { vec![tp] };
            let mut cursor = 0;
            let (next, leftover) =
                self.traverse(curve, current, pair, 0, n, Vec::new(), &mut cursor, &mut ledger)?;
            if cursor != self.strategy.len() || !leftover.is_empty() {
                return Err(CsidhError::InternalInvariant("strategy traversal out of step"));
            }
            current = next;
        }
        Ok(current)
    }

    /// The public curve of `e`: the action applied to the starting curve.
    pub fn pubkey(
        &self,
        curve: &MontgomeryCurve,
        rng: &mut (impl RngCore + CryptoRng),
        e: &[i8],
    ) -> Result<Coeff, CsidhError> {
        self.action(curve, rng, e, &curve.base())
    }

    /// Validate the peer curve, then apply the action to it.
    pub fn dh(
        &self,
        curve: &MontgomeryCurve,
        rng: &mut (impl RngCore + CryptoRng),
        e: &[i8],
        peer: &Coeff,
    ) -> Result<Coeff, CsidhError> {
        if !curve.validate(rng, peer) {
            return Err(CsidhError::InvalidPublicKey);
        }
        self.action(curve, rng, e, peer)
    }

    /// Strategy-tree descent over the index range `[lo, hi)`.
    ///
    /// `pair` has odd order exactly `∏_{i ∈ [lo, hi)} ℓᵢ` on both of its
    /// sides; `carried` points are pushed through every leaf isogeny and
    /// returned transformed.
    #[expect(clippy::too_many_arguments, reason = "explicit walk state beats a state struct here")]
    fn traverse(
        &self,
        curve: &MontgomeryCurve,
        a: Coeff,
        pair: Vec<Point>,
        lo: usize,
        hi: usize,
        carried: Vec<Vec<Point>>,
        cursor: &mut usize,
        ledger: &mut Ledger,
    ) -> Result<(Coeff, Vec<Vec<Point>>), CsidhError> {
        if hi - lo == 1 {
            return self.leaf(curve, a, pair, lo, carried, ledger);
        }
        let split = *self
            .strategy
            .get(*cursor)
            .ok_or(CsidhError::InternalInvariant("strategy sequence exhausted"))?;
        *cursor += 1;
        if split == 0 || split >= hi - lo {
            return Err(CsidhError::InternalInvariant("strategy split out of range"));
        }
        // Multiply the right-hand primes away to isolate the left range.
        let mut left_pair = pair.clone();
        for j in lo + split..hi {
            left_pair = left_pair.iter().map(|pt| curve.xmul(pt, &a, j)).collect();
        }
        let mut stacked = carried;
        stacked.push(pair);
        let (mid_curve, mut moved) =
            self.traverse(curve, a, left_pair, lo, lo + split, stacked, cursor, ledger)?;
        let right_pair = moved
            .pop()
            .ok_or(CsidhError::InternalInvariant("carried stack underflow"))?;
        self.traverse(curve, mid_curve, right_pair, lo + split, hi, moved, cursor, ledger)
    }

    /// One isogeny step at index `i`.
    ///
    /// Real steps push every carried coordinate through the isogeny and
    /// additionally multiply the *opposite-side* coordinate by `ℓᵢ` (its
    /// `ℓᵢ`-part meets the kernel trivially, so evaluation alone does not
    /// consume it). Dummy steps keep the curve and multiply every
    /// coordinate by `ℓᵢ`. Candidates for both outcomes are computed and
    /// merged by `cswap`, so the operation pattern never depends on the
    /// key.
    fn leaf(
        &self,
        curve: &MontgomeryCurve,
        a: Coeff,
        pair: Vec<Point>,
        i: usize,
        carried: Vec<Vec<Point>>,
        ledger: &mut Ledger,
    ) -> Result<(Coeff, Vec<Vec<Point>>), CsidhError> {
        let fp = curve.fp();
        let plan = ledger.consume(i);
        let side = Choice::from(plan.side);
        let dummy = Choice::from(plan.dummy);

        // Select the kernel side.
        let mut kernel = pair[0].clone();
        if pair.len() == 2 {
            let mut other = pair[1].clone();
            fp.cswap(&mut kernel.x, &mut other.x, side);
            fp.cswap(&mut kernel.z, &mut other.z, side);
        }
        if MontgomeryCurve::isinfinity(&kernel) {
            return Err(CsidhError::InternalInvariant("isogeny kernel of unexpected order"));
        }

        let kernel_data = self.formula.kps(curve, i, &kernel, &a);
        let mut next = self.formula.xisog(curve, &kernel_data, &a, i);

        let masked = self.style != Style::Df;
        let mut out = Vec::with_capacity(carried.len());
        for coords in carried {
            let mut imgs: Vec<Point> = coords
                .iter()
                .map(|pt| self.formula.xeval(curve, &kernel_data, pt))
                .collect();
            if imgs.len() == 2 {
                // The opposite-side coordinate keeps its l_i part across
                // the isogeny; clear it on the image curve.
                let (head, tail) = imgs.split_at_mut(1);
                fp.cswap(&mut head[0].x, &mut tail[0].x, side);
                fp.cswap(&mut head[0].z, &mut tail[0].z, side);
                tail[0] = curve.xmul(&tail[0], &next, i);
                fp.cswap(&mut head[0].x, &mut tail[0].x, side);
                fp.cswap(&mut head[0].z, &mut tail[0].z, side);
            }
            if masked {
                // Dummy candidate: same coordinates multiplied by l_i on
                // the unchanged curve; merged by cswap.
                for (img, pt) in imgs.iter_mut().zip(&coords) {
                    let mut alt = curve.xmul(pt, &a, i);
                    fp.cswap(&mut img.x, &mut alt.x, dummy);
                    fp.cswap(&mut img.z, &mut alt.z, dummy);
                }
            }
            out.push(imgs);
        }
        if masked {
            let mut alt = a;
            fp.cswap(&mut next.a, &mut alt.a, dummy);
            fp.cswap(&mut next.c, &mut alt.c, dummy);
        }
        Ok((next, out))
    }
}

/// Multiplication measure of `xMUL` by `L[j]`: `6·(chain length + 2)`.
fn xmul_measure(curve: &MontgomeryCurve, j: usize) -> u64 {
    6 * (u64::try_from(curve.sdacs().len_of(j)).unwrap_or(0) + 2)
}

/// Optimal balanced-traversal splits, pre-order, `n − 1` entries.
///
/// Classical dynamic program over contiguous index ranges: splitting
/// `[lo, hi)` at `h` costs the two sub-solutions, plus multiplying the
/// working pair by the right-hand primes, plus dragging one extra carried
/// point through the left-hand leaves.
fn compute_strategy(curve: &MontgomeryCurve, formula: &Formula) -> Vec<usize> {
    let n = curve.params().n;
    let pmul: Vec<u64> = (0..n).map(|j| xmul_measure(curve, j)).collect();
    let qeval: Vec<u64> = (0..n).map(|j| formula.eval_measure(curve, j)).collect();
    let prefix = |v: &[u64]| -> Vec<u64> {
        let mut acc = vec![0u64];
        for x in v {
            acc.push(acc[acc.len() - 1] + x);
        }
        acc
    };
    let pm = prefix(&pmul);
    let qe = prefix(&qeval);

    // cost[lo][len], split[lo][len]; len >= 1
    let mut cost = vec![vec![0u64; n + 1]; n];
    let mut split = vec![vec![0usize; n + 1]; n];
    for len in 2..=n {
        for lo in 0..=n - len {
            let mut best = u64::MAX;
            let mut best_h = 1;
            for h in 1..len {
                let c = cost[lo][h]
                    + cost[lo + h][len - h]
                    + (pm[lo + len] - pm[lo + h])
                    + (qe[lo + h] - qe[lo]);
                if c < best {
                    best = c;
                    best_h = h;
                }
            }
            cost[lo][len] = best;
            split[lo][len] = best_h;
        }
    }

    let mut out = Vec::with_capacity(n - 1);
    let mut stack = vec![(0usize, n)];
    while let Some((lo, len)) = stack.pop() {
        if len == 1 {
            continue;
        }
        let h = split[lo][len];
        out.push(h);
        // pre-order: left subtree fully before the right one
        stack.push((lo + h, len - h));
        stack.push((lo, h));
    }
    out
}
