//! Prime-field arithmetic context.
//!
//! All operations return canonical residues in `[0, p)`. The backend is
//! arbitrary-precision (`num-bigint`), which is correct for every supported
//! prime width but is a *reference* backend: it is not constant-time at the
//! limb level. The algorithm layer above compensates by keeping operation
//! *sequences* independent of secret data, with [`Fp::cswap`] as the
//! selection primitive; a fixed-width Montgomery-reduction backend can
//! replace this module behind the same interface.
//!
//! Operation counters (`M`, `S`, `a`) are instrumentation only. They are
//! plain `Cell` stores (uniform cost), are never secret-dependent in
//! *value* on the walk path, and are paused wholesale on the
//! public-randomness sampling paths so a walk's counts depend only on the
//! parameter set.

use core::cell::Cell;
use core::mem;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One as _, Zero as _};
use subtle::Choice;

/// Snapshot of the field-operation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpCounts {
    /// Multiplications (`M`).
    pub mul: u64,
    /// Squarings (`S`).
    pub sqr: u64,
    /// Additions and subtractions (`a`).
    pub add: u64,
}

/// Arithmetic context for one prime field.
#[derive(Debug)]
pub struct Fp {
    p: BigUint,
    p_minus_one_half: BigUint,
    mul_count: Cell<u64>,
    sqr_count: Cell<u64>,
    add_count: Cell<u64>,
    pause_depth: Cell<u32>,
}

impl Fp {
    /// Build a context for characteristic `p`.
    #[must_use]
    pub fn new(p: BigUint) -> Self {
        let p_minus_one_half = (&p - 1u32) >> 1;
        Self {
            p,
            p_minus_one_half,
            mul_count: Cell::new(0),
            sqr_count: Cell::new(0),
            add_count: Cell::new(0),
            pause_depth: Cell::new(0),
        }
    }

    /// The field characteristic.
    #[must_use]
    pub const fn p(&self) -> &BigUint {
        &self.p
    }

    /// `(p − 1) / 2`, the top of the Elligator sampling range.
    #[must_use]
    pub const fn p_minus_one_half(&self) -> &BigUint {
        &self.p_minus_one_half
    }

    fn tick(&self, cell: &Cell<u64>) {
        // Uniform-cost store; no branch on secret data (the pause depth
        // only changes on public sampling paths).
        if self.pause_depth.get() == 0 {
            cell.set(cell.get() + 1);
        }
    }

    /// Read the counters.
    #[must_use]
    pub fn counts(&self) -> OpCounts {
        OpCounts {
            mul: self.mul_count.get(),
            sqr: self.sqr_count.get(),
            add: self.add_count.get(),
        }
    }

    /// Zero the counters.
    pub fn reset_counts(&self) {
        self.mul_count.set(0);
        self.sqr_count.set(0);
        self.add_count.set(0);
    }

    /// Suspend counting (nestable). Used by the sampling and validation
    /// paths, whose retry count depends on public randomness only.
    pub fn pause_counts(&self) {
        self.pause_depth.set(self.pause_depth.get() + 1);
    }

    /// Resume counting after [`Self::pause_counts`].
    pub fn resume_counts(&self) {
        self.pause_depth.set(self.pause_depth.get().saturating_sub(1));
    }

    /// `a + b mod p`.
    #[must_use]
    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.tick(&self.add_count);
        (a + b) % &self.p
    }

    /// `a − b mod p`.
    #[must_use]
    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.tick(&self.add_count);
        ((&self.p + a) - b) % &self.p
    }

    /// `−a mod p`.
    #[must_use]
    pub fn neg(&self, a: &BigUint) -> BigUint {
        self.tick(&self.add_count);
        (&self.p - a) % &self.p
    }

    /// `a · b mod p`.
    #[must_use]
    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.tick(&self.mul_count);
        (a * b) % &self.p
    }

    /// `a² mod p`.
    #[must_use]
    pub fn sqr(&self, a: &BigUint) -> BigUint {
        self.tick(&self.sqr_count);
        (a * a) % &self.p
    }

    /// `a⁻¹ mod p` by extended GCD. `a` must be nonzero (guaranteed by
    /// callers: inversions happen on curve constants and batched kernel
    /// denominators, all nonzero for points off infinity).
    #[must_use]
    pub fn inv(&self, a: &BigUint) -> BigUint {
        let mut last_rem = BigInt::from(a.clone());
        let mut rem = BigInt::from(self.p.clone());
        let mut x = BigInt::zero();
        let mut last_x = BigInt::one();
        while !rem.is_zero() {
            let q = &last_rem / &rem;
            let next_rem = &last_rem - &q * &rem;
            last_rem = mem::replace(&mut rem, next_rem);
            let next_x = &last_x - &q * &x;
            last_x = mem::replace(&mut x, next_x);
        }
        let p_int = BigInt::from(self.p.clone());
        let mut r = last_x % &p_int;
        if r.sign() == Sign::Minus {
            r += &p_int;
        }
        r.magnitude().clone()
    }

    /// `a^e mod p`, left-to-right square-and-multiply.
    ///
    /// The loop length depends only on the bit length of `e`; within the
    /// walk `e` is always a public small prime.
    #[must_use]
    pub fn exp(&self, a: &BigUint, e: &BigUint) -> BigUint {
        if e.is_zero() {
            return BigUint::one();
        }
        let bits = e.bits();
        let mut acc = a.clone();
        for j in (0..bits - 1).rev() {
            acc = self.sqr(&acc);
            if e.bit(j) {
                acc = self.mul(&acc, a);
            }
        }
        acc
    }

    /// Swap `x` and `y` iff `swap` is set, by mask arithmetic rather than
    /// a data-dependent branch. (With the bignum backend the *values*
    /// still steer allocation sizes; the fixed-width backend makes this
    /// fully constant-time.)
    pub fn cswap(&self, x: &mut BigUint, y: &mut BigUint, swap: Choice) {
        let on = BigUint::from(swap.unwrap_u8());
        let off = BigUint::from(1 - swap.unwrap_u8());
        let nx = &*x * &off + &*y * &on;
        let ny = &*x * &on + &*y * &off;
        *x = nx;
        *y = ny;
    }

    /// Jacobi symbol `(a / p)` in `{−1, 0, 1}`.
    ///
    /// Binary algorithm; branches on its argument, so callers only pass
    /// freshly randomized or otherwise public values.
    #[must_use]
    pub fn jacobi(&self, value: &BigUint) -> i32 {
        let mut a = value % &self.p;
        let mut n = self.p.clone();
        let mut t = 1i32;
        while !a.is_zero() {
            while !a.bit(0) {
                a >>= 1;
                // n mod 8 from the low bits
                let r = u8::from(n.bit(1)) * 2 + u8::from(n.bit(2)) * 4 + 1;
                if r == 3 || r == 5 {
                    t = -t;
                }
            }
            mem::swap(&mut a, &mut n);
            if a.bit(0) && a.bit(1) && n.bit(0) && n.bit(1) {
                t = -t;
            }
            a %= &n;
        }
        if n.is_one() { t } else { 0 }
    }
}
