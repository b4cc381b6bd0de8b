//! Interchangeable isogeny-formula backends.
//!
//! Three backends compute identical curve and point images (up to
//! projective scaling): [`tvelu`] is `O(ℓ)` and wins for small degrees,
//! [`svelu`] is `Õ(√ℓ)` and wins for large ones, and the hybrid picks
//! per degree. Kernel preparation returns a value (no shared scratch), so
//! a prepared [`Kernel`] can be applied to the curve and to any number of
//! carried points.

pub mod poly;
pub mod svelu;
pub mod tvelu;

use crate::montgomery::{Coeff, MontgomeryCurve, Point};

/// Degree below which the hybrid dispatches to traditional Vélu.
const HYBRID_THRESHOLD: u64 = 89;

/// Which formula family a [`Formula`] uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    /// Traditional Vélu for every degree.
    Tvelu,
    /// √élu for every degree.
    Svelu,
    /// Per-degree dispatch between the two.
    Hvelu,
}

/// Prepared kernel data for one isogeny step.
#[derive(Clone, Debug)]
pub enum Kernel {
    /// Kernel table for the traditional formulas.
    Tvelu(tvelu::Kernel),
    /// Index-set abscissas for the √élu formulas.
    Svelu(svelu::Kernel),
}

/// A formula selection bound to one parameter set.
#[derive(Clone, Debug)]
pub struct Formula {
    kind: FormulaKind,
    multievaluation: bool,
    use_tvelu: Vec<bool>,
}

impl Formula {
    /// Resolve the per-degree dispatch table.
    ///
    /// `tuned` derives the hybrid threshold from the cost measures
    /// instead of the fixed degree bound. `multievaluation` switches
    /// √élu to remainder-tree batched evaluation.
    #[must_use]
    pub fn new(
        kind: FormulaKind,
        curve: &MontgomeryCurve,
        tuned: bool,
        multievaluation: bool,
    ) -> Self {
        let use_tvelu = curve
            .params()
            .l
            .iter()
            .map(|&ell| match kind {
                FormulaKind::Tvelu => true,
                FormulaKind::Svelu => false,
                FormulaKind::Hvelu => {
                    if tuned {
                        tvelu_measure(ell) <= svelu_measure(ell)
                    } else {
                        ell < HYBRID_THRESHOLD
                    }
                }
            })
            .collect();
        Self { kind, multievaluation, use_tvelu }
    }

    /// The selected family.
    #[must_use]
    pub const fn kind(&self) -> FormulaKind {
        self.kind
    }

    /// Prepare the kernel for `ℓ = L[i]` generated by `P` on `E_A`.
    #[must_use]
    pub fn kps(&self, curve: &MontgomeryCurve, i: usize, p: &Point, a: &Coeff) -> Kernel {
        if self.use_tvelu[i] {
            Kernel::Tvelu(tvelu::kps(curve, i, p, a))
        } else {
            Kernel::Svelu(svelu::kps(curve, i, p, a))
        }
    }

    /// Codomain constant of the prepared isogeny.
    #[must_use]
    pub fn xisog(&self, curve: &MontgomeryCurve, kernel: &Kernel, a: &Coeff, i: usize) -> Coeff {
        match kernel {
            Kernel::Tvelu(k) => tvelu::xisog(curve, k, a, i),
            Kernel::Svelu(k) => svelu::xisog(curve, k, a, i, self.multievaluation),
        }
    }

    /// Image of `P` under the prepared isogeny.
    #[must_use]
    pub fn xeval(&self, curve: &MontgomeryCurve, kernel: &Kernel, p: &Point) -> Point {
        match kernel {
            Kernel::Tvelu(k) => tvelu::xeval(curve, k, p),
            Kernel::Svelu(k) => svelu::xeval(curve, k, p, self.multievaluation),
        }
    }

    /// Field-multiplication measure of one point evaluation at degree
    /// `L[i]`; drives the strategy optimizer.
    #[must_use]
    pub fn eval_measure(&self, curve: &MontgomeryCurve, i: usize) -> u64 {
        let ell = curve.params().l[i];
        if self.use_tvelu[i] { tvelu_measure(ell) } else { svelu_measure(ell) }
    }
}

/// Rough multiplication count of a tvelu evaluation at degree `ℓ`.
const fn tvelu_measure(ell: u64) -> u64 {
    2 * ell
}

/// Rough multiplication count of a √élu evaluation at degree `ℓ`.
fn svelu_measure(ell: u64) -> u64 {
    12 * ell.isqrt()
}
