//! # csidh
//!
//! CSIDH — Commutative Supersingular Isogeny Diffie–Hellman.
//!
//! Two parties each hold a secret exponent vector and act on a
//! supersingular Montgomery curve over a prime field through the class
//! group of the endomorphism ring. The action commutes, so applying one's
//! own secret to the peer's public curve lands both parties on the same
//! curve, the shared secret:
//!
//! ```text
//! [a]·([b]·E0)  =  [b]·([a]·E0)
//! ```
//!
//! ## Layers
//!
//! - [`fp`] — canonical-residue field arithmetic with op counters
//! - [`params`] — the `p512` / `p1024` parameter tables
//! - [`sdac`] — shortest differential addition chains (disk-cached)
//! - [`montgomery`] — x-only curve arithmetic, Elligator sampling,
//!   torsion generation and public-key validation
//! - [`isogeny`] — interchangeable Vélu / √élu / hybrid formula backends
//! - [`gae`] — the strategy-driven group-action walk in three styles
//!   (dummy-free, one-direction, two-direction)
//! - [`Csidh`] — the byte-string facade: `secret_key`, `public_key`, `dh`
//!
//! ## Security posture
//!
//! The walk's operation sequence is fixed by `(prime, style, exponent)`
//! and never branches on key material; direction and dummy selection go
//! through `cswap`. Torsion sampling and public-key validation branch on
//! *public* randomness only and run with the instrumentation counters
//! paused. The bignum field backend itself is a reference backend; see
//! the [`fp`] module notes for the constant-time caveat.

#![allow(clippy::pub_use, reason = "exporting items for consumers")]

pub mod error;
pub mod fp;
pub mod gae;
pub mod isogeny;
pub mod montgomery;
pub mod params;
pub mod sdac;

mod csidh;

pub use crate::csidh::{Csidh, CurveModel};
pub use crate::error::CsidhError;
pub use crate::fp::OpCounts;
pub use crate::gae::Style;
pub use crate::isogeny::FormulaKind;
pub use crate::params::Prime;
