//! The key-agreement facade.
//!
//! Wires a `(curve model, prime, formula, style, exponent, tuned,
//! multievaluation, verbose)` selection into the field, curve, formula and
//! group-action layers, and exposes the three byte-string operations:
//!
//! - [`Csidh::secret_key`] — `n` signed exponent bytes
//! - [`Csidh::public_key`] — `⌈log₂p/8⌉` bytes, the affine coefficient of
//!   the walked curve, little-endian
//! - [`Csidh::dh`] — same width; validates the peer curve first
//!
//! Randomness is threaded explicitly; the caller owns the RNG. The action
//! result never depends on it (it only steers which torsion generators
//! witness the walk), so public keys and shared secrets are deterministic
//! functions of the key material.

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

use crate::error::CsidhError;
use crate::fp::OpCounts;
use crate::gae::{GroupAction, Style};
use crate::isogeny::{Formula, FormulaKind};
use crate::montgomery::{Coeff, MontgomeryCurve};
use crate::params::{Params, Prime};
use crate::sdac::SdacTable;

/// Supported curve models. Only Montgomery arithmetic is implemented;
/// the enum keeps the construction signature stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveModel {
    /// `C·y² = x³ + A·x² + x`.
    Montgomery,
}

/// A configured CSIDH instance.
///
/// Instances are independent of one another; sharing one across threads
/// requires external serialization (the operation counters are interior-
/// mutable).
///
/// ```
/// use csidh::{Csidh, CurveModel, FormulaKind, Prime, Style};
/// use rand::{SeedableRng, rngs::StdRng};
///
/// let engine = Csidh::new(
///     CurveModel::Montgomery, Prime::P512, FormulaKind::Hvelu, Style::Wd2,
///     1, false, false, false,
/// ).unwrap();
/// let mut rng = StdRng::seed_from_u64(7);
/// let sk_a = engine.secret_key(&mut rng);
/// let sk_b = engine.secret_key(&mut rng);
/// let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
/// let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
/// let ss_a = engine.dh(&mut rng, &sk_a, &pk_b).unwrap();
/// let ss_b = engine.dh(&mut rng, &sk_b, &pk_a).unwrap();
/// assert_eq!(ss_a, ss_b);
/// ```
#[derive(Debug)]
pub struct Csidh {
    curve: MontgomeryCurve,
    gae: GroupAction,
    verbose: bool,
}

impl Csidh {
    /// Construct an instance. Errors are fatal: an unsupported selection
    /// or an exponent bound outside `[1, 127]` (exponents must fit a
    /// signed byte) yields [`CsidhError::InvalidParameter`].
    #[expect(clippy::too_many_arguments, reason = "the construction tuple is the configuration surface")]
    #[expect(clippy::fn_params_excessive_bools, reason = "three independent toggles")]
    pub fn new(
        model: CurveModel,
        prime: Prime,
        formula: FormulaKind,
        style: Style,
        exponent: u32,
        tuned: bool,
        multievaluation: bool,
        verbose: bool,
    ) -> Result<Self, CsidhError> {
        let CurveModel::Montgomery = model;
        if exponent == 0 || exponent > 127 {
            return Err(CsidhError::InvalidParameter("exponent bound must be in [1, 127]"));
        }
        let params = Params::new(prime)?;
        let sdacs = SdacTable::load_or_generate(&params);
        let curve = MontgomeryCurve::new(params, sdacs);
        let backend = Formula::new(formula, &curve, tuned, multievaluation);
        let gae = GroupAction::new(&curve, backend, style, exponent);
        Ok(Self { curve, gae, verbose })
    }

    /// The default configuration for a prime: hybrid formulas, dummy-free
    /// walk, the prime's default exponent bound.
    pub fn with_default_parameters(prime: Prime) -> Result<Self, CsidhError> {
        Self::new(
            CurveModel::Montgomery,
            prime,
            FormulaKind::Hvelu,
            Style::Df,
            prime.default_exponent(),
            false,
            false,
            false,
        )
    }

    /// Secret-key width in bytes (`n`).
    #[must_use]
    pub fn secret_key_bytes(&self) -> usize {
        self.curve.params().n
    }

    /// Public-key / shared-secret width in bytes (`⌈log₂p/8⌉`).
    #[must_use]
    pub fn public_key_bytes(&self) -> usize {
        self.curve.params().key_bytes
    }

    /// Sample a fresh secret key: `n` signed bytes, byte `k` holding
    /// `e_k`.
    pub fn secret_key(&self, rng: &mut (impl RngCore + CryptoRng)) -> Vec<u8> {
        self.gae
            .random_key(&self.curve, rng)
            .into_iter()
            .map(|v| v.to_le_bytes()[0])
            .collect()
    }

    /// Derive the public curve of `sk`.
    pub fn public_key(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        sk: &[u8],
    ) -> Result<Vec<u8>, CsidhError> {
        let e = self.decode_secret(sk)?;
        if self.verbose {
            self.curve.fp().reset_counts();
        }
        let out = self.gae.pubkey(&self.curve, rng, &e)?;
        self.encode_curve(&out)
    }

    /// Derive the shared secret from `sk` and the peer's `pk`.
    ///
    /// The peer curve is validated first; rejection carries no
    /// information beyond the rejection itself.
    pub fn dh(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        sk: &[u8],
        pk: &[u8],
    ) -> Result<Vec<u8>, CsidhError> {
        let e = self.decode_secret(sk)?;
        let peer = self.decode_public(pk)?;
        if self.verbose {
            self.curve.fp().reset_counts();
        }
        let out = self.gae.dh(&self.curve, rng, &e, &peer)?;
        self.encode_curve(&out)
    }

    /// Field-operation counters accumulated so far (reset per call when
    /// `verbose` is set).
    #[must_use]
    pub fn op_counts(&self) -> OpCounts {
        self.curve.fp().counts()
    }

    /// Zero the field-operation counters.
    pub fn reset_op_counts(&self) {
        self.curve.fp().reset_counts();
    }

    fn decode_secret(&self, sk: &[u8]) -> Result<Vec<i8>, CsidhError> {
        if sk.len() != self.curve.params().n {
            return Err(CsidhError::InvalidSecretKey);
        }
        let e: Vec<i8> = sk.iter().map(|&b| i8::from_le_bytes([b])).collect();
        let m = self.gae.exponent_bound();
        if !e.iter().all(|&v| self.gae.style().admits(v, m)) {
            return Err(CsidhError::InvalidSecretKey);
        }
        Ok(e)
    }

    fn decode_public(&self, pk: &[u8]) -> Result<Coeff, CsidhError> {
        if pk.len() != self.curve.params().key_bytes {
            return Err(CsidhError::InvalidPublicKey);
        }
        let affine = BigUint::from_bytes_le(pk);
        if affine >= *self.curve.fp().p() {
            return Err(CsidhError::InvalidPublicKey);
        }
        Ok(self.curve.affine_to_projective(&affine))
    }

    fn encode_curve(&self, a: &Coeff) -> Result<Vec<u8>, CsidhError> {
        let affine = self.curve.coeff(a);
        let mut bytes = affine.to_bytes_le();
        let width = self.curve.params().key_bytes;
        if bytes.len() > width {
            return Err(CsidhError::InternalInvariant("coefficient exceeds key width"));
        }
        bytes.resize(width, 0);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    fn engine(formula: FormulaKind, style: Style, m: u32) -> Csidh {
        Csidh::new(CurveModel::Montgomery, Prime::P512, formula, style, m, false, false, false)
            .unwrap()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Deterministic exponent patterns shared with the reference vectors.
    fn pattern_key(n: usize, style: Style, m: i32, variant: usize) -> Vec<u8> {
        (0..n)
            .map(|k| {
                let i = i32::try_from(k).unwrap();
                let v = match (style, variant) {
                    (Style::Wd2, 0) => ((i * 17 + 3) % (2 * m + 1)) - m,
                    (Style::Wd2, _) => ((i * 11 + 5) % (2 * m + 1)) - m,
                    (Style::Df, 0) => m - 2 * ((i * 2 + 1) % (m + 1)),
                    (Style::Df, _) => m - 2 * ((i + 2) % (m + 1)),
                    (Style::Wd1, 0) => (i * 5 + 2) % (m + 1),
                    (Style::Wd1, _) => (i * 2 + 1) % (m + 1),
                };
                i8::try_from(v).unwrap().to_le_bytes()[0]
            })
            .collect()
    }

    #[test]
    fn key_widths() {
        let engine = engine(FormulaKind::Hvelu, Style::Wd2, 2);
        let mut rng = StdRng::seed_from_u64(50);
        let sk = engine.secret_key(&mut rng);
        assert_eq!(sk.len(), 74);
        assert_eq!(engine.secret_key_bytes(), 74);
        assert_eq!(engine.public_key_bytes(), 64);
    }

    #[test]
    fn secret_key_domain() {
        for style in [Style::Df, Style::Wd1, Style::Wd2] {
            let engine = engine(FormulaKind::Hvelu, style, 10);
            let mut rng = StdRng::seed_from_u64(51);
            for _ in 0..4 {
                let sk = engine.secret_key(&mut rng);
                for &b in &sk {
                    let v = i8::from_le_bytes([b]);
                    assert!(style.admits(v, 10), "{v} outside {style:?} domain");
                }
            }
        }
    }

    #[test]
    fn df_round_trip_matches_reference_vectors() {
        let engine = engine(FormulaKind::Tvelu, Style::Df, 2);
        let mut rng = StdRng::seed_from_u64(52);
        let n = engine.secret_key_bytes();
        let sk_a = pattern_key(n, Style::Df, 2, 0);
        let sk_b = pattern_key(n, Style::Df, 2, 1);
        let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
        let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
        assert_eq!(
            hex(&pk_a),
            "ba505921b9b1cfea03426172d8b705df7bc22f38e3f1ed3a15af15843bfce3554297c21ed1d8af86c28752f7385796bb979898ebadc559a352454292964bfa19"
        );
        assert_eq!(
            hex(&pk_b),
            "36c74b78524f65718dc841e8c11b89c9b8fa7319fbcca1a99a2d50011c738a628ca864a399a3c673d7b0f738c18a46e78cc12f83367cce263a8466a85b189d0d"
        );
        let ss_a = engine.dh(&mut rng, &sk_a, &pk_b).unwrap();
        let ss_b = engine.dh(&mut rng, &sk_b, &pk_a).unwrap();
        assert_eq!(ss_a, ss_b);
        assert_eq!(
            hex(&ss_a),
            "2ee56ef1d77f64d49eed8dcb75deb1d26619c747f43be11c818df7333d7a09e7ef9ea6ccc9ed4e8c38284e70ff0b961a0730e099b2050bc9b3e84952c6c8fa1a"
        );
    }

    #[test]
    fn wd1_round_trip_matches_reference_vectors() {
        let engine = engine(FormulaKind::Tvelu, Style::Wd1, 2);
        let mut rng = StdRng::seed_from_u64(53);
        let n = engine.secret_key_bytes();
        let sk_a = pattern_key(n, Style::Wd1, 2, 0);
        let sk_b = pattern_key(n, Style::Wd1, 2, 1);
        let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
        let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
        assert_eq!(
            hex(&pk_a),
            "01f350a0751f94e63db8895a15212f07a2958f924766fc980088763587e284c7ab4c20eb0d01580907233357841b4afa1679d03f1aca38ec1815b9915a3ebd11"
        );
        assert_eq!(
            hex(&pk_b),
            "6c156d001a757094d9e3ba600db839280f44bc6b4b971c65fd38b7210b8896cee9700b7b30893b4c799fda664747ce1a0a812db8cc9c4586cd2c1a6f8a88a13b"
        );
        let ss_a = engine.dh(&mut rng, &sk_a, &pk_b).unwrap();
        let ss_b = engine.dh(&mut rng, &sk_b, &pk_a).unwrap();
        assert_eq!(ss_a, ss_b);
        assert_eq!(
            hex(&ss_a),
            "397b6475537d6b8e50be62d7705168e8eed9ea796d5e6112c296249afa6510e6416b94733340e36a33b4d40d1fd6315a66d8c1e06a6ffad486f5ef7ceb5a203b"
        );
    }

    #[test]
    fn wd2_round_trip_matches_reference_vectors() {
        let engine = engine(FormulaKind::Tvelu, Style::Wd2, 2);
        let mut rng = StdRng::seed_from_u64(54);
        let n = engine.secret_key_bytes();
        let sk_a = pattern_key(n, Style::Wd2, 2, 0);
        let sk_b = pattern_key(n, Style::Wd2, 2, 1);
        let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
        let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
        assert_eq!(
            hex(&pk_a),
            "ac05593021ff115fb8d30c7d0eebfadc3ec59a570d1b83b7869012811952eaabcacb128a88a3ba49db27fff53241d236992dd91c1a25c01590a78c2d5f991a39"
        );
        assert_eq!(
            hex(&pk_b),
            "f079c49b7691bf2a812f543cf37d35893ecdb2b255908c633f7845fc4dc663d3e7acb2e8a63045c4a2f9566fab476700cdc23fdeab48d1497dac0db1bd65b944"
        );
        let ss_a = engine.dh(&mut rng, &sk_a, &pk_b).unwrap();
        let ss_b = engine.dh(&mut rng, &sk_b, &pk_a).unwrap();
        assert_eq!(ss_a, ss_b);
        assert_eq!(
            hex(&ss_a),
            "e26806b50027411e718ef2b8300a47f1efedd409c5c322aed2a5819bf126d9aee04002957e0948fef80001e32bc298c01133f1b41118be8cda9dc24de364500e"
        );
    }

    #[test]
    #[ignore = "full-size exponent walk; minutes of runtime"]
    fn df_full_exponent_round_trip() {
        let engine = engine(FormulaKind::Hvelu, Style::Df, 10);
        let mut rng = StdRng::seed_from_u64(63);
        let n = engine.secret_key_bytes();
        let sk_a = pattern_key(n, Style::Df, 10, 0);
        let sk_b = pattern_key(n, Style::Df, 10, 1);
        let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
        let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
        assert_eq!(
            hex(&pk_a),
            "3f5388742ecf9f0019c6d87a1e56c7155fe55f5f9ee64ccdff64ee251362d56e7f7c3bb781dc9a942a5af625ab75db507f1aff6cefe11c487f30f5425012473c"
        );
        assert_eq!(
            hex(&pk_b),
            "854df1b0d8043cd10c9b34c413d012e43a096a8b872f1fce57b954c90c56adde5a7c9e0e361f1dda172f7e36071fcd60f023e2ca944017e2eb1cf5332cca6007"
        );
        let ss_a = engine.dh(&mut rng, &sk_a, &pk_b).unwrap();
        let ss_b = engine.dh(&mut rng, &sk_b, &pk_a).unwrap();
        assert_eq!(ss_a, ss_b);
        assert_eq!(
            hex(&ss_a),
            "612e7d7e7865e66e0166641e1e95cdd30776d69d9be31199dfe03e92ab0707b479afaef94864cdf5540151e90424ae4ba64a168d24b3b02fa9bafac8dddc2402"
        );
    }

    #[test]
    fn wd1_random_pairs_commute() {
        let engine = engine(FormulaKind::Tvelu, Style::Wd1, 1);
        let mut rng = StdRng::seed_from_u64(61);
        for _ in 0..3 {
            let sk_a = engine.secret_key(&mut rng);
            let sk_b = engine.secret_key(&mut rng);
            let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
            let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
            assert_eq!(
                engine.dh(&mut rng, &sk_a, &pk_b).unwrap(),
                engine.dh(&mut rng, &sk_b, &pk_a).unwrap(),
            );
        }
    }

    #[test]
    #[ignore = "broad sweep; minutes of runtime"]
    fn wd1_hundred_random_pairs_commute() {
        let engine = engine(FormulaKind::Tvelu, Style::Wd1, 1);
        let mut rng = StdRng::seed_from_u64(62);
        for round in 0..100 {
            let sk_a = engine.secret_key(&mut rng);
            let sk_b = engine.secret_key(&mut rng);
            let pk_a = engine.public_key(&mut rng, &sk_a).unwrap();
            let pk_b = engine.public_key(&mut rng, &sk_b).unwrap();
            assert_eq!(
                engine.dh(&mut rng, &sk_a, &pk_b).unwrap(),
                engine.dh(&mut rng, &sk_b, &pk_a).unwrap(),
                "pair {round} failed to commute"
            );
        }
    }

    #[test]
    fn formulas_agree_on_public_keys() {
        let mut rng = StdRng::seed_from_u64(55);
        let reference = engine(FormulaKind::Tvelu, Style::Wd2, 1);
        let sk = reference.secret_key(&mut rng);
        let expected = reference.public_key(&mut rng, &sk).unwrap();
        for formula in [FormulaKind::Svelu, FormulaKind::Hvelu] {
            let other = engine(formula, Style::Wd2, 1);
            assert_eq!(
                other.public_key(&mut rng, &sk).unwrap(),
                expected,
                "{formula:?} disagrees with Tvelu"
            );
        }
        // multievaluation and tuned dispatch must not change results
        let multi = Csidh::new(
            CurveModel::Montgomery, Prime::P512, FormulaKind::Svelu, Style::Wd2,
            1, true, true, false,
        ).unwrap();
        assert_eq!(multi.public_key(&mut rng, &sk).unwrap(), expected);
    }

    #[test]
    fn styles_agree_where_domains_overlap() {
        // e with every coordinate in {-2, 0, 2}: valid for both df (m=2,
        // matching parity) and wd2 (m=2).
        let mut rng = StdRng::seed_from_u64(56);
        let df = engine(FormulaKind::Hvelu, Style::Df, 2);
        let wd2 = engine(FormulaKind::Hvelu, Style::Wd2, 2);
        let n = df.secret_key_bytes();
        let sk = pattern_key(n, Style::Df, 2, 0);
        assert_eq!(
            df.public_key(&mut rng, &sk).unwrap(),
            wd2.public_key(&mut rng, &sk).unwrap(),
        );
    }

    #[test]
    fn malformed_public_keys_are_rejected() {
        let engine = engine(FormulaKind::Hvelu, Style::Wd2, 1);
        let mut rng = StdRng::seed_from_u64(57);
        let sk = engine.secret_key(&mut rng);

        // off-class curves (reference-checked rejections: affine 3 and
        // 123456789)
        let mut off_class_small = vec![0u8; 64];
        off_class_small[0] = 3;
        let mut off_class_large = vec![0u8; 64];
        off_class_large[..4].copy_from_slice(&123_456_789u32.to_le_bytes());
        // singular curve A = 2
        let mut singular = vec![0u8; 64];
        singular[0] = 2;
        // out of field range, and wrong width
        let oversized = vec![0xffu8; 64];
        let truncated = vec![0u8; 63];

        for pk in [&off_class_small, &off_class_large, &singular, &oversized, &truncated] {
            assert!(matches!(
                engine.dh(&mut rng, &sk, pk),
                Err(CsidhError::InvalidPublicKey)
            ));
        }
    }

    #[test]
    fn malformed_secret_keys_are_rejected() {
        let engine = engine(FormulaKind::Hvelu, Style::Df, 2);
        let mut rng = StdRng::seed_from_u64(58);
        let pk = vec![0u8; 64]; // the base curve is a valid peer

        // wrong width
        let short = vec![0u8; 73];
        // out of range for m = 2
        let mut oversized = vec![0u8; 74];
        oversized[0] = 3;
        // df parity violation: 1 is not congruent to m = 2 mod 2
        let mut odd_parity = vec![0u8; 74];
        odd_parity[0] = 1;

        for sk in [&short, &oversized, &odd_parity] {
            assert!(matches!(
                engine.dh(&mut rng, sk, &pk),
                Err(CsidhError::InvalidSecretKey)
            ));
        }
    }

    #[test]
    fn df_operation_counts_are_key_independent() {
        let engine = Csidh::new(
            CurveModel::Montgomery, Prime::P512, FormulaKind::Hvelu, Style::Df,
            1, false, false, true,
        ).unwrap();
        let mut rng = StdRng::seed_from_u64(59);
        let mut seen = None;
        for _ in 0..3 {
            let sk = engine.secret_key(&mut rng);
            let _pk = engine.public_key(&mut rng, &sk).unwrap();
            let counts = engine.op_counts();
            match &seen {
                None => seen = Some(counts),
                Some(first) => assert_eq!(first, &counts, "df walk cost leaked the key"),
            }
        }
    }

    #[test]
    fn p1024_constructs_and_samples() {
        let engine = Csidh::new(
            CurveModel::Montgomery, Prime::P1024, FormulaKind::Hvelu, Style::Wd2,
            2, false, false, false,
        ).unwrap();
        let mut rng = StdRng::seed_from_u64(60);
        let sk = engine.secret_key(&mut rng);
        assert_eq!(sk.len(), 130);
        assert_eq!(engine.public_key_bytes(), 128);
    }

    #[test]
    fn bad_construction_parameters() {
        assert!(matches!(
            Csidh::new(
                CurveModel::Montgomery, Prime::P512, FormulaKind::Hvelu, Style::Df,
                0, false, false, false,
            ),
            Err(CsidhError::InvalidParameter(_))
        ));
        assert!(matches!(
            Csidh::new(
                CurveModel::Montgomery, Prime::P512, FormulaKind::Hvelu, Style::Df,
                200, false, false, false,
            ),
            Err(CsidhError::InvalidParameter(_))
        ));
    }
}
