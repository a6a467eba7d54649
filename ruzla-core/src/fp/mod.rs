//! IEEE 754 Floating-Point Values.
//!
//! [`FloatingPoint`] stores the packed sign/exponent/significand encoding
//! together with its [`FpFormat`]. All arithmetic runs through the circuit
//! templates in [`template`], instantiated concretely, so constant folding
//! agrees bit-for-bit with the solver's word-blasted circuits.

pub mod concrete;
pub mod format;
pub mod template;

pub use concrete::ConcreteFactory;
pub use format::FpFormat;

use crate::bv::BitVector;
use crate::error::{Error, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// IEEE 754 rounding modes with the fixed 3-bit encoding
/// RNE=0, RNA=1, RTN=2, RTP=3, RTZ=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    Rne,
    /// Round to nearest, ties away from zero.
    Rna,
    /// Round toward negative.
    Rtn,
    /// Round toward positive.
    Rtp,
    /// Round toward zero.
    Rtz,
}

impl RoundingMode {
    /// The fixed 3-bit encoding.
    #[must_use]
    pub fn to_index(self) -> u64 {
        match self {
            Self::Rne => 0,
            Self::Rna => 1,
            Self::Rtn => 2,
            Self::Rtp => 3,
            Self::Rtz => 4,
        }
    }

    /// Decode from the fixed 3-bit encoding.
    #[must_use]
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Rne),
            1 => Some(Self::Rna),
            2 => Some(Self::Rtn),
            3 => Some(Self::Rtp),
            4 => Some(Self::Rtz),
            _ => None,
        }
    }

    /// All rounding modes.
    pub const ALL: [Self; 5] = [Self::Rne, Self::Rna, Self::Rtn, Self::Rtp, Self::Rtz];

    /// The SMT-LIB name (`RNE`, ...).
    #[must_use]
    pub fn smt_name(self) -> &'static str {
        match self {
            Self::Rne => "RNE",
            Self::Rna => "RNA",
            Self::Rtn => "RTN",
            Self::Rtp => "RTP",
            Self::Rtz => "RTZ",
        }
    }
}

impl std::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.smt_name())
    }
}

/// An IEEE 754 floating-point value in a given format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FloatingPoint {
    format: FpFormat,
    /// Packed sign/exponent/significand encoding.
    bv: BitVector,
}

fn rm_bv(rm: RoundingMode) -> BitVector {
    BitVector::from_u64(3, rm.to_index())
}

impl FloatingPoint {
    /// Create from a packed encoding.
    #[must_use]
    pub fn new(format: FpFormat, bv: BitVector) -> Self {
        debug_assert_eq!(bv.width(), format.packed_width());
        Self { format, bv }
    }

    /// Assemble from sign, exponent and significand fields.
    #[must_use]
    pub fn from_fields(sign: &BitVector, exp: &BitVector, sig: &BitVector) -> Self {
        let format = FpFormat::new(exp.width(), sig.width() + 1);
        Self::new(format, sign.concat(exp).concat(sig))
    }

    /// Positive zero.
    #[must_use]
    pub fn pos_zero(format: FpFormat) -> Self {
        Self::new(format, BitVector::zero(format.packed_width()))
    }

    /// Negative zero.
    #[must_use]
    pub fn neg_zero(format: FpFormat) -> Self {
        Self::new(format, BitVector::min_signed(format.packed_width()))
    }

    /// Positive infinity.
    #[must_use]
    pub fn pos_inf(format: FpFormat) -> Self {
        let mut f = ConcreteFactory;
        let sign = BitVector::zero(1);
        Self::new(format, template::packed_inf(&mut f, &format, &sign))
    }

    /// Negative infinity.
    #[must_use]
    pub fn neg_inf(format: FpFormat) -> Self {
        let mut f = ConcreteFactory;
        let sign = BitVector::one(1);
        Self::new(format, template::packed_inf(&mut f, &format, &sign))
    }

    /// The canonical quiet NaN.
    #[must_use]
    pub fn nan(format: FpFormat) -> Self {
        let mut f = ConcreteFactory;
        Self::new(format, template::packed_nan(&mut f, &format))
    }

    /// Create a binary32 value from a host `f32` (bit reinterpretation).
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Self::new(
            FpFormat::binary32(),
            BitVector::from_u64(32, u64::from(value.to_bits())),
        )
    }

    /// Reinterpret a binary32 value as a host `f32`.
    #[must_use]
    pub fn to_f32(&self) -> Option<f32> {
        if self.format != FpFormat::binary32() {
            return None;
        }
        self.bv.to_u64().map(|bits| f32::from_bits(bits as u32))
    }

    /// The format.
    #[must_use]
    pub fn format(&self) -> FpFormat {
        self.format
    }

    /// The packed encoding.
    #[must_use]
    pub fn as_bv(&self) -> &BitVector {
        &self.bv
    }

    fn classify(&self, f: impl FnOnce(&mut ConcreteFactory, &FpFormat, &BitVector) -> BitVector) -> bool {
        let mut cf = ConcreteFactory;
        f(&mut cf, &self.format, &self.bv).is_one()
    }

    /// True if this is a NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.classify(template::is_nan)
    }

    /// True if this is an infinity.
    #[must_use]
    pub fn is_inf(&self) -> bool {
        self.classify(template::is_inf)
    }

    /// True if this is a zero (of either sign).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.classify(template::is_zero)
    }

    /// True if this is a normal number.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.classify(template::is_normal)
    }

    /// True if this is a subnormal number.
    #[must_use]
    pub fn is_subnormal(&self) -> bool {
        self.classify(template::is_subnormal)
    }

    /// True if negative (sign bit set and not NaN).
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.classify(template::is_negative)
    }

    /// True if positive (sign bit clear and not NaN).
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.classify(template::is_positive)
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        let mut f = ConcreteFactory;
        Self::new(self.format, template::fp_abs(&mut f, &self.format, &self.bv))
    }

    /// Negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        let mut f = ConcreteFactory;
        Self::new(self.format, template::fp_neg(&mut f, &self.format, &self.bv))
    }

    /// IEEE equality (NaN compares false; zeros compare equal).
    #[must_use]
    pub fn ieee_eq(&self, other: &Self) -> bool {
        let mut f = ConcreteFactory;
        template::fp_eq(&mut f, &self.format, &self.bv, &other.bv).is_one()
    }

    /// IEEE less-than.
    #[must_use]
    pub fn lt(&self, other: &Self) -> bool {
        let mut f = ConcreteFactory;
        template::fp_lt(&mut f, &self.format, &self.bv, &other.bv).is_one()
    }

    /// IEEE less-or-equal.
    #[must_use]
    pub fn le(&self, other: &Self) -> bool {
        let mut f = ConcreteFactory;
        template::fp_le(&mut f, &self.format, &self.bv, &other.bv).is_one()
    }

    /// Minimum; `min(-0, +0) = -0`.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        Self::new(
            self.format,
            template::fp_min(&mut f, &self.format, &self.bv, &other.bv),
        )
    }

    /// Maximum; `max(-0, +0) = +0`.
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        Self::new(
            self.format,
            template::fp_max(&mut f, &self.format, &self.bv, &other.bv),
        )
    }

    /// Correctly rounded addition.
    #[must_use]
    pub fn add(&self, rm: RoundingMode, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_add(&mut f, &self.format, &rm, &self.bv, &other.bv, false),
        )
    }

    /// Correctly rounded subtraction.
    #[must_use]
    pub fn sub(&self, rm: RoundingMode, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_add(&mut f, &self.format, &rm, &self.bv, &other.bv, true),
        )
    }

    /// Correctly rounded multiplication.
    #[must_use]
    pub fn mul(&self, rm: RoundingMode, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_mul(&mut f, &self.format, &rm, &self.bv, &other.bv),
        )
    }

    /// Correctly rounded division.
    #[must_use]
    pub fn div(&self, rm: RoundingMode, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_div(&mut f, &self.format, &rm, &self.bv, &other.bv),
        )
    }

    /// Correctly rounded fused multiply-add: `self * b + c`.
    #[must_use]
    pub fn fma(&self, rm: RoundingMode, b: &Self, c: &Self) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_fma(&mut f, &self.format, &rm, &self.bv, &b.bv, &c.bv),
        )
    }

    /// Correctly rounded square root.
    #[must_use]
    pub fn sqrt(&self, rm: RoundingMode) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_sqrt(&mut f, &self.format, &rm, &self.bv),
        )
    }

    /// IEEE remainder.
    #[must_use]
    pub fn rem(&self, other: &Self) -> Self {
        let mut f = ConcreteFactory;
        Self::new(
            self.format,
            template::fp_rem(&mut f, &self.format, &self.bv, &other.bv),
        )
    }

    /// Round to integral.
    #[must_use]
    pub fn rti(&self, rm: RoundingMode) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            self.format,
            template::fp_rti(&mut f, &self.format, &rm, &self.bv),
        )
    }

    /// Convert to another format.
    #[must_use]
    pub fn to_format(&self, target: FpFormat, rm: RoundingMode) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(
            target,
            template::fp_from_fp(&mut f, &self.format, &target, &rm, &self.bv),
        )
    }

    /// Convert an unsigned bit-vector to a floating-point value.
    #[must_use]
    pub fn from_ubv(format: FpFormat, rm: RoundingMode, bv: &BitVector) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(format, template::fp_from_ubv(&mut f, &format, &rm, bv))
    }

    /// Convert a signed bit-vector to a floating-point value.
    #[must_use]
    pub fn from_sbv(format: FpFormat, rm: RoundingMode, bv: &BitVector) -> Self {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        Self::new(format, template::fp_from_sbv(&mut f, &format, &rm, bv))
    }

    /// Convert to an unsigned bit-vector; unspecified cases yield zero.
    #[must_use]
    pub fn to_ubv(&self, rm: RoundingMode, width: u64) -> BitVector {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        template::fp_to_ubv(&mut f, &self.format, &rm, &self.bv, width)
    }

    /// Convert to a signed bit-vector; unspecified cases yield zero.
    #[must_use]
    pub fn to_sbv(&self, rm: RoundingMode, width: u64) -> BitVector {
        let mut f = ConcreteFactory;
        let rm = rm_bv(rm);
        template::fp_to_sbv(&mut f, &self.format, &rm, &self.bv, width)
    }

    /// Construct the correctly rounded value of `num / den` with the given
    /// sign. `den` must be nonzero.
    #[must_use]
    pub fn from_rational(
        format: FpFormat,
        rm: RoundingMode,
        negative: bool,
        num: &BigUint,
        den: &BigUint,
    ) -> Self {
        debug_assert!(!den.is_zero());
        let sign = BitVector::from_u64(1, u64::from(negative));
        if num.is_zero() {
            return if negative {
                Self::neg_zero(format)
            } else {
                Self::pos_zero(format)
            };
        }

        // Exponent: num/den in [2^e, 2^(e+1)).
        let nb = num.bits() as i64;
        let db = den.bits() as i64;
        let ge = |e: i64| -> bool {
            if e >= 0 {
                *num >= (den << e as u64)
            } else {
                (num << (-e) as u64) >= *den
            }
        };
        let mut e = nb - db;
        if !ge(e) {
            e -= 1;
        }

        let s = format.sig_bits;
        // Values far below the subnormal range round to zero or the
        // smallest subnormal, depending only on the direction.
        if e < format.e_min() - s as i64 - 4 {
            let up = matches!(
                (rm, negative),
                (RoundingMode::Rtp, false) | (RoundingMode::Rtn, true)
            );
            let packed = if up {
                sign.concat(&BitVector::zero(format.exp_bits))
                    .concat(&BitVector::one(s - 1))
            } else {
                sign.concat(&BitVector::zero(format.packed_width() - 1))
            };
            return Self::new(format, packed);
        }

        // Quotient with s + 2 bits (MSB set) plus a sticky remainder.
        let shift = s as i64 + 1 - e;
        let (scaled_num, scaled_den) = if shift >= 0 {
            (num << shift as u64, den.clone())
        } else {
            (num.clone(), den << (-shift) as u64)
        };
        let q = &scaled_num / &scaled_den;
        let r = &scaled_num % &scaled_den;
        let qbv = BitVector::new(s + 2, q);
        let kept = qbv.extract(s + 1, 2).expect("in range");
        let guard = qbv.extract(1, 1).expect("in range");
        let round_bit = qbv.extract(0, 0).expect("in range");
        let sticky_rem = BitVector::from_u64(1, u64::from(!r.is_zero()));
        let sticky = round_bit.or(&sticky_rem);
        let sig = kept.concat(&guard).concat(&sticky);

        let mut f = ConcreteFactory;
        let ew = 2 + 64 - (e.unsigned_abs().max(1)).leading_zeros() as u64;
        let ew = ew.max(format.unpacked_exp_bits());
        let exp = BitVector::from_i64(ew, e);
        let rm = rm_bv(rm);
        Self::new(
            format,
            template::round_and_pack(&mut f, &format, &rm, &sign, &exp, &sig),
        )
    }

    /// Construct from a decimal real string (`-1.25`, `2.5e-3`) or a
    /// rational string (`1/3`), correctly rounded.
    pub fn from_real_str(format: FpFormat, rm: RoundingMode, s: &str) -> Result<Self> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if let Some((n, d)) = body.split_once('/') {
            let num = BigUint::parse_bytes(n.trim().as_bytes(), 10)
                .ok_or_else(|| Error::Parse(format!("invalid rational '{s}'")))?;
            let den = BigUint::parse_bytes(d.trim().as_bytes(), 10)
                .ok_or_else(|| Error::Parse(format!("invalid rational '{s}'")))?;
            if den.is_zero() {
                return Err(Error::Parse(format!("zero denominator in '{s}'")));
            }
            return Ok(Self::from_rational(format, rm, negative, &num, &den));
        }

        let (mantissa, exp10) = match body.split_once(['e', 'E']) {
            Some((m, e)) => {
                let exp: i64 = e
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid exponent in '{s}'")))?;
                (m, exp)
            }
            None => (body, 0),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, fr)) => (i, fr),
            None => (mantissa, ""),
        };
        let digits: String = [int_part, frac_part].concat();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Parse(format!("invalid real literal '{s}'")));
        }
        let num = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| Error::Parse(format!("invalid real literal '{s}'")))?;
        let scale = frac_part.len() as i64 - exp10;
        let ten = BigUint::from(10u32);
        let (num, den) = if scale >= 0 {
            (num, ten.pow(scale as u32))
        } else {
            (num * ten.pow((-scale) as u32), BigUint::one())
        };
        Ok(Self::from_rational(format, rm, negative, &num, &den))
    }

    /// The sign, exponent and significand fields of the packed encoding.
    #[must_use]
    pub fn fields(&self) -> (BitVector, BitVector, BitVector) {
        let w = self.format.packed_width();
        let s = self.format.sig_bits;
        let sign = self.bv.extract(w - 1, w - 1).expect("in range");
        let exp = self.bv.extract(w - 2, s - 1).expect("in range");
        let sig = self.bv.extract(s - 2, 0).expect("in range");
        (sign, exp, sig)
    }
}

impl std::fmt::Display for FloatingPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (sign, exp, sig) = self.fields();
        write!(f, "(fp {sign} {exp} {sig})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_of(v: f32) -> FloatingPoint {
        FloatingPoint::from_f32(v)
    }

    fn check_binop(
        op: impl Fn(&FloatingPoint, RoundingMode, &FloatingPoint) -> FloatingPoint,
        host: impl Fn(f32, f32) -> f32,
        a: f32,
        b: f32,
    ) {
        let got = op(&f32_of(a), RoundingMode::Rne, &f32_of(b));
        let want = host(a, b);
        assert_eq!(
            got.to_f32().unwrap().to_bits(),
            want.to_bits(),
            "op({a}, {b}) = {:?}, want {want}",
            got.to_f32()
        );
    }

    #[test]
    fn test_classify() {
        let fmt = FpFormat::binary32();
        assert!(FloatingPoint::nan(fmt).is_nan());
        assert!(FloatingPoint::pos_inf(fmt).is_inf());
        assert!(FloatingPoint::neg_zero(fmt).is_zero());
        assert!(FloatingPoint::neg_zero(fmt).is_negative());
        assert!(f32_of(1.5).is_normal());
        assert!(f32_of(1.0e-40).is_subnormal());
        assert!(!FloatingPoint::nan(fmt).is_negative());
    }

    #[test]
    fn test_add_matches_host() {
        for (a, b) in [
            (1.5f32, 2.25f32),
            (0.1, 0.2),
            (1.0e30, 1.0e30),
            (1.0, -1.0),
            (-0.0, 0.0),
            (1.0e-40, 1.0e-40),
            (3.4e38, 3.4e38),
            (1.0, 1.0e-30),
        ] {
            check_binop(FloatingPoint::add, |x, y| x + y, a, b);
        }
    }

    #[test]
    fn test_sub_matches_host() {
        for (a, b) in [(5.5f32, 2.25f32), (1.0, 1.0), (1.0, 0.9999999), (0.1, 0.3)] {
            check_binop(FloatingPoint::sub, |x, y| x - y, a, b);
        }
    }

    #[test]
    fn test_mul_matches_host() {
        for (a, b) in [
            (1.5f32, 2.5f32),
            (0.1, 0.1),
            (1.0e30, 1.0e30),
            (1.0e-30, 1.0e-30),
            (-3.0, 0.5),
        ] {
            check_binop(FloatingPoint::mul, |x, y| x * y, a, b);
        }
    }

    #[test]
    fn test_div_matches_host() {
        for (a, b) in [(1.0f32, 3.0f32), (7.0, 2.0), (1.0, 0.1), (1.0e-38, 2.0)] {
            check_binop(FloatingPoint::div, |x, y| x / y, a, b);
        }
    }

    #[test]
    fn test_div_by_zero() {
        let one = f32_of(1.0);
        let zero = f32_of(0.0);
        assert_eq!(one.div(RoundingMode::Rne, &zero).to_f32().unwrap(), f32::INFINITY);
        assert!(zero.div(RoundingMode::Rne, &zero).is_nan());
    }

    #[test]
    fn test_sqrt_matches_host() {
        for a in [4.0f32, 2.0, 0.25, 1.0e-20, 9.0e30] {
            let got = f32_of(a).sqrt(RoundingMode::Rne);
            assert_eq!(got.to_f32().unwrap().to_bits(), a.sqrt().to_bits(), "sqrt({a})");
        }
        assert!(f32_of(-1.0).sqrt(RoundingMode::Rne).is_nan());
        let nz = FloatingPoint::neg_zero(FpFormat::binary32());
        assert_eq!(nz.sqrt(RoundingMode::Rne).as_bv(), nz.as_bv());
    }

    #[test]
    fn test_fma_matches_host() {
        for (a, b, c) in [
            (1.5f32, 2.0f32, 0.5f32),
            (0.1, 0.2, 0.3),
            (1.0e20, 1.0e20, -1.0e38),
            (3.0, -2.0, 6.0),
        ] {
            let got = f32_of(a).fma(RoundingMode::Rne, &f32_of(b), &f32_of(c));
            let want = a.mul_add(b, c);
            assert_eq!(got.to_f32().unwrap().to_bits(), want.to_bits(), "fma({a},{b},{c})");
        }
    }

    #[test]
    fn test_rem() {
        // IEEE remainder: a - b * rne(a / b), computed exactly.
        for (a, b, want) in [
            (5.0f32, 3.0f32, -1.0f32), // q = 2
            (7.5, 2.5, 0.0),           // exact multiple
            (-5.0, 3.0, 1.0),          // q = -2
            (8.0, 3.0, -1.0),          // q = 3
            (2.5, 1.0, 0.5),           // tie, q even = 2
            (3.5, 1.0, -0.5),          // tie, q even = 4
            (1.0, 4.0, 1.0),           // q = 0
            (2.0, 4.0, 2.0),           // tie at half, q = 0 stays
            (3.0, 4.0, -1.0),          // q = 1
        ] {
            let got = f32_of(a).rem(&f32_of(b));
            assert_eq!(
                got.to_f32().unwrap().to_bits(),
                want.to_bits(),
                "rem({a}, {b})"
            );
        }
        assert!(f32_of(1.0).rem(&f32_of(0.0)).is_nan());
        assert_eq!(
            f32_of(5.5).rem(&f32_of(f32::INFINITY)).to_f32().unwrap(),
            5.5
        );
    }

    #[test]
    fn test_rti() {
        for (v, rm, want) in [
            (2.5f32, RoundingMode::Rne, 2.0f32),
            (3.5, RoundingMode::Rne, 4.0),
            (2.5, RoundingMode::Rna, 3.0),
            (-1.5, RoundingMode::Rtn, -2.0),
            (-1.5, RoundingMode::Rtp, -1.0),
            (-0.3, RoundingMode::Rtz, -0.0),
            (0.7, RoundingMode::Rtp, 1.0),
            (8388609.0, RoundingMode::Rne, 8388609.0),
        ] {
            let got = f32_of(v).rti(rm);
            assert_eq!(got.to_f32().unwrap().to_bits(), want.to_bits(), "rti({v}, {rm})");
        }
    }

    #[test]
    fn test_min_max_zeros() {
        let pz = FloatingPoint::pos_zero(FpFormat::binary32());
        let nz = FloatingPoint::neg_zero(FpFormat::binary32());
        assert_eq!(pz.min(&nz).as_bv(), nz.as_bv());
        assert_eq!(nz.max(&pz).as_bv(), pz.as_bv());
        let nan = FloatingPoint::nan(FpFormat::binary32());
        assert_eq!(nan.min(&pz).as_bv(), pz.as_bv());
    }

    #[test]
    fn test_compare() {
        assert!(f32_of(1.0).lt(&f32_of(2.0)));
        assert!(f32_of(-2.0).lt(&f32_of(-1.0)));
        assert!(!f32_of(f32::NAN).lt(&f32_of(1.0)));
        assert!(f32_of(0.0).ieee_eq(&f32_of(-0.0)));
        assert!(!f32_of(f32::NAN).ieee_eq(&f32_of(f32::NAN)));
        assert!(f32_of(f32::NEG_INFINITY).lt(&f32_of(1.0)));
    }

    #[test]
    fn test_format_conversion() {
        let fmt16 = FpFormat::new(5, 11);
        let a = f32_of(1.5).to_format(fmt16, RoundingMode::Rne);
        let back = a.to_format(FpFormat::binary32(), RoundingMode::Rne);
        assert_eq!(back.to_f32().unwrap(), 1.5);
        // 2^20 overflows binary16 to infinity.
        let big = f32_of(1.0e20).to_format(fmt16, RoundingMode::Rne);
        assert!(big.is_inf());
    }

    #[test]
    fn test_bv_conversions() {
        let fmt = FpFormat::binary32();
        let x = FloatingPoint::from_ubv(fmt, RoundingMode::Rne, &BitVector::from_u64(8, 200));
        assert_eq!(x.to_f32().unwrap(), 200.0);
        let y = FloatingPoint::from_sbv(fmt, RoundingMode::Rne, &BitVector::from_i64(8, -100));
        assert_eq!(y.to_f32().unwrap(), -100.0);
        assert_eq!(f32_of(200.7).to_ubv(RoundingMode::Rtz, 8).to_u64(), Some(200));
        assert_eq!(f32_of(-100.5).to_sbv(RoundingMode::Rtz, 8).to_i64(), Some(-100));
        // Out of range and specials are pinned to zero.
        assert_eq!(f32_of(300.0).to_ubv(RoundingMode::Rne, 8).to_u64(), Some(0));
        assert_eq!(f32_of(f32::NAN).to_sbv(RoundingMode::Rne, 8).to_u64(), Some(0));
        assert_eq!(f32_of(-128.0).to_sbv(RoundingMode::Rne, 8).to_i64(), Some(-128));
    }

    #[test]
    fn test_from_real_str() {
        let fmt = FpFormat::binary32();
        for (s, want) in [
            ("1.5", 1.5f32),
            ("-0.125", -0.125),
            ("0.1", 0.1),
            ("1/3", 1.0 / 3.0),
            ("2.5e-3", 2.5e-3),
            ("-4e2", -400.0),
            ("0", 0.0),
        ] {
            let got = FloatingPoint::from_real_str(fmt, RoundingMode::Rne, s).unwrap();
            assert_eq!(got.to_f32().unwrap().to_bits(), want.to_bits(), "parse {s}");
        }
        assert!(FloatingPoint::from_real_str(fmt, RoundingMode::Rne, "x").is_err());
        assert!(FloatingPoint::from_real_str(fmt, RoundingMode::Rne, "1/0").is_err());
    }

    #[test]
    fn test_minimal_format_arithmetic() {
        // FP(2,2): values are NaN, +-inf, +-0, +-0.5, +-1, +-1.5, +-2, +-3.
        let fmt = FpFormat::new(2, 2);
        let one = FloatingPoint::from_real_str(fmt, RoundingMode::Rne, "1").unwrap();
        let sum = one.add(RoundingMode::Rne, &one);
        let two = FloatingPoint::from_real_str(fmt, RoundingMode::Rne, "2").unwrap();
        assert_eq!(sum.as_bv(), two.as_bv());
        // 2 + 2 overflows the largest finite value 3 and rounds to infinity.
        let four = two.add(RoundingMode::Rne, &two);
        assert!(four.is_inf());
        let three = two.add(RoundingMode::Rtz, &two);
        let want = FloatingPoint::from_real_str(fmt, RoundingMode::Rne, "3").unwrap();
        assert_eq!(three.as_bv(), want.as_bv());
    }

    #[test]
    fn test_rounding_modes_directed() {
        let a = f32_of(1.0);
        let tiny = f32_of(1.0e-30);
        // 1 + eps rounds up only toward positive.
        let up = a.add(RoundingMode::Rtp, &tiny);
        let down = a.add(RoundingMode::Rtz, &tiny);
        assert!(up.to_f32().unwrap() > 1.0);
        assert_eq!(down.to_f32().unwrap(), 1.0);
    }

    #[test]
    fn test_display() {
        let fmt = FpFormat::new(3, 3);
        let v = FloatingPoint::pos_zero(fmt);
        assert_eq!(v.to_string(), "(fp #b0 #b000 #b00)");
    }
}
