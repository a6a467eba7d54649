//! Arbitrary-Width Bit-Vector Values.
//!
//! [`BitVector`] is an immutable unsigned container of a fixed width with
//! the full SMT-LIB operation set. Signed operations interpret the value in
//! two's complement. Division by zero follows SMT-LIB: `udiv(x, 0) = ones`,
//! `urem(x, 0) = x`.

use crate::error::{type_error, Error, Result};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// An arbitrary-width bit-vector value.
///
/// Invariant: `value < 2^width` and `width >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    width: u64,
    value: BigUint,
}

impl BitVector {
    /// Create a bit-vector from a raw big integer, truncating to `width` bits.
    #[must_use]
    pub fn new(width: u64, value: BigUint) -> Self {
        debug_assert!(width >= 1);
        Self {
            value: value & Self::mask(width),
            width,
        }
    }

    fn mask(width: u64) -> BigUint {
        (BigUint::one() << width) - BigUint::one()
    }

    /// The all-zero bit-vector of the given width.
    #[must_use]
    pub fn zero(width: u64) -> Self {
        Self {
            width,
            value: BigUint::zero(),
        }
    }

    /// The bit-vector of the given width with value one.
    #[must_use]
    pub fn one(width: u64) -> Self {
        Self::new(width, BigUint::one())
    }

    /// The all-ones bit-vector of the given width.
    #[must_use]
    pub fn ones(width: u64) -> Self {
        Self {
            width,
            value: Self::mask(width),
        }
    }

    /// The smallest signed value `1000...0`.
    #[must_use]
    pub fn min_signed(width: u64) -> Self {
        Self {
            width,
            value: BigUint::one() << (width - 1),
        }
    }

    /// The largest signed value `0111...1`.
    #[must_use]
    pub fn max_signed(width: u64) -> Self {
        Self {
            width,
            value: (BigUint::one() << (width - 1)) - BigUint::one(),
        }
    }

    /// Create from a `u64`, truncating to `width` bits.
    #[must_use]
    pub fn from_u64(width: u64, value: u64) -> Self {
        Self::new(width, BigUint::from(value))
    }

    /// Create from an `i64` in two's complement, truncating to `width` bits.
    #[must_use]
    pub fn from_i64(width: u64, value: i64) -> Self {
        if value >= 0 {
            Self::from_u64(width, value as u64)
        } else {
            let abs = BigUint::from(value.unsigned_abs());
            let modulus = BigUint::one() << width;
            let rem = &abs & Self::mask(width);
            let value = if rem.is_zero() { rem } else { modulus - rem };
            Self::new(width, value)
        }
    }

    /// Parse a bit-vector from a string in base 2, 10 or 16.
    ///
    /// Base 10 accepts an optional leading `-`; the result wraps in two's
    /// complement. Values that do not fit the width are a parse error.
    pub fn from_str(width: u64, s: &str, base: u32) -> Result<Self> {
        if !matches!(base, 2 | 10 | 16) {
            return Err(Error::Parse(format!("unsupported base {base}")));
        }
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) if base == 10 => (true, rest),
            _ => (false, s),
        };
        if digits.is_empty() {
            return Err(Error::Parse("empty bit-vector literal".into()));
        }
        let parsed = BigUint::parse_bytes(digits.as_bytes(), base)
            .ok_or_else(|| Error::Parse(format!("invalid base-{base} literal '{s}'")))?;
        let fits = if negative {
            // -2^(w-1) is the most negative representable value.
            parsed <= (BigUint::one() << (width - 1))
        } else if base == 10 {
            parsed <= Self::mask(width)
        } else {
            // Base 2/16 literals are width-checked by digit count.
            let digit_bits = if base == 2 { 1 } else { 4 };
            digits.len() as u64 * digit_bits <= width || parsed <= Self::mask(width)
        };
        if !fits {
            return Err(Error::Parse(format!(
                "literal '{s}' does not fit in {width} bits"
            )));
        }
        if negative {
            let modulus = BigUint::one() << width;
            let rem = &parsed & Self::mask(width);
            let value = if rem.is_zero() { rem } else { modulus - rem };
            Ok(Self::new(width, value))
        } else {
            Ok(Self::new(width, parsed))
        }
    }

    /// Render in the given base (2, 10 or 16). Bases 2 and 16 are
    /// zero-padded to the width.
    #[must_use]
    pub fn to_string_base(&self, base: u32) -> String {
        match base {
            2 => {
                let s = self.value.to_str_radix(2);
                format!("{}{}", "0".repeat(self.width as usize - s.len()), s)
            }
            16 => {
                let digits = self.width.div_ceil(4) as usize;
                let s = self.value.to_str_radix(16);
                format!("{}{}", "0".repeat(digits - s.len()), s)
            }
            _ => self.value.to_str_radix(10),
        }
    }

    /// The width in bits.
    #[must_use]
    pub fn width(&self) -> u64 {
        self.width
    }

    /// The unsigned value.
    #[must_use]
    pub fn as_uint(&self) -> &BigUint {
        &self.value
    }

    /// The unsigned value as `u64`, if it fits.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// The signed (two's complement) value as `i64`, if it fits.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        if self.msb() {
            let modulus = BigUint::one() << self.width;
            let neg = modulus - &self.value;
            neg.to_u64()
                .and_then(|v| v.try_into().ok().map(|v: i64| -v))
        } else {
            self.value.to_u64().and_then(|v| v.try_into().ok())
        }
    }

    /// True if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// True if the value is one.
    #[must_use]
    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// True if all bits are set.
    #[must_use]
    pub fn is_ones(&self) -> bool {
        self.value == Self::mask(self.width)
    }

    /// True if this is the smallest signed value.
    #[must_use]
    pub fn is_min_signed(&self) -> bool {
        self.value == (BigUint::one() << (self.width - 1))
    }

    /// The most significant bit.
    #[must_use]
    pub fn msb(&self) -> bool {
        self.bit(self.width - 1)
    }

    /// The bit at the given position (0 = LSB).
    #[must_use]
    pub fn bit(&self, pos: u64) -> bool {
        debug_assert!(pos < self.width);
        self.value.bit(pos)
    }

    /// True if the signed interpretation is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.msb()
    }

    fn signed_lt(&self, other: &Self) -> bool {
        match (self.msb(), other.msb()) {
            (true, false) => true,
            (false, true) => false,
            _ => self.value < other.value,
        }
    }

    /* ---- arithmetic ------------------------------------------------------ */

    /// Wrapping addition.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.width, other.width);
        Self::new(self.width, &self.value + &other.value)
    }

    /// Wrapping subtraction.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        debug_assert_eq!(self.width, other.width);
        let modulus = BigUint::one() << self.width;
        Self::new(self.width, &self.value + modulus - &other.value)
    }

    /// Wrapping multiplication.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.width, other.width);
        Self::new(self.width, &self.value * &other.value)
    }

    /// Unsigned division; division by zero yields all ones.
    #[must_use]
    pub fn udiv(&self, other: &Self) -> Self {
        if other.is_zero() {
            Self::ones(self.width)
        } else {
            Self::new(self.width, &self.value / &other.value)
        }
    }

    /// Unsigned remainder; remainder by zero yields the dividend.
    #[must_use]
    pub fn urem(&self, other: &Self) -> Self {
        if other.is_zero() {
            self.clone()
        } else {
            Self::new(self.width, &self.value % &other.value)
        }
    }

    /// Signed division (truncating), SMT-LIB semantics. A zero divisor
    /// yields the all-ones quotient, negated like any other when the
    /// operand signs differ.
    #[must_use]
    pub fn sdiv(&self, other: &Self) -> Self {
        let (neg_a, abs_a) = self.abs_parts();
        let (neg_b, abs_b) = other.abs_parts();
        let quot = abs_a.udiv(&abs_b);
        if neg_a != neg_b {
            quot.neg()
        } else {
            quot
        }
    }

    /// Signed remainder (sign follows the dividend).
    #[must_use]
    pub fn srem(&self, other: &Self) -> Self {
        let (neg_a, abs_a) = self.abs_parts();
        let (_, abs_b) = other.abs_parts();
        let rem = abs_a.urem(&abs_b);
        if neg_a && !rem.is_zero() {
            rem.neg()
        } else {
            rem
        }
    }

    /// Signed modulo (sign follows the divisor).
    #[must_use]
    pub fn smod(&self, other: &Self) -> Self {
        let rem = self.srem(other);
        if rem.is_zero() || other.is_zero() {
            return rem;
        }
        if rem.is_negative() != other.is_negative() {
            rem.add(other)
        } else {
            rem
        }
    }

    fn abs_parts(&self) -> (bool, Self) {
        if self.is_negative() {
            (true, self.neg())
        } else {
            (false, self.clone())
        }
    }

    /// Two's complement negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        if self.value.is_zero() {
            self.clone()
        } else {
            Self {
                width: self.width,
                value: (BigUint::one() << self.width) - &self.value,
            }
        }
    }

    /// Increment by one, wrapping.
    #[must_use]
    pub fn inc(&self) -> Self {
        Self::new(self.width, &self.value + BigUint::one())
    }

    /// Decrement by one, wrapping.
    #[must_use]
    pub fn dec(&self) -> Self {
        self.sub(&Self::one(self.width))
    }

    /* ---- bitwise --------------------------------------------------------- */

    /// Bitwise NOT.
    #[must_use]
    pub fn not(&self) -> Self {
        Self {
            width: self.width,
            value: Self::mask(self.width) ^ &self.value,
        }
    }

    /// Bitwise AND.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Self {
            width: self.width,
            value: &self.value & &other.value,
        }
    }

    /// Bitwise OR.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self {
            width: self.width,
            value: &self.value | &other.value,
        }
    }

    /// Bitwise XOR.
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        Self {
            width: self.width,
            value: &self.value ^ &other.value,
        }
    }

    /// Bitwise NAND.
    #[must_use]
    pub fn nand(&self, other: &Self) -> Self {
        self.and(other).not()
    }

    /// Bitwise NOR.
    #[must_use]
    pub fn nor(&self, other: &Self) -> Self {
        self.or(other).not()
    }

    /// Bitwise XNOR.
    #[must_use]
    pub fn xnor(&self, other: &Self) -> Self {
        self.xor(other).not()
    }

    /* ---- shifts and rotates ---------------------------------------------- */

    /// Logical shift left; amounts >= width yield zero.
    #[must_use]
    pub fn shl(&self, amount: &Self) -> Self {
        match amount.to_u64() {
            Some(n) if n < self.width => Self::new(self.width, &self.value << n),
            _ => Self::zero(self.width),
        }
    }

    /// Logical shift right; amounts >= width yield zero.
    #[must_use]
    pub fn shr(&self, amount: &Self) -> Self {
        match amount.to_u64() {
            Some(n) if n < self.width => Self::new(self.width, &self.value >> n),
            _ => Self::zero(self.width),
        }
    }

    /// Arithmetic shift right; amounts >= width yield the sign fill.
    #[must_use]
    pub fn ashr(&self, amount: &Self) -> Self {
        let fill = self.msb();
        match amount.to_u64() {
            Some(n) if n < self.width => {
                let shifted = &self.value >> n;
                if fill {
                    let high = Self::mask(self.width) ^ Self::mask(self.width - n);
                    Self::new(self.width, shifted | high)
                } else {
                    Self::new(self.width, shifted)
                }
            }
            _ => {
                if fill {
                    Self::ones(self.width)
                } else {
                    Self::zero(self.width)
                }
            }
        }
    }

    /// Rotate left; the amount is taken modulo the width.
    #[must_use]
    pub fn rol(&self, amount: &Self) -> Self {
        let n = (&amount.value % BigUint::from(self.width))
            .to_u64()
            .unwrap_or(0);
        self.rol_by(n)
    }

    /// Rotate right; the amount is taken modulo the width.
    #[must_use]
    pub fn ror(&self, amount: &Self) -> Self {
        let n = (&amount.value % BigUint::from(self.width))
            .to_u64()
            .unwrap_or(0);
        self.ror_by(n)
    }

    /// Rotate left by a fixed amount.
    #[must_use]
    pub fn rol_by(&self, amount: u64) -> Self {
        let n = amount % self.width;
        if n == 0 {
            return self.clone();
        }
        let left = (&self.value << n) & Self::mask(self.width);
        let right = &self.value >> (self.width - n);
        Self::new(self.width, left | right)
    }

    /// Rotate right by a fixed amount.
    #[must_use]
    pub fn ror_by(&self, amount: u64) -> Self {
        let n = amount % self.width;
        self.rol_by((self.width - n) % self.width)
    }

    /* ---- structure ------------------------------------------------------- */

    /// Concatenation; `self` becomes the high part.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        Self {
            width: self.width + other.width,
            value: (&self.value << other.width) | &other.value,
        }
    }

    /// Extract bits `upper` down to `lower`, inclusive.
    pub fn extract(&self, upper: u64, lower: u64) -> Result<Self> {
        if upper < lower || upper >= self.width {
            return Err(type_error(format!(
                "invalid extract [{upper}:{lower}] on width {}",
                self.width
            )));
        }
        let width = upper - lower + 1;
        Ok(Self::new(width, &self.value >> lower))
    }

    /// Repeat the value `n` times.
    #[must_use]
    pub fn repeat(&self, n: u64) -> Self {
        debug_assert!(n >= 1);
        let mut res = self.clone();
        for _ in 1..n {
            res = res.concat(self);
        }
        res
    }

    /// Zero-extend by `n` bits.
    #[must_use]
    pub fn zero_extend(&self, n: u64) -> Self {
        Self {
            width: self.width + n,
            value: self.value.clone(),
        }
    }

    /// Sign-extend by `n` bits.
    #[must_use]
    pub fn sign_extend(&self, n: u64) -> Self {
        if self.msb() {
            let high = (Self::mask(n)) << self.width;
            Self {
                width: self.width + n,
                value: &self.value | high,
            }
        } else {
            self.zero_extend(n)
        }
    }

    /* ---- reductions and predicates --------------------------------------- */

    /// AND-reduction to a single bit.
    #[must_use]
    pub fn redand(&self) -> Self {
        Self::from_u64(1, self.is_ones() as u64)
    }

    /// OR-reduction to a single bit.
    #[must_use]
    pub fn redor(&self) -> Self {
        Self::from_u64(1, !self.is_zero() as u64)
    }

    /// XOR-reduction to a single bit (parity).
    #[must_use]
    pub fn redxor(&self) -> Self {
        Self::from_u64(1, (self.value.count_ones() & 1) as u64)
    }

    /// Single-bit equality comparison (`bvcomp`).
    #[must_use]
    pub fn comp(&self, other: &Self) -> Self {
        Self::from_u64(1, (self == other) as u64)
    }

    /// Unsigned less-than.
    #[must_use]
    pub fn ult(&self, other: &Self) -> bool {
        self.value < other.value
    }

    /// Unsigned less-or-equal.
    #[must_use]
    pub fn ule(&self, other: &Self) -> bool {
        self.value <= other.value
    }

    /// Unsigned greater-than.
    #[must_use]
    pub fn ugt(&self, other: &Self) -> bool {
        self.value > other.value
    }

    /// Unsigned greater-or-equal.
    #[must_use]
    pub fn uge(&self, other: &Self) -> bool {
        self.value >= other.value
    }

    /// Signed less-than.
    #[must_use]
    pub fn slt(&self, other: &Self) -> bool {
        self.signed_lt(other)
    }

    /// Signed less-or-equal.
    #[must_use]
    pub fn sle(&self, other: &Self) -> bool {
        !other.signed_lt(self)
    }

    /// Signed greater-than.
    #[must_use]
    pub fn sgt(&self, other: &Self) -> bool {
        other.signed_lt(self)
    }

    /// Signed greater-or-equal.
    #[must_use]
    pub fn sge(&self, other: &Self) -> bool {
        !self.signed_lt(other)
    }

    /* ---- overflow predicates --------------------------------------------- */

    /// Unsigned addition overflow.
    #[must_use]
    pub fn uaddo(&self, other: &Self) -> bool {
        &self.value + &other.value > Self::mask(self.width)
    }

    /// Signed addition overflow.
    #[must_use]
    pub fn saddo(&self, other: &Self) -> bool {
        let sum = self.add(other);
        self.msb() == other.msb() && sum.msb() != self.msb()
    }

    /// Unsigned subtraction overflow (borrow).
    #[must_use]
    pub fn usubo(&self, other: &Self) -> bool {
        self.value < other.value
    }

    /// Signed subtraction overflow.
    #[must_use]
    pub fn ssubo(&self, other: &Self) -> bool {
        let diff = self.sub(other);
        self.msb() != other.msb() && diff.msb() != self.msb()
    }

    /// Unsigned multiplication overflow.
    #[must_use]
    pub fn umulo(&self, other: &Self) -> bool {
        &self.value * &other.value > Self::mask(self.width)
    }

    /// Signed multiplication overflow.
    #[must_use]
    pub fn smulo(&self, other: &Self) -> bool {
        if self.width == 1 {
            // The only signed 1-bit product that overflows is -1 * -1 = 1.
            return self.msb() && other.msb();
        }
        let ext_a = self.sign_extend(self.width);
        let ext_b = other.sign_extend(self.width);
        let wide = ext_a.mul(&ext_b);
        let trunc = wide.extract(self.width - 1, 0).expect("in range");
        trunc.sign_extend(self.width) != wide
    }

    /// Signed division overflow (`min_signed / -1`).
    #[must_use]
    pub fn sdivo(&self, other: &Self) -> bool {
        self.is_min_signed() && other.is_ones()
    }
}

impl std::fmt::Display for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#b{}", self.to_string_base(2))
    }
}
