//! Floating-Point Circuit Templates.
//!
//! Every FP operation is written once, generic over a [`BvFactory`] that
//! supplies bit-vector operations. The concrete factory computes over
//! [`BitVector`] values (constant folding, model values); the solver's
//! symbolic factory builds BV terms (word-blasting). Both instantiations
//! therefore agree bit-for-bit on every operation.
//!
//! All templates operate on the packed sign/exponent/significand encoding
//! and keep control flow straight-line: loops are bounded by format widths
//! and branching happens through `ite` muxes only.

use super::format::FpFormat;
use crate::bv::BitVector;

/// Bit-vector operations required by the FP templates.
///
/// Predicates return width-1 vectors (1 = true). `ite` selects on a
/// width-1 condition.
pub trait BvFactory {
    /// The bit-vector representation (a value or a term).
    type Bv: Clone;

    /// Embed a concrete constant.
    fn constant(&mut self, value: BitVector) -> Self::Bv;
    /// Width of a vector.
    fn width(&self, a: &Self::Bv) -> u64;
    /// Bitwise NOT.
    fn not(&mut self, a: &Self::Bv) -> Self::Bv;
    /// Bitwise AND.
    fn and(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Bitwise OR.
    fn or(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Bitwise XOR.
    fn xor(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Wrapping addition.
    fn add(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Wrapping subtraction.
    fn sub(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Wrapping multiplication.
    fn mul(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Unsigned division (SMT-LIB division-by-zero semantics).
    fn udiv(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Unsigned remainder.
    fn urem(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Two's complement negation.
    fn neg(&mut self, a: &Self::Bv) -> Self::Bv;
    /// Logical shift left.
    fn shl(&mut self, a: &Self::Bv, amount: &Self::Bv) -> Self::Bv;
    /// Logical shift right.
    fn lshr(&mut self, a: &Self::Bv, amount: &Self::Bv) -> Self::Bv;
    /// Arithmetic shift right.
    fn ashr(&mut self, a: &Self::Bv, amount: &Self::Bv) -> Self::Bv;
    /// Concatenation, `hi` on top.
    fn concat(&mut self, hi: &Self::Bv, lo: &Self::Bv) -> Self::Bv;
    /// Extract bits `upper..=lower`.
    fn extract(&mut self, a: &Self::Bv, upper: u64, lower: u64) -> Self::Bv;
    /// Zero-extension by `n` bits.
    fn zero_extend(&mut self, a: &Self::Bv, n: u64) -> Self::Bv;
    /// Sign-extension by `n` bits.
    fn sign_extend(&mut self, a: &Self::Bv, n: u64) -> Self::Bv;
    /// Equality, width 1.
    fn eq(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Unsigned less-than, width 1.
    fn ult(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Unsigned less-or-equal, width 1.
    fn ule(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Signed less-than, width 1.
    fn slt(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Signed less-or-equal, width 1.
    fn sle(&mut self, a: &Self::Bv, b: &Self::Bv) -> Self::Bv;
    /// Mux on a width-1 condition.
    fn ite(&mut self, cond: &Self::Bv, then: &Self::Bv, els: &Self::Bv) -> Self::Bv;
}

/* ---- small helpers -------------------------------------------------------- */

fn c<F: BvFactory>(f: &mut F, width: u64, value: u64) -> F::Bv {
    f.constant(BitVector::from_u64(width, value))
}

fn ci<F: BvFactory>(f: &mut F, width: u64, value: i64) -> F::Bv {
    f.constant(BitVector::from_i64(width, value))
}

fn tru<F: BvFactory>(f: &mut F) -> F::Bv {
    c(f, 1, 1)
}

fn fls<F: BvFactory>(f: &mut F) -> F::Bv {
    c(f, 1, 0)
}

fn ne_zero<F: BvFactory>(f: &mut F, a: &F::Bv) -> F::Bv {
    let w = f.width(a);
    let z = c(f, w, 0);
    let e = f.eq(a, &z);
    f.not(&e)
}

fn sgt<F: BvFactory>(f: &mut F, a: &F::Bv, b: &F::Bv) -> F::Bv {
    f.slt(b, a)
}

fn sge<F: BvFactory>(f: &mut F, a: &F::Bv, b: &F::Bv) -> F::Bv {
    f.sle(b, a)
}

/// Zero-extend or truncate to `target` bits.
fn resize<F: BvFactory>(f: &mut F, a: &F::Bv, target: u64) -> F::Bv {
    let w = f.width(a);
    if target > w {
        f.zero_extend(a, target - w)
    } else if target < w {
        f.extract(a, target - 1, 0)
    } else {
        a.clone()
    }
}

fn or3<F: BvFactory>(f: &mut F, a: &F::Bv, b: &F::Bv, x: &F::Bv) -> F::Bv {
    let ab = f.or(a, b);
    f.or(&ab, x)
}

/// Right shift preserving shifted-out bits as a sticky OR in bit 0.
fn sticky_rshift<F: BvFactory>(f: &mut F, a: &F::Bv, amount: &F::Bv) -> F::Bv {
    let w = f.width(a);
    let zeros = c(f, w, 0);
    let wide = f.concat(a, &zeros);
    let amt = resize(f, amount, 2 * w);
    let shifted = f.lshr(&wide, &amt);
    let hi = f.extract(&shifted, 2 * w - 1, w);
    let lo = f.extract(&shifted, w - 1, 0);
    let sticky = ne_zero(f, &lo);
    let sticky_w = f.zero_extend(&sticky, w - 1);
    f.or(&hi, &sticky_w)
}

/// Shift `sig` left until the bit at position `top` is set, adjusting `exp`
/// down accordingly. Straight-line: log-many conditional shifts.
fn normalize_left<F: BvFactory>(
    f: &mut F,
    mut sig: F::Bv,
    mut exp: F::Bv,
    top: u64,
) -> (F::Bv, F::Bv) {
    let w = f.width(&sig);
    let ew = f.width(&exp);
    let steps = 64 - u64::leading_zeros(w) as u64; // ceil(log2(w)) + 1
    for i in (0..steps).rev() {
        let sh = 1u64 << i;
        if sh > top {
            continue;
        }
        let msb = f.extract(&sig, top, top);
        let nz = ne_zero(f, &sig);
        let msb_clear = f.not(&msb);
        let cond = f.and(&msb_clear, &nz);
        let sh_bv = c(f, w, sh);
        let shifted = f.shl(&sig, &sh_bv);
        sig = f.ite(&cond, &shifted, &sig);
        let dec = c(f, ew, sh);
        let exp2 = f.sub(&exp, &dec);
        exp = f.ite(&cond, &exp2, &exp);
    }
    (sig, exp)
}

/* ---- packed special values ------------------------------------------------ */

/// The canonical quiet NaN: sign 0, all-ones exponent, MSB-set significand.
pub fn packed_nan<F: BvFactory>(f: &mut F, fmt: &FpFormat) -> F::Bv {
    let e = fmt.exp_bits;
    let s = fmt.sig_bits;
    let sign = fls(f);
    let exp = f.constant(BitVector::ones(e));
    let sig = f.constant(BitVector::min_signed(s - 1));
    let se = f.concat(&sign, &exp);
    f.concat(&se, &sig)
}

/// Packed infinity with the given sign bit.
pub fn packed_inf<F: BvFactory>(f: &mut F, fmt: &FpFormat, sign: &F::Bv) -> F::Bv {
    let exp = f.constant(BitVector::ones(fmt.exp_bits));
    let sig = c(f, fmt.sig_bits - 1, 0);
    let se = f.concat(sign, &exp);
    f.concat(&se, &sig)
}

/// Packed zero with the given sign bit.
pub fn packed_zero<F: BvFactory>(f: &mut F, fmt: &FpFormat, sign: &F::Bv) -> F::Bv {
    let rest = c(f, fmt.packed_width() - 1, 0);
    f.concat(sign, &rest)
}

/// Largest finite value with the given sign bit.
pub fn packed_max_normal<F: BvFactory>(f: &mut F, fmt: &FpFormat, sign: &F::Bv) -> F::Bv {
    let e = fmt.exp_bits;
    let exp = f.constant(BitVector::ones(e).dec());
    let sig = f.constant(BitVector::ones(fmt.sig_bits - 1));
    let se = f.concat(sign, &exp);
    f.concat(&se, &sig)
}

/* ---- unpacking ------------------------------------------------------------ */

/// A floating-point value unpacked for arithmetic.
///
/// For nonzero finite values `sig` is normalized (MSB set) with the hidden
/// bit explicit and `exp` is the unbiased exponent (subnormals have
/// `exp < e_min`). Zeros carry `sig = 0` and the most negative working
/// exponent so magnitude comparisons order them below all finite values.
pub struct Unpacked<B> {
    /// NaN flag, width 1.
    pub nan: B,
    /// Infinity flag, width 1.
    pub inf: B,
    /// Zero flag, width 1.
    pub zero: B,
    /// Sign bit, width 1.
    pub sign: B,
    /// Unbiased signed exponent in the working width.
    pub exp: B,
    /// Normalized significand, `sig_bits` wide.
    pub sig: B,
}

/// Working exponent width for intermediates over an `n`-bit significand.
///
/// Wide enough that every exponent difference formed during alignment
/// (including against the below-everything zero exponent) stays in range.
fn work_exp_bits(fmt: &FpFormat, n: u64) -> u64 {
    let mag = (1u64 << (fmt.exp_bits + 1)) + n + 16;
    let need = 66 - u64::from(mag.leading_zeros());
    (fmt.exp_bits + 2).max(need)
}

/// The working exponent used by zeros: below every normalized finite
/// exponent of the format, but far from the signed range limits.
fn zero_exp<F: BvFactory>(f: &mut F, fmt: &FpFormat, ew: u64) -> F::Bv {
    ci(f, ew, fmt.e_min() - fmt.sig_bits as i64 - 4)
}

/// Unpack a packed encoding into normalized components with a working
/// exponent of `ew` bits.
pub fn unpack<F: BvFactory>(f: &mut F, fmt: &FpFormat, ew: u64, packed: &F::Bv) -> Unpacked<F::Bv> {
    let e = fmt.exp_bits;
    let s = fmt.sig_bits;
    let w = fmt.packed_width();

    let sign = f.extract(packed, w - 1, w - 1);
    let exp_field = f.extract(packed, w - 2, s - 1);
    let sig_field = f.extract(packed, s - 2, 0);

    let ones_e = f.constant(BitVector::ones(e));
    let exp_all_ones = f.eq(&exp_field, &ones_e);
    let zero_e = c(f, e, 0);
    let exp_is_zero = f.eq(&exp_field, &zero_e);
    let sig_is_zero = {
        let nz = ne_zero(f, &sig_field);
        f.not(&nz)
    };
    let sig_nonzero = f.not(&sig_is_zero);

    let nan = f.and(&exp_all_ones, &sig_nonzero);
    let inf = f.and(&exp_all_ones, &sig_is_zero);
    let zero = f.and(&exp_is_zero, &sig_is_zero);

    // Hidden bit: 1 for normals, 0 for subnormals.
    let hidden = f.not(&exp_is_zero);
    let sig0 = f.concat(&hidden, &sig_field);

    let exp_ext = f.zero_extend(&exp_field, ew - e);
    let bias = ci(f, ew, fmt.bias());
    let unbiased = f.sub(&exp_ext, &bias);
    let e_min = ci(f, ew, fmt.e_min());
    let exp0 = f.ite(&exp_is_zero, &e_min, &unbiased);

    // Normalize subnormal significands so arithmetic is uniform.
    let (sig1, exp1) = normalize_left(f, sig0, exp0, s - 1);

    let zexp = zero_exp(f, fmt, ew);
    let exp2 = f.ite(&zero, &zexp, &exp1);

    Unpacked {
        nan,
        inf,
        zero,
        sign,
        exp: exp2,
        sig: sig1,
    }
}

/* ---- rounding ------------------------------------------------------------- */

/// Rounding-mode selector bits derived from a 3-bit rounding-mode vector.
struct RmFlags<B> {
    rne: B,
    rna: B,
    rtn: B,
    rtp: B,
}

fn rm_flags<F: BvFactory>(f: &mut F, rm: &F::Bv) -> RmFlags<F::Bv> {
    let c0 = c(f, 3, 0);
    let c1 = c(f, 3, 1);
    let c2 = c(f, 3, 2);
    let c3 = c(f, 3, 3);
    RmFlags {
        rne: f.eq(rm, &c0),
        rna: f.eq(rm, &c1),
        rtn: f.eq(rm, &c2),
        rtp: f.eq(rm, &c3),
    }
}

fn round_increment<F: BvFactory>(
    f: &mut F,
    rm: &RmFlags<F::Bv>,
    sign: &F::Bv,
    lsb: &F::Bv,
    guard: &F::Bv,
    sticky: &F::Bv,
) -> F::Bv {
    let gs = f.or(guard, sticky);
    let ls = f.or(lsb, sticky);
    let rne_up = {
        let g_ls = f.and(guard, &ls);
        f.and(&rm.rne, &g_ls)
    };
    let rna_up = f.and(&rm.rna, guard);
    let rtp_up = {
        let pos = f.not(sign);
        let p_gs = f.and(&pos, &gs);
        f.and(&rm.rtp, &p_gs)
    };
    let rtn_up = {
        let n_gs = f.and(sign, &gs);
        f.and(&rm.rtn, &n_gs)
    };
    let a = f.or(&rne_up, &rna_up);
    or3(f, &a, &rtp_up, &rtn_up)
}

/// Round and pack a finite result.
///
/// `sig` is `sig_bits + 2` wide: the normalized significand (MSB set unless
/// the value is exactly zero) followed by a guard bit and a sticky bit,
/// denoting a magnitude in `[1, 2) * 2^exp`. Handles subnormal flushing,
/// overflow to infinity or the largest finite value, and exact zeros.
pub fn round_and_pack<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    sign: &F::Bv,
    exp: &F::Bv,
    sig: &F::Bv,
) -> F::Bv {
    let e = fmt.exp_bits;
    let s = fmt.sig_bits;
    let ew = f.width(exp);
    let flags = rm_flags(f, rm);

    // Subnormal pre-shift: move the rounding point to the subnormal ulp.
    let e_min = ci(f, ew, fmt.e_min());
    let is_sub = f.slt(exp, &e_min);
    let diff = f.sub(&e_min, exp);
    let cap = ci(f, ew, (s + 2) as i64);
    let over_cap = sgt(f, &diff, &cap);
    let clamped = f.ite(&over_cap, &cap, &diff);
    let zero_sh = c(f, ew, 0);
    let shift = f.ite(&is_sub, &clamped, &zero_sh);
    let shift_n = resize(f, &shift, s + 2);
    let sig2 = sticky_rshift(f, sig, &shift_n);
    let exp2 = f.ite(&is_sub, &e_min, exp);

    // Round to nearest ulp.
    let lsb = f.extract(&sig2, 2, 2);
    let guard = f.extract(&sig2, 1, 1);
    let sticky = f.extract(&sig2, 0, 0);
    let up = round_increment(f, &flags, sign, &lsb, &guard, &sticky);

    let kept = f.extract(&sig2, s + 1, 2);
    let kept_x = f.zero_extend(&kept, 1);
    let up_x = f.zero_extend(&up, s);
    let rounded = f.add(&kept_x, &up_x);
    let carry = f.extract(&rounded, s, s);
    let hi_part = f.extract(&rounded, s, 1);
    let lo_part = f.extract(&rounded, s - 1, 0);
    let sig3 = f.ite(&carry, &hi_part, &lo_part);
    let carry_x = f.zero_extend(&carry, ew - 1);
    let exp3 = f.add(&exp2, &carry_x);

    // Pack the finite result; a clear MSB means subnormal (exponent field 0).
    let bias = ci(f, ew, fmt.bias());
    let biased = f.add(&exp3, &bias);
    let exp_field = resize(f, &biased, e);
    let msb3 = f.extract(&sig3, s - 1, s - 1);
    let zero_e = c(f, e, 0);
    let exp_packed = f.ite(&msb3, &exp_field, &zero_e);
    let sig_field = f.extract(&sig3, s - 2, 0);
    let se = f.concat(sign, &exp_packed);
    let finite = f.concat(&se, &sig_field);

    // Overflow: infinity or the largest finite value, per rounding mode.
    let e_max = ci(f, ew, fmt.e_max());
    let overflow = sgt(f, &exp3, &e_max);
    let neg = sign;
    let pos = f.not(neg);
    let rtp_pos = f.and(&flags.rtp, &pos);
    let rtn_neg = f.and(&flags.rtn, neg);
    let nearest = f.or(&flags.rne, &flags.rna);
    let to_inf = or3(f, &nearest, &rtp_pos, &rtn_neg);
    let inf = packed_inf(f, fmt, sign);
    let max_fin = packed_max_normal(f, fmt, sign);
    let ovf_res = f.ite(&to_inf, &inf, &max_fin);
    f.ite(&overflow, &ovf_res, &finite)
}

/* ---- magnitude addition core ---------------------------------------------- */

struct MagSum<B> {
    sign: B,
    exp: B,
    /// `n + 2` bits: normalized significand, guard, sticky.
    sig: B,
    zero: B,
    zero_sign: B,
}

/// Add two signed magnitudes with `n`-bit normalized significands (zero
/// operands carry `sig = 0` and the most negative exponent). Produces a
/// normalized significand with guard and sticky bits ready for rounding.
fn add_magnitudes<F: BvFactory>(
    f: &mut F,
    n: u64,
    rtn: &F::Bv,
    sign_a: &F::Bv,
    exp_a: &F::Bv,
    sig_a: &F::Bv,
    sign_b: &F::Bv,
    exp_b: &F::Bv,
    sig_b: &F::Bv,
) -> MagSum<F::Bv> {
    let w = n + 4; // carry | n significand bits | guard, round, sticky
    let ew = f.width(exp_a);

    // Order operands by magnitude so the subtraction below cannot borrow.
    let exp_lt = f.slt(exp_a, exp_b);
    let exp_eq = f.eq(exp_a, exp_b);
    let sig_lt = f.ult(sig_a, sig_b);
    let eq_and_lt = f.and(&exp_eq, &sig_lt);
    let swap = f.or(&exp_lt, &eq_and_lt);

    let sign_l = f.ite(&swap, sign_b, sign_a);
    let exp_l = f.ite(&swap, exp_b, exp_a);
    let sig_l = f.ite(&swap, sig_b, sig_a);
    let sign_s = f.ite(&swap, sign_a, sign_b);
    let exp_s = f.ite(&swap, exp_a, exp_b);
    let sig_s = f.ite(&swap, sig_a, sig_b);

    // Align the smaller operand, folding shifted-out bits into sticky.
    let diff = f.sub(&exp_l, &exp_s);
    let cap = ci(f, ew, (n + 3) as i64);
    let over = sgt(f, &diff, &cap);
    let sh = f.ite(&over, &cap, &diff);

    let grs = c(f, 3, 0);
    let big0 = f.concat(&sig_l, &grs);
    let big = f.zero_extend(&big0, 1);
    let small0 = f.concat(&sig_s, &grs);
    let small1 = f.zero_extend(&small0, 1);
    let sh_n = resize(f, &sh, w);
    let small = sticky_rshift(f, &small1, &sh_n);

    let eff_sub = f.xor(&sign_l, &sign_s);
    let sum_add = f.add(&big, &small);
    let sum_sub = f.sub(&big, &small);
    let sum = f.ite(&eff_sub, &sum_sub, &sum_add);

    let zero = {
        let nz = ne_zero(f, &sum);
        f.not(&nz)
    };
    // Exact cancellation is +0 except under RTN; same-sign zero sums keep
    // the common sign.
    let neg_zero = tru(f);
    let pos_zero = fls(f);
    let cancel_sign = f.ite(rtn, &neg_zero, &pos_zero);
    let zero_sign = f.ite(&eff_sub, &cancel_sign, &sign_l);

    // Renormalize: one right shift on carry, log-many left shifts after
    // cancellation.
    let carry = f.extract(&sum, w - 1, w - 1);
    let dropped = f.extract(&sum, 0, 0);
    let shifted1 = {
        let one = c(f, w, 1);
        f.lshr(&sum, &one)
    };
    let sticky_keep = f.zero_extend(&dropped, w - 1);
    let shifted = f.or(&shifted1, &sticky_keep);
    let sum2 = f.ite(&carry, &shifted, &sum);
    let carry_x = f.zero_extend(&carry, ew - 1);
    let exp_c = f.add(&exp_l, &carry_x);

    let (sum3, exp2) = normalize_left(f, sum2, exp_c, w - 2);

    // Collapse G, R, S into guard and sticky.
    let top = f.extract(&sum3, w - 2, 3);
    let g = f.extract(&sum3, 2, 2);
    let r = f.extract(&sum3, 1, 1);
    let st = f.extract(&sum3, 0, 0);
    let rs = f.or(&r, &st);
    let tg = f.concat(&top, &g);
    let sig = f.concat(&tg, &rs);

    MagSum {
        sign: sign_l,
        exp: exp2,
        sig,
        zero,
        zero_sign,
    }
}

/* ---- classification ------------------------------------------------------- */

/// `fp.isNaN`, width-1 result.
pub fn is_nan<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    unpack(f, fmt, ew, a).nan
}

/// `fp.isInfinite`, width-1 result.
pub fn is_inf<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    unpack(f, fmt, ew, a).inf
}

/// `fp.isZero`, width-1 result.
pub fn is_zero<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    unpack(f, fmt, ew, a).zero
}

/// `fp.isNormal`, width-1 result.
pub fn is_normal<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let u = unpack(f, fmt, ew, a);
    let special = or3(f, &u.nan, &u.inf, &u.zero);
    let finite = f.not(&special);
    let e_min = ci(f, ew, fmt.e_min());
    let ge = sge(f, &u.exp, &e_min);
    f.and(&finite, &ge)
}

/// `fp.isSubnormal`, width-1 result.
pub fn is_subnormal<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let u = unpack(f, fmt, ew, a);
    let special = or3(f, &u.nan, &u.inf, &u.zero);
    let finite = f.not(&special);
    let e_min = ci(f, ew, fmt.e_min());
    let lt = f.slt(&u.exp, &e_min);
    f.and(&finite, &lt)
}

/// `fp.isNegative`, width-1 result.
pub fn is_negative<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let u = unpack(f, fmt, ew, a);
    let not_nan = f.not(&u.nan);
    f.and(&not_nan, &u.sign)
}

/// `fp.isPositive`, width-1 result.
pub fn is_positive<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let u = unpack(f, fmt, ew, a);
    let not_nan = f.not(&u.nan);
    let pos = f.not(&u.sign);
    f.and(&not_nan, &pos)
}

/* ---- sign operations ------------------------------------------------------ */

/// `fp.abs`: clear the sign bit.
pub fn fp_abs<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let w = fmt.packed_width();
    let rest = f.extract(a, w - 2, 0);
    let zero = fls(f);
    f.concat(&zero, &rest)
}

/// `fp.neg`: flip the sign bit.
pub fn fp_neg<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv) -> F::Bv {
    let w = fmt.packed_width();
    let sign = f.extract(a, w - 1, w - 1);
    let flipped = f.not(&sign);
    let rest = f.extract(a, w - 2, 0);
    f.concat(&flipped, &rest)
}

/* ---- comparisons ---------------------------------------------------------- */

/// `fp.eq` (IEEE equality: NaN compares false, zeros compare equal).
pub fn fp_eq<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let either_nan = f.or(&ua.nan, &ub.nan);
    let no_nan = f.not(&either_nan);
    let both_zero = f.and(&ua.zero, &ub.zero);
    let sign_eq = f.eq(&ua.sign, &ub.sign);
    let exp_eq = f.eq(&ua.exp, &ub.exp);
    let sig_eq = f.eq(&ua.sig, &ub.sig);
    let se = f.and(&sign_eq, &exp_eq);
    let struct_eq = f.and(&se, &sig_eq);
    let value_eq = f.or(&both_zero, &struct_eq);
    f.and(&no_nan, &value_eq)
}

/// `fp.lt`.
pub fn fp_lt<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let either_nan = f.or(&ua.nan, &ub.nan);
    let no_nan = f.not(&either_nan);
    let both_zero = f.and(&ua.zero, &ub.zero);

    // Magnitude order: infinities above all finite values, zeros below
    // (their working exponent is the minimum).
    let exp_lt = f.slt(&ua.exp, &ub.exp);
    let exp_eq = f.eq(&ua.exp, &ub.exp);
    let sig_lt = f.ult(&ua.sig, &ub.sig);
    let fin_lt = {
        let t = f.and(&exp_eq, &sig_lt);
        f.or(&exp_lt, &t)
    };
    let a_not_inf = f.not(&ua.inf);
    let mag_lt = {
        // a < b in magnitude: b infinite and a not, or neither infinite and
        // the (exp, sig) pair is smaller.
        let b_inf_gt = f.and(&ub.inf, &a_not_inf);
        let b_not_inf = f.not(&ub.inf);
        let fin_cmp = f.and(&b_not_inf, &fin_lt);
        let fin_cmp2 = f.and(&fin_cmp, &a_not_inf);
        f.or(&b_inf_gt, &fin_cmp2)
    };
    let mag_gt = {
        let exp_gt = sgt(f, &ua.exp, &ub.exp);
        let sig_gt = f.ult(&ub.sig, &ua.sig);
        let t = f.and(&exp_eq, &sig_gt);
        let fin_gt = f.or(&exp_gt, &t);
        let a_inf_gt = {
            let b_not_inf = f.not(&ub.inf);
            f.and(&ua.inf, &b_not_inf)
        };
        let b_not_inf = f.not(&ub.inf);
        let fin_cmp = f.and(&b_not_inf, &fin_gt);
        let fin_cmp2 = f.and(&fin_cmp, &a_not_inf);
        f.or(&a_inf_gt, &fin_cmp2)
    };

    // Sign split: negative < positive unless both are zero.
    let a_neg = &ua.sign;
    let b_neg = &ub.sign;
    let b_pos = f.not(b_neg);
    let neg_pos = f.and(a_neg, &b_pos);
    let both_neg = f.and(a_neg, b_neg);
    let both_pos = {
        let an = f.not(a_neg);
        f.and(&an, &b_pos)
    };
    let neg_case = f.and(&both_neg, &mag_gt);
    let pos_case = f.and(&both_pos, &mag_lt);
    let lt = or3(f, &neg_pos, &neg_case, &pos_case);
    let not_both_zero = f.not(&both_zero);
    let lt2 = f.and(&lt, &not_both_zero);
    f.and(&no_nan, &lt2)
}

/// `fp.leq`.
pub fn fp_le<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let lt = fp_lt(f, fmt, a, b);
    let eq = fp_eq(f, fmt, a, b);
    f.or(&lt, &eq)
}

/// `fp.min`; `min(-0, +0)` is `-0`.
pub fn fp_min<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let lt = fp_lt(f, fmt, a, b);
    let both_zero = f.and(&ua.zero, &ub.zero);
    let either_neg = f.or(&ua.sign, &ub.sign);
    let neg_zero = packed_zero(f, fmt, &either_neg);
    let pick = f.ite(&lt, a, b);
    let res = f.ite(&both_zero, &neg_zero, &pick);
    let res = f.ite(&ub.nan, a, &res);
    f.ite(&ua.nan, b, &res)
}

/// `fp.max`; `max(-0, +0)` is `+0`.
pub fn fp_max<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let ew = work_exp_bits(fmt, fmt.sig_bits);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let gt = fp_lt(f, fmt, b, a);
    let both_zero = f.and(&ua.zero, &ub.zero);
    let both_neg = f.and(&ua.sign, &ub.sign);
    let zero_res = packed_zero(f, fmt, &both_neg);
    let pick = f.ite(&gt, a, b);
    let res = f.ite(&both_zero, &zero_res, &pick);
    let res = f.ite(&ub.nan, a, &res);
    f.ite(&ua.nan, b, &res)
}

/* ---- addition ------------------------------------------------------------- */

/// `fp.add` / `fp.sub` (with `subtract` flipping the second operand).
pub fn fp_add<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    a: &F::Bv,
    b: &F::Bv,
    subtract: bool,
) -> F::Bv {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let sign_b = if subtract {
        f.not(&ub.sign)
    } else {
        ub.sign.clone()
    };

    let flags = rm_flags(f, rm);
    let sum = add_magnitudes(
        f, s, &flags.rtn, &ua.sign, &ua.exp, &ua.sig, &sign_b, &ub.exp, &ub.sig,
    );
    let rounded = round_and_pack(f, fmt, rm, &sum.sign, &sum.exp, &sum.sig);
    let zero_pack = packed_zero(f, fmt, &sum.zero_sign);
    let finite = f.ite(&sum.zero, &zero_pack, &rounded);

    // Special cases, in priority order.
    let nan = packed_nan(f, fmt);
    let inf_a = packed_inf(f, fmt, &ua.sign);
    let inf_b = packed_inf(f, fmt, &sign_b);
    let both_inf = f.and(&ua.inf, &ub.inf);
    let signs_differ = f.xor(&ua.sign, &sign_b);
    let inf_conflict = f.and(&both_inf, &signs_differ);

    let res = f.ite(&ub.inf, &inf_b, &finite);
    let res = f.ite(&ua.inf, &inf_a, &res);
    let res = f.ite(&inf_conflict, &nan, &res);
    let either_nan = f.or(&ua.nan, &ub.nan);
    f.ite(&either_nan, &nan, &res)
}

/* ---- multiplication ------------------------------------------------------- */

/// `fp.mul`.
pub fn fp_mul<F: BvFactory>(f: &mut F, fmt: &FpFormat, rm: &F::Bv, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let sign = f.xor(&ua.sign, &ub.sign);

    let sig_a = f.zero_extend(&ua.sig, s);
    let sig_b = f.zero_extend(&ub.sig, s);
    let prod = f.mul(&sig_a, &sig_b); // 2s bits, in [1, 4) at scale 2^(2s-2)
    let exp0 = f.add(&ua.exp, &ub.exp);

    let top = f.extract(&prod, 2 * s - 1, 2 * s - 1);
    // Top bit set: product in [2, 4), exponent bumps by one.
    let hi_kept = f.extract(&prod, 2 * s - 1, s);
    let hi_guard = f.extract(&prod, s - 1, s - 1);
    let hi_rest = f.extract(&prod, s - 2, 0);
    let hi_sticky = ne_zero(f, &hi_rest);
    let lo_kept = f.extract(&prod, 2 * s - 2, s - 1);
    let lo_guard = f.extract(&prod, s - 2, s - 2);
    let lo_sticky = if s >= 3 {
        let lo_rest = f.extract(&prod, s - 3, 0);
        ne_zero(f, &lo_rest)
    } else {
        fls(f)
    };
    let kept = f.ite(&top, &hi_kept, &lo_kept);
    let guard = f.ite(&top, &hi_guard, &lo_guard);
    let sticky = f.ite(&top, &hi_sticky, &lo_sticky);
    let one = c(f, ew, 1);
    let exp_hi = f.add(&exp0, &one);
    let exp = f.ite(&top, &exp_hi, &exp0);

    let kg = f.concat(&kept, &guard);
    let sig = f.concat(&kg, &sticky);
    let rounded = round_and_pack(f, fmt, rm, &sign, &exp, &sig);

    // Specials.
    let nan = packed_nan(f, fmt);
    let inf = packed_inf(f, fmt, &sign);
    let zero = packed_zero(f, fmt, &sign);
    let either_zero = f.or(&ua.zero, &ub.zero);
    let either_inf = f.or(&ua.inf, &ub.inf);
    let inf_times_zero = f.and(&either_inf, &either_zero);

    let res = f.ite(&either_zero, &zero, &rounded);
    let res = f.ite(&either_inf, &inf, &res);
    let res = f.ite(&inf_times_zero, &nan, &res);
    let either_nan = f.or(&ua.nan, &ub.nan);
    f.ite(&either_nan, &nan, &res)
}

/* ---- division ------------------------------------------------------------- */

/// `fp.div`.
pub fn fp_div<F: BvFactory>(f: &mut F, fmt: &FpFormat, rm: &F::Bv, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let sign = f.xor(&ua.sign, &ub.sign);
    let exp0 = f.sub(&ua.exp, &ub.exp);

    // Fixed-point quotient with s + 2 fraction bits.
    let wq = 2 * s + 3;
    let sig_a_w = f.zero_extend(&ua.sig, wq - s);
    let shift = c(f, wq, s + 2);
    let dividend = f.shl(&sig_a_w, &shift);
    let divisor = f.zero_extend(&ub.sig, wq - s);
    let q = f.udiv(&dividend, &divisor);
    let r = f.urem(&dividend, &divisor);
    let rem_sticky = ne_zero(f, &r);

    // Quotient is in (2^(s+1), 2^(s+3)); normalize to s bits + guard.
    let top = f.extract(&q, s + 2, s + 2);
    let hi_kept = f.extract(&q, s + 2, 3);
    let hi_guard = f.extract(&q, 2, 2);
    let hi_rest = f.extract(&q, 1, 0);
    let hi_sticky = ne_zero(f, &hi_rest);
    let lo_kept = f.extract(&q, s + 1, 2);
    let lo_guard = f.extract(&q, 1, 1);
    let lo_sticky = f.extract(&q, 0, 0);
    let kept = f.ite(&top, &hi_kept, &lo_kept);
    let guard = f.ite(&top, &hi_guard, &lo_guard);
    let sticky0 = f.ite(&top, &hi_sticky, &lo_sticky);
    let sticky = f.or(&sticky0, &rem_sticky);
    let one = c(f, ew, 1);
    let exp_lo = f.sub(&exp0, &one);
    let exp = f.ite(&top, &exp0, &exp_lo);

    let kg = f.concat(&kept, &guard);
    let sig = f.concat(&kg, &sticky);
    let rounded = round_and_pack(f, fmt, rm, &sign, &exp, &sig);

    // Specials.
    let nan = packed_nan(f, fmt);
    let inf = packed_inf(f, fmt, &sign);
    let zero = packed_zero(f, fmt, &sign);
    let both_inf = f.and(&ua.inf, &ub.inf);
    let both_zero = f.and(&ua.zero, &ub.zero);

    let res = f.ite(&ub.zero, &inf, &rounded);
    let res = f.ite(&ua.zero, &zero, &res);
    let res = f.ite(&ub.inf, &zero, &res);
    let res = f.ite(&ua.inf, &inf, &res);
    let invalid = f.or(&both_inf, &both_zero);
    let res = f.ite(&invalid, &nan, &res);
    let either_nan = f.or(&ua.nan, &ub.nan);
    f.ite(&either_nan, &nan, &res)
}

/* ---- square root ---------------------------------------------------------- */

/// `fp.sqrt`.
pub fn fp_sqrt<F: BvFactory>(f: &mut F, fmt: &FpFormat, rm: &F::Bv, a: &F::Bv) -> F::Bv {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s);
    let ua = unpack(f, fmt, ew, a);

    // Make the exponent even so it halves exactly.
    let odd = f.extract(&ua.exp, 0, 0);
    let sig_x = f.zero_extend(&ua.sig, 1); // s + 1 bits
    let one_s = c(f, s + 1, 1);
    let sig_shifted = f.shl(&sig_x, &one_s);
    let sig_ext = f.ite(&odd, &sig_shifted, &sig_x);
    let odd_e = f.zero_extend(&odd, ew - 1);
    let exp_even = f.sub(&ua.exp, &odd_e);
    // Arithmetic halve of an even value.
    let one_e = c(f, ew, 1);
    let exp_half = f.ashr(&exp_even, &one_e);

    // Digit-by-digit square root of sig_ext << (s + 3); the root has
    // exactly s + 2 bits with the MSB set.
    let nw = 2 * s + 4;
    let radicand = {
        let wide = f.zero_extend(&sig_ext, nw - (s + 1));
        let amt = c(f, nw, s + 3);
        f.shl(&wide, &amt)
    };
    let root_w = s + 2;
    let rw = root_w + 2;
    let mut root = c(f, rw, 0);
    let mut rem = c(f, rw, 0);
    for i in (0..root_w).rev() {
        // rem = rem * 4 + next two radicand bits
        let next2 = f.extract(&radicand, 2 * i + 1, 2 * i);
        let next2_w = f.zero_extend(&next2, rw - 2);
        let four = c(f, rw, 2);
        let rem4 = f.shl(&rem, &four);
        let rem_in = f.or(&rem4, &next2_w);
        // trial = root * 4 + 1
        let two = c(f, rw, 2);
        let root4 = f.shl(&root, &two);
        let one = c(f, rw, 1);
        let trial = f.or(&root4, &one);
        let fits = f.ule(&trial, &rem_in);
        let rem_sub = f.sub(&rem_in, &trial);
        rem = f.ite(&fits, &rem_sub, &rem_in);
        let one_sh = c(f, rw, 1);
        let root2 = f.shl(&root, &one_sh);
        let root2p1 = f.or(&root2, &one);
        root = f.ite(&fits, &root2p1, &root2);
    }

    let kept = f.extract(&root, root_w - 1, 2);
    let guard = f.extract(&root, 1, 1);
    let r0 = f.extract(&root, 0, 0);
    let rem_nz = ne_zero(f, &rem);
    let sticky = f.or(&r0, &rem_nz);
    let kg = f.concat(&kept, &guard);
    let sig = f.concat(&kg, &sticky);
    let rounded = round_and_pack(f, fmt, rm, &ua.sign, &exp_half, &sig);

    // sqrt(-x) is NaN for x > 0; +-0 and +inf pass through.
    let nan = packed_nan(f, fmt);
    let not_zero = f.not(&ua.zero);
    let neg_input = f.and(&ua.sign, &not_zero);
    let zero_pack = packed_zero(f, fmt, &ua.sign);
    let inf_pack = packed_inf(f, fmt, &ua.sign);
    let res = f.ite(&ua.zero, &zero_pack, &rounded);
    let res = f.ite(&ua.inf, &inf_pack, &res);
    let res = f.ite(&neg_input, &nan, &res);
    f.ite(&ua.nan, &nan, &res)
}

/* ---- fused multiply-add --------------------------------------------------- */

/// `fp.fma`: `round(a * b + c)` with a single rounding.
pub fn fp_fma<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    a: &F::Bv,
    b: &F::Bv,
    cc: &F::Bv,
) -> F::Bv {
    let s = fmt.sig_bits;
    let n = 2 * s; // exact product width
    let ew = work_exp_bits(fmt, n);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);
    let uc = unpack(f, fmt, ew, cc);
    let flags = rm_flags(f, rm);

    // Exact product, normalized to 2s bits with the MSB set.
    let sign_p = f.xor(&ua.sign, &ub.sign);
    let sig_a = f.zero_extend(&ua.sig, s);
    let sig_b = f.zero_extend(&ub.sig, s);
    let prod0 = f.mul(&sig_a, &sig_b);
    let exp_sum = f.add(&ua.exp, &ub.exp);
    let top = f.extract(&prod0, n - 1, n - 1);
    let one = c(f, n, 1);
    let prod_shifted = f.shl(&prod0, &one);
    let prod = f.ite(&top, &prod0, &prod_shifted);
    let one_e = c(f, ew, 1);
    let exp_hi = f.add(&exp_sum, &one_e);
    let exp_p0 = f.ite(&top, &exp_hi, &exp_sum);
    let p_zero = f.or(&ua.zero, &ub.zero);
    let zexp = zero_exp(f, fmt, ew);
    let exp_p = f.ite(&p_zero, &zexp, &exp_p0);
    let zero_n = c(f, n, 0);
    let sig_p = f.ite(&p_zero, &zero_n, &prod);

    // Widen the addend to the product scale.
    let pad = c(f, s, 0);
    let sig_c = f.concat(&uc.sig, &pad);

    let sum = add_magnitudes(
        f, n, &flags.rtn, &sign_p, &exp_p, &sig_p, &uc.sign, &uc.exp, &sig_c,
    );

    // Collapse the 2s + 2 bit significand to s bits + guard + sticky.
    let kept = f.extract(&sum.sig, n + 1, s + 2);
    let guard = f.extract(&sum.sig, s + 1, s + 1);
    let rest = f.extract(&sum.sig, s, 0);
    let sticky = ne_zero(f, &rest);
    let kg = f.concat(&kept, &guard);
    let sig = f.concat(&kg, &sticky);
    let rounded = round_and_pack(f, fmt, rm, &sum.sign, &sum.exp, &sig);
    let zero_pack = packed_zero(f, fmt, &sum.zero_sign);
    let finite = f.ite(&sum.zero, &zero_pack, &rounded);

    // Specials.
    let nan = packed_nan(f, fmt);
    let either_inf_ab = f.or(&ua.inf, &ub.inf);
    let inf_times_zero = f.and(&either_inf_ab, &p_zero);
    let p_nonzero = f.not(&p_zero);
    let p_inf = f.and(&either_inf_ab, &p_nonzero);
    let inf_p_pack = packed_inf(f, fmt, &sign_p);
    let inf_c_pack = packed_inf(f, fmt, &uc.sign);
    let signs_differ = f.xor(&sign_p, &uc.sign);
    let inf_conflict = {
        let both = f.and(&p_inf, &uc.inf);
        f.and(&both, &signs_differ)
    };

    let res = f.ite(&uc.inf, &inf_c_pack, &finite);
    let res = f.ite(&p_inf, &inf_p_pack, &res);
    let res = f.ite(&inf_conflict, &nan, &res);
    let res = f.ite(&inf_times_zero, &nan, &res);
    let any_nan = or3(f, &ua.nan, &ub.nan, &uc.nan);
    f.ite(&any_nan, &nan, &res)
}

/* ---- remainder ------------------------------------------------------------ */

/// `fp.rem`: IEEE remainder `a - b * round_to_nearest_even(a / b)`.
pub fn fp_rem<F: BvFactory>(f: &mut F, fmt: &FpFormat, a: &F::Bv, b: &F::Bv) -> F::Bv {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s);
    let ua = unpack(f, fmt, ew, a);
    let ub = unpack(f, fmt, ew, b);

    // Long-division alignment: repeatedly subtract |b| scaled down from |a|.
    let w = s + 2;
    let mut rem = f.zero_extend(&ua.sig, 2); // w bits
    let mut exp_r = ua.exp.clone();
    let sig_b = f.zero_extend(&ub.sig, 2);
    let mut q_lsb = fls(f);
    let bound = fmt.rem_bound();
    for _ in 0..bound {
        let active = sgt(f, &exp_r, &ub.exp);
        let ge = f.ule(&sig_b, &rem);
        let step = f.and(&active, &ge);
        let sub = f.sub(&rem, &sig_b);
        let rem1 = f.ite(&step, &sub, &rem);
        let one = c(f, w, 1);
        let doubled = f.shl(&rem1, &one);
        rem = f.ite(&active, &doubled, &rem1);
        let one_e = c(f, ew, 1);
        let dec = f.sub(&exp_r, &one_e);
        exp_r = f.ite(&active, &dec, &exp_r);
        q_lsb = f.ite(&active, &step, &q_lsb);
    }
    // Final subtraction at the divisor's scale.
    let at_scale = f.eq(&exp_r, &ub.exp);
    let ge = f.ule(&sig_b, &rem);
    let last = f.and(&at_scale, &ge);
    let sub = f.sub(&rem, &sig_b);
    rem = f.ite(&last, &sub, &rem);
    q_lsb = f.ite(&at_scale, &last, &q_lsb);

    // Round-to-nearest correction: compare 2|r| against |b|.
    let one = c(f, w, 1);
    let rem2 = f.shl(&rem, &one); // may not overflow: rem < sig_b <= 2^s
    let gt_half = f.ult(&sig_b, &rem2);
    let eq_half = f.eq(&rem2, &sig_b);
    let tie_odd = f.and(&eq_half, &q_lsb);
    let correct0 = f.or(&gt_half, &tie_odd);
    // Below the divisor's scale the quotient was zero; no correction except
    // when the exponent is exactly one below and |a| > |b| / 2.
    let one_e = c(f, ew, 1);
    let exp_bm1 = f.sub(&ub.exp, &one_e);
    let at_minus1 = f.eq(&exp_r, &exp_bm1);
    let gt_half_m1 = f.ult(&sig_b, &rem);
    let eq_half_m1 = f.eq(&rem, &sig_b);
    // q = 0 is even, so the tie at minus-one scale stays put.
    let _ = eq_half_m1;
    let correct_m1 = f.and(&at_minus1, &gt_half_m1);
    let in_scale = f.or(&at_scale, &at_minus1);
    let correct_at = f.and(&at_scale, &correct0);
    let correct = f.or(&correct_at, &correct_m1);

    // Bring the remainder to a common fixed-point scale (exp_b, one extra
    // fraction bit) and apply the correction r' = |b| - |r|.
    let rem_at_b = f.ite(&at_scale, &rem2, &rem); // scale exp_b with 1 frac bit
    let fixed = f.ite(&in_scale, &rem_at_b, &rem2);
    let sig_b2 = f.shl(&sig_b, &one);
    let corrected = f.sub(&sig_b2, &fixed);
    let mag = f.ite(&correct, &corrected, &fixed);
    let flip = f.not(&ua.sign);
    let sign = f.ite(&correct, &flip, &ua.sign);

    // Normalize and pack exactly (the remainder is always representable).
    let exp_base = f.ite(&in_scale, &ub.exp, &exp_r);
    // mag has w = s + 2 bits at scale: value = mag * 2^(exp_base - s).
    // Normalizing the MSB to position w - 1 gives exponent exp_base + 1.
    let (mag_n, exp_n) = {
        let one_e2 = c(f, ew, 1);
        let exp_adj = f.add(&exp_base, &one_e2);
        normalize_left(f, mag, exp_adj, w - 1)
    };
    let kept = f.extract(&mag_n, w - 1, 2);
    let g = f.extract(&mag_n, 1, 1);
    let st = f.extract(&mag_n, 0, 0);
    let kg = f.concat(&kept, &g);
    let sig = f.concat(&kg, &st);
    let rne = c(f, 3, 0);
    let rounded = round_and_pack(f, fmt, &rne, &sign, &exp_n, &sig);
    let mag_zero = {
        let nz = ne_zero(f, &mag_n);
        f.not(&nz)
    };
    let zero_pack = packed_zero(f, fmt, &ua.sign);
    let finite = f.ite(&mag_zero, &zero_pack, &rounded);

    // Specials: rem(x, inf) = x for finite x; NaN, inf dividend and zero
    // divisor are invalid.
    let nan = packed_nan(f, fmt);
    let res = f.ite(&ua.zero, &zero_pack, &finite);
    let res = f.ite(&ub.inf, a, &res);
    let res = f.ite(&ub.zero, &nan, &res);
    let res = f.ite(&ua.inf, &nan, &res);
    let either_nan = f.or(&ua.nan, &ub.nan);
    f.ite(&either_nan, &nan, &res)
}

/* ---- round to integral ---------------------------------------------------- */

/// `fp.roundToIntegral`.
pub fn fp_rti<F: BvFactory>(f: &mut F, fmt: &FpFormat, rm: &F::Bv, a: &F::Bv) -> F::Bv {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s);
    let ua = unpack(f, fmt, ew, a);
    let flags = rm_flags(f, rm);

    // Shift so the integer part is kept; fractional bits fall into
    // guard/sticky territory.
    let sm1 = ci(f, ew, (s - 1) as i64);
    let is_int = sge(f, &ua.exp, &sm1);
    let shift0 = f.sub(&sm1, &ua.exp);
    let cap = ci(f, ew, (s + 1) as i64);
    let over = sgt(f, &shift0, &cap);
    let shift = f.ite(&over, &cap, &shift0);

    let w = s + 2;
    let sig_w = {
        let pad = c(f, 2, 0);
        f.concat(&ua.sig, &pad)
    };
    let shift_n = resize(f, &shift, w);
    // Keep all shifted-out bits: low two stay guard/rest after the shift.
    let shifted = sticky_rshift(f, &sig_w, &shift_n);
    // Integer magnitude after the shift: bits [w-1..2]; guard = bit 1,
    // sticky = bit 0.
    let lsb = f.extract(&shifted, 2, 2);
    let guard = f.extract(&shifted, 1, 1);
    let sticky = f.extract(&shifted, 0, 0);
    let up = round_increment(f, &flags, &ua.sign, &lsb, &guard, &sticky);
    let kept = f.extract(&shifted, w - 1, 2);
    let kept_x = f.zero_extend(&kept, 4);
    let up_x = f.zero_extend(&up, w + 1);
    let int_mag = f.add(&kept_x, &up_x); // w + 2 bits, a plain integer

    // Renormalize the integer to significand form. With the MSB at the top
    // of w + 2 bits, the exponent of the exact representation is the
    // pre-normalization bit position, so seed it with s + 3.
    let exp_adj = ci(f, ew, (s + 3) as i64);
    let mag_zero = {
        let nz = ne_zero(f, &int_mag);
        f.not(&nz)
    };
    let (mag_n, exp_n) = normalize_left(f, int_mag, exp_adj, w + 1);
    // The rounded integer has at most s + 1 significant bits, and s + 1
    // only as a power of two, so the dropped tail below is always zero.
    let kept2 = f.extract(&mag_n, w + 1, w + 2 - s);
    let zero2 = c(f, 2, 0);
    let sig_rp = f.concat(&kept2, &zero2);
    let rne = c(f, 3, 0);
    let repacked = round_and_pack(f, fmt, &rne, &ua.sign, &exp_n, &sig_rp);
    let zero_pack = packed_zero(f, fmt, &ua.sign);
    let finite = f.ite(&mag_zero, &zero_pack, &repacked);
    let rounded = f.ite(&is_int, a, &finite);

    let nan = packed_nan(f, fmt);
    let res = f.ite(&ua.zero, a, &rounded);
    let res = f.ite(&ua.inf, a, &res);
    f.ite(&ua.nan, &nan, &res)
}

/* ---- conversions ----------------------------------------------------------- */

/// `to_fp` from a packed bit-vector: reinterpretation.
pub fn fp_from_bv<F: BvFactory>(_f: &mut F, _fmt: &FpFormat, bv: &F::Bv) -> F::Bv {
    bv.clone()
}

/// `to_fp` format conversion.
pub fn fp_from_fp<F: BvFactory>(
    f: &mut F,
    from: &FpFormat,
    to: &FpFormat,
    rm: &F::Bv,
    a: &F::Bv,
) -> F::Bv {
    let s_f = from.sig_bits;
    let s_t = to.sig_bits;
    let ew = work_exp_bits(from, s_f.max(s_t)).max(work_exp_bits(to, s_f.max(s_t)));
    let ua = unpack(f, from, ew, a);

    // Re-shape the significand to the target width plus guard/sticky.
    let sig = if s_t >= s_f {
        let pad = c(f, s_t - s_f + 2, 0);
        f.concat(&ua.sig, &pad)
    } else {
        let kept = f.extract(&ua.sig, s_f - 1, s_f - s_t);
        let guard = f.extract(&ua.sig, s_f - s_t - 1, s_f - s_t - 1);
        let sticky = if s_f - s_t >= 2 {
            let rest = f.extract(&ua.sig, s_f - s_t - 2, 0);
            ne_zero(f, &rest)
        } else {
            fls(f)
        };
        let kg = f.concat(&kept, &guard);
        f.concat(&kg, &sticky)
    };
    let rounded = round_and_pack(f, to, rm, &ua.sign, &ua.exp, &sig);

    let nan = packed_nan(f, to);
    let inf = packed_inf(f, to, &ua.sign);
    let zero = packed_zero(f, to, &ua.sign);
    let res = f.ite(&ua.zero, &zero, &rounded);
    let res = f.ite(&ua.inf, &inf, &res);
    f.ite(&ua.nan, &nan, &res)
}

/// `to_fp` from an unsigned bit-vector.
pub fn fp_from_ubv<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    bv: &F::Bv,
) -> F::Bv {
    let sign = fls(f);
    fp_from_int_mag(f, fmt, rm, &sign, bv)
}

/// `to_fp` from a signed bit-vector.
pub fn fp_from_sbv<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    bv: &F::Bv,
) -> F::Bv {
    let w = f.width(bv);
    let sign = f.extract(bv, w - 1, w - 1);
    let negated = f.neg(bv);
    // The most negative value negates to itself; its unsigned reading is
    // already the magnitude.
    let mag = f.ite(&sign, &negated, bv);
    fp_from_int_mag(f, fmt, rm, &sign, &mag)
}

fn fp_from_int_mag<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    sign: &F::Bv,
    mag: &F::Bv,
) -> F::Bv {
    let s = fmt.sig_bits;
    let w = f.width(mag);
    let ew = work_exp_bits(fmt, s.max(w));

    // Normalize the magnitude to the top of its width.
    let exp0 = ci(f, ew, (w - 1) as i64);
    let (norm, exp) = normalize_left(f, mag.clone(), exp0, w - 1);

    // Shape into s significand bits plus guard/sticky.
    let sig = if w >= s + 2 {
        let kept = f.extract(&norm, w - 1, w - s);
        let guard = f.extract(&norm, w - s - 1, w - s - 1);
        let sticky = if w >= s + 2 && w - s >= 2 {
            let rest = f.extract(&norm, w - s - 2, 0);
            ne_zero(f, &rest)
        } else {
            fls(f)
        };
        let kg = f.concat(&kept, &guard);
        f.concat(&kg, &sticky)
    } else {
        let pad = c(f, s + 2 - w, 0);
        f.concat(&norm, &pad)
    };
    let rounded = round_and_pack(f, fmt, rm, sign, &exp, &sig);
    let zero_in = {
        let nz = ne_zero(f, mag);
        f.not(&nz)
    };
    let pos = fls(f);
    let zero = packed_zero(f, fmt, &pos);
    f.ite(&zero_in, &zero, &rounded)
}

/// `fp.to_ubv`: conversion to an unsigned bit-vector of width `w`.
///
/// NaN, infinities, negative values and out-of-range results are
/// unspecified by SMT-LIB; this implementation fixes them to zero so the
/// concrete and symbolic sides agree.
pub fn fp_to_ubv<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    a: &F::Bv,
    w: u64,
) -> F::Bv {
    let (mag, sign, ok) = fp_to_int_mag(f, fmt, rm, a, w + 1);
    let zero = c(f, w, 0);
    let mag_nz = ne_zero(f, &mag);
    let neg_nonzero = f.and(&sign, &mag_nz);
    let top = f.extract(&mag, w, w);
    let fits = f.not(&top);
    let val = f.extract(&mag, w - 1, 0);
    let in_range = {
        let nn = f.not(&neg_nonzero);
        let a1 = f.and(&ok, &nn);
        f.and(&a1, &fits)
    };
    f.ite(&in_range, &val, &zero)
}

/// `fp.to_sbv`: conversion to a signed bit-vector of width `w`.
pub fn fp_to_sbv<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    a: &F::Bv,
    w: u64,
) -> F::Bv {
    let (mag, sign, ok) = fp_to_int_mag(f, fmt, rm, a, w + 1);
    let zero = c(f, w, 0);
    let val = f.extract(&mag, w - 1, 0);
    let negated = f.neg(&val);
    let signed_val = f.ite(&sign, &negated, &val);
    // Range: magnitude <= 2^(w-1) - 1, or exactly 2^(w-1) when negative.
    let max_pos = c(f, w + 1, (1u64 << (w - 1)) - 1);
    let fits_pos = f.ule(&mag, &max_pos);
    let min_neg = c(f, w + 1, 1u64 << (w - 1));
    let is_min = f.eq(&mag, &min_neg);
    let neg_min = f.and(&sign, &is_min);
    let fits = f.or(&fits_pos, &neg_min);
    let in_range = f.and(&ok, &fits);
    f.ite(&in_range, &signed_val, &zero)
}

/// Shared integer-conversion core: rounded magnitude (`w` bits), sign, and
/// a validity flag (false on NaN/infinity/magnitude overflow).
fn fp_to_int_mag<F: BvFactory>(
    f: &mut F,
    fmt: &FpFormat,
    rm: &F::Bv,
    a: &F::Bv,
    w: u64,
) -> (F::Bv, F::Bv, F::Bv) {
    let s = fmt.sig_bits;
    let ew = work_exp_bits(fmt, s.max(w));
    let ua = unpack(f, fmt, ew, a);
    let flags = rm_flags(f, rm);

    // Value = sig * 2^(exp - s + 1). Slide the significand into a w-bit
    // integer with two rounding bits below.
    let iw = w + s + 2;
    let sig_w = f.zero_extend(&ua.sig, iw - s);
    let base = c(f, iw, 2);
    let placed = f.shl(&sig_w, &base); // integer value * 4 when exp = s - 1
    let sm1 = ci(f, ew, (s - 1) as i64);
    let right = f.sub(&sm1, &ua.exp); // > 0: shift right
    let zero_e = c(f, ew, 0);
    let is_right = sgt(f, &right, &zero_e);
    let cap = ci(f, ew, (s + 2) as i64);
    let over = sgt(f, &right, &cap);
    let rclamped = f.ite(&over, &cap, &right);
    let rn = resize(f, &rclamped, iw);
    let shifted_r = sticky_rshift(f, &placed, &rn);
    let left = f.sub(&ua.exp, &sm1);
    let ln = resize(f, &left, iw);
    let shifted_l = f.shl(&placed, &ln);
    let placed2 = f.ite(&is_right, &shifted_r, &shifted_l);

    // Exponents at or above w - 1 can only produce out-of-width magnitudes;
    // rounding up from below is caught by the caller's fit checks.
    let max_exp = ci(f, ew, w as i64 - 1);
    let too_big = sge(f, &ua.exp, &max_exp);

    let lsb = f.extract(&placed2, 2, 2);
    let guard = f.extract(&placed2, 1, 1);
    let sticky = f.extract(&placed2, 0, 0);
    let up = round_increment(f, &flags, &ua.sign, &lsb, &guard, &sticky);
    let kept = f.extract(&placed2, w + 1, 2);
    let up_x = f.zero_extend(&up, w - 1);
    let mag = f.add(&kept, &up_x);

    let special = f.or(&ua.nan, &ua.inf);
    let invalid = f.or(&special, &too_big);
    let ok = f.not(&invalid);
    (mag, ua.sign.clone(), ok)
}
