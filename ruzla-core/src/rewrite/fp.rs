//! Floating-Point Rewrite Rules.
//!
//! Folding runs the same circuit templates the word-blaster instantiates
//! symbolically, so folded constants agree bit-for-bit with the encoded
//! circuits.

use super::Rewriter;
use crate::error::Result;
use crate::fp::{FloatingPoint, FpFormat, RoundingMode};
use crate::node::{Kind, TermId, TermManager, Value};

pub(super) fn is_fp_kind(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::FpAbs
            | Kind::FpAdd
            | Kind::FpDiv
            | Kind::FpEqual
            | Kind::FpFma
            | Kind::FpFp
            | Kind::FpGe
            | Kind::FpGt
            | Kind::FpIsInf
            | Kind::FpIsNan
            | Kind::FpIsNeg
            | Kind::FpIsNormal
            | Kind::FpIsPos
            | Kind::FpIsSubnormal
            | Kind::FpIsZero
            | Kind::FpLe
            | Kind::FpLt
            | Kind::FpMax
            | Kind::FpMin
            | Kind::FpMul
            | Kind::FpNeg
            | Kind::FpRem
            | Kind::FpRti
            | Kind::FpSqrt
            | Kind::FpSub
            | Kind::FpToFpFromBv
            | Kind::FpToFpFromFp
            | Kind::FpToFpFromSbv
            | Kind::FpToFpFromUbv
            | Kind::FpToSbv
            | Kind::FpToUbv
    )
}

fn fp_val(tm: &TermManager, t: TermId) -> Option<FloatingPoint> {
    tm.value(t).and_then(Value::as_floating_point).cloned()
}

fn rm_val(tm: &TermManager, t: TermId) -> Option<RoundingMode> {
    tm.value(t).and_then(Value::as_rounding_mode)
}

/// Fold an FP operation whose children are all values.
pub(super) fn fold(tm: &mut TermManager, term: TermId) -> Result<Option<TermId>> {
    let kind = tm.kind(term);
    let indices: Vec<u64> = tm.indices(term).to_vec();

    let fp = |tm: &mut TermManager, v: FloatingPoint| Ok(Some(tm.mk_fp(v)));
    let boolean = |tm: &mut TermManager, v: bool| Ok(Some(tm.mk_bool_value(v)));

    match kind {
        Kind::FpAbs => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            fp(tm, a.abs())
        }
        Kind::FpNeg => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            fp(tm, a.neg())
        }
        Kind::FpIsInf | Kind::FpIsNan | Kind::FpIsNeg | Kind::FpIsNormal | Kind::FpIsPos
        | Kind::FpIsSubnormal | Kind::FpIsZero => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            let v = match kind {
                Kind::FpIsInf => a.is_inf(),
                Kind::FpIsNan => a.is_nan(),
                Kind::FpIsNeg => a.is_negative(),
                Kind::FpIsNormal => a.is_normal(),
                Kind::FpIsPos => a.is_positive(),
                Kind::FpIsSubnormal => a.is_subnormal(),
                _ => a.is_zero(),
            };
            boolean(tm, v)
        }
        Kind::FpEqual | Kind::FpLt | Kind::FpLe | Kind::FpGt | Kind::FpGe => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            let b = fp_val(tm, tm.child(term, 1)).expect("fp value");
            let v = match kind {
                Kind::FpEqual => a.ieee_eq(&b),
                Kind::FpLt => a.lt(&b),
                Kind::FpLe => a.le(&b),
                Kind::FpGt => b.lt(&a),
                _ => b.le(&a),
            };
            boolean(tm, v)
        }
        Kind::FpMin => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            let b = fp_val(tm, tm.child(term, 1)).expect("fp value");
            fp(tm, a.min(&b))
        }
        Kind::FpMax => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            let b = fp_val(tm, tm.child(term, 1)).expect("fp value");
            fp(tm, a.max(&b))
        }
        Kind::FpRem => {
            let a = fp_val(tm, tm.child(term, 0)).expect("fp value");
            let b = fp_val(tm, tm.child(term, 1)).expect("fp value");
            fp(tm, a.rem(&b))
        }
        Kind::FpAdd | Kind::FpSub | Kind::FpMul | Kind::FpDiv => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let a = fp_val(tm, tm.child(term, 1)).expect("fp value");
            let b = fp_val(tm, tm.child(term, 2)).expect("fp value");
            let v = match kind {
                Kind::FpAdd => a.add(rm, &b),
                Kind::FpSub => a.sub(rm, &b),
                Kind::FpMul => a.mul(rm, &b),
                _ => a.div(rm, &b),
            };
            fp(tm, v)
        }
        Kind::FpFma => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let a = fp_val(tm, tm.child(term, 1)).expect("fp value");
            let b = fp_val(tm, tm.child(term, 2)).expect("fp value");
            let c = fp_val(tm, tm.child(term, 3)).expect("fp value");
            fp(tm, a.fma(rm, &b, &c))
        }
        Kind::FpSqrt => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let a = fp_val(tm, tm.child(term, 1)).expect("fp value");
            fp(tm, a.sqrt(rm))
        }
        Kind::FpRti => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let a = fp_val(tm, tm.child(term, 1)).expect("fp value");
            fp(tm, a.rti(rm))
        }
        Kind::FpFp => {
            let bv = |i: usize| {
                tm.value(tm.child(term, i))
                    .and_then(Value::as_bitvector)
                    .cloned()
                    .expect("bv value")
            };
            let v = FloatingPoint::from_fields(&bv(0), &bv(1), &bv(2));
            fp(tm, v)
        }
        Kind::FpToFpFromBv => {
            let bv = tm
                .value(tm.child(term, 0))
                .and_then(Value::as_bitvector)
                .cloned()
                .expect("bv value");
            let fmt = FpFormat::new(indices[0], indices[1]);
            fp(tm, FloatingPoint::new(fmt, bv))
        }
        Kind::FpToFpFromFp => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let a = fp_val(tm, tm.child(term, 1)).expect("fp value");
            let fmt = FpFormat::new(indices[0], indices[1]);
            fp(tm, a.to_format(fmt, rm))
        }
        Kind::FpToFpFromSbv | Kind::FpToFpFromUbv => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let bv = tm
                .value(tm.child(term, 1))
                .and_then(Value::as_bitvector)
                .cloned()
                .expect("bv value");
            let fmt = FpFormat::new(indices[0], indices[1]);
            let v = if kind == Kind::FpToFpFromSbv {
                FloatingPoint::from_sbv(fmt, rm, &bv)
            } else {
                FloatingPoint::from_ubv(fmt, rm, &bv)
            };
            fp(tm, v)
        }
        Kind::FpToSbv | Kind::FpToUbv => {
            let rm = rm_val(tm, tm.child(term, 0)).expect("rm value");
            let a = fp_val(tm, tm.child(term, 1)).expect("fp value");
            let v = if kind == Kind::FpToSbv {
                a.to_sbv(rm, indices[0])
            } else {
                a.to_ubv(rm, indices[0])
            };
            Ok(Some(tm.mk_bv(v)))
        }
        _ => Ok(None),
    }
}

/// Structural FP rules.
pub(super) fn rewrite(_rw: &mut Rewriter, tm: &mut TermManager, term: TermId) -> Result<TermId> {
    let kind = tm.kind(term);
    match kind {
        // Comparison directions normalize to less-than forms.
        Kind::FpGt => {
            let a = tm.child(term, 0);
            let b = tm.child(term, 1);
            tm.mk_term(Kind::FpLt, &[b, a], &[])
        }
        Kind::FpGe => {
            let a = tm.child(term, 0);
            let b = tm.child(term, 1);
            tm.mk_term(Kind::FpLe, &[b, a], &[])
        }
        Kind::FpAbs => {
            let c = tm.child(term, 0);
            // abs(abs(x)) and abs(-x) collapse to abs(x).
            if tm.kind(c) == Kind::FpAbs {
                return Ok(c);
            }
            if tm.kind(c) == Kind::FpNeg {
                let inner = tm.child(c, 0);
                return tm.mk_term(Kind::FpAbs, &[inner], &[]);
            }
            Ok(term)
        }
        Kind::FpNeg => {
            let c = tm.child(term, 0);
            if tm.kind(c) == Kind::FpNeg {
                return Ok(tm.child(c, 0));
            }
            Ok(term)
        }
        _ => Ok(term),
    }
}
