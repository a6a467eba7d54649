//! Word-Blasting Floating-Point Terms to Bit-Vector Circuits.
//!
//! Instantiates the shared FP circuit templates with a symbolic factory
//! that builds bit-vector terms, replacing every FP- and rounding-mode-
//! sorted subterm by its packed encoding. Because the same templates fold
//! constants in the rewriter, concrete and symbolic results agree
//! bit-for-bit.
//!
//! Rounding-mode constants become 3-bit vectors constrained to the five
//! valid encodings; the constraints are collected as side conditions the
//! engine asserts alongside the lowered formula.

use ruzla_core::error::{internal_error, Result};
use ruzla_core::fp::template::{self, BvFactory};
use ruzla_core::fp::FpFormat;
use ruzla_core::sort::{SortId, SortKind};
use ruzla_core::{BitVector, Kind, TermId, TermManager, Value};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// A bit-vector factory building terms through the term manager.
struct SymbolicFactory<'a> {
    tm: &'a mut TermManager,
}

impl SymbolicFactory<'_> {
    fn term(&mut self, kind: Kind, children: &[TermId], indices: &[u64]) -> TermId {
        self.tm
            .mk_term(kind, children, indices)
            .expect("fp templates construct well-typed terms")
    }
}

impl BvFactory for SymbolicFactory<'_> {
    type Bv = TermId;

    fn constant(&mut self, value: BitVector) -> TermId {
        self.tm.mk_bv(value)
    }

    fn width(&self, a: &TermId) -> u64 {
        self.tm.bv_width(self.tm.sort(*a)).expect("bv term")
    }

    fn not(&mut self, a: &TermId) -> TermId {
        self.term(Kind::BvNot, &[*a], &[])
    }

    fn and(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvAnd, &[*a, *b], &[])
    }

    fn or(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvOr, &[*a, *b], &[])
    }

    fn xor(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvXor, &[*a, *b], &[])
    }

    fn add(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvAdd, &[*a, *b], &[])
    }

    fn sub(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvSub, &[*a, *b], &[])
    }

    fn mul(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvMul, &[*a, *b], &[])
    }

    fn udiv(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvUdiv, &[*a, *b], &[])
    }

    fn urem(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvUrem, &[*a, *b], &[])
    }

    fn neg(&mut self, a: &TermId) -> TermId {
        self.term(Kind::BvNeg, &[*a], &[])
    }

    fn shl(&mut self, a: &TermId, amount: &TermId) -> TermId {
        self.term(Kind::BvShl, &[*a, *amount], &[])
    }

    fn lshr(&mut self, a: &TermId, amount: &TermId) -> TermId {
        self.term(Kind::BvShr, &[*a, *amount], &[])
    }

    fn ashr(&mut self, a: &TermId, amount: &TermId) -> TermId {
        self.term(Kind::BvAshr, &[*a, *amount], &[])
    }

    fn concat(&mut self, hi: &TermId, lo: &TermId) -> TermId {
        self.term(Kind::BvConcat, &[*hi, *lo], &[])
    }

    fn extract(&mut self, a: &TermId, upper: u64, lower: u64) -> TermId {
        self.term(Kind::BvExtract, &[*a], &[upper, lower])
    }

    fn zero_extend(&mut self, a: &TermId, n: u64) -> TermId {
        if n == 0 {
            return *a;
        }
        self.term(Kind::BvZeroExtend, &[*a], &[n])
    }

    fn sign_extend(&mut self, a: &TermId, n: u64) -> TermId {
        if n == 0 {
            return *a;
        }
        self.term(Kind::BvSignExtend, &[*a], &[n])
    }

    fn eq(&mut self, a: &TermId, b: &TermId) -> TermId {
        self.term(Kind::BvComp, &[*a, *b], &[])
    }

    fn ult(&mut self, a: &TermId, b: &TermId) -> TermId {
        let cond = self.term(Kind::BvUlt, &[*a, *b], &[]);
        self.bool_to_bit(cond)
    }

    fn ule(&mut self, a: &TermId, b: &TermId) -> TermId {
        let cond = self.term(Kind::BvUle, &[*a, *b], &[]);
        self.bool_to_bit(cond)
    }

    fn slt(&mut self, a: &TermId, b: &TermId) -> TermId {
        let cond = self.term(Kind::BvSlt, &[*a, *b], &[]);
        self.bool_to_bit(cond)
    }

    fn sle(&mut self, a: &TermId, b: &TermId) -> TermId {
        let cond = self.term(Kind::BvSle, &[*a, *b], &[]);
        self.bool_to_bit(cond)
    }

    fn ite(&mut self, cond: &TermId, then: &TermId, els: &TermId) -> TermId {
        let c = self.bit_to_bool(*cond);
        self.term(Kind::Ite, &[c, *then, *els], &[])
    }
}

impl SymbolicFactory<'_> {
    fn bool_to_bit(&mut self, cond: TermId) -> TermId {
        let one = self.tm.mk_bv(BitVector::one(1));
        let zero = self.tm.mk_bv(BitVector::zero(1));
        self.term(Kind::Ite, &[cond, one, zero], &[])
    }

    fn bit_to_bool(&mut self, bit: TermId) -> TermId {
        let one = self.tm.mk_bv(BitVector::one(1));
        self.term(Kind::Equal, &[bit, one], &[])
    }
}

/// The word-blaster: replaces FP/RM terms by packed bit-vector circuits.
#[derive(Debug, Default)]
pub struct WordBlaster {
    cache: FxHashMap<TermId, TermId>,
    /// Retyped constants for FP-sorted functions, arrays and plain
    /// constants.
    retyped: FxHashMap<TermId, TermId>,
    side_conditions: Vec<TermId>,
}

impl WordBlaster {
    /// Create an empty word-blaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraints accumulated while lowering (rounding-mode ranges);
    /// the caller must assert them.
    pub fn take_side_conditions(&mut self) -> Vec<TermId> {
        std::mem::take(&mut self.side_conditions)
    }

    /// True if the sort mentions FP or RM components.
    fn needs_lowering(tm: &TermManager, sort: SortId) -> bool {
        match tm.sort_kind(sort) {
            SortKind::Fp(..) | SortKind::Rm => true,
            SortKind::Array(i, e) => {
                let (i, e) = (*i, *e);
                Self::needs_lowering(tm, i) || Self::needs_lowering(tm, e)
            }
            SortKind::Fun(all) => {
                let all: SmallVec<[SortId; 4]> = all.iter().copied().collect();
                all.iter().any(|&s| Self::needs_lowering(tm, s))
            }
            _ => false,
        }
    }

    fn lower_sort(tm: &mut TermManager, sort: SortId) -> Result<SortId> {
        match tm.sort_kind(sort) {
            SortKind::Fp(e, s) => {
                let w = e + s;
                tm.mk_bv_sort(w)
            }
            SortKind::Rm => tm.mk_bv_sort(3),
            SortKind::Array(i, e) => {
                let (i, e) = (*i, *e);
                let li = Self::lower_sort(tm, i)?;
                let le = Self::lower_sort(tm, e)?;
                tm.mk_array_sort(li, le)
            }
            SortKind::Fun(all) => {
                let all: SmallVec<[SortId; 4]> = all.iter().copied().collect();
                let mut lowered = SmallVec::<[SortId; 4]>::new();
                for &s in &all {
                    lowered.push(Self::lower_sort(tm, s)?);
                }
                let (cod, dom) = lowered.split_last().expect("nonempty");
                tm.mk_fun_sort(dom, *cod)
            }
            _ => Ok(sort),
        }
    }

    fn fp_format(tm: &TermManager, t: TermId) -> Result<FpFormat> {
        tm.fp_format(tm.sort(t))
            .ok_or_else(|| internal_error("expected a floating-point term"))
    }

    /// Lower a term, replacing every FP/RM subterm.
    pub fn lower(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let mut stack: Vec<(TermId, bool)> = vec![(term, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if self.cache.contains_key(&cur) {
                continue;
            }
            if !expanded {
                stack.push((cur, true));
                for &child in tm.children(cur) {
                    stack.push((child, false));
                }
                continue;
            }
            let lowered = self.lower_node(tm, cur)?;
            self.cache.insert(cur, lowered);
        }
        Ok(self.cache[&term])
    }

    fn lowered_children(&self, tm: &TermManager, t: TermId) -> SmallVec<[TermId; 4]> {
        tm.children(t).iter().map(|c| self.cache[c]).collect()
    }

    fn lower_node(&mut self, tm: &mut TermManager, t: TermId) -> Result<TermId> {
        let kind = tm.kind(t);
        let cs = self.lowered_children(tm, t);
        match kind {
            Kind::Value => match tm.value(t).expect("value payload") {
                Value::FloatingPoint(fp) => {
                    let bv = fp.as_bv().clone();
                    Ok(tm.mk_bv(bv))
                }
                Value::RoundingMode(rm) => {
                    let idx = rm.to_index();
                    Ok(tm.mk_bv(BitVector::from_u64(3, idx)))
                }
                _ => Ok(t),
            },
            Kind::Constant => {
                let sort = tm.sort(t);
                if !Self::needs_lowering(tm, sort) {
                    return Ok(t);
                }
                if let Some(&r) = self.retyped.get(&t) {
                    return Ok(r);
                }
                let lowered_sort = Self::lower_sort(tm, sort)?;
                let symbol = tm.symbol(t).map(str::to_owned);
                let fresh = tm.mk_const(lowered_sort, symbol.as_deref());
                // Rounding-mode inputs range over the five valid
                // encodings only.
                if tm.is_rm_sort(sort) {
                    let four = tm.mk_bv(BitVector::from_u64(3, 4));
                    let range = tm.mk_term(Kind::BvUle, &[fresh, four], &[])?;
                    self.side_conditions.push(range);
                }
                self.retyped.insert(t, fresh);
                Ok(fresh)
            }
            Kind::Variable => {
                if Self::needs_lowering(tm, tm.sort(t)) {
                    return Err(internal_error(
                        "quantified floating-point variables are not word-blasted",
                    ));
                }
                Ok(t)
            }
            Kind::ConstArray => {
                let sort = Self::lower_sort(tm, tm.sort(t))?;
                tm.mk_const_array(sort, cs[0])
            }
            Kind::Equal => {
                let child_sort = tm.sort(tm.child(t, 0));
                if let Some(fmt) = tm.fp_format(child_sort) {
                    // FP equality is object identity: both NaN, or equal
                    // packed encodings.
                    let mut f = SymbolicFactory { tm };
                    let na = template::is_nan(&mut f, &fmt, &cs[0]);
                    let nb = template::is_nan(&mut f, &fmt, &cs[1]);
                    let both = f.and(&na, &nb);
                    let beq = f.eq(&cs[0], &cs[1]);
                    let either = f.or(&both, &beq);
                    let b = f.bit_to_bool(either);
                    return Ok(b);
                }
                tm.rebuild(t, &cs)
            }

            /* classifications */
            Kind::FpIsInf | Kind::FpIsNan | Kind::FpIsNeg | Kind::FpIsNormal | Kind::FpIsPos
            | Kind::FpIsSubnormal | Kind::FpIsZero => {
                let fmt = Self::fp_format(tm, tm.child(t, 0))?;
                let mut f = SymbolicFactory { tm };
                let bit = match kind {
                    Kind::FpIsInf => template::is_inf(&mut f, &fmt, &cs[0]),
                    Kind::FpIsNan => template::is_nan(&mut f, &fmt, &cs[0]),
                    Kind::FpIsNeg => template::is_negative(&mut f, &fmt, &cs[0]),
                    Kind::FpIsNormal => template::is_normal(&mut f, &fmt, &cs[0]),
                    Kind::FpIsPos => template::is_positive(&mut f, &fmt, &cs[0]),
                    Kind::FpIsSubnormal => template::is_subnormal(&mut f, &fmt, &cs[0]),
                    _ => template::is_zero(&mut f, &fmt, &cs[0]),
                };
                Ok(f.bit_to_bool(bit))
            }

            /* comparisons */
            Kind::FpEqual | Kind::FpLt | Kind::FpLe | Kind::FpGt | Kind::FpGe => {
                let fmt = Self::fp_format(tm, tm.child(t, 0))?;
                let mut f = SymbolicFactory { tm };
                let bit = match kind {
                    Kind::FpEqual => template::fp_eq(&mut f, &fmt, &cs[0], &cs[1]),
                    Kind::FpLt => template::fp_lt(&mut f, &fmt, &cs[0], &cs[1]),
                    Kind::FpLe => template::fp_le(&mut f, &fmt, &cs[0], &cs[1]),
                    Kind::FpGt => template::fp_lt(&mut f, &fmt, &cs[1], &cs[0]),
                    _ => template::fp_le(&mut f, &fmt, &cs[1], &cs[0]),
                };
                Ok(f.bit_to_bool(bit))
            }

            /* sign operations and min/max */
            Kind::FpAbs | Kind::FpNeg => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(match kind {
                    Kind::FpAbs => template::fp_abs(&mut f, &fmt, &cs[0]),
                    _ => template::fp_neg(&mut f, &fmt, &cs[0]),
                })
            }
            Kind::FpMin | Kind::FpMax => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(match kind {
                    Kind::FpMin => template::fp_min(&mut f, &fmt, &cs[0], &cs[1]),
                    _ => template::fp_max(&mut f, &fmt, &cs[0], &cs[1]),
                })
            }

            /* rounded arithmetic */
            Kind::FpAdd | Kind::FpSub => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_add(
                    &mut f,
                    &fmt,
                    &cs[0],
                    &cs[1],
                    &cs[2],
                    kind == Kind::FpSub,
                ))
            }
            Kind::FpMul => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_mul(&mut f, &fmt, &cs[0], &cs[1], &cs[2]))
            }
            Kind::FpDiv => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_div(&mut f, &fmt, &cs[0], &cs[1], &cs[2]))
            }
            Kind::FpFma => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_fma(&mut f, &fmt, &cs[0], &cs[1], &cs[2], &cs[3]))
            }
            Kind::FpSqrt => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_sqrt(&mut f, &fmt, &cs[0], &cs[1]))
            }
            Kind::FpRti => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_rti(&mut f, &fmt, &cs[0], &cs[1]))
            }
            Kind::FpRem => {
                let fmt = Self::fp_format(tm, t)?;
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_rem(&mut f, &fmt, &cs[0], &cs[1]))
            }

            /* structure and conversions */
            Kind::FpFp => {
                let mut f = SymbolicFactory { tm };
                let se = f.concat(&cs[0], &cs[1]);
                Ok(f.concat(&se, &cs[2]))
            }
            Kind::FpToFpFromBv => Ok(cs[0]),
            Kind::FpToFpFromFp => {
                let from = Self::fp_format(tm, tm.child(t, 1))?;
                let indices = tm.indices(t);
                let to = FpFormat::new(indices[0], indices[1]);
                let mut f = SymbolicFactory { tm };
                Ok(template::fp_from_fp(&mut f, &from, &to, &cs[0], &cs[1]))
            }
            Kind::FpToFpFromSbv | Kind::FpToFpFromUbv => {
                let indices = tm.indices(t);
                let to = FpFormat::new(indices[0], indices[1]);
                let mut f = SymbolicFactory { tm };
                Ok(if kind == Kind::FpToFpFromSbv {
                    template::fp_from_sbv(&mut f, &to, &cs[0], &cs[1])
                } else {
                    template::fp_from_ubv(&mut f, &to, &cs[0], &cs[1])
                })
            }
            Kind::FpToSbv | Kind::FpToUbv => {
                let fmt = Self::fp_format(tm, tm.child(t, 1))?;
                let width = tm.indices(t)[0];
                let mut f = SymbolicFactory { tm };
                Ok(if kind == Kind::FpToSbv {
                    template::fp_to_sbv(&mut f, &fmt, &cs[0], &cs[1], width)
                } else {
                    template::fp_to_ubv(&mut f, &fmt, &cs[0], &cs[1], width)
                })
            }

            _ => tm.rebuild(t, &cs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruzla_core::fp::{FloatingPoint, RoundingMode};
    use ruzla_core::Rewriter;

    fn lower_and_fold(tm: &mut TermManager, t: TermId) -> TermId {
        let mut wb = WordBlaster::new();
        let lowered = wb.lower(tm, t).unwrap();
        let mut rw = Rewriter::new(1);
        rw.rewrite(tm, lowered).unwrap()
    }

    #[test]
    fn test_lower_fp_value() {
        let mut tm = TermManager::new();
        let f32s = tm.mk_fp_sort(8, 24).unwrap();
        let v = tm
            .mk_fp_value_from_real(f32s, RoundingMode::Rne, "1.5")
            .unwrap();
        let lowered = lower_and_fold(&mut tm, v);
        let bv = tm.value(lowered).unwrap().as_bitvector().unwrap();
        assert_eq!(bv.to_u64(), Some(u64::from(1.5f32.to_bits())));
    }

    #[test]
    fn test_symbolic_add_agrees_with_concrete() {
        // Fold an FP addition symbolically: lower with value operands,
        // then constant-fold the BV circuit. Must equal the concrete
        // template result.
        let mut tm = TermManager::new();
        let fmt = FpFormat::new(5, 11);
        let f16 = tm.mk_fp_sort(5, 11).unwrap();
        for (x, y) in [(1.5f32, 2.25f32), (0.1, 0.7), (1000.0, 0.001), (-2.5, 2.5)] {
            let a32 = FloatingPoint::from_f32(x).to_format(fmt, RoundingMode::Rne);
            let b32 = FloatingPoint::from_f32(y).to_format(fmt, RoundingMode::Rne);
            let want = a32.add(RoundingMode::Rne, &b32);
            let rm = tm.mk_rm_value(RoundingMode::Rne);
            let a = tm.mk_fp(a32);
            let b = tm.mk_fp(b32);
            let sum = tm.mk_term(Kind::FpAdd, &[rm, a, b], &[]).unwrap();
            let lowered = lower_and_fold(&mut tm, sum);
            let got = tm.value(lowered).unwrap().as_bitvector().unwrap();
            assert_eq!(got, want.as_bv(), "fp.add({x}, {y}) in FP(5,11)");
            let _ = f16;
        }
    }

    #[test]
    fn test_rm_constant_gets_range_condition() {
        let mut tm = TermManager::new();
        let rm_s = tm.mk_rm_sort();
        let f16 = tm.mk_fp_sort(5, 11).unwrap();
        let rm = tm.mk_const(rm_s, Some("rm"));
        let a = tm.mk_const(f16, Some("a"));
        let b = tm.mk_const(f16, Some("b"));
        let sum = tm.mk_term(Kind::FpAdd, &[rm, a, b], &[]).unwrap();
        let mut wb = WordBlaster::new();
        let lowered = wb.lower(&mut tm, sum).unwrap();
        assert_eq!(tm.bv_width(tm.sort(lowered)), Some(16));
        let conds = wb.take_side_conditions();
        assert_eq!(conds.len(), 1);
        assert_eq!(tm.kind(conds[0]), Kind::BvUle);
    }

    #[test]
    fn test_classification_becomes_bool() {
        let mut tm = TermManager::new();
        let f16 = tm.mk_fp_sort(5, 11).unwrap();
        let a = tm.mk_const(f16, Some("a"));
        let isnan = tm.mk_term(Kind::FpIsNan, &[a], &[]).unwrap();
        let mut wb = WordBlaster::new();
        let lowered = wb.lower(&mut tm, isnan).unwrap();
        assert!(tm.is_bool_sort(tm.sort(lowered)));
    }

    #[test]
    fn test_fp_equality_object_semantics() {
        let mut tm = TermManager::new();
        let f16 = tm.mk_fp_sort(5, 11).unwrap();
        // NaN = NaN is true under object equality.
        let nan = tm.mk_fp_nan(f16).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[nan, nan], &[]).unwrap();
        let folded = lower_and_fold(&mut tm, eq);
        assert!(tm.is_bool_value(folded, true));
        // +0 = -0 is false under object equality.
        let pz = tm.mk_fp_pos_zero(f16).unwrap();
        let nz = tm.mk_fp_neg_zero(f16).unwrap();
        let eq2 = tm.mk_term(Kind::Equal, &[pz, nz], &[]).unwrap();
        let folded2 = lower_and_fold(&mut tm, eq2);
        assert!(tm.is_bool_value(folded2, false));
    }

    #[test]
    fn test_lowered_fun_sort() {
        let mut tm = TermManager::new();
        let f16 = tm.mk_fp_sort(5, 11).unwrap();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let fun = tm.mk_fun_sort(&[f16], bv8).unwrap();
        let f = tm.mk_const(fun, Some("f"));
        let a = tm.mk_const(f16, Some("a"));
        let app = tm.mk_term(Kind::Apply, &[f, a], &[]).unwrap();
        let mut wb = WordBlaster::new();
        let lowered = wb.lower(&mut tm, app).unwrap();
        assert_eq!(tm.kind(lowered), Kind::Apply);
        let lf = tm.child(lowered, 0);
        let sig = tm.fun_sorts(tm.sort(lf)).unwrap().to_vec();
        assert_eq!(tm.bv_width(sig[0]), Some(16));
    }
}
