//! Bit-Vector Rewrite Rules.

use super::Rewriter;
use crate::bv::BitVector;
use crate::error::Result;
use crate::node::{Kind, TermId, TermManager, Value};

pub(super) fn is_bv_kind(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::BvAdd
            | Kind::BvAnd
            | Kind::BvAshr
            | Kind::BvComp
            | Kind::BvConcat
            | Kind::BvDec
            | Kind::BvInc
            | Kind::BvMul
            | Kind::BvNand
            | Kind::BvNeg
            | Kind::BvNor
            | Kind::BvNot
            | Kind::BvOr
            | Kind::BvRedand
            | Kind::BvRedor
            | Kind::BvRedxor
            | Kind::BvRol
            | Kind::BvRor
            | Kind::BvSaddo
            | Kind::BvSdiv
            | Kind::BvSdivo
            | Kind::BvSge
            | Kind::BvSgt
            | Kind::BvShl
            | Kind::BvShr
            | Kind::BvSle
            | Kind::BvSlt
            | Kind::BvSmod
            | Kind::BvSmulo
            | Kind::BvSrem
            | Kind::BvSsubo
            | Kind::BvSub
            | Kind::BvUaddo
            | Kind::BvUdiv
            | Kind::BvUge
            | Kind::BvUgt
            | Kind::BvUle
            | Kind::BvUlt
            | Kind::BvUmulo
            | Kind::BvUrem
            | Kind::BvUsubo
            | Kind::BvXnor
            | Kind::BvXor
            | Kind::BvExtract
            | Kind::BvRepeat
            | Kind::BvRoli
            | Kind::BvRori
            | Kind::BvSignExtend
            | Kind::BvZeroExtend
    )
}

fn bv_val(tm: &TermManager, t: TermId) -> Option<BitVector> {
    tm.value(t).and_then(Value::as_bitvector).cloned()
}

/// Fold a BV operation whose children are all values.
pub(super) fn fold(tm: &mut TermManager, term: TermId) -> Result<Option<TermId>> {
    let kind = tm.kind(term);
    let a = bv_val(tm, tm.child(term, 0)).expect("bv value");
    let b = if tm.num_children(term) > 1 {
        bv_val(tm, tm.child(term, 1))
    } else {
        None
    };
    let indices: Vec<u64> = tm.indices(term).to_vec();

    let bv = |tm: &mut TermManager, v: BitVector| Ok(Some(tm.mk_bv(v)));
    let boolean = |tm: &mut TermManager, v: bool| Ok(Some(tm.mk_bool_value(v)));

    match kind {
        Kind::BvAdd => bv(tm, a.add(&b.unwrap())),
        Kind::BvSub => bv(tm, a.sub(&b.unwrap())),
        Kind::BvMul => bv(tm, a.mul(&b.unwrap())),
        Kind::BvUdiv => bv(tm, a.udiv(&b.unwrap())),
        Kind::BvUrem => bv(tm, a.urem(&b.unwrap())),
        Kind::BvSdiv => bv(tm, a.sdiv(&b.unwrap())),
        Kind::BvSrem => bv(tm, a.srem(&b.unwrap())),
        Kind::BvSmod => bv(tm, a.smod(&b.unwrap())),
        Kind::BvAnd => bv(tm, a.and(&b.unwrap())),
        Kind::BvOr => bv(tm, a.or(&b.unwrap())),
        Kind::BvXor => bv(tm, a.xor(&b.unwrap())),
        Kind::BvNand => bv(tm, a.nand(&b.unwrap())),
        Kind::BvNor => bv(tm, a.nor(&b.unwrap())),
        Kind::BvXnor => bv(tm, a.xnor(&b.unwrap())),
        Kind::BvShl => bv(tm, a.shl(&b.unwrap())),
        Kind::BvShr => bv(tm, a.shr(&b.unwrap())),
        Kind::BvAshr => bv(tm, a.ashr(&b.unwrap())),
        Kind::BvRol => bv(tm, a.rol(&b.unwrap())),
        Kind::BvRor => bv(tm, a.ror(&b.unwrap())),
        Kind::BvConcat => bv(tm, a.concat(&b.unwrap())),
        Kind::BvNot => bv(tm, a.not()),
        Kind::BvNeg => bv(tm, a.neg()),
        Kind::BvInc => bv(tm, a.inc()),
        Kind::BvDec => bv(tm, a.dec()),
        Kind::BvRedand => bv(tm, a.redand()),
        Kind::BvRedor => bv(tm, a.redor()),
        Kind::BvRedxor => bv(tm, a.redxor()),
        Kind::BvComp => bv(tm, a.comp(&b.unwrap())),
        Kind::BvExtract => bv(tm, a.extract(indices[0], indices[1])?),
        Kind::BvRepeat => bv(tm, a.repeat(indices[0])),
        Kind::BvRoli => bv(tm, a.rol_by(indices[0])),
        Kind::BvRori => bv(tm, a.ror_by(indices[0])),
        Kind::BvSignExtend => bv(tm, a.sign_extend(indices[0])),
        Kind::BvZeroExtend => bv(tm, a.zero_extend(indices[0])),
        Kind::BvUlt => boolean(tm, a.ult(&b.unwrap())),
        Kind::BvUle => boolean(tm, a.ule(&b.unwrap())),
        Kind::BvUgt => boolean(tm, a.ugt(&b.unwrap())),
        Kind::BvUge => boolean(tm, a.uge(&b.unwrap())),
        Kind::BvSlt => boolean(tm, a.slt(&b.unwrap())),
        Kind::BvSle => boolean(tm, a.sle(&b.unwrap())),
        Kind::BvSgt => boolean(tm, a.sgt(&b.unwrap())),
        Kind::BvSge => boolean(tm, a.sge(&b.unwrap())),
        Kind::BvUaddo => boolean(tm, a.uaddo(&b.unwrap())),
        Kind::BvSaddo => boolean(tm, a.saddo(&b.unwrap())),
        Kind::BvUsubo => boolean(tm, a.usubo(&b.unwrap())),
        Kind::BvSsubo => boolean(tm, a.ssubo(&b.unwrap())),
        Kind::BvUmulo => boolean(tm, a.umulo(&b.unwrap())),
        Kind::BvSmulo => boolean(tm, a.smulo(&b.unwrap())),
        Kind::BvSdivo => boolean(tm, a.sdivo(&b.unwrap())),
        _ => Ok(None),
    }
}

/// Kind-specific simplification rules for non-constant operands.
pub(super) fn rewrite(rw: &mut Rewriter, tm: &mut TermManager, term: TermId) -> Result<TermId> {
    let kind = tm.kind(term);
    let width = tm.bv_width(tm.sort(tm.child(term, 0))).expect("bv child");
    match kind {
        Kind::BvAdd => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            for (x, y) in [(a, b), (b, a)] {
                if matches!(bv_val(tm, x), Some(v) if v.is_zero()) {
                    return Ok(y);
                }
            }
            if rw.level() >= 2 {
                // x + -x cancels.
                for (x, y) in [(a, b), (b, a)] {
                    if tm.kind(x) == Kind::BvNeg && tm.child(x, 0) == y {
                        return Ok(tm.mk_bv(BitVector::zero(width)));
                    }
                }
            }
            Ok(term)
        }
        Kind::BvSub => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(tm.mk_bv(BitVector::zero(width)));
            }
            if matches!(bv_val(tm, b), Some(v) if v.is_zero()) {
                return Ok(a);
            }
            Ok(term)
        }
        Kind::BvMul => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            for (x, y) in [(a, b), (b, a)] {
                if let Some(v) = bv_val(tm, x) {
                    if v.is_zero() {
                        return Ok(tm.mk_bv(BitVector::zero(width)));
                    }
                    if v.is_one() {
                        return Ok(y);
                    }
                }
            }
            Ok(term)
        }
        Kind::BvAnd => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(a);
            }
            for (x, y) in [(a, b), (b, a)] {
                if let Some(v) = bv_val(tm, x) {
                    if v.is_zero() {
                        return Ok(tm.mk_bv(BitVector::zero(width)));
                    }
                    if v.is_ones() {
                        return Ok(y);
                    }
                }
            }
            Ok(term)
        }
        Kind::BvOr => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(a);
            }
            for (x, y) in [(a, b), (b, a)] {
                if let Some(v) = bv_val(tm, x) {
                    if v.is_ones() {
                        return Ok(tm.mk_bv(BitVector::ones(width)));
                    }
                    if v.is_zero() {
                        return Ok(y);
                    }
                }
            }
            Ok(term)
        }
        Kind::BvXor => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if rw.level() >= 2 {
                if a == b {
                    return Ok(tm.mk_bv(BitVector::zero(width)));
                }
                for (x, y) in [(a, b), (b, a)] {
                    if let Some(v) = bv_val(tm, x) {
                        if v.is_zero() {
                            return Ok(y);
                        }
                        if v.is_ones() {
                            return tm.mk_term(Kind::BvNot, &[y], &[]);
                        }
                    }
                }
            }
            Ok(term)
        }
        // Negated connectives reduce to their positive form.
        Kind::BvNand | Kind::BvNor | Kind::BvXnor => {
            let inner = match kind {
                Kind::BvNand => Kind::BvAnd,
                Kind::BvNor => Kind::BvOr,
                _ => Kind::BvXor,
            };
            let a = tm.child(term, 0);
            let b = tm.child(term, 1);
            let pos = tm.mk_term(inner, &[a, b], &[])?;
            tm.mk_term(Kind::BvNot, &[pos], &[])
        }
        Kind::BvNot => {
            let c = tm.child(term, 0);
            if tm.kind(c) == Kind::BvNot {
                return Ok(tm.child(c, 0));
            }
            Ok(term)
        }
        Kind::BvNeg => {
            let c = tm.child(term, 0);
            if tm.kind(c) == Kind::BvNeg {
                return Ok(tm.child(c, 0));
            }
            Ok(term)
        }
        Kind::BvInc => {
            let c = tm.child(term, 0);
            let one = tm.mk_bv(BitVector::one(width));
            tm.mk_term(Kind::BvAdd, &[c, one], &[])
        }
        Kind::BvDec => {
            let c = tm.child(term, 0);
            let one = tm.mk_bv(BitVector::one(width));
            tm.mk_term(Kind::BvSub, &[c, one], &[])
        }
        Kind::BvComp => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            let eq = tm.mk_term(Kind::Equal, &[a, b], &[])?;
            let one = tm.mk_bv(BitVector::one(1));
            let zero = tm.mk_bv(BitVector::zero(1));
            tm.mk_term(Kind::Ite, &[eq, one, zero], &[])
        }
        Kind::BvUdiv => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if let Some(v) = bv_val(tm, b) {
                if v.is_one() {
                    return Ok(a);
                }
                if v.is_zero() {
                    return Ok(tm.mk_bv(BitVector::ones(width)));
                }
            }
            Ok(term)
        }
        Kind::BvUrem => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if let Some(v) = bv_val(tm, b) {
                if v.is_one() {
                    return Ok(tm.mk_bv(BitVector::zero(width)));
                }
                if v.is_zero() {
                    return Ok(a);
                }
            }
            Ok(term)
        }
        Kind::BvShl | Kind::BvShr | Kind::BvAshr => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if let Some(v) = bv_val(tm, b) {
                if v.is_zero() {
                    return Ok(a);
                }
            }
            Ok(term)
        }
        // Rotations by a constant amount become indexed rotations, which in
        // turn become extract/concat.
        Kind::BvRol | Kind::BvRor => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if let Some(v) = bv_val(tm, b) {
                let n = (v.as_uint() % num_bigint::BigUint::from(width))
                    .try_into()
                    .unwrap_or(0u64);
                let indexed = if kind == Kind::BvRol {
                    Kind::BvRoli
                } else {
                    Kind::BvRori
                };
                return tm.mk_term(indexed, &[a], &[n]);
            }
            Ok(term)
        }
        Kind::BvRoli | Kind::BvRori => {
            let a = tm.child(term, 0);
            let n = tm.indices(term)[0] % width;
            if n == 0 || width == 1 {
                return Ok(a);
            }
            // Left rotation by n: low w-n bits move up, top n bits wrap.
            let n = if kind == Kind::BvRoli { n } else { width - n };
            let low = tm.mk_term(Kind::BvExtract, &[a], &[width - n - 1, 0])?;
            let high = tm.mk_term(Kind::BvExtract, &[a], &[width - 1, width - n])?;
            tm.mk_term(Kind::BvConcat, &[low, high], &[])
        }
        Kind::BvRepeat => {
            let a = tm.child(term, 0);
            let n = tm.indices(term)[0];
            if n == 1 {
                return Ok(a);
            }
            let rest = tm.mk_term(Kind::BvRepeat, &[a], &[n - 1])?;
            tm.mk_term(Kind::BvConcat, &[a, rest], &[])
        }
        Kind::BvZeroExtend => {
            let a = tm.child(term, 0);
            let n = tm.indices(term)[0];
            if n == 0 {
                return Ok(a);
            }
            let zeros = tm.mk_bv(BitVector::zero(n));
            tm.mk_term(Kind::BvConcat, &[zeros, a], &[])
        }
        Kind::BvSignExtend => {
            let a = tm.child(term, 0);
            if tm.indices(term)[0] == 0 {
                return Ok(a);
            }
            Ok(term)
        }
        Kind::BvExtract => {
            let a = tm.child(term, 0);
            let upper = tm.indices(term)[0];
            let lower = tm.indices(term)[1];
            let aw = tm.bv_width(tm.sort(a)).expect("bv child");
            if lower == 0 && upper == aw - 1 {
                return Ok(a);
            }
            if rw.level() >= 2 {
                // Fuse nested extracts.
                if tm.kind(a) == Kind::BvExtract {
                    let inner = tm.child(a, 0);
                    let ilower = tm.indices(a)[1];
                    return tm.mk_term(
                        Kind::BvExtract,
                        &[inner],
                        &[ilower + upper, ilower + lower],
                    );
                }
                // Narrow extracts that fall entirely in one concat operand.
                if tm.kind(a) == Kind::BvConcat {
                    let hi = tm.child(a, 0);
                    let lo = tm.child(a, 1);
                    let low_w = tm.bv_width(tm.sort(lo)).expect("bv child");
                    if upper < low_w {
                        return tm.mk_term(Kind::BvExtract, &[lo], &[upper, lower]);
                    }
                    if lower >= low_w {
                        return tm.mk_term(
                            Kind::BvExtract,
                            &[hi],
                            &[upper - low_w, lower - low_w],
                        );
                    }
                }
            }
            Ok(term)
        }
        // Inequality directions normalize to less-than forms.
        Kind::BvUgt => swap_cmp(tm, term, Kind::BvUlt),
        Kind::BvUge => swap_cmp(tm, term, Kind::BvUle),
        Kind::BvSgt => swap_cmp(tm, term, Kind::BvSlt),
        Kind::BvSge => swap_cmp(tm, term, Kind::BvSle),
        Kind::BvUlt => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(tm.mk_false());
            }
            if matches!(bv_val(tm, b), Some(v) if v.is_zero()) {
                return Ok(tm.mk_false());
            }
            Ok(term)
        }
        Kind::BvUle => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(tm.mk_true());
            }
            if matches!(bv_val(tm, a), Some(v) if v.is_zero()) {
                return Ok(tm.mk_true());
            }
            Ok(term)
        }
        Kind::BvSlt => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(tm.mk_false());
            }
            Ok(term)
        }
        Kind::BvSle => {
            let (a, b) = (tm.child(term, 0), tm.child(term, 1));
            if a == b {
                return Ok(tm.mk_true());
            }
            Ok(term)
        }
        _ => Ok(term),
    }
}

fn swap_cmp(tm: &mut TermManager, term: TermId, target: Kind) -> Result<TermId> {
    let a = tm.child(term, 0);
    let b = tm.child(term, 1);
    tm.mk_term(target, &[b, a], &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::Rewriter;

    fn setup() -> (TermManager, Rewriter) {
        (TermManager::new(), Rewriter::new(2))
    }

    #[test]
    fn test_constant_folding() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let a = tm.mk_bv_value_u64(bv8, 200).unwrap();
        let b = tm.mk_bv_value_u64(bv8, 100).unwrap();
        let sum = tm.mk_term(Kind::BvAdd, &[a, b], &[]).unwrap();
        let r = rw.rewrite(&mut tm, sum).unwrap();
        assert_eq!(bv_val(&tm, r).unwrap().to_u64(), Some(44));
    }

    #[test]
    fn test_overflow_folding() {
        let (mut tm, mut rw) = setup();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let a = tm.mk_bv_value_u64(bv4, 12).unwrap();
        let b = tm.mk_bv_value_u64(bv4, 7).unwrap();
        let o = tm.mk_term(Kind::BvUaddo, &[a, b], &[]).unwrap();
        let r = rw.rewrite(&mut tm, o).unwrap();
        assert!(tm.is_bool_value(r, true));
    }

    #[test]
    fn test_add_cancellation() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let nx = tm.mk_term(Kind::BvNeg, &[x], &[]).unwrap();
        let sum = tm.mk_term(Kind::BvAdd, &[x, nx], &[]).unwrap();
        let r = rw.rewrite(&mut tm, sum).unwrap();
        assert_eq!(bv_val(&tm, r).unwrap(), BitVector::zero(8));
    }

    #[test]
    fn test_mul_identities() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let one = tm.mk_bv_one(bv8).unwrap();
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let m1 = tm.mk_term(Kind::BvMul, &[x, one], &[]).unwrap();
        assert_eq!(rw.rewrite(&mut tm, m1).unwrap(), x);
        let m0 = tm.mk_term(Kind::BvMul, &[x, zero], &[]).unwrap();
        assert_eq!(rw.rewrite(&mut tm, m0).unwrap(), zero);
    }

    #[test]
    fn test_comparison_direction() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv8, None);
        let gt = tm.mk_term(Kind::BvUgt, &[x, y], &[]).unwrap();
        let r = rw.rewrite(&mut tm, gt).unwrap();
        assert_eq!(tm.kind(r), Kind::BvUlt);
        assert_eq!(tm.child(r, 0), y);
    }

    #[test]
    fn test_extract_fusion() {
        let (mut tm, mut rw) = setup();
        let bv16 = tm.mk_bv_sort(16).unwrap();
        let x = tm.mk_const(bv16, None);
        let outer = tm.mk_term(Kind::BvExtract, &[x], &[11, 4]).unwrap();
        let inner = tm.mk_term(Kind::BvExtract, &[outer], &[5, 2]).unwrap();
        let r = rw.rewrite(&mut tm, inner).unwrap();
        assert_eq!(tm.kind(r), Kind::BvExtract);
        assert_eq!(tm.child(r, 0), x);
        assert_eq!(tm.indices(r), &[9, 6]);
    }

    #[test]
    fn test_rotation_expansion() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let v = tm.mk_bv_value_u64(bv8, 0b1000_0001).unwrap();
        let rot = tm.mk_term(Kind::BvRoli, &[v], &[1]).unwrap();
        let r = rw.rewrite(&mut tm, rot).unwrap();
        assert_eq!(bv_val(&tm, r).unwrap().to_u64(), Some(0b0000_0011));
        let x = tm.mk_const(bv8, None);
        let rot2 = tm.mk_term(Kind::BvRoli, &[x], &[8]).unwrap();
        assert_eq!(rw.rewrite(&mut tm, rot2).unwrap(), x);
    }

    #[test]
    fn test_nand_is_not_and() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv8, None);
        let nand = tm.mk_term(Kind::BvNand, &[x, y], &[]).unwrap();
        let and = tm.mk_term(Kind::BvAnd, &[x, y], &[]).unwrap();
        let not_and = tm.mk_term(Kind::BvNot, &[and], &[]).unwrap();
        assert_eq!(
            rw.rewrite(&mut tm, nand).unwrap(),
            rw.rewrite(&mut tm, not_and).unwrap()
        );
    }

    #[test]
    fn test_division_by_zero_semantics() {
        let (mut tm, mut rw) = setup();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, None);
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let div = tm.mk_term(Kind::BvUdiv, &[x, zero], &[]).unwrap();
        let r = rw.rewrite(&mut tm, div).unwrap();
        assert_eq!(bv_val(&tm, r).unwrap(), BitVector::ones(8));
        let rem = tm.mk_term(Kind::BvUrem, &[x, zero], &[]).unwrap();
        assert_eq!(rw.rewrite(&mut tm, rem).unwrap(), x);
    }
}
