//! Rewriter preservation and idempotence properties.

use proptest::prelude::*;
use ruzla_core::{BitVector, Kind, Rewriter, TermManager, Value};

fn fold_binop(kind: Kind, w: u64, a: u64, b: u64, level: u64) -> BitVector {
    let mut tm = TermManager::new();
    let mut rw = Rewriter::new(level);
    let sort = tm.mk_bv_sort(w).unwrap();
    let x = tm.mk_bv_value_u64(sort, a).unwrap();
    let y = tm.mk_bv_value_u64(sort, b).unwrap();
    let t = tm.mk_term(kind, &[x, y], &[]).unwrap();
    let r = rw.rewrite(&mut tm, t).unwrap();
    tm.value(r)
        .and_then(Value::as_bitvector)
        .expect("folds to a value")
        .clone()
}

proptest! {
    /// Folding agrees with the value semantics at every rewrite level
    /// above zero.
    #[test]
    fn folding_matches_value_semantics(
        w in 1u64..=16,
        a in any::<u64>(),
        b in any::<u64>(),
        level in 1u64..=2
    ) {
        let x = BitVector::from_u64(w, a);
        let y = BitVector::from_u64(w, b);
        prop_assert_eq!(fold_binop(Kind::BvAdd, w, a, b, level), x.add(&y));
        prop_assert_eq!(fold_binop(Kind::BvMul, w, a, b, level), x.mul(&y));
        prop_assert_eq!(fold_binop(Kind::BvUdiv, w, a, b, level), x.udiv(&y));
        prop_assert_eq!(fold_binop(Kind::BvAshr, w, a, b, level), x.ashr(&y));
    }

    /// Idempotence: rewrite(rewrite(t)) == rewrite(t) over a random
    /// little term shape.
    #[test]
    fn rewrite_idempotent(
        w in 1u64..=16,
        a in any::<u64>(),
        b in any::<u64>(),
        pick in 0usize..4
    ) {
        let mut tm = TermManager::new();
        let mut rw = Rewriter::new(2);
        let sort = tm.mk_bv_sort(w).unwrap();
        let x = tm.mk_const(sort, Some("x"));
        let va = tm.mk_bv_value_u64(sort, a).unwrap();
        let vb = tm.mk_bv_value_u64(sort, b).unwrap();
        let inner = tm.mk_term(Kind::BvAdd, &[x, va], &[]).unwrap();
        let t = match pick {
            0 => tm.mk_term(Kind::BvMul, &[inner, vb], &[]).unwrap(),
            1 => tm.mk_term(Kind::BvUlt, &[inner, vb], &[]).unwrap(),
            2 => {
                let n = tm.mk_term(Kind::BvNeg, &[inner], &[]).unwrap();
                tm.mk_term(Kind::BvAdd, &[inner, n], &[]).unwrap()
            }
            _ => {
                let e = tm.mk_term(Kind::Equal, &[inner, vb], &[]).unwrap();
                tm.mk_term(Kind::Not, &[e], &[]).unwrap()
            }
        };
        let once = rw.rewrite(&mut tm, t).unwrap();
        let twice = rw.rewrite(&mut tm, once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Rewriting preserves the sort.
    #[test]
    fn rewrite_preserves_sort(w in 1u64..=16, a in any::<u64>()) {
        let mut tm = TermManager::new();
        let mut rw = Rewriter::new(2);
        let sort = tm.mk_bv_sort(w).unwrap();
        let x = tm.mk_const(sort, Some("x"));
        let v = tm.mk_bv_value_u64(sort, a).unwrap();
        for kind in [Kind::BvAdd, Kind::BvAnd, Kind::BvShl, Kind::BvSub] {
            let t = tm.mk_term(kind, &[x, v], &[]).unwrap();
            let r = rw.rewrite(&mut tm, t).unwrap();
            prop_assert_eq!(tm.sort(r), tm.sort(t));
        }
        let p = tm.mk_term(Kind::BvUle, &[x, v], &[]).unwrap();
        let rp = rw.rewrite(&mut tm, p).unwrap();
        prop_assert!(tm.is_bool_sort(tm.sort(rp)));
    }

    /// Boolean rewrites agree with truth tables on values.
    #[test]
    fn bool_folding_truth_tables(a in any::<bool>(), b in any::<bool>()) {
        let mut tm = TermManager::new();
        let mut rw = Rewriter::new(1);
        let x = tm.mk_bool_value(a);
        let y = tm.mk_bool_value(b);
        let cases = [
            (Kind::And, a && b),
            (Kind::Or, a || b),
            (Kind::Implies, !a || b),
            (Kind::Iff, a == b),
            (Kind::Xor, a != b),
        ];
        for (kind, want) in cases {
            let t = tm.mk_term(kind, &[x, y], &[]).unwrap();
            let r = rw.rewrite(&mut tm, t).unwrap();
            prop_assert!(tm.is_bool_value(r, want), "{:?}({}, {})", kind, a, b);
        }
    }
}
