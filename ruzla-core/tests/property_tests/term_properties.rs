//! Hash-consing and typing properties of the term manager.

use proptest::prelude::*;
use ruzla_core::{Kind, TermManager};

fn binary_bv_kinds() -> Vec<Kind> {
    vec![
        Kind::BvAdd,
        Kind::BvSub,
        Kind::BvMul,
        Kind::BvAnd,
        Kind::BvOr,
        Kind::BvXor,
        Kind::BvUdiv,
        Kind::BvUrem,
        Kind::BvShl,
        Kind::BvConcat,
        Kind::BvUlt,
        Kind::BvSle,
        Kind::BvUaddo,
    ]
}

proptest! {
    /// Constructing the same term twice yields the same id.
    #[test]
    fn hash_consing(
        w in 1u64..=64,
        v in any::<u64>(),
        kind in prop::sample::select(binary_bv_kinds())
    ) {
        let mut tm = TermManager::new();
        let sort = tm.mk_bv_sort(w).unwrap();
        let x = tm.mk_const(sort, Some("x"));
        let c = tm.mk_bv_value_u64(sort, v).unwrap();
        let t1 = tm.mk_term(kind, &[x, c], &[]).unwrap();
        let t2 = tm.mk_term(kind, &[x, c], &[]).unwrap();
        prop_assert_eq!(t1, t2);
    }

    /// Every successful construction carries a sort consistent with the
    /// kind signature.
    #[test]
    fn typing_totality(
        w in 1u64..=64,
        kind in prop::sample::select(binary_bv_kinds())
    ) {
        let mut tm = TermManager::new();
        let sort = tm.mk_bv_sort(w).unwrap();
        let x = tm.mk_const(sort, None);
        let y = tm.mk_const(sort, None);
        let t = tm.mk_term(kind, &[x, y], &[]).unwrap();
        let ts = tm.sort(t);
        if kind.is_bv_predicate() {
            prop_assert!(tm.is_bool_sort(ts));
        } else if kind == Kind::BvConcat {
            prop_assert_eq!(tm.bv_width(ts), Some(2 * w));
        } else {
            prop_assert_eq!(tm.bv_width(ts), Some(w));
        }
    }

    /// Extract bounds are validated exactly: upper >= lower and
    /// upper < width succeed, anything else fails.
    #[test]
    fn extract_index_validation(w in 1u64..=64, u in 0u64..80, l in 0u64..80) {
        let mut tm = TermManager::new();
        let sort = tm.mk_bv_sort(w).unwrap();
        let x = tm.mk_const(sort, None);
        let r = tm.mk_term(Kind::BvExtract, &[x], &[u, l]);
        if u >= l && u < w {
            let t = r.unwrap();
            prop_assert_eq!(tm.bv_width(tm.sort(t)), Some(u - l + 1));
        } else {
            prop_assert!(r.is_err());
        }
    }

    /// Parsing a printed numeral reproduces the u64 constructor.
    #[test]
    fn value_string_agreement(w in 1u64..=64, v in any::<u64>()) {
        let mut tm = TermManager::new();
        let sort = tm.mk_bv_sort(w).unwrap();
        let direct = tm.mk_bv_value_u64(sort, v).unwrap();
        let masked = if w == 64 { v } else { v & ((1u64 << w) - 1) };
        let via_str = tm.mk_bv_value(sort, &masked.to_string(), 10).unwrap();
        prop_assert_eq!(direct, via_str);
    }
}
