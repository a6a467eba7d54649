//! Bit-vector values agree with 64-bit reference semantics.

use proptest::prelude::*;
use ruzla_core::BitVector;

fn masked(w: u64, v: u64) -> u64 {
    if w == 64 {
        v
    } else {
        v & ((1u64 << w) - 1)
    }
}

proptest! {
    #[test]
    fn add_matches_u64(a in any::<u64>(), b in any::<u64>(), w in 1u64..=64) {
        let x = BitVector::from_u64(w, a);
        let y = BitVector::from_u64(w, b);
        let want = masked(w, masked(w, a).wrapping_add(masked(w, b)));
        prop_assert_eq!(x.add(&y).to_u64(), Some(want));
    }

    #[test]
    fn sub_is_add_of_negation(a in any::<u64>(), b in any::<u64>(), w in 1u64..=64) {
        let x = BitVector::from_u64(w, a);
        let y = BitVector::from_u64(w, b);
        let neg = y.neg();
        prop_assert_eq!(x.sub(&y), x.add(&neg));
    }

    #[test]
    fn mul_matches_u64(a in any::<u64>(), b in any::<u64>(), w in 1u64..=32) {
        let x = BitVector::from_u64(w, a);
        let y = BitVector::from_u64(w, b);
        let want = masked(w, masked(w, a).wrapping_mul(masked(w, b)));
        prop_assert_eq!(x.mul(&y).to_u64(), Some(want));
    }

    #[test]
    fn udiv_urem_reconstruct(a in any::<u64>(), b in any::<u64>(), w in 1u64..=32) {
        let x = BitVector::from_u64(w, a);
        let y = BitVector::from_u64(w, b);
        prop_assume!(!y.is_zero());
        // x = y * (x / y) + (x % y)
        let q = x.udiv(&y);
        let r = x.urem(&y);
        let back = y.mul(&q).add(&r);
        prop_assert_eq!(back, x);
        prop_assert!(r.ult(&y));
    }

    #[test]
    fn shifts_match_u64(a in any::<u64>(), sh in 0u64..80, w in 1u64..=64) {
        let x = BitVector::from_u64(w, a);
        let s = BitVector::from_u64(w, sh);
        let applied = masked(w, sh);
        let want_shl = if applied >= w { 0 } else { masked(w, masked(w, a) << applied) };
        let want_shr = if applied >= w { 0 } else { masked(w, a) >> applied };
        prop_assert_eq!(x.shl(&s).to_u64(), Some(want_shl));
        prop_assert_eq!(x.shr(&s).to_u64(), Some(want_shr));
    }

    #[test]
    fn rotate_round_trips(a in any::<u64>(), n in 0u64..130, w in 1u64..=64) {
        let x = BitVector::from_u64(w, a);
        prop_assert_eq!(x.rol_by(n).ror_by(n), x.clone());
        prop_assert_eq!(x.rol_by(w), x);
    }

    #[test]
    fn concat_extract_inverse(a in any::<u64>(), b in any::<u64>(), wa in 1u64..=32, wb in 1u64..=32) {
        let hi = BitVector::from_u64(wa, a);
        let lo = BitVector::from_u64(wb, b);
        let cat = hi.concat(&lo);
        prop_assert_eq!(cat.extract(wa + wb - 1, wb).unwrap(), hi);
        prop_assert_eq!(cat.extract(wb - 1, 0).unwrap(), lo);
    }

    #[test]
    fn signed_compare_matches_i64(a in any::<i64>(), b in any::<i64>(), w in 1u64..=63) {
        let x = BitVector::from_i64(w, a);
        let y = BitVector::from_i64(w, b);
        let xi = x.to_i64().unwrap();
        let yi = y.to_i64().unwrap();
        prop_assert_eq!(x.slt(&y), xi < yi);
        prop_assert_eq!(x.sle(&y), xi <= yi);
    }

    #[test]
    fn string_round_trip(a in any::<u64>(), w in 1u64..=64, base in prop::sample::select(vec![2u32, 10, 16])) {
        let x = BitVector::from_u64(w, a);
        let s = x.to_string_base(base);
        prop_assert_eq!(BitVector::from_str(w, &s, base).unwrap(), x);
    }

    #[test]
    fn overflow_predicates_match_wide(a in any::<u64>(), b in any::<u64>(), w in 1u64..=16) {
        let x = BitVector::from_u64(w, a);
        let y = BitVector::from_u64(w, b);
        let wide = masked(w, a) as u128 + masked(w, b) as u128;
        prop_assert_eq!(x.uaddo(&y), wide > (if w == 64 { u64::MAX as u128 } else { (1u128 << w) - 1 }));
        let prod = masked(w, a) as u128 * masked(w, b) as u128;
        prop_assert_eq!(x.umulo(&y), prod > (1u128 << w) - 1);
    }
}
