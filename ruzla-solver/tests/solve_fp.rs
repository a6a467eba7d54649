//! End-to-end floating-point solving through the word-blaster.

use ruzla_core::fp::RoundingMode;
use ruzla_core::{Kind, Options, Value};
use ruzla_solver::{SolverResult, SolvingContext};

/// Scenario: fp.isNaN(fp.add(RNE, +0.0, NaN)) over FP(5, 11) is
/// satisfiable (it is valid).
#[test]
fn test_s5_nan_propagation_sat() {
    for level in [0, 2] {
        let mut opts = Options::default();
        opts.rewrite_level = level;
        let mut ctx = SolvingContext::new(opts);
        let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
        let rm = ctx.tm().mk_rm_value(RoundingMode::Rne);
        let zero = ctx.tm().mk_fp_pos_zero(f16).unwrap();
        let nan = ctx.tm().mk_fp_nan(f16).unwrap();
        let sum = ctx.tm().mk_term(Kind::FpAdd, &[rm, zero, nan], &[]).unwrap();
        let isnan = ctx.tm().mk_term(Kind::FpIsNan, &[sum], &[]).unwrap();
        ctx.assert_formula(isnan).unwrap();
        assert_eq!(ctx.check_sat(), SolverResult::Sat, "rewrite level {level}");
    }
}

#[test]
fn test_fp_addition_symbolic() {
    // x + 1.0 = 3.0 has the solution x = 2.0 in FP(5, 11).
    let mut opts = Options::default();
    opts.produce_models = true;
    let mut ctx = SolvingContext::new(opts);
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let rm = ctx.tm().mk_rm_value(RoundingMode::Rne);
    let x = ctx.tm().mk_const(f16, Some("x"));
    let one = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "1")
        .unwrap();
    let three = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "3")
        .unwrap();
    let sum = ctx.tm().mk_term(Kind::FpAdd, &[rm, x, one], &[]).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[sum, three], &[]).unwrap();
    ctx.assert_formula(eq).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);

    let v = ctx.get_value(x).unwrap();
    let two = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "2")
        .unwrap();
    let got = ctx
        .tm_ref()
        .value(v)
        .and_then(Value::as_floating_point)
        .unwrap()
        .clone();
    let want = ctx
        .tm_ref()
        .value(two)
        .and_then(Value::as_floating_point)
        .unwrap()
        .clone();
    assert_eq!(got.as_bv(), want.as_bv());
}

#[test]
fn test_fp_ordering_unsat() {
    // x < y and y < x cannot both hold.
    let mut ctx = SolvingContext::new(Options::default());
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let x = ctx.tm().mk_const(f16, Some("x"));
    let y = ctx.tm().mk_const(f16, Some("y"));
    let lt1 = ctx.tm().mk_term(Kind::FpLt, &[x, y], &[]).unwrap();
    let lt2 = ctx.tm().mk_term(Kind::FpLt, &[y, x], &[]).unwrap();
    ctx.assert_formula(lt1).unwrap();
    ctx.assert_formula(lt2).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_fp_nan_is_unordered() {
    // A NaN input makes both x < y and x >= y false; such an x exists.
    let mut ctx = SolvingContext::new(Options::default());
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let x = ctx.tm().mk_const(f16, Some("x"));
    let y = ctx.tm().mk_const(f16, Some("y"));
    let lt = ctx.tm().mk_term(Kind::FpLt, &[x, y], &[]).unwrap();
    let ge = ctx.tm().mk_term(Kind::FpGe, &[x, y], &[]).unwrap();
    let nlt = ctx.tm().mk_term(Kind::Not, &[lt], &[]).unwrap();
    let nge = ctx.tm().mk_term(Kind::Not, &[ge], &[]).unwrap();
    ctx.assert_formula(nlt).unwrap();
    ctx.assert_formula(nge).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
}

#[test]
fn test_fp_abs_nonnegative() {
    // abs(x) is never negative: asserting fp.isNegative(fp.abs(x)) is
    // unsat.
    let mut ctx = SolvingContext::new(Options::default());
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let x = ctx.tm().mk_const(f16, Some("x"));
    let abs = ctx.tm().mk_term(Kind::FpAbs, &[x], &[]).unwrap();
    let neg = ctx.tm().mk_term(Kind::FpIsNeg, &[abs], &[]).unwrap();
    ctx.assert_formula(neg).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_fp_minimal_format() {
    // FP(2, 2) boundary: some x with x + x = x exists besides zero
    // (infinity), and a finite nonzero one does not.
    let mut ctx = SolvingContext::new(Options::default());
    let f4 = ctx.tm().mk_fp_sort(2, 2).unwrap();
    let rm = ctx.tm().mk_rm_value(RoundingMode::Rne);
    let x = ctx.tm().mk_const(f4, Some("x"));
    let sum = ctx.tm().mk_term(Kind::FpAdd, &[rm, x, x], &[]).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[sum, x], &[]).unwrap();
    let nz = {
        let z = ctx.tm().mk_term(Kind::FpIsZero, &[x], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[z], &[]).unwrap()
    };
    let fin = {
        let inf = ctx.tm().mk_term(Kind::FpIsInf, &[x], &[]).unwrap();
        let nan = ctx.tm().mk_term(Kind::FpIsNan, &[x], &[]).unwrap();
        let bad = ctx.tm().mk_term(Kind::Or, &[inf, nan], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[bad], &[]).unwrap()
    };
    ctx.assert_formula(eq).unwrap();
    ctx.assert_formula(nz).unwrap();
    ctx.assert_formula(fin).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_rm_constant_is_constrained() {
    // A symbolic rounding mode can only take the five valid encodings:
    // rounding 1 with any mode yields 1, so fp.rti(rm, 1.0) != 1.0 is
    // unsat even though rm is unconstrained.
    let mut ctx = SolvingContext::new(Options::default());
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let rm_s = ctx.tm().mk_rm_sort();
    let rm = ctx.tm().mk_const(rm_s, Some("rm"));
    let one = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "1")
        .unwrap();
    let rti = ctx.tm().mk_term(Kind::FpRti, &[rm, one], &[]).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[rti, one], &[]).unwrap();
    let ne = ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap();
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_fp_to_bv_round_trip() {
    // Reinterpreting the packed bits round-trips.
    let mut ctx = SolvingContext::new(Options::default());
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let bv16 = ctx.tm().mk_bv_sort(16).unwrap();
    let b = ctx.tm().mk_const(bv16, Some("b"));
    let as_fp = ctx.tm().mk_term(Kind::FpToFpFromBv, &[b], &[5, 11]).unwrap();
    // Packing the unpacked fields gives back b.
    let one_point_five = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "1.5")
        .unwrap();
    let eq_fp = ctx
        .tm()
        .mk_term(Kind::Equal, &[as_fp, one_point_five], &[])
        .unwrap();
    ctx.assert_formula(eq_fp).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
}

#[test]
fn test_fp_conversion_to_sbv() {
    // to_sbv(RTZ, -2.5) = -2 must hold.
    let mut ctx = SolvingContext::new(Options::default());
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let rm = ctx.tm().mk_rm_value(RoundingMode::Rtz);
    let val = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "-2.5")
        .unwrap();
    let conv = ctx.tm().mk_term(Kind::FpToSbv, &[rm, val], &[8]).unwrap();
    let want = ctx.tm().mk_bv_value_i64(bv8, -2).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[conv, want], &[]).unwrap();
    let ne = ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap();
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_fp_mul_commutes() {
    // Multiplication is commutative bit-for-bit (same rounding).
    let mut ctx = SolvingContext::new(Options::default());
    let f8 = ctx.tm().mk_fp_sort(3, 5).unwrap();
    let rm = ctx.tm().mk_rm_value(RoundingMode::Rne);
    let x = ctx.tm().mk_const(f8, Some("x"));
    let y = ctx.tm().mk_const(f8, Some("y"));
    let xy = ctx.tm().mk_term(Kind::FpMul, &[rm, x, y], &[]).unwrap();
    let yx = ctx.tm().mk_term(Kind::FpMul, &[rm, y, x], &[]).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[xy, yx], &[]).unwrap();
    let ne = ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap();
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_fp_value_model_round_trip() {
    let mut opts = Options::default();
    opts.produce_models = true;
    let mut ctx = SolvingContext::new(opts);
    let f16 = ctx.tm().mk_fp_sort(5, 11).unwrap();
    let x = ctx.tm().mk_const(f16, Some("x"));
    let half = ctx
        .tm()
        .mk_fp_value_from_real(f16, RoundingMode::Rne, "0.5")
        .unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[x, half], &[]).unwrap();
    ctx.assert_formula(eq).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    let v = ctx.get_value(x).unwrap();
    let got = ctx
        .tm_ref()
        .value(v)
        .and_then(Value::as_floating_point)
        .unwrap();
    assert!(!got.is_nan());
    assert_eq!(
        got.as_bv(),
        ctx.tm_ref()
            .value(half)
            .and_then(Value::as_floating_point)
            .unwrap()
            .as_bv()
    );
}
