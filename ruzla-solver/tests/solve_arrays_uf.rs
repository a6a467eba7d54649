//! End-to-end array and uninterpreted-function solving.

use ruzla_core::{Kind, Options, Value};
use ruzla_solver::{SolverResult, SolvingContext};

fn ctx_with(level: u64) -> SolvingContext {
    let mut opts = Options::default();
    opts.rewrite_level = level;
    SolvingContext::new(opts)
}

/// Scenario: select(store(a, 0, 5), 0) != 5 is unsatisfiable, both with
/// eager read-over-write rewriting and with lazy lemmas.
#[test]
fn test_s4_read_over_write_unsat() {
    for level in [0, 1, 2] {
        let mut ctx = ctx_with(level);
        let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
        let bv32 = ctx.tm().mk_bv_sort(32).unwrap();
        let arr_s = ctx.tm().mk_array_sort(bv8, bv32).unwrap();
        let a = ctx.tm().mk_const(arr_s, Some("a"));
        let zero = ctx.tm().mk_bv_zero(bv8).unwrap();
        let five = ctx.tm().mk_bv_value_u64(bv32, 5).unwrap();
        let st = ctx.tm().mk_term(Kind::Store, &[a, zero, five], &[]).unwrap();
        let sel = ctx.tm().mk_term(Kind::Select, &[st, zero], &[]).unwrap();
        let eq = ctx.tm().mk_term(Kind::Equal, &[sel, five], &[]).unwrap();
        let ne = ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap();
        ctx.assert_formula(ne).unwrap();
        assert_eq!(ctx.check_sat(), SolverResult::Unsat, "rewrite level {level}");
    }
}

#[test]
fn test_read_through_write_unsat() {
    // Distinct constant indices read through the store.
    for level in [0, 2] {
        let mut ctx = ctx_with(level);
        let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
        let arr_s = ctx.tm().mk_array_sort(bv8, bv8).unwrap();
        let a = ctx.tm().mk_const(arr_s, Some("a"));
        let i0 = ctx.tm().mk_bv_value_u64(bv8, 0).unwrap();
        let i1 = ctx.tm().mk_bv_value_u64(bv8, 1).unwrap();
        let v = ctx.tm().mk_bv_value_u64(bv8, 7).unwrap();
        let st = ctx.tm().mk_term(Kind::Store, &[a, i0, v], &[]).unwrap();
        let sel_other = ctx.tm().mk_term(Kind::Select, &[st, i1], &[]).unwrap();
        let sel_base = ctx.tm().mk_term(Kind::Select, &[a, i1], &[]).unwrap();
        let eq = ctx
            .tm()
            .mk_term(Kind::Equal, &[sel_other, sel_base], &[])
            .unwrap();
        let ne = ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap();
        ctx.assert_formula(ne).unwrap();
        assert_eq!(ctx.check_sat(), SolverResult::Unsat, "rewrite level {level}");
    }
}

#[test]
fn test_select_congruence_unsat() {
    // Equal symbolic indices force equal selects.
    let mut ctx = SolvingContext::new(Options::default());
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let arr_s = ctx.tm().mk_array_sort(bv8, bv8).unwrap();
    let a = ctx.tm().mk_const(arr_s, Some("a"));
    let i = ctx.tm().mk_const(bv8, Some("i"));
    let j = ctx.tm().mk_const(bv8, Some("j"));
    let si = ctx.tm().mk_term(Kind::Select, &[a, i], &[]).unwrap();
    let sj = ctx.tm().mk_term(Kind::Select, &[a, j], &[]).unwrap();
    let idx_eq = ctx.tm().mk_term(Kind::Equal, &[i, j], &[]).unwrap();
    let val_eq = ctx.tm().mk_term(Kind::Equal, &[si, sj], &[]).unwrap();
    let val_ne = ctx.tm().mk_term(Kind::Not, &[val_eq], &[]).unwrap();
    ctx.assert_formula(idx_eq).unwrap();
    ctx.assert_formula(val_ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_const_array() {
    let mut ctx = SolvingContext::new(Options::default());
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let arr_s = ctx.tm().mk_array_sort(bv8, bv8).unwrap();
    let nine = ctx.tm().mk_bv_value_u64(bv8, 9).unwrap();
    let ca = ctx.tm().mk_const_array(arr_s, nine).unwrap();
    let i = ctx.tm().mk_const(bv8, Some("i"));
    let sel = ctx.tm().mk_term(Kind::Select, &[ca, i], &[]).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[sel, nine], &[]).unwrap();
    let ne = ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap();
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_uf_congruence_unsat() {
    // x = y forces f(x) = f(y).
    let mut ctx = SolvingContext::new(Options::default());
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let fun_s = ctx.tm().mk_fun_sort(&[bv8], bv8).unwrap();
    let f = ctx.tm().mk_const(fun_s, Some("f"));
    let x = ctx.tm().mk_const(bv8, Some("x"));
    let y = ctx.tm().mk_const(bv8, Some("y"));
    let fx = ctx.tm().mk_term(Kind::Apply, &[f, x], &[]).unwrap();
    let fy = ctx.tm().mk_term(Kind::Apply, &[f, y], &[]).unwrap();
    let xeq = ctx.tm().mk_term(Kind::Equal, &[x, y], &[]).unwrap();
    let feq = ctx.tm().mk_term(Kind::Equal, &[fx, fy], &[]).unwrap();
    let fne = ctx.tm().mk_term(Kind::Not, &[feq], &[]).unwrap();
    ctx.assert_formula(xeq).unwrap();
    ctx.assert_formula(fne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_uf_distinct_args_sat() {
    // Different arguments leave the function free.
    let mut ctx = SolvingContext::new(Options::default());
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let fun_s = ctx.tm().mk_fun_sort(&[bv8], bv8).unwrap();
    let f = ctx.tm().mk_const(fun_s, Some("f"));
    let x = ctx.tm().mk_const(bv8, Some("x"));
    let y = ctx.tm().mk_const(bv8, Some("y"));
    let fx = ctx.tm().mk_term(Kind::Apply, &[f, x], &[]).unwrap();
    let fy = ctx.tm().mk_term(Kind::Apply, &[f, y], &[]).unwrap();
    let xne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[x, y], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    let fne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[fx, fy], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    ctx.assert_formula(xne).unwrap();
    ctx.assert_formula(fne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
}

#[test]
fn test_binary_uf_congruence() {
    // g(x, y) != g(y, x) is satisfiable; adding x = y makes it unsat.
    let mut opts = Options::default();
    opts.incremental = true;
    let mut ctx = SolvingContext::new(opts);
    let bv4 = ctx.tm().mk_bv_sort(4).unwrap();
    let fun_s = ctx.tm().mk_fun_sort(&[bv4, bv4], bv4).unwrap();
    let g = ctx.tm().mk_const(fun_s, Some("g"));
    let x = ctx.tm().mk_const(bv4, Some("x"));
    let y = ctx.tm().mk_const(bv4, Some("y"));
    let gxy = ctx.tm().mk_term(Kind::Apply, &[g, x, y], &[]).unwrap();
    let gyx = ctx.tm().mk_term(Kind::Apply, &[g, y, x], &[]).unwrap();
    let ne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[gxy, gyx], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    let xeq = ctx.tm().mk_term(Kind::Equal, &[x, y], &[]).unwrap();
    ctx.assert_formula(xeq).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_array_extensionality() {
    // Arrays asserted different must differ somewhere; storing the same
    // value into both at the witness index cannot restore equality, so a
    // plain disequality remains satisfiable.
    let mut ctx = SolvingContext::new(Options::default());
    let bv4 = ctx.tm().mk_bv_sort(4).unwrap();
    let arr_s = ctx.tm().mk_array_sort(bv4, bv4).unwrap();
    let a = ctx.tm().mk_const(arr_s, Some("a"));
    let b = ctx.tm().mk_const(arr_s, Some("b"));
    let ne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[a, b], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
}

#[test]
fn test_array_equality_propagates() {
    // a = b forces select(a, i) = select(b, i).
    let mut ctx = SolvingContext::new(Options::default());
    let bv4 = ctx.tm().mk_bv_sort(4).unwrap();
    let arr_s = ctx.tm().mk_array_sort(bv4, bv4).unwrap();
    let a = ctx.tm().mk_const(arr_s, Some("a"));
    let b = ctx.tm().mk_const(arr_s, Some("b"));
    let i = ctx.tm().mk_const(bv4, Some("i"));
    let sa = ctx.tm().mk_term(Kind::Select, &[a, i], &[]).unwrap();
    let sb = ctx.tm().mk_term(Kind::Select, &[b, i], &[]).unwrap();
    let aeq = ctx.tm().mk_term(Kind::Equal, &[a, b], &[]).unwrap();
    let sne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[sa, sb], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    ctx.assert_formula(aeq).unwrap();
    ctx.assert_formula(sne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_uninterpreted_sort_solving() {
    // Two constants of an uninterpreted sort can differ; three constants
    // cannot be pairwise distinct AND all equal.
    let mut ctx = SolvingContext::new(Options::default());
    let s = ctx.tm().mk_uninterpreted_sort("S");
    let a = ctx.tm().mk_const(s, Some("a"));
    let b = ctx.tm().mk_const(s, Some("b"));
    let ne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[a, b], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    ctx.assert_formula(ne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);

    let mut ctx = SolvingContext::new(Options::default());
    let s = ctx.tm().mk_uninterpreted_sort("S");
    let a = ctx.tm().mk_const(s, Some("a"));
    let b = ctx.tm().mk_const(s, Some("b"));
    let eq = ctx.tm().mk_term(Kind::Equal, &[a, b], &[]).unwrap();
    let dist = ctx.tm().mk_term(Kind::Distinct, &[a, b], &[]).unwrap();
    ctx.assert_formula(eq).unwrap();
    ctx.assert_formula(dist).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_congruence_property_in_model() {
    // Congruence invariant: applications with equal argument values share
    // a value in the final model.
    let mut opts = Options::default();
    opts.produce_models = true;
    let mut ctx = SolvingContext::new(opts);
    let bv4 = ctx.tm().mk_bv_sort(4).unwrap();
    let fun_s = ctx.tm().mk_fun_sort(&[bv4], bv4).unwrap();
    let f = ctx.tm().mk_const(fun_s, Some("f"));
    let x = ctx.tm().mk_const(bv4, Some("x"));
    let y = ctx.tm().mk_const(bv4, Some("y"));
    let fx = ctx.tm().mk_term(Kind::Apply, &[f, x], &[]).unwrap();
    let fy = ctx.tm().mk_term(Kind::Apply, &[f, y], &[]).unwrap();
    // Nothing forces x != y; check the invariant on whatever model comes
    // back.
    let three = ctx.tm().mk_bv_value_u64(bv4, 3).unwrap();
    let a1 = ctx.tm().mk_term(Kind::Equal, &[x, three], &[]).unwrap();
    let a2 = ctx.tm().mk_term(Kind::Equal, &[y, three], &[]).unwrap();
    ctx.assert_formula(a1).unwrap();
    ctx.assert_formula(a2).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    let vx = ctx.get_value(fx).unwrap();
    let vy = ctx.get_value(fy).unwrap();
    assert_eq!(vx, vy);
}

#[test]
fn test_function_model_extraction() {
    let mut opts = Options::default();
    opts.produce_models = true;
    let mut ctx = SolvingContext::new(opts);
    let bv4 = ctx.tm().mk_bv_sort(4).unwrap();
    let fun_s = ctx.tm().mk_fun_sort(&[bv4], bv4).unwrap();
    let f = ctx.tm().mk_const(fun_s, Some("f"));
    let two = ctx.tm().mk_bv_value_u64(bv4, 2).unwrap();
    let nine = ctx.tm().mk_bv_value_u64(bv4, 9).unwrap();
    let f2 = ctx.tm().mk_term(Kind::Apply, &[f, two], &[]).unwrap();
    let eq = ctx.tm().mk_term(Kind::Equal, &[f2, nine], &[]).unwrap();
    ctx.assert_formula(eq).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    let lam = ctx.get_value(f).unwrap();
    assert_eq!(ctx.tm_ref().kind(lam), Kind::Lambda);
    // Applying the model function to 2 yields 9.
    let applied = ctx.tm().mk_term(Kind::Apply, &[lam, two], &[]).unwrap();
    let v = ctx.get_value(applied).unwrap();
    assert_eq!(
        ctx.tm_ref()
            .value(v)
            .and_then(Value::as_bitvector)
            .unwrap()
            .to_u64(),
        Some(9)
    );
}
