//! Incremental solving: push/pop, assumptions, unsat cores.

use ruzla_core::{Kind, Options, TermId};
use ruzla_solver::{SolverResult, SolvingContext};

fn incremental_ctx() -> SolvingContext {
    let mut opts = Options::default();
    opts.incremental = true;
    SolvingContext::new(opts)
}

#[test]
fn test_push_pop_isolation() {
    let mut ctx = incremental_ctx();
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let x = ctx.tm().mk_const(bv8, Some("x"));
    let five = ctx.tm().mk_bv_value_u64(bv8, 5).unwrap();
    let six = ctx.tm().mk_bv_value_u64(bv8, 6).unwrap();
    let eq5 = ctx.tm().mk_term(Kind::Equal, &[x, five], &[]).unwrap();
    let eq6 = ctx.tm().mk_term(Kind::Equal, &[x, six], &[]).unwrap();

    ctx.assert_formula(eq5).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);

    // A contradicting scope pops away cleanly.
    ctx.push(1).unwrap();
    ctx.assert_formula(eq6).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
    ctx.pop(1).unwrap();

    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    assert_eq!(ctx.level(), 0);
}

#[test]
fn test_nested_scopes() {
    let mut ctx = incremental_ctx();
    let bool_s = ctx.tm().mk_bool_sort();
    let p = ctx.tm().mk_const(bool_s, Some("p"));
    let q = ctx.tm().mk_const(bool_s, Some("q"));
    let np = ctx.tm().mk_term(Kind::Not, &[p], &[]).unwrap();
    let nq = ctx.tm().mk_term(Kind::Not, &[q], &[]).unwrap();

    ctx.assert_formula(p).unwrap();
    ctx.push(2).unwrap();
    ctx.assert_formula(q).unwrap();
    ctx.push(1).unwrap();
    ctx.assert_formula(nq).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
    ctx.pop(1).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    ctx.pop(2).unwrap();
    // Only p remains; asserting not q is fine, not p is not.
    ctx.assert_formula(nq).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    ctx.assert_formula(np).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
}

#[test]
fn test_scope_discipline_errors() {
    let mut ctx = SolvingContext::new(Options::default());
    // Non-incremental contexts reject scope operations (except no-ops).
    assert!(ctx.push(1).is_err());
    assert!(ctx.pop(1).is_err());
    assert!(ctx.push(0).is_ok());
    assert!(ctx.pop(0).is_ok());

    let mut ctx = incremental_ctx();
    ctx.push(1).unwrap();
    assert!(ctx.pop(2).is_err());
    ctx.pop(1).unwrap();
    assert!(ctx.pop(1).is_err());
}

#[test]
fn test_check_sat_assuming() {
    let mut ctx = incremental_ctx();
    let bool_s = ctx.tm().mk_bool_sort();
    let p = ctx.tm().mk_const(bool_s, Some("p"));
    let q = ctx.tm().mk_const(bool_s, Some("q"));
    let imp = ctx.tm().mk_term(Kind::Implies, &[p, q], &[]).unwrap();
    let nq = ctx.tm().mk_term(Kind::Not, &[q], &[]).unwrap();
    ctx.assert_formula(imp).unwrap();

    // p alone is fine.
    assert_eq!(
        ctx.check_sat_assuming(&[p]).unwrap(),
        SolverResult::Sat
    );
    // p with not q contradicts the implication.
    assert_eq!(
        ctx.check_sat_assuming(&[p, nq]).unwrap(),
        SolverResult::Unsat
    );
    let failed = ctx.get_unsat_assumptions().unwrap();
    assert!(!failed.is_empty());
    assert!(failed.iter().all(|t| *t == p || *t == nq));
    // Assumptions do not stick.
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
}

#[test]
fn test_assumptions_require_incremental() {
    let mut ctx = SolvingContext::new(Options::default());
    let bool_s = ctx.tm().mk_bool_sort();
    let p = ctx.tm().mk_const(bool_s, Some("p"));
    assert!(ctx.check_sat_assuming(&[p]).is_err());
}

#[test]
fn test_unsat_core_subset() {
    let mut opts = Options::default();
    opts.produce_unsat_cores = true;
    let mut ctx = SolvingContext::new(opts);
    let bool_s = ctx.tm().mk_bool_sort();
    let p = ctx.tm().mk_const(bool_s, Some("p"));
    let q = ctx.tm().mk_const(bool_s, Some("q"));
    let np = ctx.tm().mk_term(Kind::Not, &[p], &[]).unwrap();

    ctx.assert_formula(p).unwrap();
    ctx.assert_formula(q).unwrap();
    ctx.assert_formula(np).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);

    let core: Vec<TermId> = ctx.get_unsat_core().unwrap();
    // The core is a subset of the original assertions and excludes the
    // irrelevant q.
    assert!(!core.is_empty());
    assert!(core.iter().all(|t| *t == p || *t == np));
}

#[test]
fn test_unsat_core_through_flattening() {
    let mut opts = Options::default();
    opts.produce_unsat_cores = true;
    let mut ctx = SolvingContext::new(opts);
    let bool_s = ctx.tm().mk_bool_sort();
    let p = ctx.tm().mk_const(bool_s, Some("p"));
    let q = ctx.tm().mk_const(bool_s, Some("q"));
    let np = ctx.tm().mk_term(Kind::Not, &[p], &[]).unwrap();
    // One conjunction assertion carrying the contradiction.
    let and = ctx.tm().mk_term(Kind::And, &[q, np], &[]).unwrap();
    ctx.assert_formula(p).unwrap();
    ctx.assert_formula(and).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
    let core = ctx.get_unsat_core().unwrap();
    // Both originals participate; the split conjunct maps back to its
    // origin.
    assert!(core.contains(&p));
    assert!(core.contains(&and));
}

#[test]
fn test_core_requires_option_and_unsat() {
    let mut ctx = SolvingContext::new(Options::default());
    assert!(ctx.get_unsat_core().is_err());

    let mut opts = Options::default();
    opts.produce_unsat_cores = true;
    let mut ctx = SolvingContext::new(opts);
    let t = ctx.tm().mk_true();
    ctx.assert_formula(t).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    assert!(ctx.get_unsat_core().is_err());
}

#[test]
fn test_incremental_lemma_reuse() {
    // Congruence lemmas survive pops (they are theory-valid).
    let mut ctx = incremental_ctx();
    let bv4 = ctx.tm().mk_bv_sort(4).unwrap();
    let fun_s = ctx.tm().mk_fun_sort(&[bv4], bv4).unwrap();
    let f = ctx.tm().mk_const(fun_s, Some("f"));
    let x = ctx.tm().mk_const(bv4, Some("x"));
    let y = ctx.tm().mk_const(bv4, Some("y"));
    let fx = ctx.tm().mk_term(Kind::Apply, &[f, x], &[]).unwrap();
    let fy = ctx.tm().mk_term(Kind::Apply, &[f, y], &[]).unwrap();
    let xeq = ctx.tm().mk_term(Kind::Equal, &[x, y], &[]).unwrap();
    let fne = {
        let eq = ctx.tm().mk_term(Kind::Equal, &[fx, fy], &[]).unwrap();
        ctx.tm().mk_term(Kind::Not, &[eq], &[]).unwrap()
    };
    ctx.push(1).unwrap();
    ctx.assert_formula(xeq).unwrap();
    ctx.assert_formula(fne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
    ctx.pop(1).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    // The same scope re-pushed stays unsat.
    ctx.push(1).unwrap();
    ctx.assert_formula(xeq).unwrap();
    ctx.assert_formula(fne).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Unsat);
    ctx.pop(1).unwrap();
}

#[test]
fn test_substitution_scoping() {
    // A substitution learned inside a scope must not leak after pop.
    let mut ctx = incremental_ctx();
    let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
    let x = ctx.tm().mk_const(bv8, Some("x"));
    let five = ctx.tm().mk_bv_value_u64(bv8, 5).unwrap();
    let six = ctx.tm().mk_bv_value_u64(bv8, 6).unwrap();
    let eq5 = ctx.tm().mk_term(Kind::Equal, &[x, five], &[]).unwrap();
    let eq6 = ctx.tm().mk_term(Kind::Equal, &[x, six], &[]).unwrap();

    ctx.push(1).unwrap();
    ctx.assert_formula(eq5).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    ctx.pop(1).unwrap();

    // x is unconstrained again: x = 6 must be satisfiable.
    ctx.push(1).unwrap();
    ctx.assert_formula(eq6).unwrap();
    assert_eq!(ctx.check_sat(), SolverResult::Sat);
    ctx.pop(1).unwrap();
}
