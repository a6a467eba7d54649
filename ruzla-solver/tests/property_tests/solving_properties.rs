//! Solving-level properties over random small formulas.
//!
//! Random BV4 assertion sets are solved at rewrite levels 0 and 2; both
//! configurations must agree, and satisfiable answers must produce models
//! that evaluate every assertion to true.

use proptest::prelude::*;
use ruzla_core::{Kind, Options, TermId, TermManager};
use ruzla_solver::{SolverResult, SolvingContext};

/// A little AST of constraints over three BV4 constants.
#[derive(Debug, Clone)]
enum Shape {
    EqConst(usize, u64),
    Ult(usize, usize),
    AddEq(usize, usize, usize),
    MulEqConst(usize, usize, u64),
    NotEq(usize, usize),
    OrEq(usize, u64, usize, u64),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop_oneof![
        (0usize..3, 0u64..16).prop_map(|(i, v)| Shape::EqConst(i, v)),
        (0usize..3, 0usize..3).prop_map(|(i, j)| Shape::Ult(i, j)),
        (0usize..3, 0usize..3, 0usize..3).prop_map(|(i, j, k)| Shape::AddEq(i, j, k)),
        (0usize..3, 0usize..3, 0u64..16).prop_map(|(i, j, v)| Shape::MulEqConst(i, j, v)),
        (0usize..3, 0usize..3).prop_map(|(i, j)| Shape::NotEq(i, j)),
        (0usize..3, 0u64..16, 0usize..3, 0u64..16)
            .prop_map(|(i, v, j, w)| Shape::OrEq(i, v, j, w)),
    ]
}

fn build(tm: &mut TermManager, consts: &[TermId], shape: &Shape) -> TermId {
    let sort = tm.sort(consts[0]);
    match *shape {
        Shape::EqConst(i, v) => {
            let c = tm.mk_bv_value_u64(sort, v).unwrap();
            tm.mk_term(Kind::Equal, &[consts[i], c], &[]).unwrap()
        }
        Shape::Ult(i, j) => tm.mk_term(Kind::BvUlt, &[consts[i], consts[j]], &[]).unwrap(),
        Shape::AddEq(i, j, k) => {
            let sum = tm.mk_term(Kind::BvAdd, &[consts[i], consts[j]], &[]).unwrap();
            tm.mk_term(Kind::Equal, &[sum, consts[k]], &[]).unwrap()
        }
        Shape::MulEqConst(i, j, v) => {
            let prod = tm.mk_term(Kind::BvMul, &[consts[i], consts[j]], &[]).unwrap();
            let c = tm.mk_bv_value_u64(sort, v).unwrap();
            tm.mk_term(Kind::Equal, &[prod, c], &[]).unwrap()
        }
        Shape::NotEq(i, j) => {
            let eq = tm.mk_term(Kind::Equal, &[consts[i], consts[j]], &[]).unwrap();
            tm.mk_term(Kind::Not, &[eq], &[]).unwrap()
        }
        Shape::OrEq(i, v, j, w) => {
            let cv = tm.mk_bv_value_u64(sort, v).unwrap();
            let cw = tm.mk_bv_value_u64(sort, w).unwrap();
            let e1 = tm.mk_term(Kind::Equal, &[consts[i], cv], &[]).unwrap();
            let e2 = tm.mk_term(Kind::Equal, &[consts[j], cw], &[]).unwrap();
            tm.mk_term(Kind::Or, &[e1, e2], &[]).unwrap()
        }
    }
}

fn solve(shapes: &[Shape], level: u64, models: bool) -> (SolverResult, Option<Vec<bool>>) {
    let mut opts = Options::default();
    opts.rewrite_level = level;
    opts.produce_models = models;
    let mut ctx = SolvingContext::new(opts);
    let sort = ctx.tm().mk_bv_sort(4).unwrap();
    let consts: Vec<TermId> = (0..3)
        .map(|i| {
            let name = format!("x{i}");
            ctx.tm().mk_const(sort, Some(&name))
        })
        .collect();
    let assertions: Vec<TermId> = shapes
        .iter()
        .map(|s| build(ctx.tm(), &consts, s))
        .collect();
    for &a in &assertions {
        ctx.assert_formula(a).unwrap();
    }
    let result = ctx.check_sat();
    let model_check = (models && result == SolverResult::Sat).then(|| {
        assertions
            .iter()
            .map(|&a| {
                let v = ctx.get_value(a).unwrap();
                ctx.tm_ref().is_bool_value(v, true)
            })
            .collect()
    });
    (result, model_check)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Rewrite levels agree; satisfiable models satisfy every assertion.
    #[test]
    fn levels_agree_and_models_satisfy(
        shapes in prop::collection::vec(shape_strategy(), 1..5)
    ) {
        let (r0, _) = solve(&shapes, 0, false);
        let (r2, checks) = solve(&shapes, 2, true);
        prop_assert_eq!(r0, r2, "shapes: {:?}", shapes);
        if let Some(checks) = checks {
            prop_assert!(
                checks.iter().all(|&ok| ok),
                "model violates an assertion: {:?}",
                shapes
            );
        }
    }
}
