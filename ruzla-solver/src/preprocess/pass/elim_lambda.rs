//! Lambda Elimination Pass.
//!
//! Beta-reduces `apply(lambda x. body, arg)` by substituting the argument
//! for the bound variable, bottom-up over the assertion DAG.

use crate::preprocess::{substitute, AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId, TermManager};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Beta-reduction of applied lambdas.
#[derive(Debug, Default)]
pub struct PassElimLambda {
    /// Applied beta reductions.
    pub num_elim: u64,
}

impl PassElimLambda {
    /// Reduce every applied lambda in the slice.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        for i in 0..slice.len() {
            let t = slice.get(i);
            let reduced = self.process(ctx, t)?;
            slice.replace(i, reduced);
        }
        Ok(())
    }

    /// Reduce applied lambdas in one term.
    pub fn process(&mut self, ctx: &mut PassCtx, term: TermId) -> Result<TermId> {
        let tm = &mut *ctx.tm;
        let mut done: FxHashMap<TermId, TermId> = FxHashMap::default();
        let mut stack: Vec<(TermId, bool)> = vec![(term, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if done.contains_key(&cur) {
                continue;
            }
            if !expanded {
                stack.push((cur, true));
                for &child in tm.children(cur) {
                    stack.push((child, false));
                }
                continue;
            }
            let children: SmallVec<[TermId; 4]> =
                tm.children(cur).iter().map(|c| done[c]).collect();
            let result = if tm.kind(cur) == Kind::Apply
                && tm.kind(children[0]) == Kind::Lambda
            {
                self.num_elim += 1;
                Self::reduce(tm, &children)?
            } else {
                tm.rebuild(cur, &children)?
            };
            done.insert(cur, result);
        }
        Ok(done[&term])
    }

    /// Reduce one application of a (possibly curried) lambda.
    fn reduce(tm: &mut TermManager, children: &[TermId]) -> Result<TermId> {
        let mut body = children[0];
        let mut map: FxHashMap<TermId, TermId> = FxHashMap::default();
        for &arg in &children[1..] {
            debug_assert_eq!(tm.kind(body), Kind::Lambda);
            let var = tm.child(body, 0);
            map.insert(var, arg);
            body = tm.child(body, 1);
        }
        substitute(tm, body, &map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruzla_core::{Options, Rewriter};

    #[test]
    fn test_beta_reduction() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let v = tm.mk_var(bv8, Some("v"));
        let one = tm.mk_bv_one(bv8).unwrap();
        let body = tm.mk_term(Kind::BvAdd, &[v, one], &[]).unwrap();
        let lam = tm.mk_term(Kind::Lambda, &[v, body], &[]).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let app = tm.mk_term(Kind::Apply, &[lam, x], &[]).unwrap();

        let mut rw = Rewriter::new(1);
        let opts = Options::default();
        let mut ctx = PassCtx {
            tm: &mut tm,
            rewriter: &mut rw,
            options: &opts,
        };
        let mut pass = PassElimLambda::default();
        let reduced = pass.process(&mut ctx, app).unwrap();
        assert_eq!(tm.kind(reduced), Kind::BvAdd);
        assert_eq!(tm.child(reduced, 0), x);
    }
}
