//! AND Flattening Pass.
//!
//! A top-level conjunction becomes one assertion per conjunct, recursing
//! into nested conjunctions. Derived assertions inherit the origin of the
//! assertion they were split from.

use crate::preprocess::{AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId};

/// Splits top-level conjunctions into separate assertions.
#[derive(Debug, Default)]
pub struct PassFlattenAnd {
    /// Conjunctions split.
    pub num_flattened: u64,
}

impl PassFlattenAnd {
    /// Flatten every conjunction assertion in the slice.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        let mut i = 0;
        while i < slice.len() {
            let t = slice.get(i);
            if ctx.tm.kind(t) == Kind::And {
                self.num_flattened += 1;
                let origin = slice.origin(i);
                // Collect the conjunct leaves of the nested AND tree.
                let mut leaves: Vec<TermId> = Vec::new();
                let mut stack = vec![t];
                while let Some(cur) = stack.pop() {
                    if ctx.tm.kind(cur) == Kind::And {
                        for &c in ctx.tm.children(cur) {
                            stack.push(c);
                        }
                    } else {
                        leaves.push(cur);
                    }
                }
                slice.replace(i, leaves[0]);
                for &leaf in &leaves[1..] {
                    slice.push_derived(leaf, origin);
                }
            }
            i += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtrack::AssertionStack;
    use ruzla_core::{Options, Rewriter, TermManager};

    #[test]
    fn test_flatten_nested_and() {
        let mut tm = TermManager::new();
        let bool_s = tm.mk_bool_sort();
        let p = tm.mk_const(bool_s, Some("p"));
        let q = tm.mk_const(bool_s, Some("q"));
        let r = tm.mk_const(bool_s, Some("r"));
        let pq = tm.mk_term(Kind::And, &[p, q], &[]).unwrap();
        let pqr = tm.mk_term(Kind::And, &[pq, r], &[]).unwrap();

        let mut stack = AssertionStack::new();
        stack.push_assertion(pqr, 7);
        let mut rw = Rewriter::new(1);
        let opts = Options::default();
        let mut ctx = PassCtx {
            tm: &mut tm,
            rewriter: &mut rw,
            options: &opts,
        };
        let mut slice = AssertionSlice::new(&mut stack, 0);
        let mut pass = PassFlattenAnd::default();
        pass.apply(&mut ctx, &mut slice).unwrap();

        assert_eq!(stack.len(), 3);
        let terms: Vec<TermId> = stack.entries().iter().map(|a| a.term).collect();
        assert!(terms.contains(&p));
        assert!(terms.contains(&q));
        assert!(terms.contains(&r));
        // Derived assertions keep the origin for unsat cores.
        assert!(stack.entries().iter().all(|a| a.origin == 7));
    }
}
