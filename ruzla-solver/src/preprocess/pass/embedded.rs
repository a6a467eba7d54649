//! Embedded Constraint Propagation Pass.
//!
//! A top-level assertion holds in every model, so its occurrences inside
//! other assertions (ITE conditions in particular) can be replaced by
//! `true`.

use crate::preprocess::{substitute, AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Replaces embedded occurrences of asserted constraints by `true`.
#[derive(Debug, Default)]
pub struct PassEmbeddedConstraints {
    /// Assertions simplified by embedding.
    pub num_embedded: u64,
}

impl PassEmbeddedConstraints {
    /// Propagate asserted constraints into sibling assertions.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        let mut asserted: FxHashSet<TermId> = FxHashSet::default();
        for i in 0..slice.len() {
            let t = slice.get(i);
            // Values and bare constants carry no structure worth replacing.
            if !ctx.tm.is_value(t) && ctx.tm.kind(t) != Kind::Constant {
                asserted.insert(t);
            }
        }
        if asserted.is_empty() {
            return Ok(());
        }
        let tru = ctx.tm.mk_true();
        for i in 0..slice.len() {
            let root = slice.get(i);
            // Replace occurrences of *other* assertions below this root.
            let mut map: FxHashMap<TermId, TermId> = FxHashMap::default();
            for &a in &asserted {
                if a != root {
                    map.insert(a, tru);
                }
            }
            // The root itself must not be rewritten to true; substitute
            // its children only.
            let children: Vec<TermId> = ctx.tm.children(root).to_vec();
            let mut new_children = Vec::with_capacity(children.len());
            let mut changed = false;
            for c in children {
                let nc = substitute(ctx.tm, c, &map)?;
                changed |= nc != c;
                new_children.push(nc);
            }
            if changed {
                self.num_embedded += 1;
                let rebuilt = ctx.tm.rebuild(root, &new_children)?;
                let rewritten = ctx.rewriter.rewrite(ctx.tm, rebuilt)?;
                slice.replace(i, rewritten);
            }
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
    fn test_embedded_condition_simplifies() {
        let mut tm = TermManager::new();
        let bool_s = tm.mk_bool_sort();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let p = tm.mk_const(bool_s, Some("p"));
        let q = tm.mk_const(bool_s, Some("q"));
        let cond = tm.mk_term(Kind::And, &[p, q], &[]).unwrap();
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv8, None);
        let ite = tm.mk_term(Kind::Ite, &[cond, x, y], &[]).unwrap();
        let z = tm.mk_const(bv8, None);
        let eq = tm.mk_term(Kind::Equal, &[ite, z], &[]).unwrap();

        let mut stack = AssertionStack::new();
        stack.push_assertion(cond, 0);
        stack.push_assertion(eq, 1);

        let mut rw = Rewriter::new(1);
        let opts = Options::default();
        let mut ctx = PassCtx {
            tm: &mut tm,
            rewriter: &mut rw,
            options: &opts,
        };
        let mut slice = AssertionSlice::new(&mut stack, 0);
        let mut pass = PassEmbeddedConstraints::default();
        pass.apply(&mut ctx, &mut slice).unwrap();

        // The ITE condition collapsed to true, so the ITE picked x.
        let t = stack.get(1).term;
        assert_eq!(tm.kind(t), Kind::Equal);
        assert!(tm.children(t).contains(&x));
    }
}
