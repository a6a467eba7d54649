//! Arithmetic Normalization Pass.
//!
//! Flattens nested bit-vector addition and multiplication chains,
//! folds their constant operands and rebuilds the chain with a canonical
//! operand order so structurally different spellings of the same sum
//! meet. Shared subterms are left alone when share-aware normalization is
//! enabled, since expanding them duplicates circuits.

use crate::preprocess::{AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{BitVector, Kind, TermId, TermManager, Value};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Add/mul chain regrouping.
#[derive(Debug, Default)]
pub struct PassNormalize {
    /// Chains normalized.
    pub num_normalized: u64,
}

impl PassNormalize {
    /// Normalize arithmetic chains in every assertion.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        // Occurrence counts decide which subterms are shared.
        let mut parents: FxHashMap<TermId, usize> = FxHashMap::default();
        if ctx.options.pp_normalize_share_aware {
            let mut seen = rustc_hash::FxHashSet::default();
            let mut stack: Vec<TermId> = (0..slice.len()).map(|i| slice.get(i)).collect();
            while let Some(cur) = stack.pop() {
                if !seen.insert(cur) {
                    continue;
                }
                for &c in ctx.tm.children(cur) {
                    *parents.entry(c).or_default() += 1;
                    stack.push(c);
                }
            }
        }

        for i in 0..slice.len() {
            let t = slice.get(i);
            let normalized = self.process(ctx, &parents, t)?;
            slice.replace(i, normalized);
        }
        Ok(())
    }

    fn process(
        &mut self,
        ctx: &mut PassCtx,
        parents: &FxHashMap<TermId, usize>,
        term: TermId,
    ) -> Result<TermId> {
        let share_aware = ctx.options.pp_normalize_share_aware;
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
            let rebuilt = tm.rebuild(cur, &children)?;
            let kind = tm.kind(rebuilt);
            let result = if matches!(kind, Kind::BvAdd | Kind::BvMul) {
                self.normalize_chain(tm, parents, share_aware, rebuilt, kind)?
            } else {
                rebuilt
            };
            done.insert(cur, result);
        }
        Ok(done[&term])
    }

    fn normalize_chain(
        &mut self,
        tm: &mut TermManager,
        parents: &FxHashMap<TermId, usize>,
        share_aware: bool,
        root: TermId,
        kind: Kind,
    ) -> Result<TermId> {
        let width = tm.bv_width(tm.sort(root)).expect("bv chain");
        // Collect the chain's leaves, stopping at shared interior nodes.
        let mut leaves: Vec<TermId> = Vec::new();
        let mut stack = vec![(tm.child(root, 0), true), (tm.child(root, 1), true)];
        while let Some((cur, _)) = stack.pop() {
            let shared = share_aware && parents.get(&cur).copied().unwrap_or(0) > 1;
            if tm.kind(cur) == kind && !shared {
                stack.push((tm.child(cur, 0), false));
                stack.push((tm.child(cur, 1), false));
            } else {
                leaves.push(cur);
            }
        }
        if leaves.len() <= 2 {
            return Ok(root);
        }

        // Fold the constant leaves.
        let neutral = if kind == Kind::BvAdd {
            BitVector::zero(width)
        } else {
            BitVector::one(width)
        };
        let mut acc = neutral.clone();
        let mut rest: Vec<TermId> = Vec::new();
        for &leaf in &leaves {
            match tm.value(leaf).and_then(Value::as_bitvector) {
                Some(v) => {
                    acc = if kind == Kind::BvAdd {
                        acc.add(v)
                    } else {
                        acc.mul(v)
                    };
                }
                None => rest.push(leaf),
            }
        }
        rest.sort_unstable();
        if rest.is_empty() {
            return Ok(tm.mk_bv(acc));
        }
        let mut chain = rest[0];
        for &leaf in &rest[1..] {
            chain = tm.mk_term(kind, &[chain, leaf], &[])?;
        }
        if acc != neutral {
            let c = tm.mk_bv(acc);
            chain = tm.mk_term(kind, &[chain, c], &[])?;
        }
        if chain != root {
            self.num_normalized += 1;
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtrack::AssertionStack;
    use ruzla_core::{Options, Rewriter};

    fn run_pass(tm: &mut TermManager, stack: &mut AssertionStack) {
        let mut rw = Rewriter::new(1);
        let opts = Options::default();
        let mut ctx = PassCtx {
            tm,
            rewriter: &mut rw,
            options: &opts,
        };
        let mut slice = AssertionSlice::new(stack, 0);
        let mut pass = PassNormalize::default();
        pass.apply(&mut ctx, &mut slice).unwrap();
    }

    #[test]
    fn test_constant_collection() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let two = tm.mk_bv_value_u64(bv8, 2).unwrap();
        let three = tm.mk_bv_value_u64(bv8, 3).unwrap();
        // ((x + 2) + 3) collects into x + 5.
        let s1 = tm.mk_term(Kind::BvAdd, &[x, two], &[]).unwrap();
        let s2 = tm.mk_term(Kind::BvAdd, &[s1, three], &[]).unwrap();
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[s2, zero], &[]).unwrap();

        let mut stack = AssertionStack::new();
        stack.push_assertion(eq, 0);
        run_pass(&mut tm, &mut stack);

        let t = stack.get(0).term;
        let sum = tm.child(t, 0);
        assert_eq!(tm.kind(sum), Kind::BvAdd);
        let c = tm.child(sum, 1);
        assert_eq!(
            tm.value(c).and_then(Value::as_bitvector).unwrap().to_u64(),
            Some(5)
        );
    }

    #[test]
    fn test_reassociation_canonicalizes() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let y = tm.mk_const(bv8, Some("y"));
        let z = tm.mk_const(bv8, Some("z"));
        let a1 = tm.mk_term(Kind::BvAdd, &[x, y], &[]).unwrap();
        let lhs = tm.mk_term(Kind::BvAdd, &[a1, z], &[]).unwrap();
        let a2 = tm.mk_term(Kind::BvAdd, &[y, z], &[]).unwrap();
        let rhs = tm.mk_term(Kind::BvAdd, &[x, a2], &[]).unwrap();
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let e1 = tm.mk_term(Kind::Equal, &[lhs, zero], &[]).unwrap();
        let e2 = tm.mk_term(Kind::Equal, &[rhs, zero], &[]).unwrap();

        let mut stack = AssertionStack::new();
        stack.push_assertion(e1, 0);
        stack.push_assertion(e2, 1);
        run_pass(&mut tm, &mut stack);

        // Both spellings normalize to the same term.
        assert_eq!(stack.get(0).term, stack.get(1).term);
    }
}
