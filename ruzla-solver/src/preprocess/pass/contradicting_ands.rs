//! Contradicting AND Detection Pass.
//!
//! Any conjunction node containing both a term and its negation denotes
//! `false`; the whole node collapses.

use crate::preprocess::{AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId, TermManager};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Collapses conjunctions containing complementary conjuncts.
#[derive(Debug, Default)]
pub struct PassContradictingAnds {
    /// Conjunctions collapsed to false.
    pub num_collapsed: u64,
}

impl PassContradictingAnds {
    /// Scan each assertion DAG for contradicting conjunctions.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        for i in 0..slice.len() {
            let t = slice.get(i);
            let processed = self.process(ctx.tm, t)?;
            slice.replace(i, processed);
        }
        Ok(())
    }

    fn process(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
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
            let result = if tm.kind(rebuilt) == Kind::And && Self::contradicts(tm, rebuilt) {
                self.num_collapsed += 1;
                tm.mk_false()
            } else {
                rebuilt
            };
            done.insert(cur, result);
        }
        Ok(done[&term])
    }

    fn contradicts(tm: &TermManager, and: TermId) -> bool {
        let children: FxHashSet<TermId> = tm.children(and).iter().copied().collect();
        children.iter().any(|&c| {
            tm.kind(c) == Kind::Not && children.contains(&tm.child(c, 0))
        })
    }
}
