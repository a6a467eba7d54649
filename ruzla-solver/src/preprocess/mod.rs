//! The Preprocessing Pipeline.
//!
//! Runs the enabled passes over the assertions of one stack level until no
//! pass changes anything, level by level, resuming from a monotone cursor.
//! Each pass is idempotent in isolation and marks whether it modified any
//! assertion. The terminator is polled between passes so cancellation
//! latency is bounded by a single pass.

pub mod pass;

use crate::backtrack::{AssertionCursor, AssertionStack, Backtrackable};
use pass::{
    PassContradictingAnds, PassElimLambda, PassElimUninterpreted, PassEmbeddedConstraints,
    PassFlattenAnd, PassNormalize, PassRewrite, PassSkeletonPreproc, PassSkolemize,
    PassVariableSubstitution,
};
use ruzla_core::error::Result;
use ruzla_core::{Options, Rewriter, TermId, TermManager};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Shared context handed to every pass.
pub struct PassCtx<'a> {
    /// The term manager.
    pub tm: &'a mut TermManager,
    /// The rewriter at the configured level.
    pub rewriter: &'a mut Rewriter,
    /// The solver options.
    pub options: &'a Options,
}

/// A mutable view of one level's assertions.
pub struct AssertionSlice<'a> {
    stack: &'a mut AssertionStack,
    start: usize,
    end: usize,
    level: u32,
    modified: usize,
}

impl<'a> AssertionSlice<'a> {
    fn new(stack: &'a mut AssertionStack, start: usize) -> Self {
        let range = stack.level_range_from(start);
        let level = stack.get(start).level;
        Self {
            stack,
            start: range.start,
            end: range.end,
            level,
            modified: 0,
        }
    }

    /// Number of assertions in the slice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the slice is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th assertion.
    #[must_use]
    pub fn get(&self, i: usize) -> TermId {
        self.stack.get(self.start + i).term
    }

    /// The originating user-assertion index of the `i`-th assertion.
    #[must_use]
    pub fn origin(&self, i: usize) -> usize {
        self.stack.get(self.start + i).origin
    }

    /// Replace the `i`-th assertion, counting a modification on change.
    pub fn replace(&mut self, i: usize, term: TermId) {
        if self.stack.get(self.start + i).term != term {
            self.stack.replace(self.start + i, term);
            self.modified += 1;
        }
    }

    /// Append a derived assertion to this level.
    pub fn push_derived(&mut self, term: TermId, origin: usize) {
        self.stack.insert_at_level(self.level, term, origin);
        self.end += 1;
        self.modified += 1;
    }

    /// Number of modifications so far.
    #[must_use]
    pub fn num_modified(&self) -> usize {
        self.modified
    }

    fn end_index(&self) -> usize {
        self.end
    }
}

/// Replace subterms according to `map`, rebuilding ancestors. Mapped
/// terms are not traversed into.
pub(crate) fn substitute(
    tm: &mut TermManager,
    root: TermId,
    map: &FxHashMap<TermId, TermId>,
) -> Result<TermId> {
    if map.is_empty() {
        return Ok(root);
    }
    let mut done: FxHashMap<TermId, TermId> = FxHashMap::default();
    let mut stack: Vec<(TermId, bool)> = vec![(root, false)];
    while let Some((cur, expanded)) = stack.pop() {
        if done.contains_key(&cur) {
            continue;
        }
        if let Some(&to) = map.get(&cur) {
            done.insert(cur, to);
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
        done.insert(cur, rebuilt);
    }
    Ok(done[&root])
}

/// True if `needle` occurs in the DAG of `haystack`.
pub(crate) fn occurs_in(tm: &TermManager, haystack: TermId, needle: TermId) -> bool {
    let mut seen: rustc_hash::FxHashSet<TermId> = rustc_hash::FxHashSet::default();
    let mut stack = vec![haystack];
    while let Some(cur) = stack.pop() {
        if cur == needle {
            return true;
        }
        if seen.insert(cur) {
            stack.extend(tm.children(cur).iter().copied());
        }
    }
    false
}

/// Preprocessor statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreprocessStats {
    /// Fixed-point iterations across all calls.
    pub num_iterations: u64,
    /// Total modifications applied by passes.
    pub num_modifications: u64,
}

/// The preprocessing driver.
pub struct Preprocessor {
    cursor: AssertionCursor,
    pass_rewrite: PassRewrite,
    pass_skolemize: PassSkolemize,
    pass_elim_lambda: PassElimLambda,
    pass_variable_subst: PassVariableSubstitution,
    pass_embedded: PassEmbeddedConstraints,
    pass_flatten_and: PassFlattenAnd,
    pass_contradicting_ands: PassContradictingAnds,
    pass_skeleton: PassSkeletonPreproc,
    pass_normalize: PassNormalize,
    pass_elim_uninterpreted: PassElimUninterpreted,
    stats: PreprocessStats,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Create a preprocessor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cursor: AssertionCursor::new(),
            pass_rewrite: PassRewrite::default(),
            pass_skolemize: PassSkolemize::default(),
            pass_elim_lambda: PassElimLambda::default(),
            pass_variable_subst: PassVariableSubstitution::default(),
            pass_embedded: PassEmbeddedConstraints::default(),
            pass_flatten_and: PassFlattenAnd::default(),
            pass_contradicting_ands: PassContradictingAnds::default(),
            pass_skeleton: PassSkeletonPreproc::default(),
            pass_normalize: PassNormalize::default(),
            pass_elim_uninterpreted: PassElimUninterpreted::default(),
            stats: PreprocessStats::default(),
        }
    }

    /// Statistics over all calls.
    #[must_use]
    pub fn stats(&self) -> PreprocessStats {
        self.stats
    }

    /// Preprocess all unprocessed assertion levels to fixed point.
    /// `stop` is polled between passes; returns `false` if it tripped.
    pub fn preprocess(
        &mut self,
        ctx: &mut PassCtx,
        stack: &mut AssertionStack,
        stop: &mut dyn FnMut() -> bool,
    ) -> Result<bool> {
        self.cursor.clamp(stack);
        let mut skeleton_done = false;
        while self.cursor.next() < stack.len() {
            let mut slice = AssertionSlice::new(stack, self.cursor.next());
            if !self.apply(ctx, &mut slice, &mut skeleton_done, stop)? {
                return Ok(false);
            }
            let end = slice.end_index();
            self.cursor.advance_to(end);
        }
        Ok(true)
    }

    /// Replay the term-level normalizations on a query term (for value
    /// computation after a check).
    pub fn process(&mut self, ctx: &mut PassCtx, term: TermId) -> Result<TermId> {
        let t = self.pass_elim_lambda.process(ctx, term)?;
        let t = self.pass_variable_subst.process(ctx, t)?;
        ctx.rewriter.rewrite(ctx.tm, t)
    }

    /// One fixed-point loop over a single level.
    fn apply(
        &mut self,
        ctx: &mut PassCtx,
        slice: &mut AssertionSlice,
        skeleton_done: &mut bool,
        stop: &mut dyn FnMut() -> bool,
    ) -> Result<bool> {
        tracing::debug!(
            assertions = slice.len(),
            level = slice.level,
            "preprocessing level"
        );
        loop {
            let before = slice.num_modified();
            self.stats.num_iterations += 1;

            macro_rules! run {
                ($pass:expr, $enabled:expr) => {
                    if $enabled {
                        $pass.apply(ctx, slice)?;
                        if stop() {
                            return Ok(false);
                        }
                    }
                };
            }

            run!(self.pass_rewrite, true);
            run!(self.pass_skolemize, true);
            run!(self.pass_elim_lambda, true);
            run!(self.pass_flatten_and, ctx.options.pp_flatten_and);
            run!(
                self.pass_variable_subst,
                ctx.options.pp_variable_subst && !ctx.options.produce_unsat_cores
            );
            if ctx.options.pp_skeleton_preproc
                && !ctx.options.produce_unsat_cores
                && !*skeleton_done
            {
                self.pass_skeleton.apply(ctx, slice)?;
                *skeleton_done = true;
            }
            run!(
                self.pass_embedded,
                ctx.options.pp_embedded_constr && !ctx.options.produce_unsat_cores
            );
            run!(
                self.pass_contradicting_ands,
                ctx.options.pp_contradicting_ands
            );
            run!(self.pass_normalize, ctx.options.pp_normalize);
            run!(self.pass_elim_uninterpreted, true);

            let delta = slice.num_modified() - before;
            self.stats.num_modifications += delta as u64;
            tracing::trace!(modified = delta, "preprocessing iteration");
            if delta == 0 {
                return Ok(true);
            }
        }
    }

}

impl Backtrackable for Preprocessor {
    fn on_push(&mut self) {
        self.pass_variable_subst.on_push();
    }

    fn on_pop(&mut self) {
        self.pass_variable_subst.on_pop();
    }
}

/// Clamp the cursor after the stack popped.
impl Preprocessor {
    /// Re-sync the cursor with the stack after a pop.
    pub fn notify_pop(&mut self, stack: &AssertionStack) {
        self.cursor.clamp(stack);
    }
}
