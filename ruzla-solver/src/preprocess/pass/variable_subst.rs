//! Variable Substitution Pass.
//!
//! Assertions that pin an uninterpreted constant to an expression
//! (`c = t`, a Boolean `c`, or `not c`) become substitutions applied
//! throughout the level, with an occur check keeping the map acyclic.
//! Substitutions are scoped: popping a level discards the entries it
//! introduced.

use crate::backtrack::Backtrackable;
use crate::preprocess::{occurs_in, substitute, AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId, TermManager};
use rustc_hash::FxHashMap;

/// A harvested substitution candidate.
enum Candidate {
    /// `key = value` directly.
    Direct(TermId, TermId),
    /// A bare Boolean constant asserted true.
    BoolTrue(TermId),
    /// A negated Boolean constant asserted false.
    BoolFalse(TermId),
    /// `(key + rest) = rhs`, pinning key to `rhs - rest`.
    NormEq {
        key: TermId,
        rest: TermId,
        rhs: TermId,
    },
}

/// Detects and applies constant-pinning substitutions.
#[derive(Debug, Default)]
pub struct PassVariableSubstitution {
    map: FxHashMap<TermId, TermId>,
    /// Keys inserted per open scope level, for pop.
    scope_keys: Vec<Vec<TermId>>,
    /// Substitutions recorded.
    pub num_substs: u64,
}

impl PassVariableSubstitution {
    /// Extract new substitutions from the slice and apply the cumulative
    /// map to every assertion.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        // Harvest candidate equalities.
        for i in 0..slice.len() {
            let t = slice.get(i);
            if let Some(cand) = self.candidate(ctx, t) {
                let (key, value) = match cand {
                    Candidate::Direct(k, v) => (k, v),
                    Candidate::BoolTrue(k) => {
                        let v = ctx.tm.mk_true();
                        (k, v)
                    }
                    Candidate::BoolFalse(k) => {
                        let v = ctx.tm.mk_false();
                        (k, v)
                    }
                    Candidate::NormEq { key, rest, rhs } => {
                        let v = ctx.tm.mk_term(Kind::BvSub, &[rhs, rest], &[])?;
                        (key, v)
                    }
                };
                self.insert(ctx.tm, key, value)?;
            }
        }
        if self.map.is_empty() {
            return Ok(());
        }
        for i in 0..slice.len() {
            let t = slice.get(i);
            let replaced = substitute(ctx.tm, t, &self.map)?;
            let rewritten = ctx.rewriter.rewrite(ctx.tm, replaced)?;
            slice.replace(i, rewritten);
        }
        Ok(())
    }

    /// Apply the cumulative substitution to a query term.
    pub fn process(&mut self, ctx: &mut PassCtx, term: TermId) -> Result<TermId> {
        substitute(ctx.tm, term, &self.map)
    }

    /// A substitution candidate from one assertion, if it yields one.
    fn candidate(&self, ctx: &PassCtx, t: TermId) -> Option<Candidate> {
        let tm = &*ctx.tm;
        match tm.kind(t) {
            Kind::Equal => {
                let a = tm.child(t, 0);
                let b = tm.child(t, 1);
                for (x, y) in [(a, b), (b, a)] {
                    if tm.kind(x) == Kind::Constant && self.usable(tm, x, y) {
                        return Some(Candidate::Direct(x, y));
                    }
                }
                // Normalized form: (c + t) = v pins c to (v - t).
                if ctx.options.pp_variable_subst_norm_eq {
                    for (sum, rhs) in [(a, b), (b, a)] {
                        if tm.kind(sum) != Kind::BvAdd {
                            continue;
                        }
                        let l = tm.child(sum, 0);
                        let r = tm.child(sum, 1);
                        for (c, rest) in [(l, r), (r, l)] {
                            if tm.kind(c) == Kind::Constant
                                && !self.map.contains_key(&c)
                                && !occurs_in(tm, rest, c)
                                && !occurs_in(tm, rhs, c)
                            {
                                return Some(Candidate::NormEq { key: c, rest, rhs });
                            }
                        }
                    }
                }
                None
            }
            Kind::Constant if tm.is_bool_sort(tm.sort(t)) => {
                (!self.map.contains_key(&t)).then_some(Candidate::BoolTrue(t))
            }
            Kind::Not => {
                let inner = tm.child(t, 0);
                (tm.kind(inner) == Kind::Constant && !self.map.contains_key(&inner))
                    .then_some(Candidate::BoolFalse(inner))
            }
            _ => None,
        }
    }

    fn usable(&self, tm: &TermManager, key: TermId, value: TermId) -> bool {
        !self.map.contains_key(&key) && !occurs_in(tm, value, key)
    }

    fn insert(&mut self, tm: &mut TermManager, key: TermId, value: TermId) -> Result<()> {
        if self.map.contains_key(&key) || occurs_in(tm, value, key) {
            return Ok(());
        }
        // Close the new entry under the existing map so application is a
        // single pass.
        let closed = substitute(tm, value, &self.map)?;
        if occurs_in(tm, closed, key) {
            return Ok(());
        }
        self.map.insert(key, closed);
        if let Some(keys) = self.scope_keys.last_mut() {
            keys.push(key);
        }
        self.num_substs += 1;
        // Close existing entries under the new one.
        let mut single = FxHashMap::default();
        single.insert(key, closed);
        let entries: Vec<(TermId, TermId)> = self.map.iter().map(|(&k, &v)| (k, v)).collect();
        for (k, v) in entries {
            if k != key {
                let nv = substitute(tm, v, &single)?;
                self.map.insert(k, nv);
            }
        }
        Ok(())
    }
}

impl Backtrackable for PassVariableSubstitution {
    fn on_push(&mut self) {
        self.scope_keys.push(Vec::new());
    }

    fn on_pop(&mut self) {
        if let Some(keys) = self.scope_keys.pop() {
            for key in keys {
                self.map.remove(&key);
            }
        }
    }
}
