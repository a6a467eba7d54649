//! Model Extraction and Term Evaluation.
//!
//! Builds a total interpretation from the SAT assignment and the
//! congruence engine's residues: leaf values read back from the
//! bit-blasted core (unconstrained bits default to zero), interior
//! operations evaluated concretely, function models as nested-ITE
//! lambdas and array models as constant arrays under store chains.

use crate::fun::{FunSolver, ModelProbe};
use ruzla_core::error::{internal_error, Result};
use ruzla_core::sort::{SortId, SortKind};
use ruzla_core::{Kind, Rewriter, TermId, TermManager, Value};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Bottom-up evaluator over the bit-blasted model.
pub struct Evaluator<'a> {
    /// The term manager.
    pub tm: &'a mut TermManager,
    /// The rewriter used for concrete folding.
    pub rewriter: &'a mut Rewriter,
    /// Model probe into the bit-blasted core.
    pub probe: &'a dyn ModelProbe,
    /// The congruence engine holding function residues.
    pub fun: &'a FunSolver,
}

impl Evaluator<'_> {
    /// The default (all-zero) value term of a scalar sort.
    fn default_value(&mut self, sort: SortId) -> Result<TermId> {
        match self.tm.sort_kind(sort) {
            SortKind::Bool => Ok(self.tm.mk_false()),
            SortKind::Bv(_) => self.tm.mk_bv_zero(sort),
            _ => Err(internal_error("default value for a non-scalar sort")),
        }
    }

    /// Evaluate a (word-blasted) term to a value term of the same sort.
    pub fn value(&mut self, term: TermId) -> Result<TermId> {
        let mut done: FxHashMap<TermId, TermId> = FxHashMap::default();
        let mut stack: Vec<(TermId, bool)> = vec![(term, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if done.contains_key(&cur) {
                continue;
            }
            let kind = self.tm.kind(cur);
            let sort = self.tm.sort(cur);
            let scalar_leaf = matches!(
                kind,
                Kind::Value | Kind::Constant | Kind::Apply | Kind::Select
            );
            if scalar_leaf {
                let v = self.leaf_value(cur)?;
                done.insert(cur, v);
                continue;
            }
            if matches!(self.tm.sort_kind(sort), SortKind::Array(..) | SortKind::Fun(_)) {
                // Interior array/function terms (stores, lambdas) stand
                // for themselves; selects and applies on them read
                // through the congruence residues.
                done.insert(cur, cur);
                continue;
            }
            if !expanded {
                stack.push((cur, true));
                for &child in self.tm.children(cur) {
                    stack.push((child, false));
                }
                continue;
            }
            let children: SmallVec<[TermId; 4]> =
                self.tm.children(cur).iter().map(|c| done[c]).collect();
            let rebuilt = self.tm.rebuild(cur, &children)?;
            let folded = self.rewriter.rewrite(self.tm, rebuilt)?;
            let v = if self.tm.is_value(folded) {
                folded
            } else {
                // Residual structure (an unregistered theory leaf below):
                // fall back to the default value.
                self.default_value(sort)?
            };
            done.insert(cur, v);
        }
        Ok(done[&term])
    }

    fn leaf_value(&mut self, t: TermId) -> Result<TermId> {
        if self.tm.kind(t) == Kind::Value {
            return Ok(t);
        }
        let sort = self.tm.sort(t);
        match self.tm.sort_kind(sort) {
            SortKind::Bool => match self.probe.bool_value(t) {
                Some(b) => Ok(self.tm.mk_bool_value(b)),
                None => self.congruence_value(t),
            },
            SortKind::Bv(_) => match self.probe.bv_value(t) {
                Some(bv) => Ok(self.tm.mk_bv(bv)),
                None => self.congruence_value(t),
            },
            SortKind::Array(..) | SortKind::Fun(_) => Ok(t),
            _ => Err(internal_error("unlowered sort in model evaluation")),
        }
    }

    /// Value of an unencoded select/apply: agree with a registered
    /// application on the same arguments, default otherwise.
    fn congruence_value(&mut self, t: TermId) -> Result<TermId> {
        let sort = self.tm.sort(t);
        let kind = self.tm.kind(t);
        if !matches!(kind, Kind::Select | Kind::Apply) {
            return self.default_value(sort);
        }
        let base = self.tm.child(t, 0);
        let args: Vec<TermId> = self.tm.children(t)[1..].to_vec();
        let mut arg_vals = Vec::with_capacity(args.len());
        for a in args {
            arg_vals.push(self.value(a)?);
        }
        for other in self.fun.applications_of(self.tm, base) {
            if self.tm.kind(other) != kind || other == t {
                continue;
            }
            let oargs: Vec<TermId> = self.tm.children(other)[1..].to_vec();
            let mut all_eq = oargs.len() == arg_vals.len();
            for (o, want) in oargs.iter().zip(&arg_vals) {
                if !all_eq {
                    break;
                }
                all_eq = self.value(*o)? == *want;
            }
            if all_eq {
                return self.leaf_value(other);
            }
        }
        self.default_value(sort)
    }

    /// The model of a function-sorted term as a nested-ITE lambda.
    pub fn fun_value(&mut self, fun: TermId) -> Result<TermId> {
        let sig: Vec<SortId> = self
            .tm
            .fun_sorts(self.tm.sort(fun))
            .ok_or_else(|| internal_error("expected a function sort"))?
            .to_vec();
        let (codomain, domain) = sig.split_last().expect("nonempty");
        let vars: Vec<TermId> = domain.iter().map(|&s| self.tm.mk_var(s, None)).collect();

        let mut body = self.default_value(*codomain)?;
        for apply in self.fun.applications_of(self.tm, fun) {
            if self.tm.kind(apply) != Kind::Apply {
                continue;
            }
            let args: Vec<TermId> = self.tm.children(apply)[1..].to_vec();
            let mut eqs: Vec<TermId> = Vec::with_capacity(args.len());
            for (&var, arg) in vars.iter().zip(&args) {
                let av = self.value(*arg)?;
                eqs.push(self.tm.mk_term(Kind::Equal, &[var, av], &[])?);
            }
            let cond = match eqs.len() {
                1 => eqs[0],
                _ => self.tm.mk_term(Kind::And, &eqs, &[])?,
            };
            let av = self.leaf_value(apply)?;
            body = self.tm.mk_term(Kind::Ite, &[cond, av, body], &[])?;
        }
        // Close the binder inside out.
        let mut res = body;
        for &var in vars.iter().rev() {
            res = self.tm.mk_term(Kind::Lambda, &[var, res], &[])?;
        }
        Ok(res)
    }

    /// The model of an array-sorted term as a constant array under a
    /// store chain.
    pub fn array_value(&mut self, arr: TermId) -> Result<TermId> {
        let sort = self.tm.sort(arr);
        let Some((_, elem)) = self.tm.array_sorts(sort) else {
            return Err(internal_error("expected an array sort"));
        };
        let default = self.default_value(elem)?;
        let mut res = self.tm.mk_const_array(sort, default)?;
        for sel in self.fun.applications_of(self.tm, arr) {
            if self.tm.kind(sel) != Kind::Select {
                continue;
            }
            let idx = self.tm.child(sel, 1);
            let iv = self.value(idx)?;
            let vv = self.leaf_value(sel)?;
            res = self.tm.mk_term(Kind::Store, &[res, iv, vv], &[])?;
        }
        Ok(res)
    }
}
