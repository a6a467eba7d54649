//! Propositional Skeleton Simplification Pass.
//!
//! Abstracts the Boolean structure of the assertions over fresh SAT
//! variables and propagates at the root level. Atoms the skeleton fixes
//! are asserted as derived units and substituted below the other
//! assertions; an unsatisfiable skeleton collapses the level to `false`.
//! Runs once per preprocessing round.

use crate::aig::{Aig, AigRef};
use crate::preprocess::{substitute, AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId, TermManager};
use ruzla_sat::{Cdcl, SatSolver};
use rustc_hash::{FxHashMap, FxHashSet};

/// Skeleton abstraction and root-level propagation.
#[derive(Debug, Default)]
pub struct PassSkeletonPreproc {
    /// Atoms fixed by the skeleton.
    pub num_fixed: u64,
}

impl PassSkeletonPreproc {
    /// Simplify the slice through its propositional skeleton.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        let mut aig = Aig::new();
        let mut nodes: FxHashMap<TermId, AigRef> = FxHashMap::default();
        let mut atoms: FxHashSet<TermId> = FxHashSet::default();

        // Abstract each assertion over the Boolean connectives.
        let mut roots: Vec<(TermId, AigRef)> = Vec::new();
        for i in 0..slice.len() {
            let t = slice.get(i);
            let r = Self::abstract_term(ctx.tm, &mut aig, &mut nodes, &mut atoms, t);
            roots.push((t, r));
        }

        let mut sat = Cdcl::with_seed(ctx.options.seed);
        for &(_, r) in &roots {
            let l = aig.lit(r, &mut sat);
            sat.add_clause(&[l]);
        }

        let Some(fixed) = sat.fixed_literals() else {
            // The skeleton alone is unsatisfiable.
            let f = ctx.tm.mk_false();
            for i in 0..slice.len() {
                slice.replace(i, f);
            }
            return Ok(());
        };

        // Root-level-fixed atoms become facts.
        let mut map: FxHashMap<TermId, TermId> = FxHashMap::default();
        for &atom in &atoms {
            let aref = nodes[&atom];
            let al = aig.lit(aref, &mut sat);
            for &l in &fixed {
                if l.var() == al.var() {
                    let value = l.is_pos() == al.is_pos();
                    let vt = ctx.tm.mk_bool_value(value);
                    map.insert(atom, vt);
                }
            }
        }
        if map.is_empty() {
            return Ok(());
        }
        self.num_fixed += map.len() as u64;

        // Assert the learned units, then substitute the atoms below the
        // remaining assertions (never a root itself: the units carry the
        // constraint from here on).
        let already: FxHashSet<TermId> = (0..slice.len()).map(|i| slice.get(i)).collect();
        let entries: Vec<(TermId, TermId)> = map.iter().map(|(&k, &v)| (k, v)).collect();
        for (atom, value) in entries {
            let unit = if ctx.tm.is_bool_value(value, true) {
                atom
            } else {
                ctx.tm.mk_term(Kind::Not, &[atom], &[])?
            };
            if !already.contains(&unit) {
                slice.push_derived(unit, 0);
            }
        }
        for i in 0..slice.len() {
            let root = slice.get(i);
            // Fixed units substitute only below other assertions.
            if map.contains_key(&root)
                || (ctx.tm.kind(root) == Kind::Not
                    && map.contains_key(&ctx.tm.child(root, 0)))
            {
                continue;
            }
            let children: Vec<TermId> = ctx.tm.children(root).to_vec();
            let mut new_children = Vec::with_capacity(children.len());
            let mut changed = false;
            for c in children {
                let nc = substitute(ctx.tm, c, &map)?;
                changed |= nc != c;
                new_children.push(nc);
            }
            if changed {
                let rebuilt = ctx.tm.rebuild(root, &new_children)?;
                let rewritten = ctx.rewriter.rewrite(ctx.tm, rebuilt)?;
                slice.replace(i, rewritten);
            }
        }
        Ok(())
    }

    /// Map the Boolean structure of `t` into the AIG; non-structural
    /// Boolean subterms become atoms.
    fn abstract_term(
        tm: &TermManager,
        aig: &mut Aig,
        nodes: &mut FxHashMap<TermId, AigRef>,
        atoms: &mut FxHashSet<TermId>,
        t: TermId,
    ) -> AigRef {
        if let Some(&r) = nodes.get(&t) {
            return r;
        }
        let r = match tm.kind(t) {
            Kind::Value => {
                if tm.is_bool_value(t, true) {
                    AigRef::TRUE
                } else {
                    AigRef::FALSE
                }
            }
            Kind::And | Kind::Or => {
                let mut acc = if tm.kind(t) == Kind::And {
                    AigRef::TRUE
                } else {
                    AigRef::FALSE
                };
                for &c in tm.children(t) {
                    let cr = Self::abstract_term(tm, aig, nodes, atoms, c);
                    acc = if tm.kind(t) == Kind::And {
                        aig.mk_and(acc, cr)
                    } else {
                        aig.mk_or(acc, cr)
                    };
                }
                acc
            }
            Kind::Not => {
                let c = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 0));
                c.not()
            }
            Kind::Implies => {
                let a = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 0));
                let b = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 1));
                aig.mk_or(a.not(), b)
            }
            Kind::Iff => {
                let a = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 0));
                let b = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 1));
                aig.mk_iff(a, b)
            }
            Kind::Xor => {
                let a = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 0));
                let b = Self::abstract_term(tm, aig, nodes, atoms, tm.child(t, 1));
                aig.mk_xor(a, b)
            }
            _ => {
                atoms.insert(t);
                aig.mk_var()
            }
        };
        nodes.insert(t, r);
        r
    }
}
