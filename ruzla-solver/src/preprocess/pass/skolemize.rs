//! Skolemization Pass for Asserted Existentials.
//!
//! A top-level `exists x. phi` (or `not (forall x. phi)`) is satisfiable
//! iff `phi[x -> c]` is for a fresh constant `c`, so asserted existentials
//! solve without the quantifier module.

use crate::preprocess::{substitute, AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::{Kind, TermId, TermManager};
use rustc_hash::FxHashMap;

/// Replaces asserted existential binders by fresh constants.
#[derive(Debug, Default)]
pub struct PassSkolemize;

impl PassSkolemize {
    /// Skolemize top-level existential assertions.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        for i in 0..slice.len() {
            let t = slice.get(i);
            let skolemized = Self::skolemize(ctx.tm, t)?;
            slice.replace(i, skolemized);
        }
        Ok(())
    }

    fn skolemize(tm: &mut TermManager, mut t: TermId) -> Result<TermId> {
        loop {
            match tm.kind(t) {
                Kind::Exists => {
                    let var = tm.child(t, 0);
                    let body = tm.child(t, 1);
                    let fresh = tm.mk_const(tm.sort(var), None);
                    let mut map = FxHashMap::default();
                    map.insert(var, fresh);
                    t = substitute(tm, body, &map)?;
                }
                Kind::Not if tm.kind(tm.child(t, 0)) == Kind::Forall => {
                    let forall = tm.child(t, 0);
                    let var = tm.child(forall, 0);
                    let body = tm.child(forall, 1);
                    let fresh = tm.mk_const(tm.sort(var), None);
                    let mut map = FxHashMap::default();
                    map.insert(var, fresh);
                    let inst = substitute(tm, body, &map)?;
                    t = tm.mk_term(Kind::Not, &[inst], &[])?;
                }
                _ => return Ok(t),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skolemize_exists() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let v = tm.mk_var(bv8, Some("v"));
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[v, zero], &[]).unwrap();
        let ex = tm.mk_term(Kind::Exists, &[v, eq], &[]).unwrap();
        let sk = PassSkolemize::skolemize(&mut tm, ex).unwrap();
        assert_eq!(tm.kind(sk), Kind::Equal);
        assert_eq!(tm.kind(tm.child(sk, 0)), Kind::Constant);
    }

    #[test]
    fn test_negated_forall() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let v = tm.mk_var(bv8, Some("v"));
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[v, zero], &[]).unwrap();
        let fa = tm.mk_term(Kind::Forall, &[v, eq], &[]).unwrap();
        let nf = tm.mk_term(Kind::Not, &[fa], &[]).unwrap();
        let sk = PassSkolemize::skolemize(&mut tm, nf).unwrap();
        assert_eq!(tm.kind(sk), Kind::Not);
        assert_eq!(tm.kind(tm.child(sk, 0)), Kind::Equal);
    }

    #[test]
    fn test_inner_quantifier_untouched() {
        let mut tm = TermManager::new();
        let bool_s = tm.mk_bool_sort();
        let p = tm.mk_const(bool_s, Some("p"));
        let sk = PassSkolemize::skolemize(&mut tm, p).unwrap();
        assert_eq!(sk, p);
    }
}
