//! Lazy Congruence for Uninterpreted Functions and Arrays.
//!
//! The bit-blaster abstracts applications, selects and array/function
//! equalities as fresh variables. After every satisfiable SAT round this
//! engine checks the abstraction against the function congruence axioms
//! and emits refutation lemmas for the violations it finds:
//!
//! - congruence: equal argument values force equal application values
//! - read-over-write: `select(store(a, i, v), j)` respects the write
//! - extensionality: arrays differing in the model expose a witness index
//!
//! Finitely many argument tuples exist over fixed-width domains, so the
//! refinement loop reaches a fixed point.

use ruzla_core::error::Result;
use ruzla_core::sort::SortKind;
use ruzla_core::{BitVector, Kind, TermId, TermManager};
use rustc_hash::{FxHashMap, FxHashSet};

/// Model probe into the bit-blasted core.
pub trait ModelProbe {
    /// The model value of a Boolean term, if it was encoded.
    fn bool_value(&self, t: TermId) -> Option<bool>;
    /// The model value of a bit-vector term, if it was encoded.
    fn bv_value(&self, t: TermId) -> Option<BitVector>;
}

/// A model value used to key congruence classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ProbeValue {
    Bool(bool),
    Bv(BitVector),
    /// Terms without an encoding (array-sorted arguments) fall back to
    /// syntactic identity.
    Opaque(TermId),
}

/// The congruence engine.
#[derive(Debug, Default)]
pub struct FunSolver {
    applies: Vec<TermId>,
    selects: Vec<TermId>,
    equalities: Vec<TermId>,
    registered: FxHashSet<TermId>,
    /// Lemmas already emitted, to keep refinement monotone.
    emitted: FxHashSet<TermId>,
    /// Extensionality witnesses per array/function equality.
    ext_done: FxHashSet<TermId>,
    num_lemmas: u64,
}

impl FunSolver {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of lemmas emitted.
    #[must_use]
    pub fn num_lemmas(&self) -> u64 {
        self.num_lemmas
    }

    /// Register a theory leaf reported by the bit-blaster.
    pub fn register(&mut self, tm: &TermManager, t: TermId) {
        if !self.registered.insert(t) {
            return;
        }
        match tm.kind(t) {
            Kind::Apply => self.applies.push(t),
            Kind::Select => self.selects.push(t),
            Kind::Equal => self.equalities.push(t),
            _ => {}
        }
    }

    fn value(&self, tm: &TermManager, probe: &dyn ModelProbe, t: TermId) -> Option<ProbeValue> {
        match tm.sort_kind(tm.sort(t)) {
            SortKind::Bool => probe.bool_value(t).map(ProbeValue::Bool),
            SortKind::Bv(_) => probe.bv_value(t).map(ProbeValue::Bv),
            _ => Some(ProbeValue::Opaque(t)),
        }
    }

    /// Check the current model; returns refutation lemmas (empty when the
    /// abstraction is congruence-consistent).
    pub fn check(
        &mut self,
        tm: &mut TermManager,
        probe: &dyn ModelProbe,
    ) -> Result<Vec<TermId>> {
        let mut lemmas: Vec<TermId> = Vec::new();

        // Union arrays and functions the model currently equates, so
        // congruence reasons across them.
        let mut parent: FxHashMap<TermId, TermId> = FxHashMap::default();
        fn find(parent: &mut FxHashMap<TermId, TermId>, t: TermId) -> TermId {
            let p = *parent.get(&t).unwrap_or(&t);
            if p == t {
                return t;
            }
            let root = find(parent, p);
            parent.insert(t, root);
            root
        }
        let equalities = self.equalities.clone();
        for &eq in &equalities {
            if probe.bool_value(eq) == Some(true) {
                let a = find(&mut parent, tm.child(eq, 0));
                let b = find(&mut parent, tm.child(eq, 1));
                if a != b {
                    parent.insert(a, b);
                }
            }
        }
        // The equality premise usable for a pair of merged terms.
        let mut eq_premise: FxHashMap<(TermId, TermId), TermId> = FxHashMap::default();
        for &eq in &equalities {
            let a = tm.child(eq, 0);
            let b = tm.child(eq, 1);
            eq_premise.insert((a, b), eq);
            eq_premise.insert((b, a), eq);
        }

        // Function congruence, per function symbol (modulo merges).
        let applies = self.applies.clone();
        let mut groups: FxHashMap<(TermId, Vec<ProbeValue>), TermId> = FxHashMap::default();
        for &apply in &applies {
            let fun = find(&mut parent, tm.child(apply, 0));
            let mut key = Vec::with_capacity(tm.num_children(apply) - 1);
            let mut complete = true;
            for &arg in &tm.children(apply)[1..].to_vec() {
                match self.value(tm, probe, arg) {
                    Some(v) => key.push(v),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            let Some(this_val) = self.value(tm, probe, apply) else {
                continue;
            };
            if !complete {
                continue;
            }
            match groups.entry((fun, key)) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(apply);
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    let other = *e.get();
                    if self.value(tm, probe, other) != Some(this_val.clone()) {
                        let lemma =
                            self.congruence_lemma(tm, probe, &eq_premise, apply, other)?;
                        self.emit(lemma, &mut lemmas);
                    }
                }
            }
        }

        // Select congruence over (array class, index value).
        let selects = self.selects.clone();
        let mut sel_groups: FxHashMap<(TermId, ProbeValue), TermId> = FxHashMap::default();
        for &sel in &selects {
            let arr = find(&mut parent, tm.child(sel, 0));
            let Some(iv) = self.value(tm, probe, tm.child(sel, 1)) else {
                continue;
            };
            if self.value(tm, probe, sel).is_none() {
                continue;
            }
            match sel_groups.entry((arr, iv)) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(sel);
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    let other = *e.get();
                    if self.value(tm, probe, sel) != self.value(tm, probe, other) {
                        let lemma =
                            self.select_congruence_lemma(tm, probe, &eq_premise, sel, other)?;
                        self.emit(lemma, &mut lemmas);
                    }
                }
            }
        }

        // Read-over-write and constant-array axioms for selects whose base
        // survived rewriting (rewrite level 0 keeps them around).
        for &sel in &selects {
            let arr = tm.child(sel, 0);
            match tm.kind(arr) {
                Kind::Store => {
                    if let Some(lemma) = self.read_over_write(tm, probe, sel)? {
                        self.emit(lemma, &mut lemmas);
                    }
                }
                Kind::ConstArray => {
                    let dflt = tm.child(arr, 0);
                    if self.value(tm, probe, sel) != self.value(tm, probe, dflt)
                        || self.value(tm, probe, sel).is_none()
                    {
                        let lemma = tm.mk_term(Kind::Equal, &[sel, dflt], &[])?;
                        self.emit(lemma, &mut lemmas);
                    }
                }
                _ => {}
            }
        }

        // Extensionality witnesses for equalities the model refutes.
        for &eq in &equalities {
            if probe.bool_value(eq) != Some(false) || !self.ext_done.insert(eq) {
                continue;
            }
            let lemma = self.extensionality_lemma(tm, eq)?;
            self.emit(lemma, &mut lemmas);
        }

        Ok(lemmas)
    }

    fn emit(&mut self, lemma: TermId, out: &mut Vec<TermId>) {
        if self.emitted.insert(lemma) {
            self.num_lemmas += 1;
            out.push(lemma);
        }
    }

    /// `(/\ args equal) => apply_a = apply_b`, with the function equality
    /// premise included when the symbols differ.
    fn congruence_lemma(
        &self,
        tm: &mut TermManager,
        _probe: &dyn ModelProbe,
        eq_premise: &FxHashMap<(TermId, TermId), TermId>,
        a: TermId,
        b: TermId,
    ) -> Result<TermId> {
        let mut premise: Vec<TermId> = Vec::new();
        let fa = tm.child(a, 0);
        let fb = tm.child(b, 0);
        if fa != fb {
            if let Some(&eq) = eq_premise.get(&(fa, fb)) {
                premise.push(eq);
            }
        }
        let args_a: Vec<TermId> = tm.children(a)[1..].to_vec();
        let args_b: Vec<TermId> = tm.children(b)[1..].to_vec();
        for (&x, &y) in args_a.iter().zip(&args_b) {
            if x != y {
                premise.push(tm.mk_term(Kind::Equal, &[x, y], &[])?);
            }
        }
        let conclusion = tm.mk_term(Kind::Equal, &[a, b], &[])?;
        self.implication(tm, premise, conclusion)
    }

    fn select_congruence_lemma(
        &self,
        tm: &mut TermManager,
        _probe: &dyn ModelProbe,
        eq_premise: &FxHashMap<(TermId, TermId), TermId>,
        a: TermId,
        b: TermId,
    ) -> Result<TermId> {
        let mut premise: Vec<TermId> = Vec::new();
        let arr_a = tm.child(a, 0);
        let arr_b = tm.child(b, 0);
        if arr_a != arr_b {
            if let Some(&eq) = eq_premise.get(&(arr_a, arr_b)) {
                premise.push(eq);
            }
        }
        let (ia, ib) = (tm.child(a, 1), tm.child(b, 1));
        if ia != ib {
            premise.push(tm.mk_term(Kind::Equal, &[ia, ib], &[])?);
        }
        let conclusion = tm.mk_term(Kind::Equal, &[a, b], &[])?;
        self.implication(tm, premise, conclusion)
    }

    /// The violated half of `select(store(a, i, v), j)`'s write axiom.
    fn read_over_write(
        &mut self,
        tm: &mut TermManager,
        probe: &dyn ModelProbe,
        sel: TermId,
    ) -> Result<Option<TermId>> {
        let store = tm.child(sel, 0);
        let j = tm.child(sel, 1);
        let base = tm.child(store, 0);
        let i = tm.child(store, 1);
        let v = tm.child(store, 2);

        let vi = self.value(tm, probe, i);
        let vj = self.value(tm, probe, j);
        let (Some(vi), Some(vj)) = (vi, vj) else {
            return Ok(None);
        };
        let idx_eq = tm.mk_term(Kind::Equal, &[i, j], &[])?;
        if vi == vj {
            if self.value(tm, probe, sel) == self.value(tm, probe, v)
                && self.value(tm, probe, sel).is_some()
            {
                return Ok(None);
            }
            let concl = tm.mk_term(Kind::Equal, &[sel, v], &[])?;
            let lemma = tm.mk_term(Kind::Implies, &[idx_eq, concl], &[])?;
            Ok(Some(lemma))
        } else {
            // Reads through the write: introduce select(base, j) and force
            // agreement; the new select is picked up next round.
            let deeper = tm.mk_term(Kind::Select, &[base, j], &[])?;
            self.register(tm, deeper);
            if self.value(tm, probe, sel).is_some()
                && self.value(tm, probe, sel) == self.value(tm, probe, deeper)
            {
                return Ok(None);
            }
            let ne = tm.mk_term(Kind::Not, &[idx_eq], &[])?;
            let concl = tm.mk_term(Kind::Equal, &[sel, deeper], &[])?;
            let lemma = tm.mk_term(Kind::Implies, &[ne, concl], &[])?;
            Ok(Some(lemma))
        }
    }

    /// `a = b \/ witness(a) != witness(b)` for a refuted array or
    /// function equality.
    fn extensionality_lemma(&mut self, tm: &mut TermManager, eq: TermId) -> Result<TermId> {
        let a = tm.child(eq, 0);
        let b = tm.child(eq, 1);
        let sort = tm.sort(a);
        let (wa, wb) = match tm.sort_kind(sort) {
            SortKind::Array(idx, _) => {
                let idx = *idx;
                let k = tm.mk_const(idx, None);
                let wa = tm.mk_term(Kind::Select, &[a, k], &[])?;
                let wb = tm.mk_term(Kind::Select, &[b, k], &[])?;
                (wa, wb)
            }
            SortKind::Fun(all) => {
                let dom: Vec<_> = all[..all.len() - 1].to_vec();
                let mut args_a = vec![a];
                let mut args_b = vec![b];
                for d in dom {
                    let k = tm.mk_const(d, None);
                    args_a.push(k);
                    args_b.push(k);
                }
                let wa = tm.mk_term(Kind::Apply, &args_a, &[])?;
                let wb = tm.mk_term(Kind::Apply, &args_b, &[])?;
                (wa, wb)
            }
            _ => {
                return Err(ruzla_core::error::internal_error(
                    "extensionality on a non-array, non-function equality",
                ))
            }
        };
        let weq = tm.mk_term(Kind::Equal, &[wa, wb], &[])?;
        let wne = tm.mk_term(Kind::Not, &[weq], &[])?;
        tm.mk_term(Kind::Or, &[eq, wne], &[])
    }

    fn implication(
        &self,
        tm: &mut TermManager,
        premise: Vec<TermId>,
        conclusion: TermId,
    ) -> Result<TermId> {
        let antecedent = match premise.len() {
            0 => return Ok(conclusion),
            1 => premise[0],
            _ => tm.mk_term(Kind::And, &premise, &[])?,
        };
        tm.mk_term(Kind::Implies, &[antecedent, conclusion], &[])
    }

    /// Registered applications of a function or selects of an array, with
    /// their argument terms, for model construction.
    #[must_use]
    pub fn applications_of(&self, tm: &TermManager, fun: TermId) -> Vec<TermId> {
        let mut out: Vec<TermId> = self
            .applies
            .iter()
            .copied()
            .filter(|&a| tm.child(a, 0) == fun)
            .collect();
        out.extend(
            self.selects
                .iter()
                .copied()
                .filter(|&s| tm.child(s, 0) == fun),
        );
        out
    }
}
