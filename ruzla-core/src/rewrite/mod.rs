//! Kind-Dispatched Term Rewriter.
//!
//! [`Rewriter::rewrite`] returns an equivalent normal form of a term under
//! the SMT-LIB theory semantics. The rewrite level selects intensity:
//!
//! - level 0: identity
//! - level 1: constant folding, neutral/absorbing elements, operator
//!   normalization (inequality direction, operand order), array
//!   read-over-write lowering
//! - level 2: level 1 plus inverse cancellation, extract/concat fusion and
//!   contradiction detection
//!
//! The rewriter is deterministic and memoized; `rewrite(rewrite(t)) ==
//! rewrite(t)`.

mod bv;
mod fp;

use crate::error::Result;
use crate::node::{Kind, TermId, TermManager, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Maximum full bottom-up passes before declaring a normal form. Rule sets
/// strictly shrink terms, so this is a backstop, not a budget.
const MAX_PASSES: usize = 64;

/// The term rewriter.
#[derive(Debug, Default)]
pub struct Rewriter {
    level: u64,
    /// Memoized normal forms at the current level.
    normal: FxHashMap<TermId, TermId>,
}

impl Rewriter {
    /// Create a rewriter with the given level (0-2).
    #[must_use]
    pub fn new(level: u64) -> Self {
        Self {
            level: level.min(2),
            normal: FxHashMap::default(),
        }
    }

    /// The rewrite level.
    #[must_use]
    pub fn level(&self) -> u64 {
        self.level
    }

    /// Change the rewrite level, invalidating the memo table.
    pub fn set_level(&mut self, level: u64) {
        if self.level != level.min(2) {
            self.level = level.min(2);
            self.normal.clear();
        }
    }

    /// Drop all memoized results (required before garbage collection).
    pub fn clear_cache(&mut self) {
        self.normal.clear();
    }

    /// Rewrite a term to an equivalent normal form of the same sort.
    pub fn rewrite(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        if self.level == 0 {
            return Ok(term);
        }
        if let Some(&t) = self.normal.get(&term) {
            return Ok(t);
        }
        let mut cur = term;
        for _ in 0..MAX_PASSES {
            let next = self.rewrite_pass(tm, cur)?;
            if next == cur {
                break;
            }
            cur = next;
        }
        self.normal.insert(term, cur);
        self.normal.insert(cur, cur);
        Ok(cur)
    }

    /// One bottom-up pass over the DAG.
    fn rewrite_pass(&mut self, tm: &mut TermManager, root: TermId) -> Result<TermId> {
        let mut done: FxHashMap<TermId, TermId> = FxHashMap::default();
        let mut stack: Vec<(TermId, bool)> = vec![(root, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if done.contains_key(&cur) {
                continue;
            }
            if let Some(&t) = self.normal.get(&cur) {
                done.insert(cur, t);
                continue;
            }
            if !expanded {
                stack.push((cur, true));
                for &child in tm.children(cur) {
                    stack.push((child, false));
                }
                continue;
            }
            let children: SmallVec<[TermId; 4]> = tm
                .children(cur)
                .iter()
                .map(|c| done[c])
                .collect();
            let rebuilt = tm.rebuild(cur, &children)?;
            let result = self.apply_rules(tm, rebuilt)?;
            done.insert(cur, result);
        }
        Ok(done[&root])
    }

    /// Apply node-local rules until the node stops changing. Newly created
    /// subterms are normalized by the next driver pass.
    fn apply_rules(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let mut cur = term;
        for _ in 0..MAX_PASSES {
            let next = self.apply_rules_once(tm, cur)?;
            if next == cur {
                return Ok(cur);
            }
            cur = next;
        }
        Ok(cur)
    }

    fn apply_rules_once(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let kind = tm.kind(term);
        if kind.is_leaf() {
            return Ok(term);
        }

        // Constant folding is uniform across kinds.
        if let Some(folded) = self.fold(tm, term)? {
            return Ok(folded);
        }

        let term = self.normalize_operands(tm, term)?;
        let kind = tm.kind(term);
        match kind {
            Kind::And | Kind::Or => self.rw_and_or(tm, term),
            Kind::Not => self.rw_not(tm, term),
            Kind::Implies => {
                let a = tm.child(term, 0);
                let b = tm.child(term, 1);
                let na = tm.mk_term(Kind::Not, &[a], &[])?;
                tm.mk_term(Kind::Or, &[na, b], &[])
            }
            Kind::Iff => {
                let a = tm.child(term, 0);
                let b = tm.child(term, 1);
                tm.mk_term(Kind::Equal, &[a, b], &[])
            }
            Kind::Xor => {
                let a = tm.child(term, 0);
                let b = tm.child(term, 1);
                let eq = tm.mk_term(Kind::Equal, &[a, b], &[])?;
                tm.mk_term(Kind::Not, &[eq], &[])
            }
            Kind::Ite => self.rw_ite(tm, term),
            Kind::Equal => self.rw_equal(tm, term),
            Kind::Distinct => self.rw_distinct(tm, term),
            Kind::Select => self.rw_select(tm, term),
            Kind::Store => self.rw_store(tm, term),
            k if bv::is_bv_kind(k) => bv::rewrite(self, tm, term),
            k if fp::is_fp_kind(k) => fp::rewrite(self, tm, term),
            _ => Ok(term),
        }
    }

    /// Sort the operands of commutative kinds by id so equal terms meet.
    fn normalize_operands(&self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let kind = tm.kind(term);
        if !kind.is_commutative() {
            return Ok(term);
        }
        let mut children: SmallVec<[TermId; 4]> = tm.children(term).iter().copied().collect();
        if children.windows(2).all(|w| w[0] <= w[1]) {
            return Ok(term);
        }
        children.sort_unstable();
        tm.rebuild(term, &children)
    }

    /* ---- constant folding -------------------------------------------------- */

    fn fold(&mut self, tm: &mut TermManager, term: TermId) -> Result<Option<TermId>> {
        let kind = tm.kind(term);
        let all_values = tm.children(term).iter().all(|&c| tm.is_value(c));
        match kind {
            Kind::And | Kind::Or | Kind::Not | Kind::Implies | Kind::Iff | Kind::Xor
                if all_values =>
            {
                let vals: Vec<bool> = tm
                    .children(term)
                    .iter()
                    .map(|&c| tm.value(c).and_then(Value::as_bool).expect("bool value"))
                    .collect();
                let res = match kind {
                    Kind::And => vals.iter().all(|&b| b),
                    Kind::Or => vals.iter().any(|&b| b),
                    Kind::Not => !vals[0],
                    Kind::Implies => !vals[0] || vals[1],
                    Kind::Iff => vals[0] == vals[1],
                    _ => vals[0] != vals[1],
                };
                Ok(Some(tm.mk_bool_value(res)))
            }
            Kind::Ite => {
                let c = tm.child(term, 0);
                match tm.value(c).and_then(Value::as_bool) {
                    Some(true) => Ok(Some(tm.child(term, 1))),
                    Some(false) => Ok(Some(tm.child(term, 2))),
                    None => Ok(None),
                }
            }
            // Hash-consing makes equal values share ids, so id comparison
            // decides equality of values.
            Kind::Equal if all_values => {
                let res = tm.child(term, 0) == tm.child(term, 1);
                Ok(Some(tm.mk_bool_value(res)))
            }
            Kind::Distinct if all_values => {
                let children = tm.children(term);
                let mut seen = FxHashSet::default();
                let distinct = children.iter().all(|&c| seen.insert(c));
                Ok(Some(tm.mk_bool_value(distinct)))
            }
            k if bv::is_bv_kind(k) && all_values => bv::fold(tm, term),
            k if fp::is_fp_kind(k) && all_values => fp::fold(tm, term),
            _ => Ok(None),
        }
    }

    /* ---- boolean rules ------------------------------------------------------ */

    fn rw_and_or(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let kind = tm.kind(term);
        let neutral = kind == Kind::And;
        // And: drop true, short-circuit false. Or: dual.
        let children: SmallVec<[TermId; 4]> = tm.children(term).iter().copied().collect();
        let mut kept: SmallVec<[TermId; 4]> = SmallVec::new();
        for &c in &children {
            if tm.is_bool_value(c, neutral) {
                continue;
            }
            if tm.is_bool_value(c, !neutral) {
                return Ok(tm.mk_bool_value(!neutral));
            }
            if kept.last() == Some(&c) {
                continue; // operands are sorted, duplicates are adjacent
            }
            kept.push(c);
        }
        if self.level >= 2 {
            let set: FxHashSet<TermId> = kept.iter().copied().collect();
            for &c in &kept {
                if tm.kind(c) == Kind::Not && set.contains(&tm.child(c, 0)) {
                    return Ok(tm.mk_bool_value(!neutral));
                }
            }
        }
        match kept.len() {
            0 => Ok(tm.mk_bool_value(neutral)),
            1 => Ok(kept[0]),
            _ if kept.len() == children.len() => Ok(term),
            _ => tm.mk_term(kind, &kept, &[]),
        }
    }

    fn rw_not(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let c = tm.child(term, 0);
        if tm.kind(c) == Kind::Not {
            return Ok(tm.child(c, 0));
        }
        Ok(term)
    }

    fn rw_ite(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let c = tm.child(term, 0);
        let t = tm.child(term, 1);
        let e = tm.child(term, 2);
        if t == e {
            return Ok(t);
        }
        if tm.is_bool_value(t, true) && tm.is_bool_value(e, false) {
            return Ok(c);
        }
        if tm.is_bool_value(t, false) && tm.is_bool_value(e, true) {
            return tm.mk_term(Kind::Not, &[c], &[]);
        }
        if self.level >= 2 && tm.kind(c) == Kind::Not {
            let inner = tm.child(c, 0);
            return tm.mk_term(Kind::Ite, &[inner, e, t], &[]);
        }
        Ok(term)
    }

    fn rw_equal(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let a = tm.child(term, 0);
        let b = tm.child(term, 1);
        if a == b {
            return Ok(tm.mk_true());
        }
        // Boolean equality with a constant side collapses.
        if tm.is_bool_sort(tm.sort(a)) {
            for (x, y) in [(a, b), (b, a)] {
                if tm.is_bool_value(x, true) {
                    return Ok(y);
                }
                if tm.is_bool_value(x, false) {
                    return tm.mk_term(Kind::Not, &[y], &[]);
                }
            }
            if self.level >= 2 {
                if tm.kind(a) == Kind::Not && tm.child(a, 0) == b {
                    return Ok(tm.mk_false());
                }
                if tm.kind(b) == Kind::Not && tm.child(b, 0) == a {
                    return Ok(tm.mk_false());
                }
            }
        }
        // Distinct values of any sort cannot be equal.
        if tm.is_value(a) && tm.is_value(b) {
            return Ok(tm.mk_bool_value(a == b));
        }
        Ok(term)
    }

    fn rw_distinct(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let children: SmallVec<[TermId; 4]> = tm.children(term).iter().copied().collect();
        for (i, &a) in children.iter().enumerate() {
            for &b in &children[i + 1..] {
                if a == b {
                    return Ok(tm.mk_false());
                }
            }
        }
        // Expand into pairwise disequalities.
        let mut conj: Vec<TermId> = Vec::new();
        for (i, &a) in children.iter().enumerate() {
            for &b in &children[i + 1..] {
                let eq = tm.mk_term(Kind::Equal, &[a, b], &[])?;
                conj.push(tm.mk_term(Kind::Not, &[eq], &[])?);
            }
        }
        if conj.len() == 1 {
            return Ok(conj[0]);
        }
        tm.mk_term(Kind::And, &conj, &[])
    }

    /* ---- array rules -------------------------------------------------------- */

    fn rw_select(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        let arr = tm.child(term, 0);
        let idx = tm.child(term, 1);
        match tm.kind(arr) {
            Kind::ConstArray => Ok(tm.child(arr, 0)),
            Kind::Ite => {
                // Push the read through array-sorted conditionals.
                let c = tm.child(arr, 0);
                let ta = tm.child(arr, 1);
                let ea = tm.child(arr, 2);
                let st = tm.mk_term(Kind::Select, &[ta, idx], &[])?;
                let se = tm.mk_term(Kind::Select, &[ea, idx], &[])?;
                tm.mk_term(Kind::Ite, &[c, st, se], &[])
            }
            Kind::Store => {
                let base = tm.child(arr, 0);
                let widx = tm.child(arr, 1);
                let val = tm.child(arr, 2);
                if widx == idx {
                    return Ok(val);
                }
                if tm.is_value(widx) && tm.is_value(idx) {
                    // Distinct value indices: the write cannot alias.
                    return tm.mk_term(Kind::Select, &[base, idx], &[]);
                }
                // Read-over-write lowering.
                let eq = tm.mk_term(Kind::Equal, &[widx, idx], &[])?;
                let deeper = tm.mk_term(Kind::Select, &[base, idx], &[])?;
                tm.mk_term(Kind::Ite, &[eq, val, deeper], &[])
            }
            _ => Ok(term),
        }
    }

    fn rw_store(&mut self, tm: &mut TermManager, term: TermId) -> Result<TermId> {
        if self.level < 2 {
            return Ok(term);
        }
        let arr = tm.child(term, 0);
        let idx = tm.child(term, 1);
        let val = tm.child(term, 2);
        // store(a, i, select(a, i)) is a.
        if tm.kind(val) == Kind::Select
            && tm.child(val, 0) == arr
            && tm.child(val, 1) == idx
        {
            return Ok(arr);
        }
        // store(store(a, i, v'), i, v) collapses to the outer write.
        if tm.kind(arr) == Kind::Store && tm.child(arr, 1) == idx {
            let base = tm.child(arr, 0);
            return tm.mk_term(Kind::Store, &[base, idx, val], &[]);
        }
        Ok(term)
    }
}
