//! Uninterpreted Constant Elimination Pass.
//!
//! Constants of uninterpreted sorts cannot be bit-blasted. Since a
//! quantifier-free formula can only force as many distinct domain
//! elements as it has terms, each uninterpreted sort embeds soundly into
//! a fixed-width bit-vector domain; its constants are replaced by fresh
//! bit-vector constants (also inside function and array sorts).

use crate::preprocess::{substitute, AssertionSlice, PassCtx};
use ruzla_core::error::Result;
use ruzla_core::sort::{SortId, SortKind};
use ruzla_core::{Kind, TermId, TermManager};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Width of the bit-vector domain standing in for an uninterpreted sort.
/// Formulas forcing more than `2^16` distinct elements are out of reach
/// long before the encoding saturates.
const DOMAIN_BITS: u64 = 16;

/// Replaces uninterpreted-sorted constants by bit-vector constants.
#[derive(Debug, Default)]
pub struct PassElimUninterpreted {
    /// Stable constant replacement map across calls.
    replaced: FxHashMap<TermId, TermId>,
    /// Constants replaced.
    pub num_eliminated: u64,
}

impl PassElimUninterpreted {
    /// Eliminate uninterpreted-sorted constants from the slice.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        // Collect constants whose sorts mention uninterpreted components.
        let mut map: FxHashMap<TermId, TermId> = FxHashMap::default();
        for i in 0..slice.len() {
            let root = slice.get(i);
            let mut stack = vec![root];
            let mut seen = rustc_hash::FxHashSet::default();
            while let Some(cur) = stack.pop() {
                if !seen.insert(cur) {
                    continue;
                }
                if ctx.tm.kind(cur) == Kind::Constant
                    && Self::mentions_uninterpreted(ctx.tm, ctx.tm.sort(cur))
                {
                    let lowered = self.replacement(ctx.tm, cur)?;
                    map.insert(cur, lowered);
                }
                stack.extend(ctx.tm.children(cur).iter().copied());
            }
        }
        if map.is_empty() {
            return Ok(());
        }
        for i in 0..slice.len() {
            let t = slice.get(i);
            let replaced = substitute(ctx.tm, t, &map)?;
            slice.replace(i, replaced);
        }
        Ok(())
    }

    fn replacement(&mut self, tm: &mut TermManager, c: TermId) -> Result<TermId> {
        if let Some(&r) = self.replaced.get(&c) {
            return Ok(r);
        }
        let sort = Self::lower_sort(tm, tm.sort(c))?;
        let symbol = tm.symbol(c).map(str::to_owned);
        let fresh = tm.mk_const(sort, symbol.as_deref());
        self.replaced.insert(c, fresh);
        self.num_eliminated += 1;
        Ok(fresh)
    }

    fn mentions_uninterpreted(tm: &TermManager, sort: SortId) -> bool {
        match tm.sort_kind(sort) {
            SortKind::Uninterpreted(_) => true,
            SortKind::Array(i, e) => {
                let (i, e) = (*i, *e);
                Self::mentions_uninterpreted(tm, i) || Self::mentions_uninterpreted(tm, e)
            }
            SortKind::Fun(all) => {
                let all: SmallVec<[SortId; 4]> = all.iter().copied().collect();
                all.iter().any(|&s| Self::mentions_uninterpreted(tm, s))
            }
            _ => false,
        }
    }

    fn lower_sort(tm: &mut TermManager, sort: SortId) -> Result<SortId> {
        match tm.sort_kind(sort) {
            SortKind::Uninterpreted(_) => tm.mk_bv_sort(DOMAIN_BITS),
            SortKind::Array(i, e) => {
                let (i, e) = (*i, *e);
                let li = Self::lower_sort(tm, i)?;
                let le = Self::lower_sort(tm, e)?;
                tm.mk_array_sort(li, le)
            }
            SortKind::Fun(all) => {
                let all: SmallVec<[SortId; 4]> = all.iter().copied().collect();
                let mut lowered = SmallVec::<[SortId; 4]>::new();
                for &s in &all {
                    lowered.push(Self::lower_sort(tm, s)?);
                }
                let (cod, dom) = lowered.split_last().expect("nonempty");
                tm.mk_fun_sort(dom, *cod)
            }
            _ => Ok(sort),
        }
    }
}
